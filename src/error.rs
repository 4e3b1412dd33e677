use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Top-level classification of why a scan failed. Exhaustive and mutually
/// exclusive; every failure is terminal for a single scan.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    DnsResolutionFailed,
    ConnectionRefused,
    Timeout,
    CertificateVerificationFailed,
    TlsProtocolError,
    MalformedCertificate,
    Unexpected,
}

#[derive(Serialize, Deserialize, Clone, Debug, Error)]
#[error("{message}")]
pub struct ScanFailure {
    pub kind: FailureKind,
    pub message: String,
    /// True when TLS was reachable but the peer certificate did not verify.
    /// Callers can report "reachable but untrusted" instead of a dead host.
    pub certificate_error: bool,
}

impl ScanFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> ScanFailure {
        ScanFailure {
            kind,
            message: message.into(),
            certificate_error: kind == FailureKind::CertificateVerificationFailed,
        }
    }

    pub fn dns(message: impl Into<String>) -> ScanFailure {
        Self::new(FailureKind::DnsResolutionFailed, message)
    }

    pub fn refused(message: impl Into<String>) -> ScanFailure {
        Self::new(FailureKind::ConnectionRefused, message)
    }

    pub fn timeout(message: impl Into<String>) -> ScanFailure {
        Self::new(FailureKind::Timeout, message)
    }

    pub fn cert_verification(message: impl Into<String>) -> ScanFailure {
        Self::new(FailureKind::CertificateVerificationFailed, message)
    }

    pub fn tls(message: impl Into<String>) -> ScanFailure {
        Self::new(FailureKind::TlsProtocolError, message)
    }

    pub fn malformed_cert(message: impl Into<String>) -> ScanFailure {
        Self::new(FailureKind::MalformedCertificate, message)
    }

    /// Catch-all that preserves the underlying cause's type name and
    /// message for diagnosis.
    pub fn unexpected<E: std::error::Error>(cause: &E) -> ScanFailure {
        Self::new(
            FailureKind::Unexpected,
            format!("Unexpected error: {}: {}", std::any::type_name::<E>(), cause),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cert_verification_failures_carry_the_marker() {
        let f = ScanFailure::cert_verification("unknown issuer");
        assert_eq!(f.kind, FailureKind::CertificateVerificationFailed);
        assert!(f.certificate_error);
    }

    #[test]
    fn other_kinds_do_not_carry_the_marker() {
        assert!(!ScanFailure::refused("nope").certificate_error);
        assert!(!ScanFailure::timeout("slow").certificate_error);
        assert!(!ScanFailure::malformed_cert("bad der").certificate_error);
    }

    #[test]
    fn unexpected_preserves_type_name_and_message() {
        let cause = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "boom");
        let f = ScanFailure::unexpected(&cause);
        assert_eq!(f.kind, FailureKind::Unexpected);
        assert!(f.message.starts_with("Unexpected error: "));
        assert!(f.message.contains("io::error::Error"), "{}", f.message);
        assert!(f.message.ends_with("boom"), "{}", f.message);
    }
}
