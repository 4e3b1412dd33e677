use std::sync::Arc;
use std::time::Duration;

use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ProtocolVersion, RootCertStore};
use serde::{Serialize, Deserialize};
use tokio::time::Instant;
use tokio_rustls::TlsConnector;

use crate::error::ScanFailure;
use crate::utils::{remaining, resolve_and_connect, Target};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ProtocolInfo {
    pub raw_version: String,
    pub friendly_name: String,
    pub insecure: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CipherInfo {
    pub name: String,
    pub protocol_label: String,
    pub bits: u32,
    /// Negotiated named group, when the TLS stack exposes it (TLS 1.3).
    pub key_exchange_group: Option<String>,
}

impl CipherInfo {
    /// The string the PQC classifier matches KEM keywords against. The named
    /// group carries the key-exchange identity under TLS 1.3; the suite name
    /// is the fallback substrate.
    pub fn key_exchange_label(&self) -> &str {
        self.key_exchange_group.as_deref().unwrap_or(&self.name)
    }
}

/// Everything the orchestrator needs from one completed handshake.
pub struct HandshakeData {
    pub protocol: ProtocolInfo,
    pub cipher: CipherInfo,
    pub peer_cert_der: Vec<u8>,
    pub compression: String,
}

pub fn protocol_info(version: Option<ProtocolVersion>) -> ProtocolInfo {
    let (raw, friendly, insecure) = match version {
        Some(ProtocolVersion::SSLv2) => ("SSLv2".to_string(), "SSL 2.0", true),
        Some(ProtocolVersion::SSLv3) => ("SSLv3".to_string(), "SSL 3.0", true),
        Some(ProtocolVersion::TLSv1_0) => ("TLSv1.0".to_string(), "TLS 1.0", false),
        Some(ProtocolVersion::TLSv1_1) => ("TLSv1.1".to_string(), "TLS 1.1", false),
        Some(ProtocolVersion::TLSv1_2) => ("TLSv1.2".to_string(), "TLS 1.2", false),
        Some(ProtocolVersion::TLSv1_3) => ("TLSv1.3".to_string(), "TLS 1.3", false),
        Some(other) => (format!("{:?}", other), "Unknown", false),
        None => ("unknown".to_string(), "Unknown", false),
    };
    ProtocolInfo { raw_version: raw, friendly_name: friendly.to_string(), insecure }
}

/// Symmetric key strength implied by the suite name.
fn cipher_bits(name: &str) -> u32 {
    if name.contains("AES_256") || name.contains("CHACHA20") {
        256
    } else if name.contains("AES_128") {
        128
    } else if name.contains("3DES") {
        112
    } else {
        0
    }
}

fn classify_handshake_error(target: &Target, e: std::io::Error) -> ScanFailure {
    if let Some(tls_err) = e.get_ref().and_then(|inner| inner.downcast_ref::<rustls::Error>()) {
        return match tls_err {
            rustls::Error::InvalidCertificate(reason) => ScanFailure::cert_verification(
                format!("Certificate verification failed: {:?}", reason),
            ),
            other => ScanFailure::tls(format!("TLS handshake with {target} failed: {other}")),
        };
    }
    match e.kind() {
        std::io::ErrorKind::TimedOut => {
            ScanFailure::timeout(format!("Timed out during TLS handshake with {target}"))
        }
        std::io::ErrorKind::ConnectionRefused => {
            ScanFailure::refused(format!("Connection refused on port {}", target.port))
        }
        /* the peer tearing the connection down mid-handshake is a TLS-level
         * rejection (no ALPN match, no common cipher, plain-TCP service) */
        std::io::ErrorKind::UnexpectedEof
        | std::io::ErrorKind::ConnectionReset
        | std::io::ErrorKind::ConnectionAborted
        | std::io::ErrorKind::BrokenPipe => {
            ScanFailure::tls(format!("TLS handshake with {target} failed: {e}"))
        }
        _ => ScanFailure::unexpected(&e),
    }
}

fn tls_connector() -> TlsConnector {
    /* no-op after the first call */
    let _ = rustls::crypto::ring::default_provider().install_default();

    let mut root_store = RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    /* strict default verification: the point of the tool is an honest
     * security assessment, so chain and hostname checks stay on */
    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}

/// Perform one verified TLS handshake. DNS resolution, TCP connect and the
/// handshake itself are all charged against the same `timeout` budget.
pub async fn execute(target: &Target, timeout: Duration) -> Result<HandshakeData, ScanFailure> {
    let deadline = Instant::now() + timeout;

    let (addr, tcp) = resolve_and_connect(target, deadline).await?;
    log::debug!("Connected to {} ({}), starting TLS handshake", target, addr);

    let server_name = ServerName::try_from(target.host.clone())
        .map_err(|e| ScanFailure::tls(format!("Invalid server name {:?}: {e}", target.host)))?;

    let connector = tls_connector();
    let stream = match tokio::time::timeout(remaining(deadline), connector.connect(server_name, tcp)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => {
            log::debug!("Handshake with {target} failed: {e}");
            return Err(classify_handshake_error(target, e));
        }
        Err(_) => {
            return Err(ScanFailure::timeout(format!(
                "Timed out during TLS handshake with {target}"
            )));
        }
    };

    let (_, conn) = stream.get_ref();

    let protocol = protocol_info(conn.protocol_version());

    let suite_name = match conn.negotiated_cipher_suite() {
        Some(suite) => format!("{:?}", suite.suite()),
        None => "unknown".to_string(),
    };
    let key_exchange_group = conn
        .negotiated_key_exchange_group()
        .map(|group| format!("{:?}", group.name()));

    let cipher = CipherInfo {
        bits: cipher_bits(&suite_name),
        protocol_label: protocol.friendly_name.clone(),
        name: suite_name,
        key_exchange_group,
    };

    let peer_cert_der = match conn.peer_certificates().and_then(|certs| certs.first()) {
        Some(der) => der.as_ref().to_vec(),
        None => {
            return Err(ScanFailure::tls(format!("{target} presented no peer certificate")));
        }
    };

    log::debug!(
        "{} negotiated {} / {} (kx {:?})",
        target, protocol.friendly_name, cipher.name, cipher.key_exchange_group
    );

    Ok(HandshakeData {
        protocol,
        cipher,
        peer_cert_der,
        /* rustls never negotiates TLS-level compression */
        compression: "none".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssl_versions_are_flagged_insecure() {
        let p = protocol_info(Some(ProtocolVersion::SSLv3));
        assert_eq!(p.friendly_name, "SSL 3.0");
        assert!(p.insecure);
        let p = protocol_info(Some(ProtocolVersion::SSLv2));
        assert!(p.insecure);
    }

    #[test]
    fn tls13_is_friendly_and_secure() {
        let p = protocol_info(Some(ProtocolVersion::TLSv1_3));
        assert_eq!(p.raw_version, "TLSv1.3");
        assert_eq!(p.friendly_name, "TLS 1.3");
        assert!(!p.insecure);
    }

    #[test]
    fn unknown_version_maps_to_unknown() {
        let p = protocol_info(None);
        assert_eq!(p.friendly_name, "Unknown");
    }

    #[test]
    fn cipher_bits_follow_the_suite_name() {
        assert_eq!(cipher_bits("TLS13_AES_256_GCM_SHA384"), 256);
        assert_eq!(cipher_bits("TLS13_AES_128_GCM_SHA256"), 128);
        assert_eq!(cipher_bits("TLS13_CHACHA20_POLY1305_SHA256"), 256);
        assert_eq!(cipher_bits("TLS_NULL_WITH_NULL_NULL"), 0);
    }

    #[test]
    fn handshake_teardown_is_a_protocol_error() {
        use crate::error::FailureKind;
        let target = Target { host: "host.example".to_string(), port: 443 };

        for kind in [
            std::io::ErrorKind::UnexpectedEof,
            std::io::ErrorKind::ConnectionReset,
            std::io::ErrorKind::ConnectionAborted,
            std::io::ErrorKind::BrokenPipe,
        ] {
            let e = std::io::Error::new(kind, "connection closed during handshake");
            let f = classify_handshake_error(&target, e);
            assert_eq!(f.kind, FailureKind::TlsProtocolError, "{kind:?}");
            assert!(!f.certificate_error);
        }
    }

    #[test]
    fn handshake_certificate_rejection_is_classified() {
        use crate::error::FailureKind;
        let target = Target { host: "host.example".to_string(), port: 443 };

        let cause = rustls::Error::InvalidCertificate(rustls::CertificateError::UnknownIssuer);
        let e = std::io::Error::new(std::io::ErrorKind::InvalidData, cause);
        let f = classify_handshake_error(&target, e);
        assert_eq!(f.kind, FailureKind::CertificateVerificationFailed);
        assert!(f.certificate_error);

        let e = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let f = classify_handshake_error(&target, e);
        assert_eq!(f.kind, FailureKind::Unexpected);
    }

    #[test]
    fn kem_label_prefers_the_named_group() {
        let cipher = CipherInfo {
            name: "TLS13_AES_256_GCM_SHA384".to_string(),
            protocol_label: "TLS 1.3".to_string(),
            bits: 256,
            key_exchange_group: Some("X25519MLKEM768".to_string()),
        };
        assert_eq!(cipher.key_exchange_label(), "X25519MLKEM768");

        let cipher = CipherInfo { key_exchange_group: None, ..cipher };
        assert_eq!(cipher.key_exchange_label(), "TLS13_AES_256_GCM_SHA384");
    }
}
