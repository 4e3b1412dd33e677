use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use x509_parser::objects::{oid2sn, oid_registry};
use x509_parser::der_parser::der::parse_der_integer;
use x509_parser::der_parser::oid::Oid;
use x509_parser::prelude::*;
use x509_parser::public_key::PublicKey;

use crate::error::ScanFailure;

/// Closed classification of the certificate's subject public key. Anything
/// outside the first three variants lands in `Other` instead of failing.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "algorithm")]
pub enum PublicKeyInfo {
    Rsa { size: usize, exponent: u64 },
    EllipticCurve { curve: String, size: usize },
    Dsa { size: usize },
    Other { name: String, size: Option<usize> },
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct CertificateExtensions {
    /// Absent extension is represented as None, never as an empty list.
    pub subject_alt_names: Option<Vec<String>>,
    pub key_usage: Option<BTreeMap<String, bool>>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CertificateInfo {
    pub subject: String,
    pub issuer: String,
    pub common_name: Option<String>,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub expired: bool,
    pub not_yet_valid: bool,
    /// Set when not_after < not_before. The expired/not_yet_valid flags are
    /// still reported as computed rather than silently reconciled.
    pub malformed_validity: bool,
    pub public_key: PublicKeyInfo,
    pub signature_algorithm: String,
    pub serial_number: String,
    pub extensions: CertificateExtensions,
}

/* PQC signature OIDs that predate the registry shipped with the parser */
const PQC_SIGNATURE_OIDS: &[(&str, &str)] = &[
    ("2.16.840.1.101.3.4.3.17", "ML-DSA-44"),
    ("2.16.840.1.101.3.4.3.18", "ML-DSA-65"),
    ("2.16.840.1.101.3.4.3.19", "ML-DSA-87"),
    ("1.3.9999.3.6", "Falcon-512"),
    ("1.3.9999.3.9", "Falcon-1024"),
];

/* Classical signature OIDs absent from the parser's registry */
const EXTRA_SIGNATURE_OIDS: &[(&str, &str)] = &[
    ("2.16.840.1.101.3.4.3.1", "dsa-with-SHA224"),
    ("2.16.840.1.101.3.4.3.2", "dsa-with-SHA256"),
];

fn algorithm_name(oid: &Oid) -> String {
    let dotted = oid.to_id_string();
    for (known, name) in PQC_SIGNATURE_OIDS.iter().chain(EXTRA_SIGNATURE_OIDS) {
        if dotted == *known {
            return name.to_string();
        }
    }
    match oid2sn(oid, oid_registry()) {
        Ok(sn) => sn.to_string(),
        Err(_) => dotted,
    }
}

fn curve_name(oid: &Oid) -> String {
    match oid.to_id_string().as_str() {
        "1.2.840.10045.3.1.7" => "secp256r1".to_string(),
        "1.3.132.0.34" => "secp384r1".to_string(),
        "1.3.132.0.35" => "secp521r1".to_string(),
        "1.3.132.0.10" => "secp256k1".to_string(),
        _ => algorithm_name(oid),
    }
}

/// Exact bit length of a big-endian integer, ignoring leading zero bytes
/// (the DER sign byte included).
fn int_bits(bytes: &[u8]) -> usize {
    let mut significant = bytes.iter().skip_while(|b| **b == 0);
    match significant.next() {
        Some(first) => significant.count() * 8 + (8 - first.leading_zeros() as usize),
        None => 0,
    }
}

/// DSA key strength is the bit length of the prime p from the Dss-Parms
/// SEQUENCE, not of the public integer y. Falls back to y when the
/// parameters are absent or unreadable.
fn dsa_key_bits(spki: &SubjectPublicKeyInfo, y: &[u8]) -> usize {
    spki.algorithm
        .parameters
        .as_ref()
        .and_then(|params| {
            /* params.data is the SEQUENCE content; p is its first INTEGER */
            let (_, p) = parse_der_integer(params.data).ok()?;
            p.as_slice().ok().map(int_bits)
        })
        .unwrap_or_else(|| int_bits(y))
}

fn public_key_info(cert: &X509Certificate) -> PublicKeyInfo {
    let spki = cert.public_key();
    match spki.parsed() {
        Ok(PublicKey::RSA(rsa)) => PublicKeyInfo::Rsa {
            size: int_bits(rsa.modulus),
            exponent: rsa.try_exponent().unwrap_or(0),
        },
        Ok(PublicKey::EC(point)) => {
            let curve = spki
                .algorithm
                .parameters
                .as_ref()
                .and_then(|p| p.as_oid().ok())
                .map(|oid| curve_name(&oid))
                .unwrap_or_else(|| "unknown".to_string());
            /* uncompressed SEC1 point: 0x04 || X || Y */
            let data = point.data();
            let size = if data.first() == Some(&4) { (data.len() - 1) / 2 * 8 } else { 0 };
            PublicKeyInfo::EllipticCurve { curve, size }
        }
        Ok(PublicKey::DSA(y)) => PublicKeyInfo::Dsa { size: dsa_key_bits(spki, y) },
        /* anything else, including key types the parser cannot interpret
         * (e.g. PQC keys), still gets classified by algorithm identifier */
        Ok(_) | Err(_) => PublicKeyInfo::Other {
            name: algorithm_name(&spki.algorithm.algorithm),
            size: None,
        },
    }
}

fn general_name_string(name: &GeneralName) -> String {
    match name {
        GeneralName::DNSName(dns) => dns.to_string(),
        GeneralName::RFC822Name(mail) => mail.to_string(),
        GeneralName::URI(uri) => uri.to_string(),
        GeneralName::IPAddress(ip) if ip.len() == 4 => {
            format!("{}.{}.{}.{}", ip[0], ip[1], ip[2], ip[3])
        }
        other => format!("{:?}", other),
    }
}

fn extensions(cert: &X509Certificate) -> Result<CertificateExtensions, ScanFailure> {
    let mut out = CertificateExtensions::default();

    match cert.subject_alternative_name() {
        Ok(Some(san)) => {
            let names = san.value.general_names.iter().map(general_name_string).collect();
            out.subject_alt_names = Some(names);
        }
        Ok(None) => {}
        Err(e) => {
            return Err(ScanFailure::malformed_cert(format!(
                "Invalid subjectAltName extension: {e}"
            )));
        }
    }

    match cert.key_usage() {
        Ok(Some(ku)) => {
            let ku = ku.value;
            let mut flags = BTreeMap::new();
            flags.insert("digital_signature".to_string(), ku.digital_signature());
            flags.insert("non_repudiation".to_string(), ku.non_repudiation());
            flags.insert("key_encipherment".to_string(), ku.key_encipherment());
            flags.insert("data_encipherment".to_string(), ku.data_encipherment());
            flags.insert("key_agreement".to_string(), ku.key_agreement());
            flags.insert("key_cert_sign".to_string(), ku.key_cert_sign());
            flags.insert("crl_sign".to_string(), ku.crl_sign());
            flags.insert("encipher_only".to_string(), ku.encipher_only());
            flags.insert("decipher_only".to_string(), ku.decipher_only());
            out.key_usage = Some(flags);
        }
        Ok(None) => {}
        Err(e) => {
            return Err(ScanFailure::malformed_cert(format!(
                "Invalid keyUsage extension: {e}"
            )));
        }
    }

    Ok(out)
}

/// Parse the DER-encoded leaf certificate. Pure: no I/O, and the only clock
/// read is the validity comparison against `Utc::now()`.
pub fn decode(der: &[u8]) -> Result<CertificateInfo, ScanFailure> {
    decode_at(der, Utc::now())
}

/// Same as `decode` with an explicit clock for the validity flags.
pub fn decode_at(der: &[u8], now: DateTime<Utc>) -> Result<CertificateInfo, ScanFailure> {
    let (_, cert) = X509Certificate::from_der(der)
        .map_err(|e| ScanFailure::malformed_cert(format!("DER parsing failed: {e}")))?;

    let not_before_ts = cert.validity().not_before.timestamp();
    let not_after_ts = cert.validity().not_after.timestamp();
    let not_before = DateTime::<Utc>::from_timestamp(not_before_ts, 0)
        .ok_or_else(|| ScanFailure::malformed_cert("notBefore outside representable time range"))?;
    let not_after = DateTime::<Utc>::from_timestamp(not_after_ts, 0)
        .ok_or_else(|| ScanFailure::malformed_cert("notAfter outside representable time range"))?;

    let common_name = cert
        .subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(|cn| cn.to_string());

    Ok(CertificateInfo {
        subject: cert.subject().to_string(),
        issuer: cert.issuer().to_string(),
        common_name,
        not_before,
        not_after,
        expired: now > not_after,
        not_yet_valid: now < not_before,
        malformed_validity: not_after < not_before,
        public_key: public_key_info(&cert),
        signature_algorithm: algorithm_name(&cert.signature_algorithm.algorithm),
        serial_number: format!("0x{:x}", cert.tbs_certificate.serial),
        extensions: extensions(&cert)?,
    })
}
