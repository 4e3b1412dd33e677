use colored::*;

use crate::cert::{CertificateInfo, PublicKeyInfo};
use crate::scan::{ScanOutcome, ScanResult};

fn print_certificate(cert: &CertificateInfo) {
    println!("{}", "--- Certificate ---".cyan());
    println!("  CN: {}", cert.common_name.as_deref().unwrap_or("N/A"));
    println!("  Subject: {}", cert.subject);
    println!("  Issuer: {}", cert.issuer);

    if cert.malformed_validity {
        println!("  Status: {}", "MALFORMED VALIDITY WINDOW".red().bold());
    } else if cert.expired {
        println!("  Status: {}", "EXPIRED".red().bold());
    } else if cert.not_yet_valid {
        println!("  Status: {}", "NOT YET VALID".yellow().bold());
    } else {
        println!("  Status: {}", "Valid".green());
    }
    println!(
        "  Validity: {} -> {}",
        cert.not_before.format("%Y-%m-%d"),
        cert.not_after.format("%Y-%m-%d")
    );

    match &cert.public_key {
        PublicKeyInfo::Rsa { size, exponent } => {
            println!("  Public Key: RSA {} bits (e={})", size, exponent);
        }
        PublicKeyInfo::EllipticCurve { curve, size } => {
            println!("  Public Key: EC {} ({} bits)", curve, size);
        }
        PublicKeyInfo::Dsa { size } => {
            println!("  Public Key: DSA {} bits", size);
        }
        PublicKeyInfo::Other { name, size } => match size {
            Some(size) => println!("  Public Key: {} ({} bits)", name, size),
            None => println!("  Public Key: {}", name),
        },
    }
    println!("  Signature: {}", cert.signature_algorithm);
    println!("  Serial: {}", cert.serial_number);

    if let Some(sans) = &cert.extensions.subject_alt_names {
        println!("  SAN: {}", sans.join(", "));
    }
}

/// Line-oriented report for one scan, fixed section order: target and
/// timestamp, protocol, cipher, certificate, PQC assessment.
pub fn print_human_readable(result: &ScanResult) {
    println!();
    println!("{}", "=".repeat(70).cyan());
    println!("{}", format!("{:^70}", "TLS Scan Results").green());
    println!("{}", "=".repeat(70).cyan());
    println!("{} {}", "Target:".yellow(), result.target);
    println!("{} {}", "Scanned:".yellow(), result.timestamp.to_rfc3339());
    println!();

    let (protocol, cipher, certificate, pqc, compression) = match &result.outcome {
        ScanOutcome::Failure(failure) => {
            println!("{} {}", "Scan failed:".red().bold(), failure.message);
            if failure.certificate_error {
                println!(
                    "{} TLS is reachable but the certificate did not verify (may be self-signed)",
                    "Note:".yellow()
                );
            }
            println!();
            return;
        }
        ScanOutcome::Success { protocol, cipher, certificate, pqc, compression } => {
            (protocol, cipher, certificate, pqc, compression)
        }
    };

    println!("{}", "--- Protocol ---".cyan());
    if protocol.insecure {
        println!("  Version: {} {}", protocol.friendly_name.red().bold(), "(INSECURE)".red());
    } else {
        println!("  Version: {}", protocol.friendly_name.green());
    }
    println!("  Compression: {}", compression);
    println!();

    println!("{}", "--- Cipher Suite ---".cyan());
    println!("  Algorithm: {}", cipher.name.cyan());
    println!("  Key Size: {} bits", cipher.bits);
    if let Some(group) = &cipher.key_exchange_group {
        println!("  Key Exchange: {}", group);
    }
    println!();

    print_certificate(certificate);
    println!();

    println!("{}", "--- Post-Quantum Cryptography ---".cyan());
    if pqc.detected {
        println!("  {}", "PQC DETECTED".green().bold());
        println!("  Assessment: {}", pqc.verdict.describe());
        for alg in &pqc.matched_algorithms {
            println!("    - {}", alg.green());
        }
    } else {
        println!("  {}", "Classical cryptography only".yellow());
        println!("  Assessment: {}", pqc.verdict.describe());
    }
    println!();
}
