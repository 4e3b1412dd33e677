use serde::{Serialize, Deserialize};

/// Overall PQC posture derived from the two detection booleans.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    FullPqc,
    SignatureOnly,
    KeyExchangeOnly,
    ClassicalOnly,
}

impl Verdict {
    pub fn describe(&self) -> &'static str {
        match self {
            Verdict::FullPqc => "Full PQC protection (signature + key exchange)",
            Verdict::SignatureOnly => "PQC signatures only (key exchange classical)",
            Verdict::KeyExchangeOnly => "PQC key exchange only (signature classical)",
            Verdict::ClassicalOnly => "Classical cryptography only (vulnerable to quantum attacks)",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PqcAssessment {
    pub detected: bool,
    pub signature_pqc: bool,
    pub key_exchange_pqc: bool,
    pub matched_algorithms: Vec<String>,
    pub verdict: Verdict,
}

/// Ordered keyword lists the classifier matches against. Data, not logic:
/// new algorithm names get added here without touching the matcher.
#[derive(Clone, Debug)]
pub struct KeywordTable {
    pub signature: Vec<String>,
    pub key_exchange: Vec<String>,
    /// Matched with separators stripped from both sides.
    pub hybrid: Vec<String>,
}

impl Default for KeywordTable {
    fn default() -> KeywordTable {
        KeywordTable {
            signature: ["mldsa", "ml-dsa", "dilithium", "falcon", "sphincs"]
                .iter().map(|s| s.to_string()).collect(),
            key_exchange: ["mlkem", "ml-kem", "kyber", "ntru", "saber"]
                .iter().map(|s| s.to_string()).collect(),
            hybrid: ["x25519mlkem", "p256mlkem", "ecdhemlkem"]
                .iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Classifier {
    table: KeywordTable,
}

fn strip_separators(s: &str) -> String {
    s.chars().filter(|c| *c != '-' && *c != '_').collect()
}

impl Classifier {
    pub fn new(table: KeywordTable) -> Classifier {
        Classifier { table }
    }

    /// Case-insensitive substring matching of the certificate signature
    /// algorithm and the negotiated key-exchange label against the keyword
    /// table. Pure: identical inputs always yield identical assessments.
    pub fn classify(&self, signature_algorithm: &str, key_exchange_label: &str) -> PqcAssessment {
        let mut matched: Vec<String> = vec![];
        let mut signature_pqc = false;
        let mut key_exchange_pqc = false;

        let sig_lower = signature_algorithm.to_lowercase();
        for keyword in &self.table.signature {
            if sig_lower.contains(&keyword.to_lowercase()) {
                signature_pqc = true;
                matched.push(format!("Signature: {signature_algorithm}"));
                break;
            }
        }

        let kex_lower = key_exchange_label.to_lowercase();
        for keyword in &self.table.key_exchange {
            if kex_lower.contains(&keyword.to_lowercase()) {
                key_exchange_pqc = true;
                matched.push(format!("KEM: {key_exchange_label}"));
                break;
            }
        }

        /* hybrid markers are informational and may double-report on top of
         * the KEM match */
        let kex_stripped = strip_separators(&kex_lower);
        for pattern in &self.table.hybrid {
            if kex_stripped.contains(&strip_separators(&pattern.to_lowercase())) {
                matched.push("Hybrid: Classical + PQC".to_string());
                break;
            }
        }

        let verdict = match (signature_pqc, key_exchange_pqc) {
            (true, true) => Verdict::FullPqc,
            (true, false) => Verdict::SignatureOnly,
            (false, true) => Verdict::KeyExchangeOnly,
            (false, false) => Verdict::ClassicalOnly,
        };

        PqcAssessment {
            detected: signature_pqc || key_exchange_pqc,
            signature_pqc,
            key_exchange_pqc,
            matched_algorithms: matched,
            verdict,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classical_suite_is_not_detected() {
        let c = Classifier::default();
        let a = c.classify("ecdsaWithSHA256", "ECDHE-RSA-AES256-GCM-SHA384");
        assert!(!a.detected);
        assert_eq!(a.verdict, Verdict::ClassicalOnly);
        assert!(a.matched_algorithms.is_empty());
    }

    #[test]
    fn hybrid_handshake_with_pqc_signature_is_full_pqc() {
        let c = Classifier::default();
        let a = c.classify("ML-DSA-65", "X25519_MLKEM768");
        assert!(a.detected);
        assert!(a.signature_pqc);
        assert!(a.key_exchange_pqc);
        assert_eq!(a.verdict, Verdict::FullPqc);
        assert!(a.matched_algorithms.iter().any(|m| m.starts_with("Signature:")));
        assert!(a.matched_algorithms.iter().any(|m| m.starts_with("KEM:")));
        assert!(a.matched_algorithms.iter().any(|m| m.starts_with("Hybrid:")));
    }

    #[test]
    fn mlkem_in_any_case_sets_key_exchange() {
        let c = Classifier::default();
        for name in ["TLS_MLKEM768_AES128", "mlkem1024", "MlKem512-exp"] {
            let a = c.classify("sha256WithRSAEncryption", name);
            assert!(a.key_exchange_pqc, "{name}");
            assert!(a.matched_algorithms.iter().any(|m| m.starts_with("KEM:")));
            assert_eq!(a.verdict, Verdict::KeyExchangeOnly);
        }
    }

    #[test]
    fn dilithium_and_mldsa_signatures_detected_any_case() {
        let c = Classifier::default();
        for name in ["DILITHIUM3", "dilithium-aes", "ml-dsa-87", "ML-DSA-44"] {
            let a = c.classify(name, "TLS13_AES_256_GCM_SHA384");
            assert!(a.signature_pqc, "{name}");
            assert_eq!(a.verdict, Verdict::SignatureOnly);
        }
    }

    #[test]
    fn first_signature_match_wins_and_is_recorded_verbatim() {
        let c = Classifier::default();
        let a = c.classify("Falcon-512-with-SPHINCS", "x");
        assert_eq!(a.matched_algorithms, vec!["Signature: Falcon-512-with-SPHINCS".to_string()]);
    }

    #[test]
    fn hybrid_marker_normalizes_separators() {
        let c = Classifier::default();
        for name in ["X25519MLKEM768", "x25519_mlkem768", "ECDHE-MLKEM-768", "P256_MLKEM768"] {
            let a = c.classify("ecdsaWithSHA256", name);
            assert!(
                a.matched_algorithms.iter().any(|m| m.starts_with("Hybrid:")),
                "{name}"
            );
        }
    }

    #[test]
    fn classify_is_idempotent() {
        let c = Classifier::default();
        let a = c.classify("ML-DSA-65", "X25519MLKEM768");
        let b = c.classify("ML-DSA-65", "X25519MLKEM768");
        assert_eq!(a, b);
    }

    #[test]
    fn detected_tracks_the_two_booleans() {
        let c = Classifier::default();
        for (sig, kex) in [
            ("ML-DSA-65", "MLKEM768"),
            ("ML-DSA-65", "x25519"),
            ("ecdsaWithSHA256", "MLKEM768"),
            ("ecdsaWithSHA256", "x25519"),
        ] {
            let a = c.classify(sig, kex);
            assert_eq!(a.detected, a.signature_pqc || a.key_exchange_pqc);
        }
    }

    #[test]
    fn keyword_table_is_extensible() {
        let mut table = KeywordTable::default();
        table.signature.push("newhopesig".to_string());
        let c = Classifier::new(table);
        let a = c.classify("NewHopeSig-1024", "x25519");
        assert!(a.signature_pqc);
        assert_eq!(a.verdict, Verdict::SignatureOnly);
    }
}
