pub mod config;
pub mod error;
pub mod utils;
pub mod cert;
pub mod pqc;
pub mod tls;
pub mod scan;
pub mod output;

pub use crate::cert::{decode, CertificateInfo, PublicKeyInfo};
pub use crate::config::Config;
pub use crate::error::{FailureKind, ScanFailure};
pub use crate::pqc::{Classifier, KeywordTable, PqcAssessment, Verdict};
pub use crate::scan::{scan_runner, scan_target, Scan, ScanOptions, ScanOutcome, ScanResult};
pub use crate::utils::{parse_single_target, Target};
