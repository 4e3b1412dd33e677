use std::time::Duration;

use crate::pqc::{Classifier, KeywordTable};

pub struct TlsConfig {
    pub default_port: u16,
}

impl TlsConfig {
    pub fn new() -> TlsConfig {
        TlsConfig { default_port: 443 }
    }
}

impl Default for TlsConfig {
    fn default() -> TlsConfig {
        TlsConfig::new()
    }
}

/// Settings shared by every scan in a run. Holds no mutable state, so one
/// instance can back any number of concurrent scans.
pub struct Config {
    pub tls_config: TlsConfig,
    /// Overall budget per target: DNS + TCP connect + TLS handshake combined.
    pub connection_timeout: Duration,
    pub classifier: Classifier,
}

impl Config {
    pub fn new() -> Config {
        Config {
            tls_config: TlsConfig::new(),
            connection_timeout: Duration::from_secs(10),
            classifier: Classifier::default(),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Config {
        Config { connection_timeout: timeout, ..Config::new() }
    }

    /// Swap in an extended keyword table so emerging PQC algorithm names can
    /// be detected without touching the matcher.
    pub fn with_keywords(mut self, table: KeywordTable) -> Config {
        self.classifier = Classifier::new(table);
        self
    }
}

impl Default for Config {
    fn default() -> Config {
        Config::new()
    }
}
