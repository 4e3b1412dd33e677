use serde::{Serialize, Deserialize};
use chrono::prelude::*;
use std::sync::Arc;

use crate::cert::{self, CertificateInfo};
use crate::config::Config;
use crate::error::ScanFailure;
use crate::pqc::PqcAssessment;
use crate::tls::{self, CipherInfo, ProtocolInfo};
use crate::utils::Target;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum ScanOutcome {
    Success {
        protocol: ProtocolInfo,
        cipher: CipherInfo,
        certificate: CertificateInfo,
        pqc: PqcAssessment,
        compression: String,
    },
    Failure(ScanFailure),
}

/// One observation of one target. Assembled once, never mutated.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ScanResult {
    pub target: Target,
    pub timestamp: DateTime<Utc>,
    pub outcome: ScanOutcome,
}

impl ScanResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ScanOutcome::Success { .. })
    }
}

/// Versioned envelope for a batch run, written to JSON for downstream
/// aggregation tooling.
#[derive(Serialize, Deserialize, Clone)]
pub struct Scan {
    pub version: String,
    pub results: Vec<ScanResult>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

pub struct ScanOptions {
    pub num_threads: usize,
    pub targets: Vec<Target>,
}

/// The single core operation: handshake, then decode, then classify. Any
/// handshake failure short-circuits; a malformed certificate after a
/// successful handshake is its own failure kind.
pub async fn scan_target(config: &Config, target: &Target) -> ScanResult {
    log::debug!("Started TLS scanning {}", target);
    let timestamp = Utc::now();

    let handshake = match tls::execute(target, config.connection_timeout).await {
        Ok(data) => data,
        Err(failure) => {
            log::debug!("Scan of {} failed: {}", target, failure.message);
            return ScanResult {
                target: target.clone(),
                timestamp,
                outcome: ScanOutcome::Failure(failure),
            };
        }
    };

    let certificate = match cert::decode(&handshake.peer_cert_der) {
        Ok(info) => info,
        Err(failure) => {
            log::debug!("Certificate from {} did not parse: {}", target, failure.message);
            return ScanResult {
                target: target.clone(),
                timestamp,
                outcome: ScanOutcome::Failure(failure),
            };
        }
    };

    let pqc = config.classifier.classify(
        &certificate.signature_algorithm,
        handshake.cipher.key_exchange_label(),
    );

    log::trace!("Finished TLS scanning {}", target);
    ScanResult {
        target: target.clone(),
        timestamp,
        outcome: ScanOutcome::Success {
            protocol: handshake.protocol,
            cipher: handshake.cipher,
            certificate,
            pqc,
            compression: handshake.compression,
        },
    }
}

/// Fan targets out over a bounded worker pool, one scan per worker, results
/// collected over a channel. `scan_target` is stateless, so workers share
/// nothing but the config.
pub async fn scan_runner(config: Arc<Config>, scan: ScanOptions) -> Scan {
    let (tx, rx_orig) = async_channel::unbounded::<Option<Target>>();
    let (results_tx_orig, results_rx) = async_channel::unbounded();
    let targets_cnt = scan.targets.len();

    /* no need to have more workers than targets */
    let mut num_threads = scan.num_threads.max(1);
    if num_threads > targets_cnt {
        num_threads = targets_cnt.max(1);
    }

    let start_time = Utc::now();

    /* queue all targets, then one None per worker as the exit signal */
    for target in scan.targets {
        log::trace!("Sending {}", target);
        if let Err(_) = tx.send(Some(target)).await {
            log::error!("worker dropped");
        }
    }
    for _ in 0..num_threads {
        if let Err(_) = tx.send(None).await {
            log::error!("worker dropped");
        }
    }

    log::trace!("Spawning {} workers", num_threads);
    for no in 1..num_threads+1 {
        let rx = rx_orig.clone();
        let results_tx = results_tx_orig.clone();
        let config = config.clone();
        tokio::spawn(async move {
            while let Ok(target) = rx.recv().await {
                let target = match target {
                    Some(target) => target,
                    None => {
                        log::trace!("Exit requested for scan worker {}", no);
                        let _ = results_tx.send(None).await;
                        break;
                    }
                };

                let result = scan_target(&config, &target).await;
                let _ = results_tx.send(Some(result)).await;
            }
            log::trace!("Exiting scan worker {}", no);
        });
    }

    let mut results: Vec<ScanResult> = vec![];
    let mut workers_left = num_threads;

    while let Ok(result) = results_rx.recv().await {
        match result {
            None => {
                workers_left -= 1;
                if workers_left == 0 {
                    break;
                }
            }
            Some(result) => {
                results.push(result);
            }
        }
    }

    log::info!("Done scanning. All workers exited.");

    Scan {
        version: env!("CARGO_PKG_VERSION").to_string(),
        results,
        start_time,
        end_time: Utc::now(),
    }
}
