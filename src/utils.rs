use anyhow::{anyhow, Result};
use std::fmt;
use serde::{Serialize, Deserialize};
use tokio::net::{TcpSocket, TcpStream, lookup_host};
use tokio::time::Instant;
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::ScanFailure;

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Target {
    pub host: String,
    pub port: u16
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

pub fn parse_single_target(input: &str, default_port: Option<u16>) -> Result<Target> {
    let target = match input.rfind(':') {
        None => {
            match default_port {
                Some(port) => Target { host: input.to_string(), port },
                None => {
                    return Err(anyhow!("Could not find :<PORT> in {input} and no default port specified."));
                }
            }
        },
        Some(pos) => {
            match input[pos+1..].parse::<u16>() {
                Err(_) => {
                    return Err(anyhow!("Invalid port. Value not in range [1-65535]."));
                }
                Ok(port) => Target { host: input[..pos].to_string(), port }
            }
        }
    };
    if target.port == 0 {
        return Err(anyhow!("Invalid port. Value not in range [1-65535]."));
    }
    if target.host.is_empty() {
        return Err(anyhow!("Empty host in {input}"));
    }
    Ok(target)
}

/// Time left until `deadline`, zero once it has passed. Feeding the zero
/// duration into tokio::time::timeout makes the next phase fail immediately,
/// so a scan never runs past its overall budget.
pub fn remaining(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}

/// Resolve the target and open a TCP connection, both charged against the
/// same deadline that later covers the TLS handshake.
pub async fn resolve_and_connect(target: &Target, deadline: Instant) -> Result<(SocketAddr, TcpStream), ScanFailure> {
    let resolved = tokio::time::timeout(remaining(deadline), lookup_host(format!("{}", target))).await;
    let resolved = match resolved {
        Err(_) => {
            log::debug!("Timed out resolving {target}");
            return Err(ScanFailure::timeout(format!("Timed out resolving {}", target.host)));
        }
        Ok(Err(e)) => {
            log::trace!("Could not resolve {target}: {e}");
            return Err(ScanFailure::dns(format!("Cannot resolve hostname: {}", target.host)));
        }
        Ok(Ok(addrs)) => addrs,
    };

    let addr = match resolved.into_iter().next() {
        Some(addr) => addr,
        None => {
            return Err(ScanFailure::dns(format!("Cannot resolve hostname: {}", target.host)));
        }
    };
    log::trace!("Resolved {0} to {1}", target, addr);

    let socket = match addr {
        SocketAddr::V4(_) => TcpSocket::new_v4(),
        SocketAddr::V6(_) => TcpSocket::new_v6(),
    };
    let socket = match socket {
        Ok(s) => s,
        Err(e) => return Err(ScanFailure::unexpected(&e)),
    };

    match tokio::time::timeout(remaining(deadline), socket.connect(addr)).await {
        Ok(Ok(stream)) => Ok((addr, stream)),
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::ConnectionRefused => {
            log::debug!("Connection refused by {addr}");
            Err(ScanFailure::refused(format!("Connection refused on port {}", target.port)))
        }
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::TimedOut => {
            Err(ScanFailure::timeout(format!("Timed out connecting to {addr}")))
        }
        Ok(Err(e)) => Err(ScanFailure::unexpected(&e)),
        Err(_) => {
            log::debug!("Timed out connecting to {addr}");
            Err(ScanFailure::timeout(format!("Timed out connecting to {addr}")))
        }
    }
}
