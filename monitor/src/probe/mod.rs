//! Reachability probes
//!
//! A [`Prober`] never fails: timeouts, unreachable hosts and transport
//! errors all collapse into an unreachable [`ProbeResult`].

mod command;
mod icmp;

pub use command::CommandProber;
pub use icmp::IcmpProber;

use crate::config::ProbeMethod;
use anyhow::Result;
use async_trait::async_trait;
use stats::ProbeResult;
use std::net::{IpAddr, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A configured host and the address it resolved to at startup.
///
/// Hosts that failed to resolve keep their slot with no address and always
/// probe as unreachable, so batch positions match the configured host list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    pub addr: Option<IpAddr>,
}

#[async_trait]
pub trait Prober: Send + Sync {
    /// Send one echo request and wait at most `timeout` for the reply
    async fn probe(&self, target: &Target, timeout: Duration) -> ProbeResult;
}

/// Resolve configured hosts in order. Unresolvable hosts are kept without
/// an address; it is an error if none resolve.
pub fn resolve_targets(hosts: &[String]) -> Result<Vec<Target>> {
    let targets: Vec<Target> = hosts
        .iter()
        .map(|host| {
            let addr = match host.parse::<IpAddr>() {
                Ok(addr) => Some(addr),
                Err(e) => match resolve_hostname(host) {
                    Ok(addr) => {
                        debug!("Resolved {} to {}", host, addr);
                        Some(addr)
                    }
                    Err(e2) => {
                        warn!(
                            "Failed to resolve {}: {} (parse: {}); it will count as unreachable",
                            host, e2, e
                        );
                        None
                    }
                },
            };
            Target {
                name: host.clone(),
                addr,
            }
        })
        .collect();

    if targets.iter().all(|t| t.addr.is_none()) {
        anyhow::bail!("No valid targets configured");
    }
    if targets.len() < 2 {
        warn!("Only one target configured; a single host outage will look like an internet outage");
    }

    Ok(targets)
}

fn resolve_hostname(hostname: &str) -> Result<IpAddr> {
    let addr = format!("{}:0", hostname)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| anyhow::anyhow!("No addresses found"))?;

    Ok(addr.ip())
}

/// Pick the probe implementation for `method`
pub fn build_prober(method: ProbeMethod) -> Result<Arc<dyn Prober>> {
    match method {
        ProbeMethod::Icmp => Ok(Arc::new(IcmpProber::new()?)),
        ProbeMethod::Command => Ok(Arc::new(CommandProber::new())),
        ProbeMethod::Auto => match IcmpProber::new() {
            Ok(prober) => {
                info!("Using native ICMP probes");
                Ok(Arc::new(prober))
            }
            Err(e) => {
                warn!("Native ICMP unavailable ({:#}), falling back to ping command", e);
                Ok(Arc::new(CommandProber::new()))
            }
        },
    }
}
