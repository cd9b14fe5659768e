//! ICMP echo probes over raw or unprivileged datagram sockets

use super::{Prober, Target};
use anyhow::{Context, Result};
use async_trait::async_trait;
use stats::ProbeResult;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;
use surge_ping::{Client, Config as PingConfig, ICMP, PingIdentifier, PingSequence};
use tracing::{debug, warn};

pub struct IcmpProber {
    client_v4: Client,
    client_v6: Option<Client>,
    sequence: AtomicU16,
}

impl IcmpProber {
    pub fn new() -> Result<Self> {
        let client_v4 = Client::new(&PingConfig::default())
            .context("Failed to create ICMP client (CAP_NET_RAW required)")?;

        let client_v6 = match Client::new(&PingConfig::builder().kind(ICMP::V6).build()) {
            Ok(client) => Some(client),
            Err(e) => {
                warn!("ICMPv6 unavailable, IPv6 targets will report unreachable: {}", e);
                None
            }
        };

        Ok(Self {
            client_v4,
            client_v6,
            sequence: AtomicU16::new(0),
        })
    }

    async fn ping(&self, target: IpAddr, timeout: Duration) -> Result<f64> {
        let payload = [0u8; 56]; // Standard ping payload size

        let client = match target {
            IpAddr::V4(_) => &self.client_v4,
            IpAddr::V6(_) => self
                .client_v6
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("no ICMPv6 client"))?,
        };

        let mut pinger = client.pinger(target, PingIdentifier(rand::random())).await;
        pinger.timeout(timeout);

        let sequence = PingSequence(self.sequence.fetch_add(1, Ordering::Relaxed));

        match tokio::time::timeout(timeout, pinger.ping(sequence, &payload)).await {
            Ok(Ok((_packet, rtt))) => Ok(rtt.as_secs_f64() * 1000.0),
            Ok(Err(e)) => anyhow::bail!("Ping failed: {}", e),
            Err(_) => anyhow::bail!("Ping timeout after {:?}", timeout),
        }
    }
}

#[async_trait]
impl Prober for IcmpProber {
    async fn probe(&self, target: &Target, timeout: Duration) -> ProbeResult {
        let Some(addr) = target.addr else {
            return ProbeResult::unreachable(target.name.clone());
        };

        match self.ping(addr, timeout).await {
            Ok(rtt_ms) => {
                debug!("ICMP {} -> {:.2}ms", target.name, rtt_ms);
                ProbeResult::reachable(target.name.clone(), Some(rtt_ms))
            }
            Err(e) => {
                debug!("ICMP {} -> {}", target.name, e);
                ProbeResult::unreachable(target.name.clone())
            }
        }
    }
}
