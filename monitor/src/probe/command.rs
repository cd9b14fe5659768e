//! Probes through the system `ping` binary, for hosts without ICMP socket access

use super::{Prober, Target};
use async_trait::async_trait;
use regex::Regex;
use stats::ProbeResult;
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Default)]
pub struct CommandProber;

impl CommandProber {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Prober for CommandProber {
    async fn probe(&self, target: &Target, timeout: Duration) -> ProbeResult {
        let Some(addr) = target.addr else {
            return ProbeResult::unreachable(target.name.clone());
        };
        let wait_secs = timeout.as_secs().max(1).to_string();
        let addr = addr.to_string();

        let child = Command::new("ping")
            .args(["-c", "1", "-W", wait_secs.as_str(), addr.as_str()])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output();

        // ping's own -W only has second granularity
        let output = match tokio::time::timeout(timeout + Duration::from_millis(500), child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                debug!("ping {} -> failed to execute: {}", target.name, e);
                return ProbeResult::unreachable(target.name.clone());
            }
            Err(_) => {
                debug!("ping {} -> timeout", target.name);
                return ProbeResult::unreachable(target.name.clone());
            }
        };

        if !output.status.success() {
            debug!("ping {} -> exit {:?}", target.name, output.status.code());
            return ProbeResult::unreachable(target.name.clone());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let latency = parse_ping_time(&stdout);
        debug!("ping {} -> {:?}ms", target.name, latency);

        ProbeResult::reachable(target.name.clone(), latency)
    }
}

/// Extract the round-trip time from `time=12.3 ms` / `time<1 ms`
pub fn parse_ping_time(output: &str) -> Option<f64> {
    static TIME_RE: OnceLock<Option<Regex>> = OnceLock::new();
    let re = TIME_RE
        .get_or_init(|| Regex::new(r"time[=<]\s*(?P<ms>[0-9]+(?:\.[0-9]+)?)\s*ms").ok())
        .as_ref()?;

    re.captures(output)?.name("ms")?.as_str().parse().ok()
}
