//! Probe results for one monitoring cycle

use serde::{Deserialize, Serialize};

/// Outcome of a single reachability probe against one host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// Host as configured (address or hostname)
    pub host: String,

    /// Whether the host answered within the timeout
    pub reachable: bool,

    /// Round-trip time in milliseconds (None if lost or not measurable)
    pub latency_ms: Option<f64>,
}

impl ProbeResult {
    pub fn reachable(host: impl Into<String>, latency_ms: Option<f64>) -> Self {
        Self {
            host: host.into(),
            reachable: true,
            latency_ms,
        }
    }

    pub fn unreachable(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            reachable: false,
            latency_ms: None,
        }
    }
}

/// One cycle of probes across all configured hosts.
///
/// Position `i` always corresponds to configured host `i`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeBatch {
    results: Vec<ProbeResult>,
}

impl ProbeBatch {
    pub fn new(results: Vec<ProbeResult>) -> Self {
        Self { results }
    }

    pub fn results(&self) -> &[ProbeResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// At least one host answered
    pub fn is_up(&self) -> bool {
        self.results.iter().any(|r| r.reachable)
    }

    /// No host answered
    pub fn all_down(&self) -> bool {
        !self.is_up()
    }

    /// Every latency sample from a reachable host exceeds `threshold_ms`.
    ///
    /// Hosts without a sample are ignored. With no samples at all this is
    /// false, so an outage never doubles as a high-ping period.
    pub fn all_high_ping(&self, threshold_ms: f64) -> bool {
        let mut samples = self
            .results
            .iter()
            .filter(|r| r.reachable)
            .filter_map(|r| r.latency_ms)
            .peekable();

        if samples.peek().is_none() {
            return false;
        }

        samples.all(|ms| ms > threshold_ms)
    }

    /// Latencies aligned with the host list
    pub fn latencies(&self) -> Vec<Option<f64>> {
        self.results.iter().map(|r| r.latency_ms).collect()
    }

    /// Reachability flags aligned with the host list
    pub fn reachability(&self) -> Vec<bool> {
        self.results.iter().map(|r| r.reachable).collect()
    }
}

impl From<Vec<ProbeResult>> for ProbeBatch {
    fn from(results: Vec<ProbeResult>) -> Self {
        Self::new(results)
    }
}
