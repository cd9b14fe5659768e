//! Snapshot and aggregate value types

use serde::{Deserialize, Serialize};

/// Immutable copy of the daily accumulator taken at report time.
///
/// Durations are seconds, latencies milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    pub uptime_secs: f64,
    pub downtime_secs: f64,
    pub uptime_pct: f64,
    pub downtime_pct: f64,
    pub high_ping_count: u64,
    pub high_ping_secs: f64,
    pub internet_failures: u64,
    pub total_pings: u64,
    pub failed_pings: u64,
    pub packet_loss_pct: f64,
    pub average_ping_ms: f64,
    pub max_ping_ms: f64,
    pub longest_downtime_secs: f64,
    pub system_downtime_secs: f64,
    /// Host with the least downtime plus high-ping events
    pub most_stable_host: Option<String>,
}

/// Sum of persisted daily snapshots over a weekly or monthly window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedStats {
    /// Number of snapshot rows that went into the aggregate
    pub snapshots: u64,
    pub uptime_secs: f64,
    pub downtime_secs: f64,
    pub high_ping_count: u64,
    pub high_ping_secs: f64,
    pub internet_failures: u64,
    pub total_pings: u64,
    pub failed_pings: u64,
    /// Mean of the per-snapshot averages
    pub average_ping_ms: f64,
    pub max_ping_ms: f64,
    pub longest_downtime_secs: f64,
    pub system_downtime_secs: f64,
}

impl AggregatedStats {
    pub fn uptime_pct(&self) -> f64 {
        percentage(self.uptime_secs, self.uptime_secs + self.downtime_secs)
    }

    pub fn downtime_pct(&self) -> f64 {
        percentage(self.downtime_secs, self.uptime_secs + self.downtime_secs)
    }

    pub fn packet_loss_pct(&self) -> f64 {
        percentage(self.failed_pings as f64, self.total_pings as f64)
    }
}

/// `part / whole * 100`, or 0 when `whole` is 0
pub fn percentage(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}
