//! NetPulse statistics core
//!
//! Pure data types and state machines shared by the monitor: probe batches,
//! the daily statistics accumulator, the edge-triggered transient state and
//! the text of every alert and report. Nothing in here performs I/O.

pub mod batch;
pub mod daily;
pub mod report;
pub mod summary;
pub mod transient;

pub use batch::{ProbeBatch, ProbeResult};
pub use daily::{DailyStats, HostStats};
pub use report::ReportPeriod;
pub use summary::{AggregatedStats, StatsSummary};
pub use transient::{TransientState, Transition};

/// Latency above which a probe counts as high ping (milliseconds)
pub const DEFAULT_HIGH_PING_THRESHOLD_MS: f64 = 150.0;

/// Hosts probed when none are configured
pub const DEFAULT_HOSTS: [&str; 2] = ["1.1.1.1", "8.8.8.8"];
