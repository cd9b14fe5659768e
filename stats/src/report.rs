//! Alert and report text
//!
//! Alerts go to the messaging channel (Markdown); log blocks are appended to
//! the plain-text report file.

use crate::summary::{AggregatedStats, StatsSummary};
use chrono::{DateTime, Local, NaiveDate};
use std::time::Duration;

const SEPARATOR: &str = "------------------------------------";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPeriod {
    Daily,
    Weekly,
    Monthly,
}

impl ReportPeriod {
    pub fn title(self) -> &'static str {
        match self {
            ReportPeriod::Daily => "Daily",
            ReportPeriod::Weekly => "Weekly",
            ReportPeriod::Monthly => "Monthly",
        }
    }

    /// Event type written to the event log when the report is recorded
    pub fn event_type(self) -> &'static str {
        match self {
            ReportPeriod::Daily => "Daily Stats",
            ReportPeriod::Weekly => "Weekly Stats",
            ReportPeriod::Monthly => "Monthly Stats",
        }
    }
}

/// `HH:MM:SS` with sub-seconds dropped; hours are not wrapped at 24
pub fn format_hms(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

pub fn outage_alert() -> String {
    "🚨 Internet is DOWN on all servers!".to_string()
}

pub fn restored_alert(since: DateTime<Local>, at: DateTime<Local>, downtime: Duration) -> String {
    format!(
        "**✅ Internet Restored**\n\
         ❌ Outage started at: {}\n\
         🕒 Restored at: {}\n\
         ⏱ Total Downtime: {}",
        since.format("%H:%M:%S"),
        at.format("%H:%M:%S"),
        format_hms(downtime),
    )
}

pub fn high_ping_alert(threshold_ms: f64) -> String {
    format!("⚠️ High Ping Alert: all servers above {:.0} ms.", threshold_ms)
}

pub fn daily_alert(date: NaiveDate, stats: &StatsSummary) -> String {
    format!(
        "**📊 Daily Internet Stats Report ({date}):**\n\
         ✅ Uptime: {:.2} min ({:.2}%)\n\
         ❌ Downtime: {:.2} min ({:.2}%)\n\
         ⚠️ High Pings: {} times\n\
         ⏱ Time in High Ping: {:.2} min\n\
         🚨 Internet Failures: {} times\n\
         📡 Packet Loss: {:.2}%\n\
         📈 Average Ping: {:.2} ms\n\
         ⏳ Longest Downtime: {:.2} min\n",
        stats.uptime_secs / 60.0,
        stats.uptime_pct,
        stats.downtime_secs / 60.0,
        stats.downtime_pct,
        stats.high_ping_count,
        stats.high_ping_secs / 60.0,
        stats.internet_failures,
        stats.packet_loss_pct,
        stats.average_ping_ms,
        stats.longest_downtime_secs / 60.0,
        date = date.format("%Y-%m-%d"),
    )
}

pub fn daily_log_block(date: NaiveDate, stats: &StatsSummary) -> String {
    format!(
        "Daily Stats Report ({date}):\n\
         Uptime: {:.2} min ({:.2}%)\n\
         Downtime: {:.2} min ({:.2}%)\n\
         High Pings: {} times\n\
         Time in High Ping: {:.2} min\n\
         Internet Failures: {} times\n\
         Packet Loss: {:.2}%\n\
         Average Ping: {:.2} ms\n\
         Max Ping: {:.2} ms\n\
         Most Stable Server: {}\n\
         Longest Downtime: {:.2} min\n\
         Monitor Offline: {:.2} min\n\
         {SEPARATOR}\n",
        stats.uptime_secs / 60.0,
        stats.uptime_pct,
        stats.downtime_secs / 60.0,
        stats.downtime_pct,
        stats.high_ping_count,
        stats.high_ping_secs / 60.0,
        stats.internet_failures,
        stats.packet_loss_pct,
        stats.average_ping_ms,
        stats.max_ping_ms,
        stats.most_stable_host.as_deref().unwrap_or("n/a"),
        stats.longest_downtime_secs / 60.0,
        stats.system_downtime_secs / 60.0,
        date = date.format("%Y-%m-%d"),
    )
}

/// Weekly/monthly alert; long windows are reported in hours
pub fn aggregate_alert(period: ReportPeriod, date: NaiveDate, stats: &AggregatedStats) -> String {
    format!(
        "**📊 {} Internet Stats Report ({date}):**\n\
         ✅ Uptime: {:.2} hrs ({:.2}%)\n\
         ❌ Downtime: {:.2} hrs ({:.2}%)\n\
         ⚠️ High Pings: {} times\n\
         ⏱ Time in High Ping: {:.2} hrs\n\
         🚨 Internet Failures: {} times\n\
         📡 Packet Loss: {:.2}%\n\
         📈 Average Ping: {:.2} ms\n\
         📊 Max Ping: {:.2} ms\n\
         ⏳ Longest Downtime: {:.2} min\n",
        period.title(),
        stats.uptime_secs / 3600.0,
        stats.uptime_pct(),
        stats.downtime_secs / 3600.0,
        stats.downtime_pct(),
        stats.high_ping_count,
        stats.high_ping_secs / 3600.0,
        stats.internet_failures,
        stats.packet_loss_pct(),
        stats.average_ping_ms,
        stats.max_ping_ms,
        stats.longest_downtime_secs / 60.0,
        date = date.format("%Y-%m-%d"),
    )
}

pub fn aggregate_log_block(period: ReportPeriod, date: NaiveDate, stats: &AggregatedStats) -> String {
    format!(
        "{} Stats Report ({date}):\n\
         Snapshots: {}\n\
         Uptime: {:.2} min ({:.2}%)\n\
         Downtime: {:.2} min ({:.2}%)\n\
         High Pings: {} times\n\
         Time in High Ping: {:.2} min\n\
         Internet Failures: {} times\n\
         Packet Loss: {:.2}%\n\
         Average Ping: {:.2} ms\n\
         Max Ping: {:.2} ms\n\
         Longest Downtime: {:.2} min\n\
         Monitor Offline: {:.2} min\n\
         {SEPARATOR}\n",
        period.title(),
        stats.snapshots,
        stats.uptime_secs / 60.0,
        stats.uptime_pct(),
        stats.downtime_secs / 60.0,
        stats.downtime_pct(),
        stats.high_ping_count,
        stats.high_ping_secs / 60.0,
        stats.internet_failures,
        stats.packet_loss_pct(),
        stats.average_ping_ms,
        stats.max_ping_ms,
        stats.longest_downtime_secs / 60.0,
        stats.system_downtime_secs / 60.0,
        date = date.format("%Y-%m-%d"),
    )
}
