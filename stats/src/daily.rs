//! Daily statistics accumulator
//!
//! One live [`DailyStats`] exists per calendar day. Every monitoring cycle
//! calls [`DailyStats::update`]; the wall-clock time elapsed since the
//! previous call is attributed as a whole to uptime or downtime depending on
//! whether any host was reachable in this cycle. The scheduler takes a
//! [`StatsSummary`] at report time and replaces the accumulator at midnight.

use crate::summary::{StatsSummary, percentage};
use chrono::{DateTime, Local};
use std::cmp::Ordering;
use std::time::Duration;

/// Per-host counters, kept in configured host order
#[derive(Debug, Clone, PartialEq)]
pub struct HostStats {
    pub host: String,
    /// Time this host was unreachable
    pub downtime: Duration,
    /// Cycles where this host was up while the batch saw high latency
    pub high_pings: u64,
}

impl HostStats {
    fn new(host: String) -> Self {
        Self {
            host,
            downtime: Duration::ZERO,
            high_pings: 0,
        }
    }

    fn instability(&self) -> f64 {
        self.downtime.as_secs_f64() + self.high_pings as f64
    }
}

#[derive(Debug, Clone)]
pub struct DailyStats {
    high_ping_threshold_ms: f64,
    started_at: DateTime<Local>,
    last_update: DateTime<Local>,

    uptime: Duration,
    downtime: Duration,
    high_ping_time: Duration,
    high_ping_count: u64,
    internet_failures: u64,
    longest_downtime: Duration,
    total_pings: u64,
    failed_pings: u64,
    latency_samples: Vec<f64>,
    hosts: Vec<HostStats>,
    system_downtime: Duration,

    // edge detection, independent of the alerting state machine
    is_down: bool,
    is_high_ping: bool,
    down_since: Option<DateTime<Local>>,
}

impl DailyStats {
    pub fn new<I, S>(hosts: I, high_ping_threshold_ms: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new_at(Local::now(), hosts, high_ping_threshold_ms)
    }

    pub fn new_at<I, S>(now: DateTime<Local>, hosts: I, high_ping_threshold_ms: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            high_ping_threshold_ms,
            started_at: now,
            last_update: now,
            uptime: Duration::ZERO,
            downtime: Duration::ZERO,
            high_ping_time: Duration::ZERO,
            high_ping_count: 0,
            internet_failures: 0,
            longest_downtime: Duration::ZERO,
            total_pings: 0,
            failed_pings: 0,
            latency_samples: Vec::new(),
            hosts: hosts
                .into_iter()
                .map(|h| HostStats::new(h.into()))
                .collect(),
            system_downtime: Duration::ZERO,
            is_down: false,
            is_high_ping: false,
            down_since: None,
        }
    }

    /// Fold one cycle into the accumulator using the current local time
    pub fn update(
        &mut self,
        is_up: bool,
        is_high_ping: bool,
        latencies: &[Option<f64>],
        reachable: &[bool],
    ) {
        self.update_at(Local::now(), is_up, is_high_ping, latencies, reachable);
    }

    /// Fold one cycle into the accumulator as observed at `now`.
    ///
    /// `latencies` and `reachable` are aligned with the host list.
    pub fn update_at(
        &mut self,
        now: DateTime<Local>,
        is_up: bool,
        is_high_ping: bool,
        latencies: &[Option<f64>],
        reachable: &[bool],
    ) {
        let elapsed = elapsed_between(self.last_update, now);

        if is_up {
            self.uptime += elapsed;
            if self.is_down {
                self.internet_failures += 1;
                if let Some(since) = self.down_since.take() {
                    self.longest_downtime = self.longest_downtime.max(elapsed_between(since, now));
                }
                self.is_down = false;
            }
        } else {
            self.downtime += elapsed;
            if !self.is_down {
                self.is_down = true;
                self.down_since = Some(now);
            }
        }

        if is_high_ping {
            self.high_ping_time += elapsed;
            if !self.is_high_ping {
                self.high_ping_count += 1;
                self.is_high_ping = true;
            }
        } else {
            self.is_high_ping = false;
        }

        self.total_pings += latencies.len() as u64;
        self.failed_pings += reachable.iter().filter(|up| !**up).count() as u64;
        self.latency_samples.extend(latencies.iter().flatten().copied());

        // Batch-wide: one slow host marks every reachable host as high ping.
        let batch_high = latencies
            .iter()
            .flatten()
            .any(|ms| *ms > self.high_ping_threshold_ms);

        for (host, up) in self.hosts.iter_mut().zip(reachable) {
            if !up {
                host.downtime += elapsed;
            } else if batch_high {
                host.high_pings += 1;
            }
        }

        self.last_update = now;
    }

    /// Record time during which the monitor process itself was not running
    pub fn add_system_downtime(&mut self, gap: Duration) {
        self.system_downtime += gap;
    }

    pub fn summary(&self) -> StatsSummary {
        let uptime = self.uptime.as_secs_f64();
        let downtime = self.downtime.as_secs_f64();
        let total = uptime + downtime;

        let average_ping_ms = if self.latency_samples.is_empty() {
            0.0
        } else {
            self.latency_samples.iter().sum::<f64>() / self.latency_samples.len() as f64
        };

        // latencies are never negative, so 0.0 doubles as the empty value
        let max_ping_ms = self.latency_samples.iter().copied().fold(0.0, f64::max);

        // min_by keeps the first of equal elements
        let most_stable_host = self
            .hosts
            .iter()
            .min_by(|a, b| {
                a.instability()
                    .partial_cmp(&b.instability())
                    .unwrap_or(Ordering::Equal)
            })
            .map(|h| h.host.clone());

        StatsSummary {
            uptime_secs: uptime,
            downtime_secs: downtime,
            uptime_pct: percentage(uptime, total),
            downtime_pct: percentage(downtime, total),
            high_ping_count: self.high_ping_count,
            high_ping_secs: self.high_ping_time.as_secs_f64(),
            internet_failures: self.internet_failures,
            total_pings: self.total_pings,
            failed_pings: self.failed_pings,
            packet_loss_pct: percentage(self.failed_pings as f64, self.total_pings as f64),
            average_ping_ms,
            max_ping_ms,
            longest_downtime_secs: self.longest_downtime.as_secs_f64(),
            system_downtime_secs: self.system_downtime.as_secs_f64(),
            most_stable_host,
        }
    }

    /// Start a fresh day for the same hosts and threshold
    pub fn reset(&mut self) {
        self.reset_at(Local::now());
    }

    pub fn reset_at(&mut self, now: DateTime<Local>) {
        let hosts: Vec<String> = self.hosts.iter().map(|h| h.host.clone()).collect();
        *self = Self::new_at(now, hosts, self.high_ping_threshold_ms);
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn last_update(&self) -> DateTime<Local> {
        self.last_update
    }

    pub fn hosts(&self) -> &[HostStats] {
        &self.hosts
    }

    pub fn high_ping_threshold_ms(&self) -> f64 {
        self.high_ping_threshold_ms
    }
}

/// Wall-clock time from `from` to `to`; a clock stepping backwards counts as zero
fn elapsed_between(from: DateTime<Local>, to: DateTime<Local>) -> Duration {
    (to - from).to_std().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const HOSTS: [&str; 2] = ["1.1.1.1", "8.8.8.8"];

    fn at(secs: i64) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 12, 12, 0, 0).unwrap() + chrono::Duration::seconds(secs)
    }

    fn stats() -> DailyStats {
        DailyStats::new_at(at(0), HOSTS, 150.0)
    }

    #[test]
    fn test_elapsed_time_is_fully_attributed() {
        let mut s = stats();
        s.update_at(at(1), true, false, &[Some(10.0), Some(20.0)], &[true, true]);
        s.update_at(at(3), false, false, &[None, None], &[false, false]);
        s.update_at(at(4), false, false, &[None, None], &[false, false]);
        s.update_at(at(10), true, false, &[Some(5.0), None], &[true, false]);

        let summary = s.summary();
        assert_eq!(summary.uptime_secs, 7.0);
        assert_eq!(summary.downtime_secs, 3.0);
        assert_eq!(summary.uptime_secs + summary.downtime_secs, 10.0);
    }

    #[test]
    fn test_backwards_clock_adds_nothing() {
        let mut s = stats();
        s.update_at(at(5), true, false, &[Some(10.0), Some(10.0)], &[true, true]);
        s.update_at(at(2), true, false, &[Some(10.0), Some(10.0)], &[true, true]);

        let summary = s.summary();
        assert_eq!(summary.uptime_secs + summary.downtime_secs, 5.0);
    }

    #[test]
    fn test_recovery_counts_one_failure() {
        let mut s = stats();
        s.update_at(at(1), true, false, &[Some(10.0), Some(20.0)], &[true, true]);
        s.update_at(at(2), false, false, &[None, None], &[false, false]);
        s.update_at(at(30), false, false, &[None, None], &[false, false]);
        s.update_at(at(62), true, false, &[Some(5.0), None], &[true, false]);

        let summary = s.summary();
        assert_eq!(summary.internet_failures, 1);
        assert!(summary.longest_downtime_secs >= 60.0);

        // staying up does not count again
        s.update_at(at(63), true, false, &[Some(5.0), Some(6.0)], &[true, true]);
        assert_eq!(s.summary().internet_failures, 1);
    }

    #[test]
    fn test_longest_downtime_keeps_maximum() {
        let mut s = stats();
        s.update_at(at(1), false, false, &[None, None], &[false, false]);
        s.update_at(at(101), true, false, &[Some(5.0), Some(5.0)], &[true, true]);
        s.update_at(at(102), false, false, &[None, None], &[false, false]);
        s.update_at(at(112), true, false, &[Some(5.0), Some(5.0)], &[true, true]);

        let summary = s.summary();
        assert_eq!(summary.internet_failures, 2);
        assert_eq!(summary.longest_downtime_secs, 100.0);
    }

    #[test]
    fn test_high_ping_counts_edges_and_accumulates_time() {
        let mut s = stats();
        let slow = [Some(200.0), Some(300.0)];
        let fast = [Some(20.0), Some(30.0)];
        let up = [true, true];

        s.update_at(at(1), true, true, &slow, &up);
        s.update_at(at(2), true, true, &slow, &up);
        s.update_at(at(3), true, true, &slow, &up);
        s.update_at(at(4), true, false, &fast, &up);
        s.update_at(at(5), true, true, &slow, &up);

        let summary = s.summary();
        assert_eq!(summary.high_ping_count, 2);
        assert_eq!(summary.high_ping_secs, 4.0);
    }

    #[test]
    fn test_per_host_high_ping_is_batch_wide() {
        // Known coarse policy: host 0 answered fast but still gets a high-ping
        // count because another host in the same batch was slow.
        let mut s = stats();
        s.update_at(at(1), true, false, &[Some(10.0), Some(400.0)], &[true, true]);

        let hosts = s.hosts();
        assert_eq!(hosts[0].high_pings, 1);
        assert_eq!(hosts[1].high_pings, 1);
    }

    #[test]
    fn test_per_host_downtime() {
        let mut s = stats();
        s.update_at(at(4), true, false, &[Some(10.0), None], &[true, false]);

        let hosts = s.hosts();
        assert_eq!(hosts[0].downtime, Duration::ZERO);
        assert_eq!(hosts[1].downtime, Duration::from_secs(4));
        assert_eq!(s.summary().most_stable_host.as_deref(), Some("1.1.1.1"));
    }

    #[test]
    fn test_most_stable_host_tie_prefers_first() {
        let mut s = stats();
        s.update_at(at(1), true, false, &[Some(10.0), Some(10.0)], &[true, true]);
        assert_eq!(s.summary().most_stable_host.as_deref(), Some("1.1.1.1"));

        let empty = DailyStats::new_at(at(0), Vec::<String>::new(), 150.0);
        assert_eq!(empty.summary().most_stable_host, None);
    }

    #[test]
    fn test_summary_derived_fields() {
        let mut s = stats();
        s.update_at(at(1), true, false, &[Some(10.0), Some(30.0)], &[true, true]);
        s.update_at(at(2), true, false, &[Some(50.0), None], &[true, false]);

        let summary = s.summary();
        assert_eq!(summary.total_pings, 4);
        assert_eq!(summary.failed_pings, 1);
        assert_eq!(summary.packet_loss_pct, 25.0);
        assert_eq!(summary.average_ping_ms, 30.0);
        assert_eq!(summary.max_ping_ms, 50.0);
        assert_eq!(summary.uptime_pct, 100.0);
        assert_eq!(summary.downtime_pct, 0.0);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut s = stats();
        s.update_at(at(1), false, true, &[None, None], &[false, false]);
        s.update_at(at(5), true, true, &[Some(500.0), Some(600.0)], &[true, true]);
        s.add_system_downtime(Duration::from_secs(30));

        s.reset_at(at(10));
        let summary = s.summary();

        assert_eq!(
            summary,
            StatsSummary {
                most_stable_host: Some("1.1.1.1".to_string()),
                ..Default::default()
            }
        );
        assert_eq!(s.started_at(), at(10));
        assert_eq!(s.hosts().len(), 2);
        assert!(s.hosts().iter().all(|h| h.high_pings == 0 && h.downtime.is_zero()));
    }

    #[test]
    fn test_reset_while_down_forgets_outage() {
        let mut s = stats();
        s.update_at(at(1), false, false, &[None, None], &[false, false]);
        s.reset_at(at(2));
        s.update_at(at(3), true, false, &[Some(5.0), Some(5.0)], &[true, true]);

        assert_eq!(s.summary().internet_failures, 0);
        assert_eq!(s.summary().uptime_secs, 1.0);
    }

    #[test]
    fn test_scenario_outage_and_recovery() {
        let mut s = stats();
        // cycle 1: both reachable
        s.update_at(at(1), true, false, &[Some(10.0), Some(20.0)], &[true, true]);
        // cycle 2: both unreachable
        s.update_at(at(2), false, false, &[None, None], &[false, false]);
        s.update_at(at(3), false, false, &[None, None], &[false, false]);
        // cycle 3: one reachable at 5ms
        s.update_at(at(4), true, false, &[Some(5.0), None], &[true, false]);

        let summary = s.summary();
        assert_eq!(summary.internet_failures, 1);
        assert_eq!(summary.downtime_secs, 2.0);
        assert_eq!(summary.uptime_secs, 2.0);
        assert_eq!(summary.failed_pings, 5);
    }
}
