//! Wall-clock driven reports and the daily reset
//!
//! The scheduler polls once per `poll_interval` and fires a rule only when
//! the poll lands in its exact minute. A missed minute skips that report.

use crate::alerts::AlertSink;
use crate::config::Schedule;
use crate::monitoring::SharedStats;
use crate::output::ReportFile;
use crate::storage::Database;
use anyhow::Result;
use chrono::{Datelike, Duration as ChronoDuration, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use stats::ReportPeriod;
use stats::report;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub struct ReportScheduler {
    schedule: Schedule,
    stats: SharedStats,
    db: Arc<Database>,
    alerts: Arc<dyn AlertSink>,
    report_file: ReportFile,
}

impl ReportScheduler {
    pub fn new(
        schedule: Schedule,
        stats: SharedStats,
        db: Arc<Database>,
        alerts: Arc<dyn AlertSink>,
        report_file: ReportFile,
    ) -> Self {
        Self {
            schedule,
            stats,
            db,
            alerts,
            report_file,
        }
    }

    pub async fn run(&self) -> Result<()> {
        info!(
            "Report scheduler started (daily at {:?}, reset at {}, poll every {:?})",
            self.schedule
                .daily_report_times
                .iter()
                .map(|t| t.format("%H:%M").to_string())
                .collect::<Vec<_>>(),
            self.schedule.reset_time.format("%H:%M"),
            self.schedule.poll_interval
        );

        loop {
            self.tick(Local::now().naive_local()).await;
            tokio::time::sleep(self.schedule.poll_interval).await;
        }
    }

    /// Evaluate every rule for one poll at `now`
    pub async fn tick(&self, now: NaiveDateTime) {
        let time = now.time();
        let today = now.date();

        if self
            .schedule
            .daily_report_times
            .iter()
            .any(|t| same_minute(*t, time))
        {
            self.send_daily_report(now).await;
        }

        if same_minute(self.schedule.reset_time, time) {
            self.stats.lock().await.reset();
            info!("Daily statistics reset");
        }

        if today.weekday() == self.schedule.weekly_report_day
            && same_minute(self.schedule.weekly_report_time, time)
        {
            self.send_aggregate_report(ReportPeriod::Weekly, today).await;
        }

        if today.day() == self.schedule.monthly_report_day
            && same_minute(self.schedule.monthly_report_time, time)
        {
            self.send_aggregate_report(ReportPeriod::Monthly, today).await;
        }

        if let Err(e) = self.db.update_heartbeat(now) {
            error!("Failed to update heartbeat: {:#}", e);
        }
    }

    /// Snapshot today's statistics to the report file, the database and the
    /// alert channel. The accumulator keeps running.
    pub async fn send_daily_report(&self, now: NaiveDateTime) {
        let summary = self.stats.lock().await.summary();
        let today = now.date();

        if let Err(e) = self.report_file.append(&report::daily_log_block(today, &summary)) {
            error!("Failed to write daily report to {:?}: {:#}", self.report_file.path(), e);
        }
        if let Err(e) = self.db.insert_daily_snapshot(now, &summary) {
            error!("Failed to store daily snapshot: {:#}", e);
        }
        self.record_report(ReportPeriod::Daily);

        self.alerts.send(&report::daily_alert(today, &summary)).await;
        info!(
            "Daily report sent: uptime {:.2}%, {} failures",
            summary.uptime_pct, summary.internet_failures
        );
    }

    /// Aggregate persisted snapshots for `period` ending `today`.
    ///
    /// Returns false when the window holds no data.
    pub async fn send_aggregate_report(&self, period: ReportPeriod, today: NaiveDate) -> bool {
        let start = window_start(period, today);

        let aggregated = match self.db.aggregate_since(start) {
            Ok(Some(aggregated)) => aggregated,
            Ok(None) => {
                warn!("No data for {} report since {}", period.title(), start);
                return false;
            }
            Err(e) => {
                error!("Failed to aggregate {} stats: {:#}", period.title(), e);
                return false;
            }
        };

        if let Err(e) = self
            .report_file
            .append(&report::aggregate_log_block(period, today, &aggregated))
        {
            error!(
                "Failed to write {} report to {:?}: {:#}",
                period.title(),
                self.report_file.path(),
                e
            );
        }

        self.record_report(period);

        self.alerts
            .send(&report::aggregate_alert(period, today, &aggregated))
            .await;
        info!(
            "{} report sent ({} snapshots since {})",
            period.title(),
            aggregated.snapshots,
            start
        );

        true
    }

    fn record_report(&self, period: ReportPeriod) {
        let recorded = format!("{} Recorded", period.event_type());
        if let Err(e) = self.db.log_event(period.event_type(), &recorded) {
            error!("Failed to record {} event: {:#}", period.event_type(), e);
        }
    }

    /// Compare the stored heartbeat with `now` and book any gap longer than
    /// `threshold` as system downtime. Refreshes the heartbeat afterwards.
    pub async fn check_heartbeat_gap(&self, now: NaiveDateTime, threshold: Duration) -> Option<Duration> {
        let gap = self.offline_gap(now, threshold);

        if let Err(e) = self.db.update_heartbeat(now) {
            error!("Failed to update heartbeat: {:#}", e);
        }

        let (last, gap) = gap?;
        warn!(
            "Monitor was offline from {} to {} ({})",
            last.format("%H:%M:%S"),
            now.format("%H:%M:%S"),
            report::format_hms(gap)
        );

        let details = format!(
            "Offline from {} to {} ({})",
            last.format("%Y-%m-%d %H:%M:%S"),
            now.format("%Y-%m-%d %H:%M:%S"),
            report::format_hms(gap)
        );
        if let Err(e) = self.db.log_event("System Downtime", &details) {
            error!("Failed to record system downtime: {:#}", e);
        }

        self.stats.lock().await.add_system_downtime(gap);
        Some(gap)
    }

    fn offline_gap(&self, now: NaiveDateTime, threshold: Duration) -> Option<(NaiveDateTime, Duration)> {
        let last = match self.db.last_heartbeat() {
            Ok(last) => last?,
            Err(e) => {
                error!("Failed to read heartbeat: {:#}", e);
                return None;
            }
        };

        let gap = (now - last).to_std().ok()?;
        if gap <= threshold {
            debug!("Last heartbeat {} is recent, no downtime to book", last);
            return None;
        }

        Some((last, gap))
    }
}

fn same_minute(scheduled: NaiveTime, now: NaiveTime) -> bool {
    scheduled.hour() == now.hour() && scheduled.minute() == now.minute()
}

/// First day included in the aggregation window
fn window_start(period: ReportPeriod, today: NaiveDate) -> NaiveDate {
    match period {
        ReportPeriod::Daily => today,
        ReportPeriod::Weekly => today - ChronoDuration::days(6),
        ReportPeriod::Monthly => today.with_day(1).unwrap_or(today),
    }
}
