//! The monitor loop: probe every host, fold the batch into today's
//! statistics, then let the state tracker decide on alerts.

mod tracker;

pub use tracker::StateTracker;

use crate::probe::{Prober, Target};
use anyhow::{Context, Result};
use stats::{DailyStats, ProbeBatch};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Today's accumulator, shared by the monitor loop and the report scheduler
pub type SharedStats = Arc<Mutex<DailyStats>>;

/// Accumulator whose per-host slots follow `targets` in order
pub fn shared_stats(targets: &[Target], high_ping_threshold_ms: f64) -> SharedStats {
    Arc::new(Mutex::new(DailyStats::new(
        targets.iter().map(|t| t.name.clone()),
        high_ping_threshold_ms,
    )))
}

pub struct MonitorLoop {
    targets: Vec<Target>,
    prober: Arc<dyn Prober>,
    stats: SharedStats,
    tracker: Arc<StateTracker>,
    interval: Duration,
    timeout: Duration,
}

impl MonitorLoop {
    pub fn new(
        targets: Vec<Target>,
        prober: Arc<dyn Prober>,
        stats: SharedStats,
        tracker: Arc<StateTracker>,
        interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            targets,
            prober,
            stats,
            tracker,
            interval,
            timeout,
        }
    }

    /// Probe all targets concurrently and process the results in host order
    pub async fn run_cycle(&self) -> Result<ProbeBatch> {
        let handles: Vec<_> = self
            .targets
            .iter()
            .cloned()
            .map(|target| {
                let prober = self.prober.clone();
                let timeout = self.timeout;
                tokio::spawn(async move { prober.probe(&target, timeout).await })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(handle.await.context("Probe task failed")?);
        }
        let batch = ProbeBatch::new(results);

        {
            let mut stats = self.stats.lock().await;
            let is_up = batch.is_up();
            let is_high_ping = batch.all_high_ping(stats.high_ping_threshold_ms());

            debug!(
                "Cycle: up={} high_ping={} latencies={:?}",
                is_up,
                is_high_ping,
                batch.latencies()
            );

            stats.update(is_up, is_high_ping, &batch.latencies(), &batch.reachability());
        }

        self.tracker.update_state(&batch).await;

        Ok(batch)
    }

    /// Run cycles forever; only a failed probe task ends the loop
    pub async fn run(&self) -> Result<()> {
        info!(
            "Monitoring {} hosts every {:?} (timeout {:?})",
            self.targets.len(),
            self.interval,
            self.timeout
        );

        loop {
            self.run_cycle().await?;
            tokio::time::sleep(self.interval).await;
        }
    }
}
