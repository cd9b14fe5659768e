//! Outage and latency alerting around [`TransientState`]

use crate::alerts::AlertSink;
use crate::storage::Database;
use chrono::{DateTime, Local};
use stats::report;
use stats::{ProbeBatch, TransientState, Transition};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

pub struct StateTracker {
    state: Mutex<TransientState>,
    high_ping_threshold_ms: f64,
    alerts: Arc<dyn AlertSink>,
    db: Arc<Database>,
}

impl StateTracker {
    pub fn new(high_ping_threshold_ms: f64, alerts: Arc<dyn AlertSink>, db: Arc<Database>) -> Self {
        Self {
            state: Mutex::new(TransientState::new()),
            high_ping_threshold_ms,
            alerts,
            db,
        }
    }

    pub async fn update_state(&self, batch: &ProbeBatch) {
        self.update_state_at(Local::now(), batch).await;
    }

    /// Evaluate one cycle; alerts fire only on transitions.
    ///
    /// The state lock is held until every alert for this cycle has been
    /// delivered, so overlapping evaluations cannot fire the same alert twice.
    pub async fn update_state_at(&self, now: DateTime<Local>, batch: &ProbeBatch) {
        let mut state = self.state.lock().await;

        let transitions = state.observe(
            now,
            batch.all_down(),
            batch.all_high_ping(self.high_ping_threshold_ms),
        );

        for transition in transitions {
            self.handle(transition).await;
        }
    }

    #[cfg(test)]
    pub async fn is_down(&self) -> bool {
        self.state.lock().await.is_down()
    }

    async fn handle(&self, transition: Transition) {
        match transition {
            Transition::WentDown { at } => {
                info!("Internet went down at {}", at.format("%H:%M:%S"));
                self.record("Internet Down", "All hosts unreachable");
                self.alerts.send(&report::outage_alert()).await;
            }
            Transition::Restored { since, at, downtime } => {
                let message = report::restored_alert(since, at, downtime);
                info!(
                    "Internet restored at {} after {}",
                    at.format("%H:%M:%S"),
                    report::format_hms(downtime)
                );
                self.record("Internet Restored", &message);
                self.alerts.send(&message).await;
            }
            Transition::HighPingStarted { at } => {
                let message = report::high_ping_alert(self.high_ping_threshold_ms);
                warn!(
                    "High ping on all hosts since {} (threshold {:.0}ms)",
                    at.format("%H:%M:%S"),
                    self.high_ping_threshold_ms
                );
                self.record("High Ping", &message);
                self.alerts.send(&message).await;
            }
            Transition::HighPingCleared { at } => {
                info!("Ping back to normal at {}", at.format("%H:%M:%S"));
            }
        }
    }

    fn record(&self, event_type: &str, details: &str) {
        if let Err(e) = self.db.log_event(event_type, details) {
            error!("Failed to record {} event: {:#}", event_type, e);
        }
    }
}
