//! Alert delivery
//!
//! Alerts are best-effort: [`AlertSink::send`] logs delivery failures and
//! never returns them to the caller.

mod telegram;

pub use telegram::TelegramAlerts;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum AlertError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Alert rejected ({status}): {description}")]
    Rejected { status: u16, description: String },
}

#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Deliver one text message
    async fn deliver(&self, message: &str) -> Result<(), AlertError>;

    /// Deliver and log any failure
    async fn send(&self, message: &str) {
        if let Err(e) = self.deliver(message).await {
            error!("Failed to send alert: {}", e);
        }
    }
}

/// Sink used when no messaging channel is configured
pub struct LogAlerts;

#[async_trait]
impl AlertSink for LogAlerts {
    async fn deliver(&self, message: &str) -> Result<(), AlertError> {
        warn!("ALERT: {}", message);
        Ok(())
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Records every message; optionally fails delivery
    #[derive(Default)]
    pub struct RecordingAlerts {
        messages: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingAlerts {
        pub fn failing() -> Self {
            Self {
                messages: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        pub fn messages(&self) -> Vec<String> {
            self.messages.lock().unwrap().clone()
        }

        pub fn count_containing(&self, needle: &str) -> usize {
            self.messages().iter().filter(|m| m.contains(needle)).count()
        }
    }

    #[async_trait]
    impl AlertSink for RecordingAlerts {
        async fn deliver(&self, message: &str) -> Result<(), AlertError> {
            self.messages.lock().unwrap().push(message.to_string());
            if self.fail {
                return Err(AlertError::Rejected {
                    status: 500,
                    description: "test failure".to_string(),
                });
            }
            Ok(())
        }
    }
}
