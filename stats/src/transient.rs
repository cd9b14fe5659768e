//! Edge-triggered outage and latency state
//!
//! [`TransientState::observe`] is called once per cycle and reports only the
//! changes: a run of identical cycles produces no transitions. Outage and
//! high-ping tracking are independent flags.

use chrono::{DateTime, Local};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Every host stopped answering
    WentDown { at: DateTime<Local> },

    /// At least one host answers again after an outage
    Restored {
        since: DateTime<Local>,
        at: DateTime<Local>,
        downtime: Duration,
    },

    /// Every reachable host crossed the latency threshold
    HighPingStarted { at: DateTime<Local> },

    /// Latency back to normal (no alert)
    HighPingCleared { at: DateTime<Local> },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransientState {
    is_down: bool,
    is_high_ping: bool,
    down_since: Option<DateTime<Local>>,
}

impl TransientState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_down(&self) -> bool {
        self.is_down
    }

    pub fn is_high_ping(&self) -> bool {
        self.is_high_ping
    }

    pub fn down_since(&self) -> Option<DateTime<Local>> {
        self.down_since
    }

    /// Evaluate one cycle and return the transitions it caused
    pub fn observe(
        &mut self,
        now: DateTime<Local>,
        all_down: bool,
        all_high_ping: bool,
    ) -> Vec<Transition> {
        let mut transitions = Vec::new();

        if all_down {
            if !self.is_down {
                self.is_down = true;
                self.down_since = Some(now);
                transitions.push(Transition::WentDown { at: now });
            }
        } else if self.is_down {
            self.is_down = false;
            let since = self.down_since.take().unwrap_or(now);
            transitions.push(Transition::Restored {
                since,
                at: now,
                downtime: (now - since).to_std().unwrap_or_default(),
            });
        }

        if all_high_ping && !all_down {
            if !self.is_high_ping {
                self.is_high_ping = true;
                transitions.push(Transition::HighPingStarted { at: now });
            }
        } else if self.is_high_ping {
            self.is_high_ping = false;
            transitions.push(Transition::HighPingCleared { at: now });
        }

        transitions
    }
}
