//! One-shot countdown to scanner expiry.

use super::session::ScanEvent;
use crate::cancel::CancellationToken;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

/// Counts down to a deadline and fires [`ScanEvent::TimerExpired`] once.
#[derive(Debug)]
pub struct ScanTimer {
    deadline: Instant,
    fired: bool,
}

impl ScanTimer {
    pub fn new(deadline: Instant) -> Self {
        Self {
            deadline,
            fired: false,
        }
    }

    /// Timer for a wall-clock deadline, measured from `now`.
    ///
    /// A deadline already in the past gives a timer that fires on its first poll.
    pub fn until(deadline: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let remaining = (deadline - now).to_std().unwrap_or(Duration::ZERO);
        Self::new(Instant::now() + remaining)
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// Time left at `now`, zero once the deadline has passed.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.deadline.saturating_duration_since(now)
    }

    /// Returns the expiry event the first time `now` reaches the deadline.
    pub fn poll(&mut self, now: Instant) -> Option<ScanEvent> {
        if self.fired || now < self.deadline {
            return None;
        }
        self.fired = true;
        Some(ScanEvent::TimerExpired)
    }

    /// Sleep until the deadline, then send the expiry event.
    ///
    /// Returns early without sending if `cancel` fires first.
    pub async fn run(mut self, tx: mpsc::Sender<ScanEvent>, cancel: CancellationToken) {
        tokio::select! {
            _ = tokio::time::sleep_until(self.deadline) => {
                if let Some(event) = self.poll(Instant::now()) {
                    debug!("Scanner timer expired");
                    let _ = tx.send(event).await;
                }
            }
            _ = cancel.cancelled() => {
                debug!("Scanner timer cancelled");
            }
        }
    }
}
