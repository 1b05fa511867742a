// src/runner/timer.rs

use std::future;
use std::time::Duration;

use tokio::time::{self, Instant};

/// Resettable quiet-period timer.
///
/// Each controller owns exactly one of these. `arm()` sets the deadline to
/// now + quiet period; arming again before the deadline resets it, so the
/// timer only fires quiet-period after the *last* qualifying signal in a
/// burst. Concurrent scheduling calls therefore coalesce into a single
/// pending deadline.
#[derive(Debug)]
pub struct DebounceTimer {
    quiet: Duration,
    deadline: Option<Instant>,
}

impl DebounceTimer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            deadline: None,
        }
    }

    /// Arm the timer, resetting any pending deadline.
    pub fn arm(&mut self) {
        self.deadline = Some(Instant::now() + self.quiet);
    }

    /// Cancel the pending deadline, if any.
    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Resolves when the armed deadline is reached; pends forever while
    /// disarmed. The deadline is absolute, so this future may be recreated
    /// on every select iteration without skewing the quiet period.
    pub async fn fired(&self) {
        match self.deadline {
            Some(deadline) => time::sleep_until(deadline).await,
            None => future::pending().await,
        }
    }
}
