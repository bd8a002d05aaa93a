//! Countdown timer
//!
//! Counts a configured duration down in whole seconds. The host drives it
//! with a 1 Hz tick and plays the alarm when a tick reports expiry.

use std::time::Duration;

use tracing::debug;

/// Countdown states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownState {
    /// Not started or reset
    Idle,
    /// Counting down
    Running,
    /// Stopped part way
    Paused,
    /// Reached zero; alarm should sound
    Expired,
}

/// Result of a single tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Still counting, with the time left
    Running(Duration),
    /// This tick reached zero
    Expired,
    /// Not running; nothing happened
    Idle,
}

/// Whole-second countdown
pub struct Countdown {
    duration: u64,
    remaining: u64,
    state: CountdownState,
}

impl Countdown {
    /// Create a countdown of `minutes:seconds`
    pub fn new(minutes: u32, seconds: u32) -> Self {
        Self::from_duration(Duration::from_secs(
            u64::from(minutes) * 60 + u64::from(seconds),
        ))
    }

    /// Create a countdown of `duration`, truncated to whole seconds
    pub fn from_duration(duration: Duration) -> Self {
        let secs = duration.as_secs();
        Self {
            duration: secs,
            remaining: secs,
            state: CountdownState::Idle,
        }
    }

    /// Current state
    pub fn state(&self) -> CountdownState {
        self.state
    }

    /// Time left
    pub fn remaining(&self) -> Duration {
        Duration::from_secs(self.remaining)
    }

    /// Start or resume counting
    pub fn start(&mut self) {
        match self.state {
            CountdownState::Idle | CountdownState::Paused if self.remaining > 0 => {
                self.state = CountdownState::Running;
                debug!(remaining = self.remaining, "Countdown started");
            }
            CountdownState::Expired => {
                self.remaining = self.duration;
                self.state = CountdownState::Running;
                debug!(remaining = self.remaining, "Countdown restarted");
            }
            _ => {}
        }
    }

    /// Pause a running countdown
    pub fn pause(&mut self) {
        if self.state == CountdownState::Running {
            self.state = CountdownState::Paused;
            debug!(remaining = self.remaining, "Countdown paused");
        }
    }

    /// Back to the full duration, not running
    pub fn reset(&mut self) {
        self.remaining = self.duration;
        self.state = CountdownState::Idle;
    }

    /// Change the configured duration; resets the countdown
    pub fn set_duration(&mut self, duration: Duration) {
        self.duration = duration.as_secs();
        self.reset();
    }

    /// Advance by one second
    pub fn tick(&mut self) -> TickOutcome {
        if self.state != CountdownState::Running {
            return TickOutcome::Idle;
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.state = CountdownState::Expired;
            debug!("Countdown expired");
            TickOutcome::Expired
        } else {
            TickOutcome::Running(self.remaining())
        }
    }

    /// Remaining time as `MM:SS`
    pub fn display_string(&self) -> String {
        format!("{:02}:{:02}", self.remaining / 60, self.remaining % 60)
    }
}
