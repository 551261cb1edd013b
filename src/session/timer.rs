// src/session/timer.rs

//! Countdown bookkeeping for timed attempts.
//!
//! The countdown does not own a clock. The session runtime delivers one
//! tick per second while the attempt is active and the countdown only
//! counts them down.

use std::time::Duration;

/// Interval between countdown ticks.
pub const TICK: Duration = Duration::from_secs(1);

/// Remaining seconds below which the clock is rendered as urgent.
pub const URGENT_BELOW_SECS: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    remaining: u32,
}

impl Countdown {
    pub fn new(seconds: u32) -> Self {
        Self { remaining: seconds }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Consumes one second. Returns `true` when this tick exhausts the countdown.
    ///
    /// A countdown that is already at zero reports expiry again; the caller
    /// drops the countdown on the first expiry so this never happens in a session.
    pub fn tick(&mut self) -> bool {
        if self.remaining <= 1 {
            self.remaining = 0;
            return true;
        }
        self.remaining -= 1;
        false
    }
}

/// Renders seconds as `m:ss`.
pub fn format_clock(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

pub fn is_urgent(seconds: u32) -> bool {
    seconds < URGENT_BELOW_SECS
}
