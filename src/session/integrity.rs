// src/session/integrity.rs

//! Heuristic detection of a student leaving the quiz tab.
//!
//! Losing visibility arms a grace period. Coming back before it ends
//! cancels it; letting it run out is a breach. Every armed grace period
//! gets a fresh token so a late expiry from a cancelled period is ignored.

use std::time::Duration;

/// How long the tab may stay hidden before the attempt is closed.
pub const GRACE_PERIOD: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GraceToken(u64);

#[derive(Debug, Default)]
pub struct IntegrityMonitor {
    pending: Option<GraceToken>,
    issued: u64,
}

impl IntegrityMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms a grace period. Returns `None` if one is already running.
    pub fn visibility_lost(&mut self) -> Option<GraceToken> {
        if self.pending.is_some() {
            return None;
        }
        self.issued += 1;
        let token = GraceToken(self.issued);
        self.pending = Some(token);
        Some(token)
    }

    /// Cancels the running grace period, if any, and returns its token.
    pub fn visibility_restored(&mut self) -> Option<GraceToken> {
        self.pending.take()
    }

    /// Returns `true` when `token` is the running grace period, which makes
    /// this expiry a confirmed breach.
    pub fn grace_elapsed(&mut self, token: GraceToken) -> bool {
        if self.pending == Some(token) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    pub fn pending(&self) -> Option<GraceToken> {
        self.pending
    }
}
