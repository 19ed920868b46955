//! Paced replay of a finished ledger.
//!
//! A consumer (dashboard animation, terminal ticker) drives the cursor with
//! wall-clock deltas; the cursor maps them to simulated time and reveals the
//! ledger entries whose timestamps have been reached. The ledger itself is
//! never mutated, so replay cannot change results.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::LedgerEntry;

/// Shared cancellation flag for a replay.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Cursor over an immutable ledger, advanced in simulated time.
#[derive(Debug)]
pub struct ReplayCursor<'a> {
    ledger: &'a [LedgerEntry],
    /// Simulated epoch milliseconds reached so far.
    virtual_ms: f64,
    /// Simulated milliseconds per real millisecond.
    speed: f64,
    visible: usize,
    cancel: CancelToken,
}

impl<'a> ReplayCursor<'a> {
    /// Start just before the first entry. A non-positive or non-finite speed
    /// is treated as 1.
    pub fn new(ledger: &'a [LedgerEntry], speed: f64, cancel: CancelToken) -> Self {
        let start = ledger.first().map(|e| e.timestamp).unwrap_or(0);
        Self {
            ledger,
            virtual_ms: start as f64 - 1.0,
            speed: if speed.is_finite() && speed > 0.0 { speed } else { 1.0 },
            visible: 0,
            cancel,
        }
    }

    /// Advance by a real-time delta and return the entries that became visible.
    ///
    /// After cancellation the cursor is frozen and this returns an empty slice.
    pub fn advance(&mut self, real_elapsed: Duration) -> &'a [LedgerEntry] {
        if self.cancel.is_cancelled() {
            return &[];
        }
        self.virtual_ms += real_elapsed.as_secs_f64() * 1_000.0 * self.speed;
        let from = self.visible;
        while self.visible < self.ledger.len()
            && (self.ledger[self.visible].timestamp as f64) <= self.virtual_ms
        {
            self.visible += 1;
        }
        &self.ledger[from..self.visible]
    }

    /// Entries revealed so far.
    pub fn visible(&self) -> &'a [LedgerEntry] {
        &self.ledger[..self.visible]
    }

    pub fn is_finished(&self) -> bool {
        self.visible == self.ledger.len()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
