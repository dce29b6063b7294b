//! Ready gate for views whose external resources load outside the engine.
//!
//! The host flips the gate once its resources are in; the false → true
//! transition hands out a `RefreshToken`. Re-initialization work keyed on that
//! token runs at most once per token through `RefreshLedger::claim`.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RefreshToken(pub u64);

#[derive(Debug, Default)]
pub struct ReadyGate {
    ready: AtomicBool,
    generation: AtomicU64,
}

impl ReadyGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Returns a token only on the transition to ready.
    pub fn mark_ready(&self) -> Option<RefreshToken> {
        self.ready
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        let token = RefreshToken(self.generation.fetch_add(1, Ordering::AcqRel) + 1);
        debug!(token = token.0, "view ready");
        Some(token)
    }

    /// Back to not-ready, e.g. when the resource list changes.
    pub fn reset(&self) {
        self.ready.store(false, Ordering::Release);
    }
}

/// Remembers the newest token whose refresh already ran.
#[derive(Debug, Default)]
pub struct RefreshLedger {
    last: AtomicU64,
}

impl RefreshLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the caller should run the refresh for `token`.
    pub fn claim(&self, token: RefreshToken) -> bool {
        self.last.fetch_max(token.0, Ordering::AcqRel) < token.0
    }
}
