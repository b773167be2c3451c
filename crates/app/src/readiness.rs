//! Readiness gate consulted by the readiness probe.

use std::sync::atomic::{AtomicBool, Ordering};

/// Process wide readiness state.
///
/// Both flags only ever go from `false` to `true`. Once `terminating` is set it dominates every
/// read: [`ReadinessState::is_ready`] returns `false` forever after, whatever `ready` holds.
#[derive(Debug, Default)]
pub struct ReadinessState {
    terminating: AtomicBool,
    ready: AtomicBool,
}

impl ReadinessState {
    /// Creates a state that is neither ready nor terminating.
    pub const fn new() -> Self {
        Self { terminating: AtomicBool::new(false), ready: AtomicBool::new(false) }
    }

    /// Returns `true` if the instance can serve traffic.
    pub fn is_ready(&self) -> bool {
        if self.terminating.load(Ordering::SeqCst) {
            return false
        }
        self.ready.load(Ordering::SeqCst)
    }

    /// Returns `true` once termination started.
    pub fn is_terminating(&self) -> bool {
        self.terminating.load(Ordering::SeqCst)
    }

    /// Flips the instance to ready.
    ///
    /// Returns `true` if this call performed the transition. Calling it again, or after
    /// termination started, is a no-op.
    pub fn set_ready(&self) -> bool {
        if self.is_terminating() {
            return false
        }
        self.ready.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_ok()
    }

    /// Marks the instance as terminating. Returns `true` for the first caller only.
    pub(crate) fn set_terminating(&self) -> bool {
        self.terminating.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_ok()
    }
}
