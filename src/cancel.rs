//! Cooperative cancellation of running decodes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use crate::error::{Error, UnitResult};


/// A shared flag that asks a running decode to stop.
/// Clones observe the same flag, so one clone can be handed to a worker
/// while another stays with the caller.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {

    /// A token that has not been cancelled yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every decode observing this token to stop at its next check.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Whether `cancel` was called on any clone of this token.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Returns `Error::Aborted` once cancelled.
    #[inline]
    pub fn check(&self) -> UnitResult {
        if self.is_cancelled() { Err(Error::Aborted) }
        else { Ok(()) }
    }
}
