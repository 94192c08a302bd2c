// Thu Oct 15 2026 - Alex

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

const RUNNING: u8 = 0;
const CANCELLED: u8 = 1;
const COMMITTED: u8 = 2;

/// Shared flag between an analysis and whoever owns its request.
///
/// The scanner polls it between chunks. Before an analysis publishes
/// anything it must win `try_commit`; once committed, `cancel` loses and
/// the caller has to wait for the result instead.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    state: Arc<AtomicU8>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the analysis already committed its result.
    pub fn cancel(&self) -> bool {
        self.state
            .compare_exchange(RUNNING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .map_or_else(|current| current == CANCELLED, |_| true)
    }

    pub fn try_commit(&self) -> bool {
        self.state
            .compare_exchange(RUNNING, COMMITTED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.load(Ordering::Acquire) == CANCELLED
    }
}
