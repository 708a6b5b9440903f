//! Optional cross-run coordination.
//!
//! Overlapping runs are tolerated by default: selections narrow as statuses
//! change and fallback writes are guarded per id. Hosts whose scheduler
//! cannot guarantee non-overlap may enable a [`RunLock`] so a second run
//! skips its pass instead of racing the first.

use crate::store::StoreFuture;

/// Non-blocking, advisory, per-job lock.
pub trait RunLock: Send + Sync {
    /// Try to take the lock for `job_name`. Returns `false` if another run
    /// holds it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::store::StoreError`] if the lock backend fails.
    fn try_acquire<'a>(&'a self, job_name: &'a str) -> StoreFuture<'a, bool>;

    /// Release a lock previously taken with [`RunLock::try_acquire`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::store::StoreError`] if the lock backend fails.
    fn release<'a>(&'a self, job_name: &'a str) -> StoreFuture<'a, ()>;
}
