//! Batch Guard
//!
//! A batch suppresses dispatch while it runs and commits once at the end.
//! The commit runs from `Drop`, so it also happens when the batch body
//! panics.
//!
//! # Commit Order
//!
//! For every writable cell that changed during the batch, in the order the
//! cells first changed:
//!
//! 1. Add the cell's dependents to one combined set.
//! 2. Report the cell to the change sink.
//!
//! Then every item in the combined set is reevaluated exactly once. Batch
//! mode is already off at that point, so any further changes dispatch
//! normally.

use super::registry::RegistryShared;

/// Guard that ends a batch when dropped.
pub(crate) struct BatchGuard<'a> {
    shared: &'a RegistryShared,
}

impl<'a> BatchGuard<'a> {
    /// Wrap a batch that the caller has already started.
    pub(crate) fn new(shared: &'a RegistryShared) -> Self {
        Self { shared }
    }
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            tracing::debug!(registry = ?self.shared.id(), "batch body panicked; committing");
        }
        self.shared.commit_batch();
    }
}
