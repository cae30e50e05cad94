//! Copy-on-read snapshot publication (spec §5): a request reads a pointer to
//! the current value once and uses it for the remainder of its processing;
//! writers publish a new value without blocking readers.

use std::sync::Arc;

use arc_swap::ArcSwap;

/// A value readers load once per request and writers replace wholesale.
///
/// Wraps [`ArcSwap`] so that publishing a new snapshot is a single atomic
/// pointer swap, never a lock held across a request's lifetime.
pub struct Snapshot<T> {
    inner: ArcSwap<T>,
}

impl<T> Snapshot<T> {
    pub fn new(value: T) -> Self {
        Snapshot {
            inner: ArcSwap::from_pointee(value),
        }
    }

    /// Load the current value. Cheap: an atomic load plus a refcount bump.
    pub fn load(&self) -> Arc<T> {
        self.inner.load_full()
    }

    /// Publish a new value, replacing whatever the previous snapshot was.
    pub fn store(&self, value: T) {
        self.inner.store(Arc::new(value));
    }

    /// Replace the current value with the result of merging it through `f`,
    /// used for partial-field patches (chaos config, IAM mode) that must
    /// preserve fields the caller didn't mention.
    pub fn rcu(&self, f: impl Fn(&T) -> T) {
        let current = self.load();
        self.store(f(&current));
    }
}
