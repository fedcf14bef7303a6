//! Cell Core
//!
//! Every cell kind shares one core: a name, a cached value, an equality
//! policy and an optional changed callback.
//!
//! # Update Path
//!
//! `update(new, notify)` is the only way the cached value changes:
//!
//! 1. If the equality policy says `new` equals the cached value, stop.
//! 2. Detach from the outgoing value's change feed, if the cell observes one.
//! 3. Store `new`.
//! 4. Attach to the incoming value's change feed, if it exposes one.
//! 5. If `notify` is set, invoke the changed callback with the cell.
//!
//! Step 4 is what keeps a cell reactive to mutation of the value it holds:
//! a change reported by the value goes straight to step 5.
//!
//! # Locking
//!
//! The value lock is never held while the changed callback runs, so
//! callbacks may read any cell, including this one.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use crate::error::{RegistryError, Result};
use crate::graph::{CellId, CellKind};
use crate::observe::{self, ReportsChanges, Subscription};

/// A named cell as seen by the registry and by change sinks.
pub trait Property: Send + Sync {
    /// Unique id of the cell.
    fn id(&self) -> CellId;

    /// Name of the cell, unique within its registry.
    fn name(&self) -> &str;

    /// Private cells are never reported to the change sink.
    fn is_private(&self) -> bool;

    fn kind(&self) -> CellKind;
}

impl<'a> fmt::Debug for dyn Property + 'a {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("kind", &self.kind())
            .field("private", &self.is_private())
            .finish()
    }
}

/// Equality policy deciding whether an update is a no-op.
///
/// Called as `equality(new, current)`.
pub type Equality<T> = Arc<dyn Fn(&T, &T) -> bool + Send + Sync>;

/// Callback invoked with a cell whenever its value changes.
pub type ChangedCallback = Arc<dyn Fn(&dyn Property) + Send + Sync>;

type Watcher<T> = fn(&T, Arc<dyn Fn() + Send + Sync>) -> Option<Subscription>;

pub(crate) fn default_equality<T: PartialEq + 'static>() -> Equality<T> {
    Arc::new(|new: &T, current: &T| new == current)
}

pub(crate) fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(RegistryError::InvalidName {
            name: name.to_owned(),
        });
    }
    Ok(())
}

/// Options for a cell.
///
/// ```rust
/// use trellis_core::reactive::CellOptions;
///
/// let options = CellOptions::<f64>::new()
///     .private(true)
///     .equality(|new, current| (new - current).abs() < 1e-9);
/// ```
pub struct CellOptions<T> {
    pub(crate) private: bool,
    pub(crate) equality: Option<Equality<T>>,
    pub(crate) watcher: Option<Watcher<T>>,
}

impl<T> CellOptions<T> {
    pub fn new() -> Self {
        Self {
            private: false,
            equality: None,
            watcher: None,
        }
    }

    /// Exclude the cell from the change sink. It still drives dependents.
    pub fn private(mut self, private: bool) -> Self {
        self.private = private;
        self
    }

    /// Replace the default `PartialEq` policy.
    pub fn equality<F>(mut self, equality: F) -> Self
    where
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        self.equality = Some(Arc::new(equality));
        self
    }
}

impl<T: ReportsChanges> CellOptions<T> {
    /// Follow changes the held value reports about itself.
    pub fn observe_changes(mut self) -> Self {
        self.watcher = Some(observe::watch::<T>);
        self
    }
}

impl<T> Default for CellOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for CellOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellOptions")
            .field("private", &self.private)
            .field("custom_equality", &self.equality.is_some())
            .field("observe_changes", &self.watcher.is_some())
            .finish()
    }
}

/// Shared state behind every cell handle.
pub(crate) struct CellCore<T> {
    id: CellId,
    name: String,
    kind: CellKind,
    private: bool,
    value: RwLock<T>,
    equality: Equality<T>,
    changed: Option<ChangedCallback>,
    watcher: Option<Watcher<T>>,

    /// Subscription to the current value's own change feed.
    subscription: Mutex<Option<Subscription>>,

    this: Weak<CellCore<T>>,
}

impl<T: Send + Sync + 'static> CellCore<T> {
    /// Create a core seeded with `initial`. Seeding never notifies.
    ///
    /// `fallback` is used when `options` carries no equality policy.
    pub(crate) fn new(
        name: String,
        kind: CellKind,
        initial: T,
        fallback: Equality<T>,
        options: CellOptions<T>,
        changed: Option<ChangedCallback>,
    ) -> Result<Arc<Self>> {
        validate_name(&name)?;

        let core = Arc::new_cyclic(|this| Self {
            id: CellId::new(),
            name,
            kind,
            private: options.private,
            value: RwLock::new(initial),
            equality: options.equality.unwrap_or(fallback),
            changed,
            watcher: options.watcher,
            subscription: Mutex::new(None),
            this: this.clone(),
        });
        core.watch_current();
        Ok(core)
    }

    pub(crate) fn get(&self) -> T
    where
        T: Clone,
    {
        self.value.read().clone()
    }

    pub(crate) fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&*self.value.read())
    }

    /// Store `new_value` unless it equals the cached value.
    ///
    /// Returns whether the value changed.
    pub(crate) fn update(&self, new_value: T, notify: bool) -> bool {
        if (self.equality)(&new_value, &*self.value.read()) {
            return false;
        }

        let outgoing = self.subscription.lock().take();
        drop(outgoing);

        let old_value = std::mem::replace(&mut *self.value.write(), new_value);
        self.watch_current();
        drop(old_value);

        tracing::trace!(cell = %self.name, kind = %self.kind, notify, "cell value changed");

        if notify {
            self.notify_changed();
        }
        true
    }

    pub(crate) fn notify_changed(&self) {
        if let Some(changed) = &self.changed {
            changed(self as &dyn Property);
        }
    }

    fn watch_current(&self) {
        let Some(watcher) = self.watcher else {
            return;
        };

        let this = self.this.clone();
        let on_change: Arc<dyn Fn() + Send + Sync> = Arc::new(move || {
            if let Some(cell) = this.upgrade() {
                tracing::trace!(cell = %cell.name, "held value reported a change");
                cell.notify_changed();
            }
        });

        let subscription = watcher(&*self.value.read(), on_change);
        *self.subscription.lock() = subscription;
    }

    #[cfg(test)]
    pub(crate) fn is_watching(&self) -> bool {
        self.subscription.lock().is_some()
    }
}

impl<T: Send + Sync + 'static> Property for CellCore<T> {
    fn id(&self) -> CellId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_private(&self) -> bool {
        self.private
    }

    fn kind(&self) -> CellKind {
        self.kind
    }
}

impl<T> fmt::Debug for CellCore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("private", &self.private)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::{ChangeFeed, PropertyChange, PropertyChanges};
    use std::sync::atomic::{AtomicI32, Ordering};

    fn counting_callback() -> (Arc<AtomicI32>, ChangedCallback) {
        let count = Arc::new(AtomicI32::new(0));
        let c = count.clone();
        (count, Arc::new(move |_: &dyn Property| {
            c.fetch_add(1, Ordering::SeqCst);
        }))
    }

    fn core<T: PartialEq + Send + Sync + 'static>(
        initial: T,
        options: CellOptions<T>,
        changed: Option<ChangedCallback>,
    ) -> Arc<CellCore<T>> {
        CellCore::new(
            "Cell".into(),
            CellKind::Writable,
            initial,
            default_equality(),
            options,
            changed,
        )
        .unwrap()
    }

    #[test]
    fn seeding_does_not_notify() {
        let (count, changed) = counting_callback();
        let cell = core(7, CellOptions::new(), Some(changed));

        assert_eq!(cell.get(), 7);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn equal_update_is_a_no_op() {
        let (count, changed) = counting_callback();
        let cell = core(7, CellOptions::new(), Some(changed));

        assert!(!cell.update(7, true));
        assert_eq!(count.load(Ordering::SeqCst), 0);

        assert!(cell.update(8, true));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn suppressed_update_stores_without_notifying() {
        let (count, changed) = counting_callback();
        let cell = core(1, CellOptions::new(), Some(changed));

        assert!(cell.update(2, false));
        assert_eq!(cell.get(), 2);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn custom_equality_gates_updates() {
        let (count, changed) = counting_callback();
        let options = CellOptions::new().equality(|new: &i32, current: &i32| new / 10 == current / 10);
        let cell = core(11, options, Some(changed));

        cell.update(15, true);
        assert_eq!(cell.get(), 11);

        cell.update(21, true);
        assert_eq!(cell.get(), 21);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn invalid_names_are_rejected() {
        for name in ["", "   ", "\t\n"] {
            let result = CellCore::new(
                name.into(),
                CellKind::Writable,
                0,
                default_equality(),
                CellOptions::new(),
                None,
            );
            assert_eq!(
                result.err(),
                Some(RegistryError::InvalidName { name: name.into() })
            );
        }
    }

    struct Observed {
        changes: PropertyChanges,
    }

    impl PartialEq for Observed {
        fn eq(&self, other: &Self) -> bool {
            self.changes.feed().ptr_eq(other.changes.feed())
        }
    }

    impl ReportsChanges for Observed {
        fn object_changes(&self) -> Option<&ChangeFeed<PropertyChange>> {
            Some(self.changes.feed())
        }
    }

    #[test]
    fn observed_value_is_followed_and_released_on_replacement() {
        let (count, changed) = counting_callback();
        let first = Arc::new(Observed {
            changes: PropertyChanges::new(),
        });
        let cell = core(
            Some(first.clone()),
            CellOptions::new().observe_changes(),
            Some(changed),
        );

        assert!(cell.is_watching());
        first.changes.notify("Name");
        assert_eq!(count.load(Ordering::SeqCst), 1);

        cell.update(None, true);
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(!cell.is_watching());
        assert_eq!(first.changes.feed().listener_count(), 0);

        first.changes.notify("Name");
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn values_are_not_followed_without_opting_in() {
        let (count, changed) = counting_callback();
        let value = Arc::new(Observed {
            changes: PropertyChanges::new(),
        });
        let cell = core(Some(value.clone()), CellOptions::new(), Some(changed));

        value.changes.notify("Name");
        assert!(!cell.is_watching());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
