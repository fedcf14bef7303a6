//! Self-reported changes.
//!
//! A value placed into a cell may report its own internal changes, either
//! at object level (one of its properties changed) or at membership level
//! (items were added to or removed from it). A cell configured with
//! `observe_changes` subscribes to whichever feed the value exposes, so that
//! mutating the held value drives the cell's change path without replacing
//! the value.

use std::sync::Arc;

use super::feed::{ChangeFeed, Subscription};

/// Object-level change: a named property of the value changed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyChange {
    pub property: String,
}

/// Membership-level change of an ordered container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionChange {
    /// `count` items were inserted starting at `index`.
    Added { index: usize, count: usize },

    /// `count` items were removed starting at `index`.
    Removed { index: usize, count: usize },

    /// The item at `index` was replaced.
    Replaced { index: usize },

    /// The item at `from` was moved to `to`.
    Moved { from: usize, to: usize },

    /// The contents changed in a way not described by the other variants.
    Reset,
}

/// Capability of a value to report its own internal changes.
///
/// Both methods default to `None`. When a value exposes both, cells only
/// follow the membership feed.
pub trait ReportsChanges {
    /// Feed of membership changes, for containers.
    fn membership_changes(&self) -> Option<&ChangeFeed<CollectionChange>> {
        None
    }

    /// Feed of object-level property changes.
    fn object_changes(&self) -> Option<&ChangeFeed<PropertyChange>> {
        None
    }
}

impl<T: ReportsChanges> ReportsChanges for Option<T> {
    fn membership_changes(&self) -> Option<&ChangeFeed<CollectionChange>> {
        self.as_ref().and_then(ReportsChanges::membership_changes)
    }

    fn object_changes(&self) -> Option<&ChangeFeed<PropertyChange>> {
        self.as_ref().and_then(ReportsChanges::object_changes)
    }
}

impl<T: ReportsChanges + ?Sized> ReportsChanges for Arc<T> {
    fn membership_changes(&self) -> Option<&ChangeFeed<CollectionChange>> {
        (**self).membership_changes()
    }

    fn object_changes(&self) -> Option<&ChangeFeed<PropertyChange>> {
        (**self).object_changes()
    }
}

/// Subscribe `on_change` to the feed `value` exposes, if any.
pub(crate) fn watch<T: ReportsChanges>(
    value: &T,
    on_change: Arc<dyn Fn() + Send + Sync>,
) -> Option<Subscription> {
    if let Some(feed) = value.membership_changes() {
        return Some(feed.subscribe(move |_| on_change()));
    }
    value
        .object_changes()
        .map(|feed| feed.subscribe(move |_| on_change()))
}

/// An owned object-level feed for types that want to report their changes.
///
/// ```rust
/// use trellis_core::observe::{ChangeFeed, PropertyChange, PropertyChanges, ReportsChanges};
///
/// struct Person {
///     changes: PropertyChanges,
/// }
///
/// impl ReportsChanges for Person {
///     fn object_changes(&self) -> Option<&ChangeFeed<PropertyChange>> {
///         Some(self.changes.feed())
///     }
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct PropertyChanges {
    feed: ChangeFeed<PropertyChange>,
}

impl PropertyChanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tell listeners that `property` changed.
    pub fn notify(&self, property: impl Into<String>) {
        self.feed.emit(&PropertyChange {
            property: property.into(),
        });
    }

    pub fn feed(&self) -> &ChangeFeed<PropertyChange> {
        &self.feed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    struct Both {
        membership: ChangeFeed<CollectionChange>,
        object: PropertyChanges,
    }

    impl ReportsChanges for Both {
        fn membership_changes(&self) -> Option<&ChangeFeed<CollectionChange>> {
            Some(&self.membership)
        }

        fn object_changes(&self) -> Option<&ChangeFeed<PropertyChange>> {
            Some(self.object.feed())
        }
    }

    struct Silent;

    impl ReportsChanges for Silent {}

    fn counter() -> (Arc<AtomicI32>, Arc<dyn Fn() + Send + Sync>) {
        let count = Arc::new(AtomicI32::new(0));
        let c = count.clone();
        (count, Arc::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }))
    }

    #[test]
    fn membership_feed_wins_over_object_feed() {
        let value = Both {
            membership: ChangeFeed::new(),
            object: PropertyChanges::new(),
        };
        let (count, on_change) = counter();

        let _subscription = watch(&value, on_change);

        value.object.notify("Name");
        assert_eq!(count.load(Ordering::SeqCst), 0);

        value.membership.emit(&CollectionChange::Reset);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn silent_and_absent_values_are_not_watched() {
        let (_, on_change) = counter();
        assert!(watch(&Silent, on_change.clone()).is_none());
        assert!(watch(&None::<Arc<Silent>>, on_change).is_none());
    }

    #[test]
    fn option_and_arc_forward_the_capability() {
        let value = Some(Arc::new(Both {
            membership: ChangeFeed::new(),
            object: PropertyChanges::new(),
        }));
        let (count, on_change) = counter();

        let subscription = watch(&value, on_change);
        assert!(subscription.is_some());

        if let Some(inner) = &value {
            inner.membership.emit(&CollectionChange::Reset);
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
