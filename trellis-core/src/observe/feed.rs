//! Change Feeds
//!
//! A `ChangeFeed` is a shared list of listeners that can be told about an
//! event. Feeds are how values report their own internal changes, and how
//! commands expose their executability-changed event.
//!
//! # Locking
//!
//! Listeners are never called with the feed lock held. `emit` snapshots the
//! listener list first, so a listener may subscribe, unsubscribe or emit on
//! the same feed without deadlocking.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use smallvec::SmallVec;

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;
type OccupancyHook = Arc<dyn Fn(bool) + Send + Sync>;

struct FeedState<E> {
    next_key: u64,
    listeners: Vec<(u64, Listener<E>)>,
}

struct FeedShared<E> {
    state: Mutex<FeedState<E>>,

    /// Called with `true` when the first listener attaches and with `false`
    /// when the last one detaches.
    occupancy: Option<OccupancyHook>,
}

impl<E> FeedShared<E> {
    fn remove(&self, key: u64) {
        let now_empty = {
            let mut state = self.state.lock();
            let Some(position) = state.listeners.iter().position(|(k, _)| *k == key) else {
                return;
            };
            state.listeners.remove(position);
            state.listeners.is_empty()
        };

        if now_empty {
            if let Some(hook) = &self.occupancy {
                hook(false);
            }
        }
    }
}

/// A shared, cloneable list of listeners for events of type `E`.
///
/// Clones share the same listeners.
pub struct ChangeFeed<E> {
    shared: Arc<FeedShared<E>>,
}

impl<E: 'static> ChangeFeed<E> {
    /// Create a feed with no listeners.
    pub fn new() -> Self {
        Self::from_hook(None)
    }

    /// Create a feed that reports when it gains its first listener and when
    /// it loses its last one.
    ///
    /// The hook runs before the first listener is added and after the last
    /// one is removed.
    pub fn with_occupancy_hook<F>(hook: F) -> Self
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        Self::from_hook(Some(Arc::new(hook)))
    }

    fn from_hook(occupancy: Option<OccupancyHook>) -> Self {
        Self {
            shared: Arc::new(FeedShared {
                state: Mutex::new(FeedState {
                    next_key: 0,
                    listeners: Vec::new(),
                }),
                occupancy,
            }),
        }
    }

    /// Attach a listener.
    ///
    /// The listener stays attached until the returned subscription is
    /// dropped or cancelled.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        if self.shared.occupancy.is_some() && self.listener_count() == 0 {
            if let Some(hook) = &self.shared.occupancy {
                hook(true);
            }
        }

        let key = {
            let mut state = self.shared.state.lock();
            let key = state.next_key;
            state.next_key += 1;
            state.listeners.push((key, Arc::new(listener)));
            key
        };

        let shared: Weak<FeedShared<E>> = Arc::downgrade(&self.shared);
        Subscription::new(move || {
            if let Some(shared) = shared.upgrade() {
                shared.remove(key);
            }
        })
    }

    /// Call every listener with `event`, in subscription order.
    pub fn emit(&self, event: &E) {
        let snapshot: SmallVec<[Listener<E>; 4]> = self
            .shared
            .state
            .lock()
            .listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in snapshot {
            listener(event);
        }
    }

    /// Get the number of attached listeners.
    pub fn listener_count(&self) -> usize {
        self.shared.state.lock().listeners.len()
    }

    /// Whether two handles refer to the same feed.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl<E: 'static> Default for ChangeFeed<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for ChangeFeed<E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<E> fmt::Debug for ChangeFeed<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeFeed")
            .field("listener_count", &self.shared.state.lock().listeners.len())
            .field("has_occupancy_hook", &self.shared.occupancy.is_some())
            .finish()
    }
}

/// Handle for an attached listener.
///
/// Dropping the handle detaches the listener.
#[must_use = "dropping a Subscription detaches its listener immediately"]
pub struct Subscription {
    detach: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub(crate) fn new<F>(detach: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            detach: Some(Box::new(detach)),
        }
    }

    /// A subscription that is attached to nothing.
    pub fn inert() -> Self {
        Self { detach: None }
    }

    /// Whether dropping this handle would detach a listener.
    pub fn is_active(&self) -> bool {
        self.detach.is_some()
    }

    /// Detach the listener now.
    pub fn cancel(self) {
        drop(self);
    }

    /// Keep the listener attached for as long as the feed lives.
    pub fn forget(mut self) {
        self.detach = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn emit_reaches_every_listener() {
        let feed = ChangeFeed::<i32>::new();
        let total = Arc::new(AtomicI32::new(0));

        let t1 = total.clone();
        let _s1 = feed.subscribe(move |v| {
            t1.fetch_add(*v, Ordering::SeqCst);
        });
        let t2 = total.clone();
        let _s2 = feed.subscribe(move |v| {
            t2.fetch_add(*v * 10, Ordering::SeqCst);
        });

        feed.emit(&2);
        assert_eq!(total.load(Ordering::SeqCst), 22);
        assert_eq!(feed.listener_count(), 2);
    }

    #[test]
    fn dropping_subscription_detaches() {
        let feed = ChangeFeed::<()>::new();
        let calls = Arc::new(AtomicI32::new(0));

        let c = calls.clone();
        let subscription = feed.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        feed.emit(&());
        drop(subscription);
        feed.emit(&());

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(feed.listener_count(), 0);
    }

    #[test]
    fn forgotten_subscription_stays_attached() {
        let feed = ChangeFeed::<()>::new();
        let calls = Arc::new(AtomicI32::new(0));

        let c = calls.clone();
        feed.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        })
        .forget();

        feed.emit(&());
        feed.emit(&());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn occupancy_hook_fires_on_first_and_last_listener() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let e = events.clone();
        let feed = ChangeFeed::<()>::with_occupancy_hook(move |attached| e.lock().push(attached));

        let first = feed.subscribe(|_| {});
        let second = feed.subscribe(|_| {});
        assert_eq!(*events.lock(), vec![true]);

        drop(first);
        assert_eq!(*events.lock(), vec![true]);

        drop(second);
        assert_eq!(*events.lock(), vec![true, false]);

        let _third = feed.subscribe(|_| {});
        assert_eq!(*events.lock(), vec![true, false, true]);
    }

    #[test]
    fn listener_may_unsubscribe_during_emit() {
        let feed = ChangeFeed::<()>::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let s = slot.clone();
        let subscription = feed.subscribe(move |_| {
            s.lock().take();
        });
        *slot.lock() = Some(subscription);

        feed.emit(&());
        assert_eq!(feed.listener_count(), 0);
    }

    #[test]
    fn subscription_outliving_feed_is_harmless() {
        let feed = ChangeFeed::<()>::new();
        let subscription = feed.subscribe(|_| {});
        drop(feed);
        drop(subscription);
    }

    #[test]
    fn inert_subscription_is_inactive() {
        let subscription = Subscription::inert();
        assert!(!subscription.is_active());
        subscription.cancel();
    }
}
