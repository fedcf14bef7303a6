//! Observable ordered container.
//!
//! `ObservableVec` is a shared `Vec` that emits a `CollectionChange` after
//! every structural mutation. Handles are cheap to clone and all clones see
//! the same storage and the same feed, which is what lets a collection cell
//! react to mutation while its own value never changes identity.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::change::{CollectionChange, ReportsChanges};
use super::feed::ChangeFeed;

struct VecShared<T> {
    items: RwLock<Vec<T>>,
    feed: ChangeFeed<CollectionChange>,
}

/// A shared vector reporting membership changes.
///
/// Events are emitted after the storage lock is released, so listeners may
/// read the container. Mutations that change nothing emit nothing.
pub struct ObservableVec<T> {
    shared: Arc<VecShared<T>>,
}

impl<T: Send + Sync + 'static> ObservableVec<T> {
    /// Create an empty container.
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    /// Wrap an existing vector.
    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            shared: Arc::new(VecShared {
                items: RwLock::new(items),
                feed: ChangeFeed::new(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.shared.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.items.read().is_empty()
    }

    /// Run `f` with a view of the current items.
    ///
    /// `f` must not mutate this container.
    pub fn with<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(self.shared.items.read().as_slice())
    }

    /// Clone the item at `index`.
    pub fn get(&self, index: usize) -> Option<T>
    where
        T: Clone,
    {
        self.shared.items.read().get(index).cloned()
    }

    /// Clone all items.
    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.shared.items.read().clone()
    }

    pub fn contains(&self, item: &T) -> bool
    where
        T: PartialEq,
    {
        self.shared.items.read().contains(item)
    }

    /// Append an item.
    pub fn push(&self, item: T) {
        let index = {
            let mut items = self.shared.items.write();
            items.push(item);
            items.len() - 1
        };
        self.emit(CollectionChange::Added { index, count: 1 });
    }

    /// Insert an item at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`, like `Vec::insert`.
    pub fn insert(&self, index: usize, item: T) {
        self.shared.items.write().insert(index, item);
        self.emit(CollectionChange::Added { index, count: 1 });
    }

    /// Append every item of `iter` and emit a single event.
    pub fn extend<I: IntoIterator<Item = T>>(&self, iter: I) {
        let incoming: Vec<T> = iter.into_iter().collect();
        if incoming.is_empty() {
            return;
        }
        let count = incoming.len();
        let index = {
            let mut items = self.shared.items.write();
            let index = items.len();
            items.extend(incoming);
            index
        };
        self.emit(CollectionChange::Added { index, count });
    }

    /// Remove and return the last item.
    pub fn pop(&self) -> Option<T> {
        let (popped, index) = {
            let mut items = self.shared.items.write();
            let popped = items.pop();
            (popped, items.len())
        };
        if popped.is_some() {
            self.emit(CollectionChange::Removed { index, count: 1 });
        }
        popped
    }

    /// Remove and return the item at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds, like `Vec::remove`.
    pub fn remove(&self, index: usize) -> T {
        let removed = self.shared.items.write().remove(index);
        self.emit(CollectionChange::Removed { index, count: 1 });
        removed
    }

    /// Remove the first item equal to `item`. Returns whether one was found.
    pub fn remove_item(&self, item: &T) -> bool
    where
        T: PartialEq,
    {
        let removed = {
            let mut items = self.shared.items.write();
            let position = items.iter().position(|candidate| candidate == item);
            if let Some(index) = position {
                items.remove(index);
            }
            position
        };
        match removed {
            Some(index) => {
                self.emit(CollectionChange::Removed { index, count: 1 });
                true
            }
            None => false,
        }
    }

    /// Replace the item at `index`, returning the old one.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn set(&self, index: usize, item: T) -> T {
        let old = std::mem::replace(&mut self.shared.items.write()[index], item);
        self.emit(CollectionChange::Replaced { index });
        old
    }

    /// Move the item at `from` to position `to`.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of bounds.
    pub fn move_item(&self, from: usize, to: usize) {
        if from == to {
            return;
        }
        {
            let mut items = self.shared.items.write();
            let item = items.remove(from);
            items.insert(to, item);
        }
        self.emit(CollectionChange::Moved { from, to });
    }

    /// Keep only the items matching `keep`.
    pub fn retain(&self, keep: impl FnMut(&T) -> bool) {
        let changed = {
            let mut items = self.shared.items.write();
            let before = items.len();
            items.retain(keep);
            items.len() != before
        };
        if changed {
            self.emit(CollectionChange::Reset);
        }
    }

    /// Remove all items.
    pub fn clear(&self) {
        let drained = std::mem::take(&mut *self.shared.items.write());
        if !drained.is_empty() {
            self.emit(CollectionChange::Reset);
        }
    }

    /// Whether two handles refer to the same container.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// The membership feed of this container.
    pub fn feed(&self) -> &ChangeFeed<CollectionChange> {
        &self.shared.feed
    }

    fn emit(&self, change: CollectionChange) {
        self.shared.feed.emit(&change);
    }
}

impl<T> Clone for ObservableVec<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + Sync + 'static> Default for ObservableVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync + 'static> FromIterator<T> for ObservableVec<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<T: Send + Sync + 'static> ReportsChanges for ObservableVec<T> {
    fn membership_changes(&self) -> Option<&ChangeFeed<CollectionChange>> {
        Some(&self.shared.feed)
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservableVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.shared.items.read().iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn recorded(vec: &ObservableVec<i32>) -> Arc<Mutex<Vec<CollectionChange>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let l = log.clone();
        vec.feed().subscribe(move |change| l.lock().push(*change)).forget();
        log
    }

    #[test]
    fn mutations_emit_membership_changes() {
        let vec = ObservableVec::from_vec(vec![1, 2, 3]);
        let log = recorded(&vec);

        vec.push(4);
        vec.insert(0, 0);
        assert_eq!(vec.remove(1), 1);
        assert_eq!(vec.set(0, 10), 0);
        vec.move_item(0, 2);

        assert_eq!(vec.to_vec(), vec![2, 3, 10, 4]);
        assert_eq!(
            *log.lock(),
            vec![
                CollectionChange::Added { index: 3, count: 1 },
                CollectionChange::Added { index: 0, count: 1 },
                CollectionChange::Removed { index: 1, count: 1 },
                CollectionChange::Replaced { index: 0 },
                CollectionChange::Moved { from: 0, to: 2 },
            ]
        );
    }

    #[test]
    fn no_op_mutations_are_silent() {
        let vec = ObservableVec::<i32>::new();
        let log = recorded(&vec);

        vec.clear();
        vec.extend(Vec::new());
        assert_eq!(vec.pop(), None);
        vec.retain(|_| true);
        assert!(!vec.remove_item(&7));

        assert!(log.lock().is_empty());
    }

    #[test]
    fn extend_emits_one_event() {
        let vec = ObservableVec::from_vec(vec![1]);
        let log = recorded(&vec);

        vec.extend([2, 3, 4]);

        assert_eq!(vec.len(), 4);
        assert_eq!(*log.lock(), vec![CollectionChange::Added { index: 1, count: 3 }]);
    }

    #[test]
    fn retain_and_clear_reset() {
        let vec: ObservableVec<i32> = (1..=6).collect();
        let log = recorded(&vec);

        vec.retain(|v| v % 2 == 0);
        assert_eq!(vec.to_vec(), vec![2, 4, 6]);

        vec.clear();
        assert!(vec.is_empty());
        assert_eq!(*log.lock(), vec![CollectionChange::Reset, CollectionChange::Reset]);
    }

    #[test]
    fn clones_share_storage_and_feed() {
        let first = ObservableVec::<i32>::new();
        let second = first.clone();
        let log = recorded(&first);

        second.push(5);

        assert!(first.ptr_eq(&second));
        assert!(!first.ptr_eq(&ObservableVec::new()));
        assert_eq!(first.get(0), Some(5));
        assert_eq!(log.lock().len(), 1);
    }

    #[test]
    fn listeners_can_read_during_emit() {
        let vec = ObservableVec::<i32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let reader = vec.clone();
        let s = seen.clone();
        vec.feed()
            .subscribe(move |_| s.lock().push(reader.len()))
            .forget();

        vec.push(1);
        vec.push(2);
        assert_eq!(*seen.lock(), vec![1, 2]);
    }
}
