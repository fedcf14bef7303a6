//! Collection Cell
//!
//! A collection cell owns an `ObservableVec`. The cell's value never changes
//! identity; instead, every structural mutation of the container runs the
//! cell's change path as if the value had been replaced.
//!
//! # Example
//!
//! ```rust
//! use trellis_core::reactive::CollectionCell;
//!
//! let todos = CollectionCell::new("Todos", ["write", "test"]).unwrap();
//! todos.items().push("ship");
//! assert_eq!(todos.len(), 3);
//! ```

use std::fmt;
use std::sync::Arc;

use super::cell::{CellCore, CellOptions, ChangedCallback, Equality, Property};
use crate::error::Result;
use crate::graph::{CellId, CellKind};
use crate::observe::ObservableVec;

/// A cell holding an observable ordered container.
///
/// Clones share the same cell.
pub struct CollectionCell<T> {
    core: Arc<CellCore<ObservableVec<T>>>,
}

impl<T: Send + Sync + 'static> CollectionCell<T> {
    /// Create a standalone collection cell seeded with `initial`.
    pub fn new<I>(name: impl Into<String>, initial: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
    {
        Self::create(name.into(), initial.into_iter().collect(), CellOptions::default(), None)
    }

    /// Create a standalone collection cell with options.
    pub fn with_options<I>(
        name: impl Into<String>,
        initial: I,
        options: CellOptions<ObservableVec<T>>,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
    {
        Self::create(name.into(), initial.into_iter().collect(), options, None)
    }

    /// Create a standalone collection cell that reports its changes to `on_changed`.
    pub fn with_changed_callback<I, C>(
        name: impl Into<String>,
        initial: I,
        options: CellOptions<ObservableVec<T>>,
        on_changed: C,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        C: Fn(&dyn Property) + Send + Sync + 'static,
    {
        let changed: ChangedCallback = Arc::new(on_changed);
        Self::create(name.into(), initial.into_iter().collect(), options, Some(changed))
    }

    pub(crate) fn create(
        name: String,
        initial: ObservableVec<T>,
        options: CellOptions<ObservableVec<T>>,
        changed: Option<ChangedCallback>,
    ) -> Result<Self> {
        // Container mutations are always followed
        let options = options.observe_changes();
        let same_handle: Equality<ObservableVec<T>> =
            Arc::new(|new: &ObservableVec<T>, current: &ObservableVec<T>| new.ptr_eq(current));

        let core = CellCore::new(name, CellKind::Collection, initial, same_handle, options, changed)?;
        Ok(Self { core })
    }

    /// Handle to the held container.
    ///
    /// Mutating the container through this handle notifies the cell.
    pub fn items(&self) -> ObservableVec<T> {
        self.core.get()
    }

    pub fn len(&self) -> usize {
        self.core.with(ObservableVec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.core.with(ObservableVec::is_empty)
    }

    pub fn id(&self) -> CellId {
        self.core.id()
    }

    pub fn name(&self) -> &str {
        self.core.name()
    }

    pub fn is_private(&self) -> bool {
        self.core.is_private()
    }
}

impl<T: Send + Sync + 'static> Property for CollectionCell<T> {
    fn id(&self) -> CellId {
        self.core.id()
    }

    fn name(&self) -> &str {
        self.core.name()
    }

    fn is_private(&self) -> bool {
        self.core.is_private()
    }

    fn kind(&self) -> CellKind {
        CellKind::Collection
    }
}

impl<T> Clone for CollectionCell<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T> fmt::Debug for CollectionCell<T>
where
    T: fmt::Debug + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.core.with(|items| {
            f.debug_struct("CollectionCell")
                .field("id", &self.core.id())
                .field("name", &self.core.name())
                .field("items", items)
                .finish()
        })
    }
}

impl<T> fmt::Display for CollectionCell<T>
where
    T: fmt::Debug + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.core.with(|items| write!(f, "{items:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    fn counted(name: &str, initial: Vec<i32>) -> (Arc<AtomicI32>, CollectionCell<i32>) {
        let count = Arc::new(AtomicI32::new(0));
        let c = count.clone();
        let cell = CollectionCell::with_changed_callback(name, initial, CellOptions::new(), move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        (count, cell)
    }

    #[test]
    fn seeding_does_not_notify() {
        let (count, cell) = counted("Numbers", vec![1, 2, 3]);

        assert_eq!(cell.items().to_vec(), vec![1, 2, 3]);
        assert_eq!(cell.kind(), CellKind::Collection);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn container_mutation_notifies() {
        let (count, cell) = counted("Numbers", vec![]);

        cell.items().push(1);
        cell.items().push(2);
        assert_eq!(count.load(Ordering::SeqCst), 2);

        cell.items().remove(0);
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert_eq!(cell.len(), 1);
    }

    #[test]
    fn silent_mutation_does_not_notify() {
        let (count, cell) = counted("Numbers", vec![]);

        cell.items().clear();
        assert!(cell.items().pop().is_none());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn handles_alias_the_same_container() {
        let cell = CollectionCell::new("Names", ["a".to_string()]).unwrap();
        let first = cell.items();
        let second = cell.clone().items();

        first.push("b".into());
        assert!(first.ptr_eq(&second));
        assert_eq!(second.len(), 2);
        assert_eq!(cell.to_string(), r#"["a", "b"]"#);
    }

    #[test]
    fn blank_name_is_rejected() {
        assert!(CollectionCell::<i32>::new(" ", Vec::new()).is_err());
    }
}
