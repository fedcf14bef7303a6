//! Readonly Cell
//!
//! A readonly cell is a computed value: a provider function produces it and
//! the cell caches the result.
//!
//! # How Readonly Cells Work
//!
//! 1. On construction, the provider runs once to seed the cache. Seeding
//!    never notifies.
//!
//! 2. Reads return the cached value; they never run the provider.
//!
//! 3. `reevaluate()` runs the provider again and stores the result through
//!    the normal update path, notifying only if the value changed.
//!
//! Recomputation is pull-based: the registry calls `reevaluate()` when a
//! declared dependency changes. The provider is never called for any other
//! reason.

use std::fmt;
use std::sync::Arc;

use super::cell::{default_equality, validate_name, CellCore, CellOptions, ChangedCallback, Property};
use super::item::Reactive;
use crate::error::Result;
use crate::graph::{CellId, CellKind, ItemId};

type Provider<T> = Arc<dyn Fn() -> T + Send + Sync>;

/// A cell whose value is computed by a provider.
///
/// Clones share the same cell.
pub struct ReadonlyCell<T> {
    core: Arc<CellCore<T>>,
    provider: Provider<T>,
    item_id: ItemId,
}

impl<T> ReadonlyCell<T>
where
    T: PartialEq + Send + Sync + 'static,
{
    /// Create a standalone readonly cell.
    pub fn new<F>(name: impl Into<String>, provider: F) -> Result<Self>
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::create(name.into(), Arc::new(provider), CellOptions::default(), None)
    }

    /// Create a standalone readonly cell with options.
    pub fn with_options<F>(name: impl Into<String>, provider: F, options: CellOptions<T>) -> Result<Self>
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::create(name.into(), Arc::new(provider), options, None)
    }

    /// Create a standalone readonly cell that reports its changes to `on_changed`.
    pub fn with_changed_callback<F, C>(
        name: impl Into<String>,
        provider: F,
        options: CellOptions<T>,
        on_changed: C,
    ) -> Result<Self>
    where
        F: Fn() -> T + Send + Sync + 'static,
        C: Fn(&dyn Property) + Send + Sync + 'static,
    {
        let changed: ChangedCallback = Arc::new(on_changed);
        Self::create(name.into(), Arc::new(provider), options, Some(changed))
    }

    pub(crate) fn create(
        name: String,
        provider: Provider<T>,
        options: CellOptions<T>,
        changed: Option<ChangedCallback>,
    ) -> Result<Self> {
        validate_name(&name)?;

        let initial = provider();
        let core = CellCore::new(name, CellKind::Readonly, initial, default_equality(), options, changed)?;

        Ok(Self {
            core,
            provider,
            item_id: ItemId::new(),
        })
    }
}

impl<T: Send + Sync + 'static> ReadonlyCell<T> {
    /// Get the cached value.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.core.get()
    }

    /// Run `f` with a reference to the cached value.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.core.with(f)
    }

    /// Run the provider and store its result.
    pub fn reevaluate(&self) {
        let value = (self.provider)();
        self.core.update(value, true);
    }

    pub fn id(&self) -> CellId {
        self.core.id()
    }

    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    pub fn name(&self) -> &str {
        self.core.name()
    }

    pub fn is_private(&self) -> bool {
        self.core.is_private()
    }
}

impl<T: Send + Sync + 'static> Reactive for ReadonlyCell<T> {
    fn item_id(&self) -> ItemId {
        self.item_id
    }

    fn reevaluate(&self) {
        ReadonlyCell::reevaluate(self);
    }
}

impl<T: Send + Sync + 'static> Property for ReadonlyCell<T> {
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
        CellKind::Readonly
    }
}

impl<T> Clone for ReadonlyCell<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            provider: Arc::clone(&self.provider),
            item_id: self.item_id,
        }
    }
}

impl<T> fmt::Debug for ReadonlyCell<T>
where
    T: fmt::Debug + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.core.with(|value| {
            f.debug_struct("ReadonlyCell")
                .field("id", &self.core.id())
                .field("item_id", &self.item_id)
                .field("name", &self.core.name())
                .field("value", value)
                .finish()
        })
    }
}

impl<T> fmt::Display for ReadonlyCell<T>
where
    T: fmt::Display + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.core.with(|value| value.fmt(f))
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
