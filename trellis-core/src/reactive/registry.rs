//! Registry
//!
//! The registry is the context that owns cells and reactive items, wires
//! their dependencies and dispatches changes.
//!
//! # How Dispatch Works
//!
//! Every cell created through a registry reports its changes to the
//! registry. When a cell changes outside of a batch:
//!
//! 1. If the cell is not private, it is reported to the change sink.
//! 2. Every item registered as a dependent of the cell is reevaluated, in
//!    registration order.
//!
//! Reevaluating a readonly cell may change it, which dispatches again. A
//! chain of readonly cells therefore cascades one hop at a time. An item
//! only reevaluates for the cells it declared as dependencies.
//!
//! # Batches
//!
//! Inside [`Registry::batch_update`], dispatch only records which writable
//! cells changed. The batch commits when it ends; see the `batch` module.
//!
//! # Locking
//!
//! Registry state sits behind one mutex that is never held while a cell,
//! item or sink callback runs. Dependents are snapshotted before dispatch,
//! so callbacks may freely read cells, create new ones, or query the
//! registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use indexmap::IndexSet;
use parking_lot::Mutex;
use smallvec::SmallVec;

use super::action::Action;
use super::batch::BatchGuard;
use super::cell::{validate_name, CellOptions, ChangedCallback, Property};
use super::collection::CollectionCell;
use super::command::{Command, ParamCommand, RequeryHandler, RequeryHook};
use super::item::Reactive;
use super::readonly::ReadonlyCell;
use super::writable::WritableCell;
use crate::error::{RegistryError, Result};
use crate::graph::{CellId, DependencyGraph, ItemId, RegistryId};
use crate::observe::ObservableVec;

/// External change sink, called with every non-private cell that changed.
pub type ChangeSink = Arc<dyn Fn(&dyn Property) + Send + Sync>;

type Snapshot = SmallVec<[Arc<dyn Reactive>; 8]>;

struct RegistryState {
    graph: DependencyGraph,
    cells: HashMap<CellId, Arc<dyn Property>>,
    items: HashMap<ItemId, Arc<dyn Reactive>>,
    in_batch: bool,

    /// Writable cells changed during the current batch, in first-changed order.
    batch_dirty: IndexSet<CellId>,
}

impl RegistryState {
    fn check_name(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        if self.graph.contains_name(name) {
            return Err(RegistryError::NameConflict {
                name: name.to_owned(),
            });
        }
        Ok(())
    }

    fn check_dependencies(&self, dependencies: &[&dyn Property]) -> Result<Vec<CellId>> {
        dependencies
            .iter()
            .map(|dependency| {
                if self.graph.contains_cell(dependency.id()) {
                    Ok(dependency.id())
                } else {
                    Err(RegistryError::ForeignDependency {
                        name: dependency.name().to_owned(),
                    })
                }
            })
            .collect()
    }

    fn insert_cell(&mut self, cell: Arc<dyn Property>) -> Result<()> {
        if !self.graph.add_cell(cell.id(), cell.name()) {
            return Err(RegistryError::NameConflict {
                name: cell.name().to_owned(),
            });
        }
        self.cells.insert(cell.id(), cell);
        Ok(())
    }

    fn insert_item(&mut self, item: Arc<dyn Reactive>, dependencies: &[CellId]) {
        let item_id = item.item_id();
        self.graph.add_item(item_id);
        for dependency in dependencies {
            let added = self.graph.add_edge(*dependency, item_id);
            debug_assert!(added, "dependency was validated against this registry");
        }
        self.items.insert(item_id, item);
    }

    fn resolve_items(&self, ids: impl IntoIterator<Item = ItemId>) -> Snapshot {
        ids.into_iter()
            .filter_map(|id| self.items.get(&id).cloned())
            .collect()
    }
}

/// State shared by every handle of one registry.
pub(crate) struct RegistryShared {
    id: RegistryId,
    sink: Option<ChangeSink>,
    requery_hook: Option<RequeryHook>,
    state: Mutex<RegistryState>,
}

impl RegistryShared {
    pub(crate) fn id(&self) -> RegistryId {
        self.id
    }

    /// Entry point for every cell owned by this registry.
    fn on_cell_changed(&self, cell: &dyn Property) {
        let dependents = {
            let mut state = self.state.lock();
            if state.in_batch {
                if cell.kind().is_batch_tracked() {
                    state.batch_dirty.insert(cell.id());
                }
                return;
            }
            state.resolve_items(state.graph.dependents_of(cell.id()))
        };

        tracing::trace!(
            registry = ?self.id,
            cell = cell.name(),
            dependents = dependents.len(),
            "dispatching change"
        );

        self.notify(cell);
        for item in dependents {
            item.reevaluate();
        }
    }

    fn notify(&self, cell: &dyn Property) {
        if cell.is_private() {
            return;
        }
        if let Some(sink) = &self.sink {
            sink(cell);
        }
    }

    /// Leave batch mode and commit what the batch recorded.
    pub(crate) fn commit_batch(&self) {
        let dirty = {
            let mut state = self.state.lock();
            state.in_batch = false;
            std::mem::take(&mut state.batch_dirty)
        };

        tracing::debug!(registry = ?self.id, dirty = dirty.len(), "committing batch");

        let mut combined: IndexSet<ItemId> = IndexSet::new();
        for cell_id in dirty {
            let cell = {
                let state = self.state.lock();
                state.graph.collect_dependents(cell_id, &mut combined);
                state.cells.get(&cell_id).cloned()
            };
            if let Some(cell) = cell {
                self.notify(cell.as_ref());
            }
        }

        let dependents = self.state.lock().resolve_items(combined);
        for item in dependents {
            item.reevaluate();
        }
    }
}

/// Builder for a [`Registry`].
#[derive(Default)]
pub struct RegistryBuilder {
    sink: Option<ChangeSink>,
    requery_hook: Option<RequeryHook>,
}

impl RegistryBuilder {
    /// Set the sink that receives every non-private cell that changed.
    pub fn on_property_changed<F>(mut self, sink: F) -> Self
    where
        F: Fn(&dyn Property) + Send + Sync + 'static,
    {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Set the requery hook handed to every command of the registry.
    pub fn requery_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(bool, RequeryHandler) + Send + Sync + 'static,
    {
        self.requery_hook = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> Registry {
        let id = RegistryId::new();
        tracing::debug!(registry = ?id, "registry created");

        Registry {
            shared: Arc::new(RegistryShared {
                id,
                sink: self.sink,
                requery_hook: self.requery_hook,
                state: Mutex::new(RegistryState {
                    graph: DependencyGraph::new(),
                    cells: HashMap::new(),
                    items: HashMap::new(),
                    in_batch: false,
                    batch_dirty: IndexSet::new(),
                }),
            }),
        }
    }
}

impl fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field("sink", &self.sink.is_some())
            .field("requery_hook", &self.requery_hook.is_some())
            .finish()
    }
}

/// Owner of a graph of cells and reactive items.
///
/// Handles are cheap to clone and share one registry.
///
/// # Lifetime
///
/// Cells only hold a weak reference back to their registry. Keep a
/// `Registry` handle alive for as long as its cells are in use: once the
/// last handle is dropped the cells keep their values, but setting them no
/// longer reaches the change sink or reevaluates dependents.
///
/// # Example
///
/// ```rust
/// use trellis_core::Registry;
///
/// let registry = Registry::new();
/// let a = registry.create_writable("A", 1).unwrap();
/// let b = registry.create_writable("B", 2).unwrap();
///
/// let (x, y) = (a.clone(), b.clone());
/// let sum = registry
///     .create_readonly("Sum", move || x.get() + y.get(), &[&a, &b])
///     .unwrap();
///
/// a.set(10);
/// assert_eq!(sum.get(), 12);
/// ```
#[derive(Clone)]
pub struct Registry {
    shared: Arc<RegistryShared>,
}

impl Registry {
    /// Create a registry without a change sink or requery hook.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn id(&self) -> RegistryId {
        self.shared.id
    }

    fn dispatcher(&self) -> ChangedCallback {
        let shared: Weak<RegistryShared> = Arc::downgrade(&self.shared);
        Arc::new(move |cell: &dyn Property| {
            if let Some(shared) = shared.upgrade() {
                shared.on_cell_changed(cell);
            }
        })
    }

    // ------------------------------------------------------------------------
    // Cells
    // ------------------------------------------------------------------------

    /// Create a writable cell.
    pub fn create_writable<T>(&self, name: impl Into<String>, initial: T) -> Result<WritableCell<T>>
    where
        T: PartialEq + Send + Sync + 'static,
    {
        self.create_writable_with(name, initial, CellOptions::default())
    }

    /// Create a writable cell with options.
    pub fn create_writable_with<T>(
        &self,
        name: impl Into<String>,
        initial: T,
        options: CellOptions<T>,
    ) -> Result<WritableCell<T>>
    where
        T: PartialEq + Send + Sync + 'static,
    {
        let name = name.into();
        self.shared.state.lock().check_name(&name)?;

        let cell = WritableCell::create(name, initial, options, Some(self.dispatcher()))?;
        self.shared.state.lock().insert_cell(Arc::new(cell.clone()))?;

        tracing::debug!(registry = ?self.shared.id, cell = cell.name(), kind = "writable", "registered cell");
        Ok(cell)
    }

    /// Create a readonly cell computed by `provider`.
    ///
    /// The provider runs once now, and again whenever a cell in
    /// `dependencies` changes.
    pub fn create_readonly<T, F>(
        &self,
        name: impl Into<String>,
        provider: F,
        dependencies: &[&dyn Property],
    ) -> Result<ReadonlyCell<T>>
    where
        T: PartialEq + Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.create_readonly_with(name, provider, dependencies, CellOptions::default())
    }

    /// Create a readonly cell with options.
    pub fn create_readonly_with<T, F>(
        &self,
        name: impl Into<String>,
        provider: F,
        dependencies: &[&dyn Property],
        options: CellOptions<T>,
    ) -> Result<ReadonlyCell<T>>
    where
        T: PartialEq + Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let name = name.into();
        let dependencies = {
            let state = self.shared.state.lock();
            state.check_name(&name)?;
            state.check_dependencies(dependencies)?
        };

        let cell = ReadonlyCell::create(name, Arc::new(provider), options, Some(self.dispatcher()))?;
        {
            let mut state = self.shared.state.lock();
            state.insert_cell(Arc::new(cell.clone()))?;
            state.insert_item(Arc::new(cell.clone()), &dependencies);
        }

        tracing::debug!(
            registry = ?self.shared.id,
            cell = cell.name(),
            kind = "readonly",
            dependencies = dependencies.len(),
            "registered cell"
        );
        Ok(cell)
    }

    /// Create a collection cell seeded with `initial`.
    pub fn create_collection<T, I>(&self, name: impl Into<String>, initial: I) -> Result<CollectionCell<T>>
    where
        T: Send + Sync + 'static,
        I: IntoIterator<Item = T>,
    {
        self.create_collection_with(name, initial, CellOptions::default())
    }

    /// Create a collection cell with options.
    pub fn create_collection_with<T, I>(
        &self,
        name: impl Into<String>,
        initial: I,
        options: CellOptions<ObservableVec<T>>,
    ) -> Result<CollectionCell<T>>
    where
        T: Send + Sync + 'static,
        I: IntoIterator<Item = T>,
    {
        let name = name.into();
        self.shared.state.lock().check_name(&name)?;

        let cell = CollectionCell::create(name, initial.into_iter().collect(), options, Some(self.dispatcher()))?;
        self.shared.state.lock().insert_cell(Arc::new(cell.clone()))?;

        tracing::debug!(registry = ?self.shared.id, cell = cell.name(), kind = "collection", "registered cell");
        Ok(cell)
    }

    // ------------------------------------------------------------------------
    // Reactive items
    // ------------------------------------------------------------------------

    fn register_item(&self, item: Arc<dyn Reactive>, dependencies: &[CellId], kind: &'static str) {
        self.shared.state.lock().insert_item(item, dependencies);
        tracing::debug!(
            registry = ?self.shared.id,
            kind,
            dependencies = dependencies.len(),
            "registered item"
        );
    }

    fn check_dependencies(&self, dependencies: &[&dyn Property]) -> Result<Vec<CellId>> {
        self.shared.state.lock().check_dependencies(dependencies)
    }

    /// Create an action that runs whenever a cell in `dependencies` changes.
    pub fn create_action<F>(&self, effect: F, dependencies: &[&dyn Property]) -> Result<Action>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let dependencies = self.check_dependencies(dependencies)?;
        let action = Action::new(effect);
        self.register_item(Arc::new(action.clone()), &dependencies, "action");
        Ok(action)
    }

    /// Create a command that is always executable.
    pub fn create_command<F>(&self, execute: F, dependencies: &[&dyn Property]) -> Result<Command>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let dependencies = self.check_dependencies(dependencies)?;
        let command = Command::create(Box::new(execute), None, self.shared.requery_hook.clone());
        self.register_item(Arc::new(command.clone()), &dependencies, "command");
        Ok(command)
    }

    /// Create a command gated by `can_execute`, rechecked whenever a cell in
    /// `dependencies` changes.
    pub fn create_guarded_command<F, P>(
        &self,
        execute: F,
        can_execute: P,
        dependencies: &[&dyn Property],
    ) -> Result<Command>
    where
        F: Fn() + Send + Sync + 'static,
        P: Fn() -> bool + Send + Sync + 'static,
    {
        let dependencies = self.check_dependencies(dependencies)?;
        let command = Command::create(
            Box::new(execute),
            Some(Box::new(can_execute)),
            self.shared.requery_hook.clone(),
        );
        self.register_item(Arc::new(command.clone()), &dependencies, "command");
        Ok(command)
    }

    /// Create a parameterized command that is always executable.
    pub fn create_param_command<T, F>(&self, execute: F, dependencies: &[&dyn Property]) -> Result<ParamCommand<T>>
    where
        T: 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        let dependencies = self.check_dependencies(dependencies)?;
        let command = ParamCommand::create(Box::new(execute), None, self.shared.requery_hook.clone());
        self.register_item(Arc::new(command.clone()), &dependencies, "param_command");
        Ok(command)
    }

    /// Create a parameterized command gated by `can_execute`.
    pub fn create_guarded_param_command<T, F, P>(
        &self,
        execute: F,
        can_execute: P,
        dependencies: &[&dyn Property],
    ) -> Result<ParamCommand<T>>
    where
        T: 'static,
        F: Fn(T) + Send + Sync + 'static,
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let dependencies = self.check_dependencies(dependencies)?;
        let command = ParamCommand::create(
            Box::new(execute),
            Some(Box::new(can_execute)),
            self.shared.requery_hook.clone(),
        );
        self.register_item(Arc::new(command.clone()), &dependencies, "param_command");
        Ok(command)
    }

    // ------------------------------------------------------------------------
    // Batches and reevaluation
    // ------------------------------------------------------------------------

    /// Run `f` as one batch.
    ///
    /// While `f` runs, changes are recorded instead of dispatched. When it
    /// returns, or panics, every changed writable cell is reported once and
    /// every affected item is reevaluated once.
    ///
    /// Fails with [`RegistryError::BatchInProgress`] if called from inside
    /// another batch of this registry. `f` does not run in that case.
    ///
    /// # Panics
    ///
    /// If `f` panics, the commit still runs while the panic unwinds and the
    /// panic then resumes. The change sink and every reevaluated item must
    /// not panic during that commit, or the process aborts.
    pub fn batch_update<R>(&self, f: impl FnOnce() -> R) -> Result<R> {
        {
            let mut state = self.shared.state.lock();
            if state.in_batch {
                return Err(RegistryError::BatchInProgress);
            }
            state.in_batch = true;
            state.batch_dirty.clear();
        }
        tracing::debug!(registry = ?self.shared.id, "batch started");

        let _guard = BatchGuard::new(&self.shared);
        Ok(f())
    }

    /// Whether a batch is running.
    pub fn is_batching(&self) -> bool {
        self.shared.state.lock().in_batch
    }

    /// Reevaluate every item, in registration order.
    pub fn reevaluate_all(&self) {
        let items = {
            let state = self.shared.state.lock();
            state.resolve_items(state.graph.items())
        };
        tracing::debug!(registry = ?self.shared.id, items = items.len(), "reevaluating all items");

        for item in items {
            item.reevaluate();
        }
    }

    // ------------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------------

    /// Look up a cell by name.
    pub fn cell(&self, name: &str) -> Option<Arc<dyn Property>> {
        let state = self.shared.state.lock();
        let id = state.graph.cell_named(name)?;
        state.cells.get(&id).cloned()
    }

    /// Look up several cells by name, for use as dependencies.
    ///
    /// Fails with [`RegistryError::InvalidDependency`] on the first name
    /// that is not registered.
    pub fn resolve(&self, names: &[&str]) -> Result<Vec<Arc<dyn Property>>> {
        names
            .iter()
            .map(|name| {
                self.cell(name).ok_or_else(|| RegistryError::InvalidDependency {
                    name: (*name).to_owned(),
                })
            })
            .collect()
    }

    /// Whether `cell` is registered in this registry.
    pub fn contains(&self, cell: &dyn Property) -> bool {
        self.shared.state.lock().graph.contains_cell(cell.id())
    }

    /// Get the number of registered cells.
    pub fn cell_count(&self) -> usize {
        self.shared.state.lock().graph.cell_count()
    }

    /// Get the number of registered items.
    pub fn item_count(&self) -> usize {
        self.shared.state.lock().graph.item_count()
    }

    /// Get the number of items depending on `cell`.
    pub fn dependent_count(&self, cell: &dyn Property) -> usize {
        self.shared.state.lock().graph.dependent_count(cell.id())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Registry")
            .field("id", &self.shared.id)
            .field("cells", &state.graph.cell_count())
            .field("items", &state.graph.item_count())
            .field("batching", &state.in_batch)
            .finish()
    }
}
