//! Writable Cell
//!
//! A writable cell holds a value assigned by callers. It is the root of
//! every cascade: setting it to a different value runs the changed callback,
//! which for registry-owned cells dispatches to dependents.
//!
//! # Example
//!
//! ```rust
//! use trellis_core::reactive::WritableCell;
//!
//! let count = WritableCell::new("Count", 0).unwrap();
//! count.set(5);
//! count.update(|v| v + 1);
//! assert_eq!(count.get(), 6);
//! ```

use std::fmt;
use std::sync::Arc;

use super::cell::{default_equality, CellCore, CellOptions, ChangedCallback, Property};
use crate::error::Result;
use crate::graph::{CellId, CellKind};

/// A cell whose value is set directly.
///
/// Clones share the same cell.
pub struct WritableCell<T> {
    core: Arc<CellCore<T>>,
}

impl<T> WritableCell<T>
where
    T: PartialEq + Send + Sync + 'static,
{
    /// Create a standalone writable cell.
    pub fn new(name: impl Into<String>, initial: T) -> Result<Self> {
        Self::create(name.into(), initial, CellOptions::default(), None)
    }

    /// Create a standalone writable cell with options.
    pub fn with_options(name: impl Into<String>, initial: T, options: CellOptions<T>) -> Result<Self> {
        Self::create(name.into(), initial, options, None)
    }

    /// Create a standalone writable cell that reports its changes to `on_changed`.
    pub fn with_changed_callback<F>(
        name: impl Into<String>,
        initial: T,
        options: CellOptions<T>,
        on_changed: F,
    ) -> Result<Self>
    where
        F: Fn(&dyn Property) + Send + Sync + 'static,
    {
        let changed: ChangedCallback = Arc::new(on_changed);
        Self::create(name.into(), initial, options, Some(changed))
    }

    pub(crate) fn create(
        name: String,
        initial: T,
        options: CellOptions<T>,
        changed: Option<ChangedCallback>,
    ) -> Result<Self> {
        let core = CellCore::new(name, CellKind::Writable, initial, default_equality(), options, changed)?;
        Ok(Self { core })
    }
}

impl<T: Send + Sync + 'static> WritableCell<T> {
    /// Get the current value.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.core.get()
    }

    /// Run `f` with a reference to the current value.
    ///
    /// `f` must not set this cell.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.core.with(f)
    }

    /// Set a new value.
    ///
    /// Does nothing if `value` equals the current value under the cell's
    /// equality policy.
    pub fn set(&self, value: T) {
        self.core.update(value, true);
    }

    /// Update the value using a function of the current value.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let next = self.core.with(f);
        self.set(next);
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

impl<T: Send + Sync + 'static> Property for WritableCell<T> {
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
        CellKind::Writable
    }
}

impl<T> Clone for WritableCell<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T> fmt::Debug for WritableCell<T>
where
    T: fmt::Debug + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.core.with(|value| {
            f.debug_struct("WritableCell")
                .field("id", &self.core.id())
                .field("name", &self.core.name())
                .field("value", value)
                .finish()
        })
    }
}

impl<T> fmt::Display for WritableCell<T>
where
    T: fmt::Display + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.core.with(|value| value.fmt(f))
    }
}
