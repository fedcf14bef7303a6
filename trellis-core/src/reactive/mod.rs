//! Reactive Primitives
//!
//! This module implements the cells, reactive items and the registry that
//! connects them.
//!
//! # Concepts
//!
//! ## Cells
//!
//! A cell is a named, cached value. Updating a cell with a value equal to
//! the cached one does nothing; any other update runs the cell's change
//! path. There are three kinds:
//!
//! - [`WritableCell`]: set directly by callers
//! - [`ReadonlyCell`]: computed by a provider, recomputed on `reevaluate()`
//! - [`CollectionCell`]: holds an [`ObservableVec`](crate::observe::ObservableVec)
//!   whose mutations count as changes
//!
//! ## Reactive Items
//!
//! Anything implementing [`Reactive`] can depend on cells: readonly cells,
//! [`Action`]s, [`Command`]s and [`ParamCommand`]s.
//!
//! ## The Registry
//!
//! A [`Registry`] owns cells and items. Dependencies are declared when an
//! item is created, never discovered by tracking reads. When a cell of the
//! registry changes, the registry reports it to its change sink and
//! reevaluates the cell's dependents.

mod action;
mod batch;
mod cell;
mod collection;
mod command;
mod item;
mod readonly;
mod registry;
mod writable;

pub use action::Action;
pub use cell::{CellOptions, ChangedCallback, Equality, Property};
pub use collection::CollectionCell;
pub use command::{Command, ParamCommand, RequeryHandler, RequeryHook};
pub use item::Reactive;
pub use readonly::ReadonlyCell;
pub use registry::{ChangeSink, Registry, RegistryBuilder};
pub use writable::WritableCell;
