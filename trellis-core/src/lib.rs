//! Trellis Core
//!
//! This crate provides a small reactive-state runtime for view-model style
//! code. It implements:
//!
//! - Named value cells with equality-gated updates
//! - Computed cells, actions and commands driven by declared dependencies
//! - A registry that dispatches changes and runs batched updates
//! - Deep reactivity for values that report their own changes
//!
//! Everything runs synchronously: a `set`, `reevaluate` or `batch_update`
//! call returns only after every cascade it caused has finished.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: cells, actions, commands and the registry
//! - `graph`: ids and the cell-to-item dependency graph
//! - `observe`: change feeds, subscriptions and the observable vector
//! - `error`: the error type shared by every fallible operation
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//! use trellis_core::Registry;
//!
//! let changed = Arc::new(Mutex::new(Vec::new()));
//! let log = changed.clone();
//! let registry = Registry::builder()
//!     .on_property_changed(move |cell| log.lock().push(cell.name().to_string()))
//!     .build();
//!
//! let first = registry.create_writable("First", "Ada".to_string()).unwrap();
//! let last = registry.create_writable("Last", "Lovelace".to_string()).unwrap();
//!
//! let (f, l) = (first.clone(), last.clone());
//! let full = registry
//!     .create_readonly("Full", move || format!("{} {}", f.get(), l.get()), &[&first, &last])
//!     .unwrap();
//!
//! registry
//!     .batch_update(|| {
//!         first.set("Grace".into());
//!         last.set("Hopper".into());
//!     })
//!     .unwrap();
//!
//! assert_eq!(full.get(), "Grace Hopper");
//! assert_eq!(*changed.lock(), ["First", "Last", "Full"]);
//! ```

pub mod error;
pub mod graph;
pub mod observe;
pub mod reactive;

pub use error::{RegistryError, Result};
pub use reactive::{
    Action, CellOptions, CollectionCell, Command, ParamCommand, Property, Reactive, ReadonlyCell, Registry,
    WritableCell,
};
