//! Dependency Graph
//!
//! This module implements the dependency graph that tracks relationships
//! between cells and the reactive items that depend on them.
//!
//! # Overview
//!
//! The graph is declared, not discovered: every reactive item names the cells
//! it depends on when it is created, and the edges never change afterwards.
//!
//! - Cells are the sources of change (writable, readonly and collection cells)
//! - Items are the things that reevaluate (readonly cells, actions, commands)
//! - An edge from cell C to item I means "reevaluate I when C changes"
//!
//! A readonly cell is both a cell and an item, which is how multi-level
//! cascades form. The graph does not detect cycles.

mod dependents;
mod node;

pub use dependents::DependencyGraph;
pub use node::{CellId, CellKind, ItemId, RegistryId};
