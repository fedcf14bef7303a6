//! Graph Identities
//!
//! This module defines the identifiers and node kinds that live in the
//! dependency graph.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a cell in a registry.
///
/// Ids come from a process-wide counter and are never reused, so a cell id
/// minted by one registry can never collide with a cell of another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(u64);

impl CellId {
    /// Generate a new unique cell ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for CellId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for a reactive item (computed cell, action or command).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(u64);

impl ItemId {
    /// Generate a new unique item ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistryId(u64);

impl RegistryId {
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for RegistryId {
    fn default() -> Self {
        Self::new()
    }
}

/// The kind of cell in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    /// A cell whose value is assigned by callers. These are the roots of the
    /// graph and the only cells tracked during a batch update.
    Writable,

    /// A cell whose value is produced by a provider. It is also a reactive
    /// item and may depend on other cells.
    Readonly,

    /// A cell wrapping an observable container. Membership changes of the
    /// container drive the change path; the cell value itself never changes.
    Collection,
}

impl CellKind {
    /// Whether changes of this kind are collected during a batch update.
    pub fn is_batch_tracked(self) -> bool {
        self == CellKind::Writable
    }
}

impl fmt::Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CellKind::Writable => "writable",
            CellKind::Readonly => "readonly",
            CellKind::Collection => "collection",
        };
        f.write_str(label)
    }
}
