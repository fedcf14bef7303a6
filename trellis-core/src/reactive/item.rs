//! Reactive items.
//!
//! A reactive item is anything the registry reevaluates when a cell it
//! depends on changes: readonly cells, actions and commands.

use crate::graph::ItemId;

/// A trait for types that reevaluate when their dependencies change.
pub trait Reactive: Send + Sync {
    /// Get the item ID for this reactive value.
    fn item_id(&self) -> ItemId;

    /// Recompute state from the current values of the dependencies.
    fn reevaluate(&self);
}
