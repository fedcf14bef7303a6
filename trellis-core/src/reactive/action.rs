//! Action Implementation
//!
//! An Action is a side effect that runs whenever one of its dependencies
//! changes.
//!
//! # Differences from Readonly Cells
//!
//! - Readonly cells hold a value; actions do not.
//! - Readonly cells notify only when their value changes; actions run on
//!   every reevaluation.
//! - Actions have no dependents of their own, so running one never cascades
//!   through the registry.
//!
//! Creating an action does not run it.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::item::Reactive;
use crate::graph::ItemId;

struct ActionInner {
    item_id: ItemId,
    effect: Box<dyn Fn() + Send + Sync>,

    /// Number of times the effect has run.
    run_count: AtomicUsize,
}

/// A side effect driven by the dependency graph.
///
/// # Example
///
/// ```rust
/// use trellis_core::reactive::Action;
///
/// let action = Action::new(|| println!("dependencies changed"));
/// action.run();
/// assert_eq!(action.run_count(), 1);
/// ```
#[derive(Clone)]
pub struct Action {
    inner: Arc<ActionInner>,
}

impl Action {
    pub fn new<F>(effect: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(ActionInner {
                item_id: ItemId::new(),
                effect: Box::new(effect),
                run_count: AtomicUsize::new(0),
            }),
        }
    }

    /// Run the effect.
    pub fn run(&self) {
        (self.inner.effect)();
        self.inner.run_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the number of times the effect has run.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.load(Ordering::Relaxed)
    }

    pub fn item_id(&self) -> ItemId {
        self.inner.item_id
    }
}

impl Reactive for Action {
    fn item_id(&self) -> ItemId {
        self.inner.item_id
    }

    fn reevaluate(&self) {
        self.run();
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("item_id", &self.inner.item_id)
            .field("run_count", &self.run_count())
            .finish()
    }
}
