//! Commands
//!
//! A command is an action with an executability check. Two flavours exist:
//!
//! - [`Command`] takes no parameter. It caches the result of its predicate
//!   and fires its executability-changed event only when a reevaluation
//!   flips the cached value.
//! - [`ParamCommand`] takes a parameter. Its predicate depends on the
//!   parameter, so nothing is cached and every reevaluation fires the event.
//!
//! # Requery Hooks
//!
//! A requery hook lets an outside broadcaster drive reevaluation. The hook is
//! called with `(true, handler)` just before the first listener attaches to
//! the executability-changed event, and with `(false, handler)` just after
//! the last one detaches. Invoking the handler reevaluates the command.
//!
//! A command built without a predicate is always executable. It has no
//! executability-changed event: attaching returns an inert subscription and
//! the requery hook is never called.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use super::item::Reactive;
use crate::graph::ItemId;
use crate::observe::{ChangeFeed, Subscription};

/// External refresh hook, called as `hook(attach, handler)`.
pub type RequeryHook = Arc<dyn Fn(bool, RequeryHandler) + Send + Sync>;

/// Handle a broadcaster invokes to request reevaluation of one command.
///
/// Handlers compare equal when they target the same command, so a
/// broadcaster can find and drop the handler it was given on attach.
#[derive(Clone)]
pub struct RequeryHandler {
    target: Arc<dyn Fn() + Send + Sync>,
}

impl RequeryHandler {
    fn new(target: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            target: Arc::new(target),
        }
    }

    /// Request reevaluation of the command.
    pub fn invoke(&self) {
        (self.target)();
    }
}

impl PartialEq for RequeryHandler {
    fn eq(&self, other: &Self) -> bool {
        Arc::as_ptr(&self.target).cast::<()>() == Arc::as_ptr(&other.target).cast::<()>()
    }
}

impl Eq for RequeryHandler {}

impl fmt::Debug for RequeryHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RequeryHandler")
            .field(&Arc::as_ptr(&self.target).cast::<()>())
            .finish()
    }
}

fn executability_feed(item_id: ItemId, hook: Option<RequeryHook>, handler: RequeryHandler) -> ChangeFeed<()> {
    match hook {
        Some(hook) => ChangeFeed::with_occupancy_hook(move |attached| {
            tracing::debug!(item = ?item_id, attached, "command requery hook");
            hook(attached, handler.clone());
        }),
        None => ChangeFeed::new(),
    }
}

fn subscribe<F>(feed: Option<&ChangeFeed<()>>, listener: F) -> Subscription
where
    F: Fn() + Send + Sync + 'static,
{
    match feed {
        Some(feed) => feed.subscribe(move |_| listener()),
        None => Subscription::inert(),
    }
}

// ----------------------------------------------------------------------------
// Parameterless command
// ----------------------------------------------------------------------------

struct CommandInner {
    item_id: ItemId,
    execute: Box<dyn Fn() + Send + Sync>,
    predicate: Option<Box<dyn Fn() -> bool + Send + Sync>>,

    /// Last computed executability.
    can_execute: AtomicBool,

    /// Executability-changed event; absent without a predicate.
    changed: Option<ChangeFeed<()>>,
}

/// A parameterless command with a cached executability.
///
/// # Example
///
/// ```rust
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
/// use trellis_core::reactive::Command;
///
/// let enabled = Arc::new(AtomicBool::new(false));
/// let gate = enabled.clone();
/// let save = Command::guarded(|| println!("saved"), move || gate.load(Ordering::SeqCst));
///
/// assert!(!save.can_execute());
/// enabled.store(true, Ordering::SeqCst);
/// save.reevaluate();
/// assert!(save.can_execute());
/// ```
#[derive(Clone)]
pub struct Command {
    inner: Arc<CommandInner>,
}

impl Command {
    /// Create a command that is always executable.
    pub fn new<F>(execute: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::create(Box::new(execute), None, None)
    }

    /// Create a command gated by `can_execute`.
    pub fn guarded<F, P>(execute: F, can_execute: P) -> Self
    where
        F: Fn() + Send + Sync + 'static,
        P: Fn() -> bool + Send + Sync + 'static,
    {
        Self::create(Box::new(execute), Some(Box::new(can_execute)), None)
    }

    /// Create a gated command attached to a requery hook.
    pub fn guarded_with_hook<F, P>(execute: F, can_execute: P, hook: RequeryHook) -> Self
    where
        F: Fn() + Send + Sync + 'static,
        P: Fn() -> bool + Send + Sync + 'static,
    {
        Self::create(Box::new(execute), Some(Box::new(can_execute)), Some(hook))
    }

    pub(crate) fn create(
        execute: Box<dyn Fn() + Send + Sync>,
        predicate: Option<Box<dyn Fn() -> bool + Send + Sync>>,
        hook: Option<RequeryHook>,
    ) -> Self {
        // Seeding the cache is not a transition
        let initial = predicate.as_ref().map_or(true, |predicate| predicate());
        let item_id = ItemId::new();

        let inner = Arc::new_cyclic(|this: &Weak<CommandInner>| {
            let changed = predicate.is_some().then(|| {
                let this = this.clone();
                let handler = RequeryHandler::new(move || {
                    if let Some(inner) = this.upgrade() {
                        Command { inner }.reevaluate();
                    }
                });
                executability_feed(item_id, hook, handler)
            });

            CommandInner {
                item_id,
                execute,
                predicate,
                can_execute: AtomicBool::new(initial),
                changed,
            }
        });

        Self { inner }
    }

    /// Get the cached executability.
    pub fn can_execute(&self) -> bool {
        self.inner.can_execute.load(Ordering::SeqCst)
    }

    /// Run the command if it is executable. Otherwise do nothing.
    pub fn execute(&self) {
        if self.can_execute() {
            (self.inner.execute)();
        }
    }

    /// Recompute executability and fire the event if it changed.
    pub fn reevaluate(&self) {
        let next = self.inner.predicate.as_ref().map_or(true, |predicate| predicate());
        let previous = self.inner.can_execute.swap(next, Ordering::SeqCst);
        if previous == next {
            return;
        }

        tracing::debug!(item = ?self.inner.item_id, can_execute = next, "command executability changed");
        if let Some(feed) = &self.inner.changed {
            feed.emit(&());
        }
    }

    /// Listen for executability changes.
    ///
    /// Returns an inert subscription if the command has no predicate.
    pub fn on_can_execute_changed<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        subscribe(self.inner.changed.as_ref(), listener)
    }

    /// Get the number of executability listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.changed.as_ref().map_or(0, ChangeFeed::listener_count)
    }

    pub fn item_id(&self) -> ItemId {
        self.inner.item_id
    }
}

impl Reactive for Command {
    fn item_id(&self) -> ItemId {
        self.inner.item_id
    }

    fn reevaluate(&self) {
        Command::reevaluate(self);
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("item_id", &self.inner.item_id)
            .field("can_execute", &self.can_execute())
            .field("guarded", &self.inner.predicate.is_some())
            .field("listener_count", &self.listener_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Parameterized command
// ----------------------------------------------------------------------------

struct ParamCommandInner<T> {
    item_id: ItemId,
    execute: Box<dyn Fn(T) + Send + Sync>,
    predicate: Option<Box<dyn Fn(&T) -> bool + Send + Sync>>,
    changed: Option<ChangeFeed<()>>,
}

/// A command taking a parameter of type `T`.
///
/// Executability is computed for each parameter on demand.
pub struct ParamCommand<T> {
    inner: Arc<ParamCommandInner<T>>,
}

impl<T: 'static> ParamCommand<T> {
    /// Create a command that is always executable.
    pub fn new<F>(execute: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Self::create(Box::new(execute), None, None)
    }

    /// Create a command gated by `can_execute`.
    pub fn guarded<F, P>(execute: F, can_execute: P) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self::create(Box::new(execute), Some(Box::new(can_execute)), None)
    }

    /// Create a gated command attached to a requery hook.
    pub fn guarded_with_hook<F, P>(execute: F, can_execute: P, hook: RequeryHook) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self::create(Box::new(execute), Some(Box::new(can_execute)), Some(hook))
    }

    pub(crate) fn create(
        execute: Box<dyn Fn(T) + Send + Sync>,
        predicate: Option<Box<dyn Fn(&T) -> bool + Send + Sync>>,
        hook: Option<RequeryHook>,
    ) -> Self {
        let item_id = ItemId::new();

        let inner = Arc::new_cyclic(|this: &Weak<ParamCommandInner<T>>| {
            let changed = predicate.is_some().then(|| {
                let this = this.clone();
                let handler = RequeryHandler::new(move || {
                    if let Some(inner) = this.upgrade() {
                        ParamCommand { inner }.reevaluate();
                    }
                });
                executability_feed(item_id, hook, handler)
            });

            ParamCommandInner {
                item_id,
                execute,
                predicate,
                changed,
            }
        });

        Self { inner }
    }

    /// Whether the command can run with `parameter`.
    pub fn can_execute(&self, parameter: &T) -> bool {
        self.inner.predicate.as_ref().map_or(true, |predicate| predicate(parameter))
    }

    /// Run the command with `parameter` if it is executable for it.
    pub fn execute(&self, parameter: T) {
        if self.can_execute(&parameter) {
            (self.inner.execute)(parameter);
        }
    }

    /// Fire the executability-changed event.
    ///
    /// Without a cached value there is nothing to compare, so every call
    /// fires when a predicate is present.
    pub fn reevaluate(&self) {
        if let Some(feed) = &self.inner.changed {
            tracing::trace!(item = ?self.inner.item_id, "parameterized command requeried");
            feed.emit(&());
        }
    }

    /// Listen for executability changes.
    ///
    /// Returns an inert subscription if the command has no predicate.
    pub fn on_can_execute_changed<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        subscribe(self.inner.changed.as_ref(), listener)
    }

    pub fn listener_count(&self) -> usize {
        self.inner.changed.as_ref().map_or(0, ChangeFeed::listener_count)
    }

    pub fn item_id(&self) -> ItemId {
        self.inner.item_id
    }
}

impl<T: 'static> Reactive for ParamCommand<T> {
    fn item_id(&self) -> ItemId {
        self.inner.item_id
    }

    fn reevaluate(&self) {
        ParamCommand::reevaluate(self);
    }
}

impl<T> Clone for ParamCommand<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for ParamCommand<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamCommand")
            .field("item_id", &self.inner.item_id)
            .field("guarded", &self.inner.predicate.is_some())
            .finish()
    }
}
