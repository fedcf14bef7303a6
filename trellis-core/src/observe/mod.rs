//! Change Observation
//!
//! Building blocks for values that report their own changes:
//!
//! - [`ChangeFeed`] and [`Subscription`]: a listener list and the RAII handle
//!   that detaches a listener
//! - [`ReportsChanges`]: the capability a value implements to expose a feed
//! - [`ObservableVec`]: an ordered container that reports membership changes
//!
//! Cells use these to stay reactive to mutation of the value they hold.

mod change;
mod feed;
mod vec;

pub use change::{CollectionChange, PropertyChange, PropertyChanges, ReportsChanges};
pub use feed::{ChangeFeed, Subscription};
pub use vec::ObservableVec;

pub(crate) use change::watch;
