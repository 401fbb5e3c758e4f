//! Bookkeeping stores used around models: notifications, pending requests and the
//! request/submit flow.
//!
//! Stores are cheap handles over shared state. Clones observe and update the same
//! store, so a UI can read pending counters while a request is running.

mod notifications;
mod request;
mod worker;

pub use notifications::*;
pub use request::*;
pub use worker::*;

/// Resets a store to its initial state.
///
/// Stores made of other stores clean each of their parts.
pub trait Clean {
    fn clean(&self);
}
