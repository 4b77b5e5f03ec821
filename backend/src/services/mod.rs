//! Module for services that run alongside the session manager.
//!
//! These services orchestrate repeated interactions with the authentication
//! layer, such as watching the admin session for expiry.

pub mod expiry_watcher;

pub use expiry_watcher::{ExpiryHandler, ExpiryWatcher, WatchState};
