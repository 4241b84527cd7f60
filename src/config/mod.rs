//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Top-level [`Config`] and loading
//! - [`unread`]: Unread resolution tuning (cutoff, candidate cap, push behaviour)
//! - [`store`]: Sorted-set store backend selection
//! - [`validation`]: Startup checks

mod store;
mod types;
mod unread;
pub mod validation;

pub use store::{StoreBackend, StoreConfig};
pub use types::{Config, ConfigError};
pub use unread::{MAX_CUTOFF_DAYS, UnreadConfig};
