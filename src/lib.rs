//! topic-unread - per-user unread topic tracking.
//!
//! Computes which topics a user has not read yet, counts them per filter
//! bucket and mutates the user's read/unread state. All state lives in a
//! [`store::SortedSetStore`]; everything else the engine needs (topic
//! records, privileges, block and ignore lists, notifications, realtime
//! push) is reached through the traits in [`collaborators`].

pub mod clock;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod hooks;
pub mod metrics;
pub mod store;
pub mod telemetry;
pub mod unread;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, StoreConfig, UnreadConfig};
pub use error::{ServiceError, StoreError, UnreadError};
pub use hooks::Hooks;
pub use unread::{
    CategoryFilter, Collaborators, UnreadCounts, UnreadFilter, UnreadService, UnreadTopicsPage,
    UnreadTopicsQuery,
};

/// Topic identifier.
pub type Tid = i64;

/// User identifier. Zero and negative values denote anonymous users.
pub type Uid = i64;

/// Category identifier.
pub type Cid = i64;

/// Post identifier.
pub type Pid = i64;

/// Epoch milliseconds; used for every sorted-set score in this crate.
pub type Score = i64;
