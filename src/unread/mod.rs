//! The unread engine.
//!
//! [`UnreadService`] owns a sorted-set store, the collaborator handles and
//! the resolved configuration. Its operations are split by concern:
//! - [`candidates`]: merge of recent activity, read scores and overrides
//! - [`resolve`]: ordered unread tids per filter, and pagination
//! - [`counts`]: per-bucket unread totals
//! - [`mark`]: read/unread mutations and count pushes
//! - [`status`]: per-topic read verdicts and tid filters

mod candidates;
mod counts;
mod mark;
mod resolve;
mod status;
mod types;

pub use mark::UNREAD_COUNT_EVENT;
pub use types::{CategoryFilter, UnreadCounts, UnreadFilter, UnreadTopicsPage, UnreadTopicsQuery};

use crate::clock::{Clock, SystemClock};
use crate::collaborators::{
    BlockFilter, CategoryReadState, EventSink, IgnoreLists, Notifications, PostDirectory,
    PrivilegeFilter, TopicDirectory,
};
use crate::config::UnreadConfig;
use crate::hooks::Hooks;
use crate::store::SortedSetStore;
use crate::{Score, Uid};
use std::sync::Arc;

/// Handles to every external subsystem the engine consults.
#[derive(Clone)]
pub struct Collaborators {
    pub topics: Arc<dyn TopicDirectory>,
    pub posts: Arc<dyn PostDirectory>,
    pub privileges: Arc<dyn PrivilegeFilter>,
    pub blocks: Arc<dyn BlockFilter>,
    pub ignores: Arc<dyn IgnoreLists>,
    pub categories: Arc<dyn CategoryReadState>,
    pub notifications: Arc<dyn Notifications>,
    pub events: Arc<dyn EventSink>,
}

impl Collaborators {
    /// Use one object for every collaborator role.
    pub fn from_directory<D>(directory: Arc<D>) -> Self
    where
        D: TopicDirectory
            + PostDirectory
            + PrivilegeFilter
            + BlockFilter
            + IgnoreLists
            + CategoryReadState
            + Notifications
            + EventSink
            + 'static,
    {
        Self {
            topics: directory.clone(),
            posts: directory.clone(),
            privileges: directory.clone(),
            blocks: directory.clone(),
            ignores: directory.clone(),
            categories: directory.clone(),
            notifications: directory.clone(),
            events: directory,
        }
    }
}

/// Per-user unread resolution, counting and read-state mutation.
///
/// Holds no per-user state; every call reads and writes through the store.
pub struct UnreadService {
    store: Arc<dyn SortedSetStore>,
    collab: Collaborators,
    config: UnreadConfig,
    clock: Arc<dyn Clock>,
    hooks: Hooks,
}

impl UnreadService {
    pub fn new(store: Arc<dyn SortedSetStore>, collab: Collaborators, config: UnreadConfig) -> Self {
        Self {
            store,
            collab,
            config,
            clock: Arc::new(SystemClock),
            hooks: Hooks::new(),
        }
    }

    /// Replace the wall clock, e.g. with a [`ManualClock`](crate::ManualClock).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    pub fn config(&self) -> &UnreadConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn SortedSetStore> {
        &self.store
    }

    /// Topics with activity older than this are not considered recent.
    pub fn unread_cutoff(&self) -> Score {
        self.config.cutoff_from(self.now())
    }

    fn now(&self) -> Score {
        self.clock.now_millis()
    }
}

/// Anonymous and invalid users have no read state.
#[inline]
fn is_guest(uid: Uid) -> bool {
    uid <= 0
}
