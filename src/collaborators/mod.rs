//! External collaborator contracts.
//!
//! The unread engine owns only read state. Topic records, privileges,
//! block/ignore lists, category read markers, notifications and realtime
//! push belong to other subsystems and are reached through these traits.

use crate::error::ServiceError;
use crate::{Cid, Tid, Uid};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub mod memory;

pub use memory::MemoryDirectory;

/// Topic fields the engine needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicRecord {
    pub tid: Tid,
    /// Author of the topic.
    pub uid: Uid,
    /// Owning category; `None` when the record is incomplete.
    #[serde(default)]
    pub cid: Option<Cid>,
    #[serde(default)]
    pub title: String,
    /// Number of posts including the opening post.
    #[serde(default = "default_post_count")]
    pub post_count: u64,
}

fn default_post_count() -> u64 {
    1
}

impl TopicRecord {
    pub fn authored(&self) -> AuthoredRecord {
        AuthoredRecord {
            id: self.tid,
            author: self.uid,
        }
    }
}

/// Anything with an author that a block list can hide (topics, posts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuthoredRecord {
    pub id: i64,
    pub author: Uid,
}

#[async_trait]
pub trait TopicDirectory: Send + Sync {
    /// Records aligned with `tids`; missing topics yield `None`.
    async fn topics_fields(&self, tids: &[Tid]) -> Result<Vec<Option<TopicRecord>>, ServiceError>;

    async fn topic_exists(&self, tid: Tid) -> Result<bool, ServiceError>;

    /// Full records for display, in `tids` order, as seen by `uid`.
    async fn topics_by_tids(&self, tids: &[Tid], uid: Uid) -> Result<Vec<TopicRecord>, ServiceError>;
}

#[async_trait]
pub trait PostDirectory: Send + Sync {
    /// Authors aligned with `pids`; missing posts yield `None`.
    async fn posts_authors(&self, pids: &[i64]) -> Result<Vec<Option<AuthoredRecord>>, ServiceError>;
}

#[async_trait]
pub trait PrivilegeFilter: Send + Sync {
    /// Subset of `tids` that `uid` may read, order preserved.
    async fn filter_readable_tids(&self, tids: &[Tid], uid: Uid) -> Result<Vec<Tid>, ServiceError>;
}

#[async_trait]
pub trait BlockFilter: Send + Sync {
    /// Drop records whose author `uid` has blocked, order preserved.
    async fn filter_unblocked(
        &self,
        uid: Uid,
        records: Vec<AuthoredRecord>,
    ) -> Result<Vec<AuthoredRecord>, ServiceError>;
}

#[async_trait]
pub trait IgnoreLists: Send + Sync {
    async fn ignored_tids(&self, uid: Uid) -> Result<HashSet<Tid>, ServiceError>;

    async fn ignored_cids(&self, uid: Uid) -> Result<HashSet<Cid>, ServiceError>;
}

#[async_trait]
pub trait CategoryReadState: Send + Sync {
    async fn mark_categories_read(&self, cids: &[Cid], uid: Uid) -> Result<(), ServiceError>;

    /// Mark the category unread for every user.
    async fn mark_category_unread_for_all(&self, cid: Cid) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait Notifications: Send + Sync {
    /// Ids of `uid`'s unread notifications whose `field` is one of `values`.
    async fn unread_notification_ids_for(
        &self,
        uid: Uid,
        field: &str,
        values: &[i64],
    ) -> Result<Vec<String>, ServiceError>;

    async fn mark_read_multiple(&self, nids: &[String], uid: Uid) -> Result<(), ServiceError>;

    async fn push_notification_count(&self, uid: Uid) -> Result<(), ServiceError>;
}

/// Realtime delivery to a user's connected clients.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit_to_user(
        &self,
        uid: Uid,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<(), ServiceError>;
}
