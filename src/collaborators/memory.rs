//! In-process implementation of every collaborator trait.
//!
//! Backs the command-line tool and the test suites. Calls that mutate
//! other subsystems (category markers, notification pushes, realtime
//! events) are recorded so callers can inspect them afterwards.

use super::{
    AuthoredRecord, BlockFilter, CategoryReadState, EventSink, IgnoreLists, Notifications,
    PostDirectory, PrivilegeFilter, TopicDirectory, TopicRecord,
};
use crate::error::ServiceError;
use crate::{Cid, Pid, Tid, Uid};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashSet;

/// A realtime event captured by [`MemoryDirectory`].
#[derive(Debug, Clone, PartialEq)]
pub struct EmittedEvent {
    pub uid: Uid,
    pub event: String,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone)]
struct StoredNotification {
    uid: Uid,
    tid: Tid,
    read: bool,
}

#[derive(Default)]
pub struct MemoryDirectory {
    topics: DashMap<Tid, TopicRecord>,
    posts: DashMap<Pid, AuthoredRecord>,
    ignored_tids: DashMap<Uid, HashSet<Tid>>,
    ignored_cids: DashMap<Uid, HashSet<Cid>>,
    blocks: DashMap<Uid, HashSet<Uid>>,
    /// Categories a user may NOT read; everything else is readable.
    denied_cids: DashMap<Uid, HashSet<Cid>>,
    notifications: DashMap<String, StoredNotification>,

    events: Mutex<Vec<EmittedEvent>>,
    category_reads: Mutex<Vec<(Uid, Vec<Cid>)>>,
    unread_for_all: Mutex<Vec<Cid>>,
    notification_pushes: Mutex<Vec<Uid>>,

    /// Name of a service that should fail every call.
    outage: Mutex<Option<&'static str>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_topic(&self, topic: TopicRecord) {
        self.topics.insert(topic.tid, topic);
    }

    pub fn topic(&self, tid: Tid) -> Option<TopicRecord> {
        self.topics.get(&tid).map(|t| t.value().clone())
    }

    pub fn insert_post(&self, pid: Pid, author: Uid) {
        self.posts.insert(pid, AuthoredRecord { id: pid, author });
    }

    pub fn ignore_topic(&self, uid: Uid, tid: Tid) {
        self.ignored_tids.entry(uid).or_default().insert(tid);
    }

    pub fn ignore_category(&self, uid: Uid, cid: Cid) {
        self.ignored_cids.entry(uid).or_default().insert(cid);
    }

    pub fn block(&self, uid: Uid, blocked: Uid) {
        self.blocks.entry(uid).or_default().insert(blocked);
    }

    pub fn deny_category(&self, uid: Uid, cid: Cid) {
        self.denied_cids.entry(uid).or_default().insert(cid);
    }

    pub fn add_notification(&self, nid: impl Into<String>, uid: Uid, tid: Tid) {
        self.notifications.insert(
            nid.into(),
            StoredNotification {
                uid,
                tid,
                read: false,
            },
        );
    }

    pub fn is_notification_read(&self, nid: &str) -> bool {
        self.notifications.get(nid).map(|n| n.read).unwrap_or(false)
    }

    /// Make every call to `service` fail until cleared with `None`.
    pub fn set_outage(&self, service: Option<&'static str>) {
        *self.outage.lock() = service;
    }

    pub fn events(&self) -> Vec<EmittedEvent> {
        self.events.lock().clone()
    }

    pub fn category_reads(&self) -> Vec<(Uid, Vec<Cid>)> {
        self.category_reads.lock().clone()
    }

    pub fn unread_for_all(&self) -> Vec<Cid> {
        self.unread_for_all.lock().clone()
    }

    pub fn notification_pushes(&self) -> Vec<Uid> {
        self.notification_pushes.lock().clone()
    }

    fn check(&self, service: &'static str) -> Result<(), ServiceError> {
        match *self.outage.lock() {
            Some(down) if down == service => Err(ServiceError::Unavailable {
                service,
                reason: "simulated outage".to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn can_read_cid(&self, uid: Uid, cid: Cid) -> bool {
        self.denied_cids
            .get(&uid)
            .map(|denied| !denied.contains(&cid))
            .unwrap_or(true)
    }
}

#[async_trait]
impl TopicDirectory for MemoryDirectory {
    async fn topics_fields(&self, tids: &[Tid]) -> Result<Vec<Option<TopicRecord>>, ServiceError> {
        self.check("topics")?;
        Ok(tids
            .iter()
            .map(|tid| self.topics.get(tid).map(|t| t.value().clone()))
            .collect())
    }

    async fn topic_exists(&self, tid: Tid) -> Result<bool, ServiceError> {
        self.check("topics")?;
        Ok(self.topics.contains_key(&tid))
    }

    async fn topics_by_tids(&self, tids: &[Tid], _uid: Uid) -> Result<Vec<TopicRecord>, ServiceError> {
        self.check("topics")?;
        Ok(tids
            .iter()
            .filter_map(|tid| self.topics.get(tid).map(|t| t.value().clone()))
            .collect())
    }
}

#[async_trait]
impl PostDirectory for MemoryDirectory {
    async fn posts_authors(&self, pids: &[Pid]) -> Result<Vec<Option<AuthoredRecord>>, ServiceError> {
        self.check("posts")?;
        Ok(pids.iter().map(|pid| self.posts.get(pid).map(|p| *p)).collect())
    }
}

#[async_trait]
impl PrivilegeFilter for MemoryDirectory {
    async fn filter_readable_tids(&self, tids: &[Tid], uid: Uid) -> Result<Vec<Tid>, ServiceError> {
        self.check("privileges")?;
        Ok(tids
            .iter()
            .copied()
            .filter(|tid| match self.topics.get(tid).and_then(|t| t.cid) {
                Some(cid) => self.can_read_cid(uid, cid),
                // Unknown topics are left for later stages to drop.
                None => true,
            })
            .collect())
    }
}

#[async_trait]
impl BlockFilter for MemoryDirectory {
    async fn filter_unblocked(
        &self,
        uid: Uid,
        records: Vec<AuthoredRecord>,
    ) -> Result<Vec<AuthoredRecord>, ServiceError> {
        self.check("blocks")?;
        let Some(blocked) = self.blocks.get(&uid).map(|b| b.value().clone()) else {
            return Ok(records);
        };
        Ok(records
            .into_iter()
            .filter(|r| !blocked.contains(&r.author))
            .collect())
    }
}

#[async_trait]
impl IgnoreLists for MemoryDirectory {
    async fn ignored_tids(&self, uid: Uid) -> Result<HashSet<Tid>, ServiceError> {
        self.check("ignores")?;
        Ok(self
            .ignored_tids
            .get(&uid)
            .map(|s| s.value().clone())
            .unwrap_or_default())
    }

    async fn ignored_cids(&self, uid: Uid) -> Result<HashSet<Cid>, ServiceError> {
        self.check("ignores")?;
        Ok(self
            .ignored_cids
            .get(&uid)
            .map(|s| s.value().clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl CategoryReadState for MemoryDirectory {
    async fn mark_categories_read(&self, cids: &[Cid], uid: Uid) -> Result<(), ServiceError> {
        self.check("categories")?;
        self.category_reads.lock().push((uid, cids.to_vec()));
        Ok(())
    }

    async fn mark_category_unread_for_all(&self, cid: Cid) -> Result<(), ServiceError> {
        self.check("categories")?;
        self.unread_for_all.lock().push(cid);
        Ok(())
    }
}

#[async_trait]
impl Notifications for MemoryDirectory {
    async fn unread_notification_ids_for(
        &self,
        uid: Uid,
        field: &str,
        values: &[i64],
    ) -> Result<Vec<String>, ServiceError> {
        self.check("notifications")?;
        if field != "tid" {
            return Ok(Vec::new());
        }
        let mut nids: Vec<String> = self
            .notifications
            .iter()
            .filter(|n| n.uid == uid && !n.read && values.contains(&n.tid))
            .map(|n| n.key().clone())
            .collect();
        nids.sort();
        Ok(nids)
    }

    async fn mark_read_multiple(&self, nids: &[String], uid: Uid) -> Result<(), ServiceError> {
        self.check("notifications")?;
        for nid in nids {
            if let Some(mut n) = self.notifications.get_mut(nid)
                && n.uid == uid
            {
                n.read = true;
            }
        }
        Ok(())
    }

    async fn push_notification_count(&self, uid: Uid) -> Result<(), ServiceError> {
        self.check("notifications")?;
        self.notification_pushes.lock().push(uid);
        Ok(())
    }
}

#[async_trait]
impl EventSink for MemoryDirectory {
    async fn emit_to_user(
        &self,
        uid: Uid,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<(), ServiceError> {
        self.check("events")?;
        self.events.lock().push(EmittedEvent {
            uid,
            event: event.to_string(),
            payload,
        });
        Ok(())
    }
}
