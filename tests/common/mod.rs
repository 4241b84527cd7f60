//! Integration test common infrastructure.
//!
//! Provides a small in-process forum: a memory store, a memory directory
//! and a manual clock wired into an [`UnreadService`].

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Arc;
use topic_unread::collaborators::{MemoryDirectory, TopicRecord};
use topic_unread::store::{Member, MemoryStore, ScoredMember, SortedSetStore, StoreError, keys};
use topic_unread::{
    CategoryFilter, Cid, Collaborators, ManualClock, Pid, Score, Tid, Uid, UnreadConfig,
    UnreadFilter, UnreadService,
};

pub const MINUTE: Score = 60_000;
pub const HOUR: Score = 60 * MINUTE;
pub const DAY: Score = 24 * HOUR;

/// Fixed "now" for every test forum.
pub const NOW: Score = 30 * DAY;

pub struct TestForum {
    pub store: Arc<MemoryStore>,
    pub directory: Arc<MemoryDirectory>,
    pub clock: Arc<ManualClock>,
    pub service: UnreadService,
}

impl TestForum {
    pub fn new() -> Self {
        Self::with_config(UnreadConfig::default())
    }

    pub fn with_config(config: UnreadConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let directory = Arc::new(MemoryDirectory::new());
        let clock = Arc::new(ManualClock::new(NOW));
        let service = UnreadService::new(
            store.clone(),
            Collaborators::from_directory(directory.clone()),
            config,
        )
        .with_clock(clock.clone());
        Self {
            store,
            directory,
            clock,
            service,
        }
    }

    /// Create a topic with one post and last activity at `activity`.
    pub async fn topic(&self, tid: Tid, cid: Cid, author: Uid, activity: Score) {
        self.directory.insert_topic(TopicRecord {
            tid,
            uid: author,
            cid: Some(cid),
            title: format!("Topic {}", tid),
            post_count: 1,
        });
        self.store
            .add(keys::TOPICS_RECENT, &[(activity, tid)])
            .await
            .unwrap();
        self.store.add(keys::TOPICS_POSTS, &[(1, tid)]).await.unwrap();
    }

    /// Add a reply to `tid`, bumping its activity and post count.
    pub async fn reply(&self, tid: Tid, pid: Pid, author: Uid, at: Score) {
        let mut topic = self.directory.topic(tid).expect("reply to unknown topic");
        topic.post_count += 1;
        let post_count = topic.post_count as Score;
        self.directory.insert_topic(topic);
        self.directory.insert_post(pid, author);
        self.store.add(&keys::topic_posts(tid), &[(at, pid)]).await.unwrap();
        self.store.add(keys::TOPICS_RECENT, &[(at, tid)]).await.unwrap();
        self.store
            .add(keys::TOPICS_POSTS, &[(post_count, tid)])
            .await
            .unwrap();
    }

    pub async fn read_at(&self, uid: Uid, tid: Tid, at: Score) {
        self.store.add(&keys::tids_read(uid), &[(at, tid)]).await.unwrap();
    }

    pub async fn follow(&self, uid: Uid, tid: Tid) {
        self.store
            .add(&keys::followed_tids(uid), &[(NOW, tid)])
            .await
            .unwrap();
    }

    pub async fn read_score(&self, uid: Uid, tid: Tid) -> Option<Score> {
        self.store.score_of(&keys::tids_read(uid), tid).await.unwrap()
    }

    pub async fn override_score(&self, uid: Uid, tid: Tid) -> Option<Score> {
        self.store.score_of(&keys::tids_unread(uid), tid).await.unwrap()
    }

    pub async fn unread(&self, uid: Uid) -> Vec<Tid> {
        self.unread_with(uid, UnreadFilter::All).await
    }

    pub async fn unread_with(&self, uid: Uid, filter: UnreadFilter) -> Vec<Tid> {
        self.service
            .resolve_unread_tids(uid, filter, &CategoryFilter::any(), None)
            .await
            .unwrap()
    }
}

/// A store that fails the test on any access.
pub struct UntouchableStore;

#[async_trait]
impl SortedSetStore for UntouchableStore {
    async fn scores_by_range(
        &self,
        key: &str,
        _min: Score,
        _max: Score,
        _descending: bool,
    ) -> Result<Vec<ScoredMember>, StoreError> {
        panic!("unexpected store access: scores_by_range({})", key)
    }

    async fn range_with_scores(
        &self,
        key: &str,
        _start: isize,
        _stop: isize,
        _descending: bool,
    ) -> Result<Vec<ScoredMember>, StoreError> {
        panic!("unexpected store access: range_with_scores({})", key)
    }

    async fn score_of(&self, key: &str, _member: Member) -> Result<Option<Score>, StoreError> {
        panic!("unexpected store access: score_of({})", key)
    }

    async fn scores_of(
        &self,
        key: &str,
        _members: &[Member],
    ) -> Result<Vec<Option<Score>>, StoreError> {
        panic!("unexpected store access: scores_of({})", key)
    }

    async fn add(&self, key: &str, _entries: &[(Score, Member)]) -> Result<(), StoreError> {
        panic!("unexpected store access: add({})", key)
    }

    async fn remove(&self, key: &str, _members: &[Member]) -> Result<(), StoreError> {
        panic!("unexpected store access: remove({})", key)
    }

    async fn delete_key(&self, key: &str) -> Result<(), StoreError> {
        panic!("unexpected store access: delete_key({})", key)
    }

    async fn card(&self, key: &str) -> Result<usize, StoreError> {
        panic!("unexpected store access: card({})", key)
    }
}

/// A service whose store panics when touched.
pub fn untouchable_service() -> UnreadService {
    UnreadService::new(
        Arc::new(UntouchableStore),
        Collaborators::from_directory(Arc::new(MemoryDirectory::new())),
        UnreadConfig::default(),
    )
}
