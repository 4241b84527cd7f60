//! Sorted-set store abstraction.
//!
//! All read state is kept in ordered sets keyed by string. Each member is a
//! numeric id carrying an integer score (a timestamp, or a post count for
//! [`keys::TOPICS_POSTS`]).

use async_trait::async_trait;
use std::sync::Arc;

pub mod keys;
pub mod memory;
pub mod redb;

pub use crate::error::StoreError;
pub use memory::MemoryStore;
pub use redb::RedbStore;

use crate::Score;
use crate::config::{StoreBackend, StoreConfig};

/// Member id stored in a sorted set.
pub type Member = i64;

/// A member together with its score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoredMember {
    pub member: Member,
    pub score: Score,
}

impl ScoredMember {
    pub fn new(member: Member, score: Score) -> Self {
        Self { member, score }
    }
}

#[async_trait]
pub trait SortedSetStore: Send + Sync {
    /// Members with `min <= score <= max`, ascending or descending by score.
    async fn scores_by_range(
        &self,
        key: &str,
        min: Score,
        max: Score,
        descending: bool,
    ) -> Result<Vec<ScoredMember>, StoreError>;

    /// Members by rank with scores. `start`/`stop` are inclusive and may be
    /// negative to count from the end (`-1` is the last member).
    async fn range_with_scores(
        &self,
        key: &str,
        start: isize,
        stop: isize,
        descending: bool,
    ) -> Result<Vec<ScoredMember>, StoreError>;

    /// Ascending members by rank.
    async fn rank_range(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<Member>, StoreError> {
        let entries = self.range_with_scores(key, start, stop, false).await?;
        Ok(entries.into_iter().map(|e| e.member).collect())
    }

    async fn score_of(&self, key: &str, member: Member) -> Result<Option<Score>, StoreError>;

    /// Scores aligned with `members`; absent members yield `None`.
    async fn scores_of(
        &self,
        key: &str,
        members: &[Member],
    ) -> Result<Vec<Option<Score>>, StoreError>;

    /// Insert or overwrite each `(score, member)` pair.
    async fn add(&self, key: &str, entries: &[(Score, Member)]) -> Result<(), StoreError>;

    async fn remove(&self, key: &str, members: &[Member]) -> Result<(), StoreError>;

    async fn delete_key(&self, key: &str) -> Result<(), StoreError>;

    /// Number of members in the set.
    async fn card(&self, key: &str) -> Result<usize, StoreError>;
}

/// Build the store selected by `config`.
pub fn open(config: &StoreConfig) -> Result<Arc<dyn SortedSetStore>, StoreError> {
    let store: Arc<dyn SortedSetStore> = match config.backend {
        StoreBackend::Memory => {
            tracing::info!("Using in-memory sorted-set store");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Redb => {
            tracing::info!(path = %config.path, "Initializing Redb sorted-set store");
            Arc::new(RedbStore::new(&config.path)?)
        }
    };
    Ok(store)
}

/// Resolve Redis-style inclusive rank bounds against a set of `len` members.
///
/// Returns `None` when the range selects nothing.
pub(crate) fn normalize_rank(start: isize, stop: isize, len: usize) -> Option<(usize, usize)> {
    if len == 0 {
        return None;
    }
    let len = len as isize;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize))
}
