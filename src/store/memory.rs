//! In-memory sorted-set store.
//!
//! Each set is dual-indexed: an ordered `(score, member)` index for range
//! queries and a member -> score map for point lookups. Equal scores order
//! by member, so descending queries return ties in descending member order.

use super::{Member, ScoredMember, SortedSetStore, StoreError, normalize_rank};
use crate::Score;
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::{BTreeSet, HashMap};

/// A single sorted set.
#[derive(Debug, Default, Clone)]
pub struct SortedSet {
    ordered: BTreeSet<(Score, Member)>,
    scores: HashMap<Member, Score>,
}

impl SortedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Insert or update a member's score.
    pub fn insert(&mut self, score: Score, member: Member) {
        if let Some(old) = self.scores.insert(member, score) {
            self.ordered.remove(&(old, member));
        }
        self.ordered.insert((score, member));
    }

    /// Remove a member. Returns whether it was present.
    pub fn remove(&mut self, member: Member) -> bool {
        match self.scores.remove(&member) {
            Some(score) => {
                self.ordered.remove(&(score, member));
                true
            }
            None => false,
        }
    }

    pub fn score(&self, member: Member) -> Option<Score> {
        self.scores.get(&member).copied()
    }

    pub fn range_by_score(&self, min: Score, max: Score, descending: bool) -> Vec<ScoredMember> {
        if min > max {
            return Vec::new();
        }
        let range = self.ordered.range((min, Member::MIN)..=(max, Member::MAX));
        let to_entry = |&(score, member): &(Score, Member)| ScoredMember::new(member, score);
        if descending {
            range.rev().map(to_entry).collect()
        } else {
            range.map(to_entry).collect()
        }
    }

    pub fn range_by_rank(&self, start: isize, stop: isize, descending: bool) -> Vec<ScoredMember> {
        let Some((start, stop)) = normalize_rank(start, stop, self.len()) else {
            return Vec::new();
        };
        let take = stop - start + 1;
        let to_entry = |&(score, member): &(Score, Member)| ScoredMember::new(member, score);
        if descending {
            self.ordered
                .iter()
                .rev()
                .skip(start)
                .take(take)
                .map(to_entry)
                .collect()
        } else {
            self.ordered.iter().skip(start).take(take).map(to_entry).collect()
        }
    }
}

/// Process-local [`SortedSetStore`]. Empty sets are dropped, matching the
/// behaviour of key-value stores where an empty sorted set does not exist.
#[derive(Default)]
pub struct MemoryStore {
    sets: DashMap<String, SortedSet>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SortedSetStore for MemoryStore {
    async fn scores_by_range(
        &self,
        key: &str,
        min: Score,
        max: Score,
        descending: bool,
    ) -> Result<Vec<ScoredMember>, StoreError> {
        Ok(self
            .sets
            .get(key)
            .map(|set| set.range_by_score(min, max, descending))
            .unwrap_or_default())
    }

    async fn range_with_scores(
        &self,
        key: &str,
        start: isize,
        stop: isize,
        descending: bool,
    ) -> Result<Vec<ScoredMember>, StoreError> {
        Ok(self
            .sets
            .get(key)
            .map(|set| set.range_by_rank(start, stop, descending))
            .unwrap_or_default())
    }

    async fn score_of(&self, key: &str, member: Member) -> Result<Option<Score>, StoreError> {
        Ok(self.sets.get(key).and_then(|set| set.score(member)))
    }

    async fn scores_of(
        &self,
        key: &str,
        members: &[Member],
    ) -> Result<Vec<Option<Score>>, StoreError> {
        let Some(set) = self.sets.get(key) else {
            return Ok(vec![None; members.len()]);
        };
        Ok(members.iter().map(|&m| set.score(m)).collect())
    }

    async fn add(&self, key: &str, entries: &[(Score, Member)]) -> Result<(), StoreError> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut set = self.sets.entry(key.to_string()).or_default();
        for &(score, member) in entries {
            set.insert(score, member);
        }
        Ok(())
    }

    async fn remove(&self, key: &str, members: &[Member]) -> Result<(), StoreError> {
        let now_empty = match self.sets.get_mut(key) {
            Some(mut set) => {
                for &member in members {
                    set.remove(member);
                }
                set.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.sets.remove_if(key, |_, set| set.is_empty());
        }
        Ok(())
    }

    async fn delete_key(&self, key: &str) -> Result<(), StoreError> {
        self.sets.remove(key);
        Ok(())
    }

    async fn card(&self, key: &str) -> Result<usize, StoreError> {
        Ok(self.sets.get(key).map(|set| set.len()).unwrap_or(0))
    }
}
