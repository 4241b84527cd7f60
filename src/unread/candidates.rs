//! Candidate construction shared by resolution and counting.

use super::UnreadService;
use crate::error::{UnreadError, UnreadResult};
use crate::store::{ScoredMember, keys};
use crate::{Score, Tid, Uid};
use futures_util::TryFutureExt;
use std::collections::{HashMap, HashSet};

/// Which read-score comparison decides that a topic is unread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnreadTest {
    /// Unread only if there is no read score at all.
    NeverRead,
    /// Unread if there is no read score, or activity moved past it.
    Stale,
}

/// Raw inputs fetched for one user.
#[derive(Debug, Default)]
pub(crate) struct UnreadSources {
    pub ignored_tids: HashSet<Tid>,
    /// Recent activity at or above the cutoff, descending.
    pub recent: Vec<ScoredMember>,
    /// Read scores at or above the cutoff, descending.
    pub user_scores: Vec<ScoredMember>,
    /// The whole unread-override set, descending.
    pub overrides: Vec<ScoredMember>,
}

/// Deduplicated unread tids in recency order, with the read scores used.
#[derive(Debug, Default)]
pub(crate) struct Candidates {
    pub tids: Vec<Tid>,
    pub read_scores: HashMap<Tid, Score>,
}

impl UnreadSources {
    /// Nothing recent and nothing forced unread.
    pub fn is_empty(&self) -> bool {
        self.recent.is_empty() && self.overrides.is_empty()
    }

    pub fn into_candidates(self, test: UnreadTest) -> Candidates {
        let read_scores: HashMap<Tid, Score> = self
            .user_scores
            .iter()
            .map(|e| (e.member, e.score))
            .collect();

        let mut merged = self.recent;
        merged.extend(self.overrides);
        // Stable: equal scores keep concatenation order.
        merged.sort_by(|a, b| b.score.cmp(&a.score));

        let mut seen = HashSet::with_capacity(merged.len());
        let tids = merged
            .into_iter()
            .filter(|entry| !self.ignored_tids.contains(&entry.member))
            .filter(|entry| match (test, read_scores.get(&entry.member)) {
                (_, None) => true,
                (UnreadTest::NeverRead, Some(_)) => false,
                (UnreadTest::Stale, Some(&read)) => entry.score > read,
            })
            .map(|entry| entry.member)
            .filter(|tid| seen.insert(*tid))
            .collect();

        Candidates { tids, read_scores }
    }
}

impl UnreadService {
    /// Fetch ignored tids, recent activity, read scores and overrides in
    /// parallel.
    pub(crate) async fn fetch_sources(&self, uid: Uid, cutoff: Score) -> UnreadResult<UnreadSources> {
        let read_key = keys::tids_read(uid);
        let unread_key = keys::tids_unread(uid);

        let (ignored_tids, recent, user_scores, overrides) = tokio::try_join!(
            self.collab.ignores.ignored_tids(uid).map_err(UnreadError::from),
            self.store
                .scores_by_range(keys::TOPICS_RECENT, cutoff, Score::MAX, true)
                .map_err(UnreadError::from),
            self.store
                .scores_by_range(&read_key, cutoff, Score::MAX, true)
                .map_err(UnreadError::from),
            self.store
                .range_with_scores(&unread_key, 0, -1, true)
                .map_err(UnreadError::from),
        )?;

        Ok(UnreadSources {
            ignored_tids,
            recent,
            user_scores,
            overrides,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(pairs: &[(Tid, Score)]) -> Vec<ScoredMember> {
        pairs.iter().map(|&(m, s)| ScoredMember::new(m, s)).collect()
    }

    #[test]
    fn merge_orders_by_score_and_dedupes() {
        let sources = UnreadSources {
            recent: entries(&[(1, 100), (2, 50)]),
            overrides: entries(&[(2, 300), (3, 10)]),
            ..Default::default()
        };
        let candidates = sources.into_candidates(UnreadTest::Stale);
        assert_eq!(candidates.tids, vec![2, 1, 3]);
    }

    #[test]
    fn equal_scores_keep_concatenation_order() {
        let sources = UnreadSources {
            recent: entries(&[(5, 100), (4, 100)]),
            overrides: entries(&[(9, 100)]),
            ..Default::default()
        };
        let candidates = sources.into_candidates(UnreadTest::Stale);
        assert_eq!(candidates.tids, vec![5, 4, 9]);
    }

    #[test]
    fn ignored_tids_are_dropped() {
        let sources = UnreadSources {
            ignored_tids: HashSet::from([1]),
            recent: entries(&[(1, 100), (2, 50)]),
            ..Default::default()
        };
        assert_eq!(sources.into_candidates(UnreadTest::Stale).tids, vec![2]);
    }

    #[test]
    fn stale_test_compares_scores() {
        let sources = UnreadSources {
            recent: entries(&[(1, 100), (2, 50), (3, 40)]),
            user_scores: entries(&[(1, 100), (2, 20)]),
            ..Default::default()
        };
        assert_eq!(sources.into_candidates(UnreadTest::Stale).tids, vec![2, 3]);
    }

    #[test]
    fn never_read_test_ignores_scores() {
        let sources = UnreadSources {
            recent: entries(&[(1, 100), (2, 50), (3, 40)]),
            user_scores: entries(&[(1, 100), (2, 20)]),
            ..Default::default()
        };
        assert_eq!(sources.into_candidates(UnreadTest::NeverRead).tids, vec![3]);
    }

    #[test]
    fn later_duplicate_read_entry_is_skipped_but_earlier_survives() {
        // Override at 300 beats read score 200; the recent entry at 100 does
        // not, but the tid is already in the result.
        let sources = UnreadSources {
            recent: entries(&[(7, 100)]),
            user_scores: entries(&[(7, 200)]),
            overrides: entries(&[(7, 300)]),
            ..Default::default()
        };
        assert_eq!(sources.into_candidates(UnreadTest::Stale).tids, vec![7]);
    }

    #[test]
    fn empty_sources() {
        assert!(UnreadSources::default().is_empty());
        let sources = UnreadSources {
            overrides: entries(&[(1, 1)]),
            ..Default::default()
        };
        assert!(!sources.is_empty());
    }
}
