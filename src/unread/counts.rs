//! Unread totals for every filter bucket in one pass.

use super::candidates::UnreadTest;
use super::{CategoryFilter, UnreadCounts, UnreadService, is_guest};
use crate::error::{UnreadError, UnreadResult};
use crate::hooks::UnreadCountsContext;
use crate::store::keys;
use crate::telemetry::{OperationTimer, spans};
use crate::Uid;
use futures_util::TryFutureExt;
use tracing::{Instrument, debug};

impl UnreadService {
    /// Unread totals for `uid` across the `""`, `new`, `watched` and
    /// `unreplied` buckets. Guests get zeros without touching the store.
    pub async fn unread_counts(&self, uid: Uid) -> UnreadResult<UnreadCounts> {
        self.unread_counts_in(uid, &CategoryFilter::any()).await
    }

    /// Like [`unread_counts`](Self::unread_counts), restricted to `cid`.
    pub async fn unread_counts_in(
        &self,
        uid: Uid,
        cid: &CategoryFilter,
    ) -> UnreadResult<UnreadCounts> {
        if is_guest(uid) {
            return Ok(UnreadCounts::default());
        }
        let timer = OperationTimer::new("unread_counts");
        let result = self
            .counts_inner(uid, cid)
            .instrument(spans::query("unread_counts", uid, ""))
            .await;
        if let Err(e) = &result {
            timer.fail(e.error_code());
        }
        result
    }

    async fn counts_inner(&self, uid: Uid, cid: &CategoryFilter) -> UnreadResult<UnreadCounts> {
        let cutoff = self.unread_cutoff();

        let sources = self.fetch_sources(uid, cutoff).await?;
        if sources.is_empty() {
            debug!(cutoff, "No recent or overridden topics");
            return Ok(UnreadCounts::default());
        }

        let mut candidates = sources.into_candidates(UnreadTest::Stale);
        crate::metrics::record_candidates(candidates.tids.len());
        candidates.tids.truncate(self.config.max_candidates);

        let counts = if candidates.tids.is_empty() {
            UnreadCounts::default()
        } else {
            let follow_key = keys::followed_tids(uid);
            let tids = &candidates.tids;
            let (topics, follows, ignored_cids) = tokio::try_join!(
                self.collab.topics.topics_fields(tids).map_err(UnreadError::from),
                self.store.scores_of(&follow_key, tids).map_err(UnreadError::from),
                self.collab.ignores.ignored_cids(uid).map_err(UnreadError::from),
            )?;

            let mut counts = UnreadCounts::default();
            for (topic, followed) in topics.into_iter().zip(follows) {
                let Some(topic) = topic else { continue };
                let Some(topic_cid) = topic.cid else { continue };
                if !cid.matches(topic_cid) {
                    continue;
                }
                let followed = followed.is_some();

                if followed || !ignored_cids.contains(&topic_cid) {
                    counts.all += 1;
                }
                if followed {
                    counts.watched += 1;
                }
                if topic.post_count == 1 {
                    counts.unreplied += 1;
                }
                if !candidates.read_scores.contains_key(&topic.tid) {
                    counts.new += 1;
                }
            }
            counts
        };

        let context = self
            .hooks
            .unread_counts
            .fire(UnreadCountsContext { uid, counts });
        debug!(counts = ?context.counts, "Computed unread counts");
        Ok(context.counts)
    }
}
