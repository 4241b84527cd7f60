//! Per-topic read verdicts and tid filters.

use super::{UnreadService, is_guest};
use crate::error::{UnreadError, UnreadResult};
use crate::store::keys;
use crate::telemetry::{OperationTimer, spans};
use crate::{Score, Tid, Uid};
use futures_util::future::try_join_all;
use tracing::Instrument;

/// Whether one topic counts as read, from its three scores.
///
/// An override always means unread. Otherwise a topic is read when its
/// activity is older than `cutoff` (or unknown) or the user caught up with it.
fn read_verdict(
    recent: Option<Score>,
    user: Option<Score>,
    overridden: bool,
    cutoff: Score,
) -> bool {
    if overridden {
        return false;
    }
    match (recent, user) {
        (None, _) => true,
        (Some(recent), _) if recent < cutoff => true,
        (Some(recent), Some(user)) => user >= recent,
        (Some(_), None) => false,
    }
}

impl UnreadService {
    /// Read verdicts for `tids`, aligned with the input. Guests read nothing.
    pub async fn has_read_topics(&self, tids: &[Tid], uid: Uid) -> UnreadResult<Vec<bool>> {
        if is_guest(uid) {
            return Ok(vec![false; tids.len()]);
        }
        if tids.is_empty() {
            return Ok(Vec::new());
        }
        let timer = OperationTimer::new("has_read_topics");
        let result = self
            .has_read_inner(tids, uid)
            .instrument(spans::query("has_read_topics", uid, ""))
            .await;
        if let Err(e) = &result {
            timer.fail(e.error_code());
        }
        result
    }

    async fn has_read_inner(&self, tids: &[Tid], uid: Uid) -> UnreadResult<Vec<bool>> {
        let read_key = keys::tids_read(uid);
        let unread_key = keys::tids_unread(uid);

        let (recent, user, overrides) = tokio::try_join!(
            self.store.scores_of(keys::TOPICS_RECENT, tids),
            self.store.scores_of(&read_key, tids),
            self.store.scores_of(&unread_key, tids),
        )?;

        let cutoff = self.unread_cutoff();
        let verdicts: Vec<bool> = (0..tids.len())
            .map(|i| read_verdict(recent[i], user[i], overrides[i].is_some(), cutoff))
            .collect();

        if !self.config.block_aware_read_status {
            return Ok(verdicts);
        }

        // Unread only because of posts from blocked users counts as read.
        try_join_all(tids.iter().zip(verdicts).map(|(&tid, read)| async move {
            if read {
                return Ok(true);
            }
            let unblocked = self.has_unblocked_unread_posts(uid, tid).await?;
            Ok::<_, UnreadError>(!unblocked)
        }))
        .await
    }

    pub async fn has_read_topic(&self, tid: Tid, uid: Uid) -> UnreadResult<bool> {
        let verdicts = self.has_read_topics(&[tid], uid).await?;
        Ok(verdicts.first().copied().unwrap_or(false))
    }

    /// Whether `tid` has posts since the user's last read that were not
    /// written by someone the user blocked.
    pub async fn has_unblocked_unread_posts(&self, uid: Uid, tid: Tid) -> UnreadResult<bool> {
        let read_key = keys::tids_read(uid);
        let (topic_ts, read_ts) = tokio::try_join!(
            self.store.score_of(keys::TOPICS_RECENT, tid),
            self.store.score_of(&read_key, tid),
        )?;
        let Some(read_ts) = read_ts else {
            return Ok(true);
        };

        let since_read = self
            .store
            .scores_by_range(&keys::topic_posts(tid), read_ts, Score::MAX, true)
            .await?;
        if since_read.is_empty() {
            return Ok(topic_ts.is_some_and(|ts| ts > read_ts));
        }

        let pids: Vec<i64> = since_read.into_iter().map(|e| e.member).collect();
        let authors = self.collab.posts.posts_authors(&pids).await?;
        let unblocked = self
            .collab
            .blocks
            .filter_unblocked(uid, authors.into_iter().flatten().collect())
            .await?;
        Ok(!unblocked.is_empty())
    }

    /// Keep tids the user has no read score for.
    pub async fn filter_new_tids(&self, tids: &[Tid], uid: Uid) -> UnreadResult<Vec<Tid>> {
        let scores = self.store.scores_of(&keys::tids_read(uid), tids).await?;
        Ok(tids
            .iter()
            .zip(scores)
            .filter(|(tid, score)| **tid > 0 && score.is_none())
            .map(|(&tid, _)| tid)
            .collect())
    }

    /// Keep tids with at most one post. Unknown post counts pass.
    pub async fn filter_unreplied_tids(&self, tids: &[Tid]) -> UnreadResult<Vec<Tid>> {
        let scores = self.store.scores_of(keys::TOPICS_POSTS, tids).await?;
        Ok(tids
            .iter()
            .zip(scores)
            .filter(|(tid, score)| **tid > 0 && score.unwrap_or(0) <= 1)
            .map(|(&tid, _)| tid)
            .collect())
    }

    /// Keep tids the user follows.
    pub async fn filter_watched_tids(&self, tids: &[Tid], uid: Uid) -> UnreadResult<Vec<Tid>> {
        let scores = self.store.scores_of(&keys::followed_tids(uid), tids).await?;
        Ok(tids
            .iter()
            .zip(scores)
            .filter(|(_, score)| score.is_some())
            .map(|(&tid, _)| tid)
            .collect())
    }
}
