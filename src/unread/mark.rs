//! Read-state mutations.
//!
//! Writes are not serialized per user: a concurrent `mark_unread` landing
//! between the read-set writes and the override clear of `mark_all_read`
//! can be lost.

use super::{UnreadFilter, UnreadService, is_guest};
use crate::error::{UnreadError, UnreadResult};
use crate::hooks::MarkedReadContext;
use crate::store::keys;
use crate::telemetry::{OperationTimer, spans};
use crate::{Cid, Score, Tid, Uid};
use futures_util::TryFutureExt;
use std::collections::HashSet;
use tracing::{Instrument, debug, info, warn};

/// Realtime event carrying fresh unread totals.
pub const UNREAD_COUNT_EVENT: &str = "event:unread.updateCount";

impl UnreadService {
    /// Mark `tids` read for `uid`.
    ///
    /// Only topics with recent activity the user has not caught up with are
    /// written. Returns `false` when nothing changed.
    pub async fn mark_as_read(&self, tids: &[Tid], uid: Uid) -> UnreadResult<bool> {
        let timer = OperationTimer::new("mark_as_read");
        let result = async {
            let marked = self.mark_as_read_inner(tids, uid).await?;
            if marked {
                self.push_after_mutation(uid).await;
            }
            Ok::<_, UnreadError>(marked)
        }
        .instrument(spans::mutation("mark_as_read", uid, tids.len()))
        .await;
        if let Err(e) = &result {
            timer.fail(e.error_code());
        }
        result
    }

    async fn mark_as_read_inner(&self, tids: &[Tid], uid: Uid) -> UnreadResult<bool> {
        if is_guest(uid) || tids.is_empty() {
            return Ok(false);
        }

        let mut seen = HashSet::with_capacity(tids.len());
        let tids: Vec<Tid> = tids
            .iter()
            .copied()
            .filter(|&tid| tid > 0 && seen.insert(tid))
            .collect();
        if tids.is_empty() {
            return Ok(false);
        }

        let read_key = keys::tids_read(uid);
        let unread_key = keys::tids_unread(uid);

        let (topic_scores, user_scores) = tokio::try_join!(
            self.store.scores_of(keys::TOPICS_RECENT, &tids),
            self.store.scores_of(&read_key, &tids),
        )?;

        let stale: Vec<Tid> = tids
            .iter()
            .zip(topic_scores.iter().zip(&user_scores))
            .filter_map(|(&tid, (topic, user))| match (topic, user) {
                (Some(topic), Some(user)) if user >= topic => None,
                (Some(_), _) => Some(tid),
                (None, _) => None,
            })
            .collect();
        if stale.is_empty() {
            debug!("Topics already read");
            return Ok(false);
        }

        let now = self.now();
        let entries: Vec<(Score, Tid)> = stale.iter().map(|&tid| (now, tid)).collect();

        let ((), (), topics) = tokio::try_join!(
            self.store.add(&read_key, &entries).map_err(UnreadError::from),
            self.store.remove(&unread_key, &stale).map_err(UnreadError::from),
            self.collab.topics.topics_fields(&stale).map_err(UnreadError::from),
        )?;

        let mut cids: Vec<Cid> = Vec::new();
        for cid in topics.into_iter().flatten().filter_map(|t| t.cid) {
            if !cids.contains(&cid) {
                cids.push(cid);
            }
        }
        self.collab.categories.mark_categories_read(&cids, uid).await?;

        info!(count = stale.len(), "Marked topics read");
        crate::metrics::record_marked_read(stale.len());
        self.hooks
            .mark_as_read
            .fire(&MarkedReadContext { uid, tids: stale });
        Ok(true)
    }

    /// Force `tid` back to unread for `uid`, regardless of its age.
    pub async fn mark_unread(&self, tid: Tid, uid: Uid) -> UnreadResult<()> {
        let timer = OperationTimer::new("mark_unread");
        let result = async {
            if is_guest(uid) {
                return Ok(());
            }
            if !self.collab.topics.topic_exists(tid).await? {
                return Err(UnreadError::NoTopic(tid));
            }
            self.store.remove(&keys::tids_read(uid), &[tid]).await?;
            self.store
                .add(&keys::tids_unread(uid), &[(self.now(), tid)])
                .await?;
            info!(tid, "Marked topic unread");

            self.push_after_mutation(uid).await;
            Ok::<_, UnreadError>(())
        }
        .instrument(spans::mutation("mark_unread", uid, 1))
        .await;
        if let Err(e) = &result {
            timer.fail(e.error_code());
        }
        result
    }

    /// Mark every recent topic read and clear all unread overrides.
    ///
    /// Covers the unfiltered recent set, so topics the user cannot see are
    /// marked too. Returns whether any read score advanced.
    pub async fn mark_all_read(&self, uid: Uid) -> UnreadResult<bool> {
        let timer = OperationTimer::new("mark_all_read");
        let result = async {
            if is_guest(uid) {
                return Ok(false);
            }
            let recent = self
                .store
                .scores_by_range(keys::TOPICS_RECENT, self.unread_cutoff(), Score::MAX, true)
                .await?;
            let tids: Vec<Tid> = recent.into_iter().map(|e| e.member).collect();

            let (marked, notified) = tokio::join!(
                self.mark_as_read_inner(&tids, uid),
                self.mark_topic_notifications_read(&tids, uid),
            );
            let marked = marked?;
            self.store.delete_key(&keys::tids_unread(uid)).await?;
            // Notification failures do not fail the mutation.
            if let Err(e) = notified {
                warn!(error = %e, "Failed to mark topic notifications read");
            }
            info!(recent = tids.len(), marked, "Marked all topics read");

            self.push_after_mutation(uid).await;
            Ok::<_, UnreadError>(marked)
        }
        .instrument(spans::mutation("mark_all_read", uid, 0))
        .await;
        if let Err(e) = &result {
            timer.fail(e.error_code());
        }
        result
    }

    /// Mark `uid`'s unread notifications about `tids` read.
    pub async fn mark_topic_notifications_read(&self, tids: &[Tid], uid: Uid) -> UnreadResult<()> {
        if tids.is_empty() {
            return Ok(());
        }
        let notifications = &self.collab.notifications;
        let nids = notifications
            .unread_notification_ids_for(uid, "tid", tids)
            .await?;
        notifications.mark_read_multiple(&nids, uid).await?;
        notifications.push_notification_count(uid).await?;
        debug!(count = nids.len(), "Marked topic notifications read");
        Ok(())
    }

    /// Mark the category owning `tid` unread for every user.
    pub async fn mark_category_unread_for_all(&self, tid: Tid) -> UnreadResult<()> {
        let span = spans::topic("mark_category_unread_for_all", tid);
        async {
            let topics = self.collab.topics.topics_fields(&[tid]).await?;
            let cid = topics.into_iter().next().flatten().and_then(|t| t.cid);
            match cid {
                Some(cid) => {
                    self.collab
                        .categories
                        .mark_category_unread_for_all(cid)
                        .await?;
                }
                None => debug!("Topic has no category"),
            }
            Ok::<_, UnreadError>(())
        }
        .instrument(span)
        .await
    }

    /// Alias of [`mark_category_unread_for_all`](Self::mark_category_unread_for_all).
    pub async fn mark_as_unread_for_all(&self, tid: Tid) -> UnreadResult<()> {
        self.mark_category_unread_for_all(tid).await
    }

    /// Push fresh totals after a committed mutation. Failures are logged;
    /// the mutation itself already succeeded.
    async fn push_after_mutation(&self, uid: Uid) {
        if !self.config.push_on_mark {
            return;
        }
        if let Err(e) = self.push_unread_count(uid).await {
            warn!(error = %e, code = e.error_code(), "Failed to push unread count");
        }
    }

    /// Send the user's all/new/watched totals over the event sink.
    pub async fn push_unread_count(&self, uid: Uid) -> UnreadResult<()> {
        if is_guest(uid) {
            return Ok(());
        }
        let (all, new, watched) = tokio::try_join!(
            self.total_unread(uid, UnreadFilter::All),
            self.total_unread(uid, UnreadFilter::New),
            self.total_unread(uid, UnreadFilter::Watched),
        )?;
        let payload = serde_json::json!({
            "unreadTopicCount": all,
            "unreadNewTopicCount": new,
            "unreadWatchedTopicCount": watched,
        });
        self.collab
            .events
            .emit_to_user(uid, UNREAD_COUNT_EVENT, payload)
            .await?;
        Ok(())
    }
}
