//! Ordered unread tid resolution and pagination.

use super::candidates::UnreadTest;
use super::{CategoryFilter, UnreadFilter, UnreadService, UnreadTopicsPage, UnreadTopicsQuery, is_guest};
use crate::error::{UnreadError, UnreadResult};
use crate::hooks::UnreadTidsContext;
use crate::store::keys;
use crate::telemetry::{OperationTimer, spans};
use crate::{Score, Tid, Uid};
use futures_util::TryFutureExt;
use std::collections::HashSet;
use tracing::{Instrument, debug};

impl UnreadService {
    /// Unread tids for `uid`, most recently active first.
    ///
    /// `cutoff` overrides the configured age limit for this call only; a
    /// non-positive value falls back to the configured one.
    pub async fn resolve_unread_tids(
        &self,
        uid: Uid,
        filter: UnreadFilter,
        cid: &CategoryFilter,
        cutoff: Option<Score>,
    ) -> UnreadResult<Vec<Tid>> {
        if is_guest(uid) {
            return Ok(Vec::new());
        }
        let timer = OperationTimer::new("resolve_unread_tids");
        let result = self
            .resolve_inner(uid, filter, cid, cutoff)
            .instrument(spans::query("resolve_unread_tids", uid, filter.as_str()))
            .await;
        if let Err(e) = &result {
            timer.fail(e.error_code());
        }
        result
    }

    async fn resolve_inner(
        &self,
        uid: Uid,
        filter: UnreadFilter,
        cid: &CategoryFilter,
        cutoff: Option<Score>,
    ) -> UnreadResult<Vec<Tid>> {
        let cutoff = cutoff
            .filter(|&c| c > 0)
            .unwrap_or_else(|| self.unread_cutoff());

        let sources = self.fetch_sources(uid, cutoff).await?;
        if sources.is_empty() {
            debug!(cutoff, "No recent or overridden topics");
            return Ok(Vec::new());
        }

        let test = match filter {
            UnreadFilter::New => UnreadTest::NeverRead,
            _ => UnreadTest::Stale,
        };
        let candidates = sources.into_candidates(test);
        crate::metrics::record_candidates(candidates.tids.len());

        let mut tids = match filter {
            UnreadFilter::Watched => self.filter_watched_tids(&candidates.tids, uid).await?,
            UnreadFilter::Unreplied => self.filter_unreplied_tids(&candidates.tids).await?,
            UnreadFilter::All | UnreadFilter::New => candidates.tids,
        };
        tids.truncate(self.config.max_candidates);

        let tids = if tids.is_empty() {
            tids
        } else {
            self.filter_visible(uid, filter, cid, tids).await?
        };

        let context = self.hooks.unread_tids.fire(UnreadTidsContext {
            uid,
            tids,
            cid: cid.clone(),
            filter,
        });
        debug!(count = context.tids.len(), "Resolved unread tids");
        Ok(context.tids)
    }

    /// Privilege, category, ignore and block filtering. Order is preserved.
    async fn filter_visible(
        &self,
        uid: Uid,
        filter: UnreadFilter,
        cid: &CategoryFilter,
        tids: Vec<Tid>,
    ) -> UnreadResult<Vec<Tid>> {
        let tids = self.collab.privileges.filter_readable_tids(&tids, uid).await?;

        let follow_key = keys::followed_tids(uid);
        let skip_follows = matches!(filter, UnreadFilter::Watched | UnreadFilter::New);
        let skip_ignored_cids = filter == UnreadFilter::Watched;

        let (topics, follows, ignored_cids) = tokio::try_join!(
            self.collab.topics.topics_fields(&tids).map_err(UnreadError::from),
            async {
                if skip_follows {
                    Ok(vec![None; tids.len()])
                } else {
                    self.store
                        .scores_of(&follow_key, &tids)
                        .await
                        .map_err(UnreadError::from)
                }
            },
            async {
                if skip_ignored_cids {
                    Ok(HashSet::new())
                } else {
                    self.collab
                        .ignores
                        .ignored_cids(uid)
                        .await
                        .map_err(UnreadError::from)
                }
            },
        )?;

        let mut dropped = 0usize;
        let visible: Vec<_> = topics
            .into_iter()
            .zip(follows)
            .filter_map(|(topic, followed)| {
                let Some(topic) = topic else {
                    dropped += 1;
                    return None;
                };
                let topic_cid = topic.cid?;
                let keep = (followed.is_some() || !ignored_cids.contains(&topic_cid))
                    && cid.matches(topic_cid);
                keep.then(|| topic.authored())
            })
            .collect();
        if dropped > 0 {
            debug!(dropped, "Dropped unread tids without topic records");
        }

        let unblocked = self.collab.blocks.filter_unblocked(uid, visible).await?;
        Ok(unblocked.into_iter().map(|r| r.id).collect())
    }

    /// Number of unread topics for `uid` under `filter`, any category.
    pub async fn total_unread(&self, uid: Uid, filter: UnreadFilter) -> UnreadResult<usize> {
        let tids = self
            .resolve_unread_tids(uid, filter, &CategoryFilter::any(), None)
            .await?;
        Ok(tids.len())
    }

    /// Resolve, slice and hydrate one page of unread topics.
    pub async fn unread_topics(&self, query: &UnreadTopicsQuery) -> UnreadResult<UnreadTopicsPage> {
        let mut page = UnreadTopicsPage {
            show_select: true,
            ..Default::default()
        };

        let tids = self
            .resolve_unread_tids(query.uid, query.filter, &query.cid, query.cutoff)
            .await?;
        page.topic_count = tids.len();
        if tids.is_empty() {
            return Ok(page);
        }

        let slice = page_slice(&tids, query.start, query.stop);
        if slice.is_empty() {
            return Ok(page);
        }

        let topics = self.collab.topics.topics_by_tids(slice, query.uid).await?;
        if topics.is_empty() {
            return Ok(page);
        }
        page.topics = topics;
        page.next_start = query.stop + 1;
        Ok(page)
    }
}

/// Inclusive `start..=stop` slice; a negative `stop` runs to the end.
fn page_slice(tids: &[Tid], start: usize, stop: i64) -> &[Tid] {
    let start = start.min(tids.len());
    let end = if stop < 0 {
        tids.len()
    } else {
        (stop as usize).saturating_add(1).min(tids.len())
    };
    if start >= end {
        return &[];
    }
    &tids[start..end]
}
