//! Unread tid resolution: ordering, cutoff, filters and visibility.

mod common;

use common::{DAY, HOUR, MINUTE, NOW, TestForum, untouchable_service};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use topic_unread::collaborators::TopicRecord;
use topic_unread::store::{SortedSetStore, keys};
use topic_unread::{CategoryFilter, UnreadConfig, UnreadError, UnreadFilter, UnreadTopicsQuery};

#[tokio::test]
async fn guests_resolve_nothing_without_store_access() {
    let service = untouchable_service();
    for uid in [0, -1] {
        for filter in UnreadFilter::ALL {
            let tids = service
                .resolve_unread_tids(uid, filter, &CategoryFilter::any(), None)
                .await
                .unwrap();
            assert!(tids.is_empty());
        }
    }
}

#[tokio::test]
async fn stale_read_is_unread_and_caught_up_is_not() {
    let forum = TestForum::new();
    forum.topic(1, 10, 2, 100).await;
    forum.topic(2, 10, 2, 50).await;
    forum.read_at(1, 1, 100).await;

    let tids = forum
        .service
        .resolve_unread_tids(1, UnreadFilter::All, &CategoryFilter::any(), Some(10))
        .await
        .unwrap();
    assert_eq!(tids, vec![2]);

    forum.service.mark_unread(2, 1).await.unwrap();
    assert!(forum.service.mark_as_read(&[2], 1).await.unwrap());

    let tids = forum
        .service
        .resolve_unread_tids(1, UnreadFilter::All, &CategoryFilter::any(), Some(10))
        .await
        .unwrap();
    assert!(tids.is_empty());
}

#[tokio::test]
async fn zero_cutoff_uses_configured_age_limit() {
    let forum = TestForum::new();
    forum.topic(1, 10, 2, NOW - 5 * DAY).await;
    forum.topic(2, 10, 2, NOW - HOUR).await;

    for cutoff in [0, -1] {
        let tids = forum
            .service
            .resolve_unread_tids(1, UnreadFilter::All, &CategoryFilter::any(), Some(cutoff))
            .await
            .unwrap();
        assert_eq!(tids, vec![2]);
    }

    let page = forum
        .service
        .unread_topics(&UnreadTopicsQuery::new(1).cutoff(0))
        .await
        .unwrap();
    assert_eq!(page.topic_count, 1);
}

#[tokio::test]
async fn most_recent_activity_first() {
    let forum = TestForum::new();
    forum.topic(1, 10, 2, NOW - 3 * HOUR).await;
    forum.topic(2, 10, 2, NOW - HOUR).await;
    forum.topic(3, 10, 2, NOW - 2 * HOUR).await;

    assert_eq!(forum.unread(1).await, vec![2, 3, 1]);
}

#[tokio::test]
async fn activity_before_cutoff_is_not_unread() {
    let forum = TestForum::new();
    forum.topic(1, 10, 2, NOW - 3 * DAY).await;
    forum.topic(2, 10, 2, NOW - HOUR).await;

    assert_eq!(forum.unread(1).await, vec![2]);
}

#[tokio::test]
async fn cutoff_days_come_from_config() {
    let forum = TestForum::with_config(UnreadConfig {
        cutoff_days: 7,
        ..Default::default()
    });
    forum.topic(1, 10, 2, NOW - 3 * DAY).await;

    assert_eq!(forum.unread(1).await, vec![1]);
}

#[tokio::test]
async fn huge_cutoff_days_reach_back_without_overflow() {
    let forum = TestForum::with_config(UnreadConfig {
        cutoff_days: 200_000_000_000,
        ..Default::default()
    });
    forum.topic(1, 10, 2, 1).await;

    assert_eq!(forum.unread(1).await, vec![1]);
    assert_eq!(forum.service.unread_counts(1).await.unwrap().all, 1);
    assert!(!forum.service.has_read_topic(1, 1).await.unwrap());
}

#[tokio::test]
async fn override_surfaces_old_topic() {
    let forum = TestForum::new();
    forum.topic(1, 10, 2, NOW - 10 * DAY).await;
    forum.topic(2, 10, 2, NOW - 2 * HOUR).await;
    forum.read_at(1, 1, NOW - 9 * DAY).await;

    forum.clock.advance(MINUTE);
    forum.service.mark_unread(1, 1).await.unwrap();

    // The override is scored at mark time, so it sorts ahead of older activity.
    assert_eq!(forum.unread(1).await, vec![1, 2]);
}

#[tokio::test]
async fn override_is_not_duplicated_with_recent_entry() {
    let forum = TestForum::new();
    forum.topic(1, 10, 2, NOW - HOUR).await;
    forum.service.mark_unread(1, 1).await.unwrap();

    assert_eq!(forum.unread(1).await, vec![1]);
}

#[tokio::test]
async fn new_filter_excludes_topics_read_before() {
    let forum = TestForum::new();
    forum.topic(1, 10, 2, NOW - HOUR).await;
    forum.topic(2, 10, 2, NOW - 2 * HOUR).await;
    forum.read_at(1, 1, NOW - 5 * HOUR).await;

    assert_eq!(forum.unread(1).await, vec![1, 2]);
    assert_eq!(forum.unread_with(1, UnreadFilter::New).await, vec![2]);
}

#[tokio::test]
async fn watched_filter_keeps_followed_topics() {
    let forum = TestForum::new();
    forum.topic(1, 10, 2, NOW - HOUR).await;
    forum.topic(2, 10, 2, NOW - 2 * HOUR).await;
    forum.follow(1, 2).await;

    assert_eq!(forum.unread_with(1, UnreadFilter::Watched).await, vec![2]);
}

#[tokio::test]
async fn watched_filter_ignores_category_ignores() {
    let forum = TestForum::new();
    forum.topic(1, 20, 2, NOW - HOUR).await;
    forum.topic(2, 20, 2, NOW - 2 * HOUR).await;
    forum.follow(1, 1).await;
    forum.directory.ignore_category(1, 20);

    assert_eq!(forum.unread_with(1, UnreadFilter::Watched).await, vec![1]);
}

#[tokio::test]
async fn unreplied_filter_keeps_single_post_topics() {
    let forum = TestForum::new();
    forum.topic(1, 10, 2, NOW - 3 * HOUR).await;
    forum.topic(2, 10, 2, NOW - 3 * HOUR).await;
    forum.reply(1, 100, 3, NOW - HOUR).await;

    assert_eq!(forum.unread(1).await, vec![1, 2]);
    assert_eq!(forum.unread_with(1, UnreadFilter::Unreplied).await, vec![2]);
}

#[tokio::test]
async fn ignored_topics_are_dropped() {
    let forum = TestForum::new();
    forum.topic(1, 10, 2, NOW - HOUR).await;
    forum.topic(2, 10, 2, NOW - 2 * HOUR).await;
    forum.directory.ignore_topic(1, 1);

    assert_eq!(forum.unread(1).await, vec![2]);
}

#[tokio::test]
async fn ignored_topic_stays_hidden_even_when_overridden() {
    let forum = TestForum::new();
    forum.topic(1, 10, 2, NOW - HOUR).await;
    forum.directory.ignore_topic(1, 1);
    forum.service.mark_unread(1, 1).await.unwrap();

    assert!(forum.unread(1).await.is_empty());
}

#[tokio::test]
async fn ignored_category_hidden_unless_followed() {
    let forum = TestForum::new();
    forum.topic(1, 20, 2, NOW - HOUR).await;
    forum.topic(2, 20, 2, NOW - 2 * HOUR).await;
    forum.topic(3, 10, 2, NOW - 3 * HOUR).await;
    forum.directory.ignore_category(1, 20);
    forum.follow(1, 2).await;

    assert_eq!(forum.unread(1).await, vec![2, 3]);
    // The new filter does not consult follows.
    assert_eq!(forum.unread_with(1, UnreadFilter::New).await, vec![3]);
}

#[tokio::test]
async fn category_restriction() {
    let forum = TestForum::new();
    forum.topic(1, 10, 2, NOW - HOUR).await;
    forum.topic(2, 20, 2, NOW - 2 * HOUR).await;
    forum.topic(3, 30, 2, NOW - 3 * HOUR).await;

    let only_20 = forum
        .service
        .resolve_unread_tids(1, UnreadFilter::All, &CategoryFilter::single(20), None)
        .await
        .unwrap();
    assert_eq!(only_20, vec![2]);

    let several = forum
        .service
        .resolve_unread_tids(1, UnreadFilter::All, &CategoryFilter::of([10, 30]), None)
        .await
        .unwrap();
    assert_eq!(several, vec![1, 3]);
}

#[tokio::test]
async fn unreadable_categories_are_hidden() {
    let forum = TestForum::new();
    forum.topic(1, 10, 2, NOW - HOUR).await;
    forum.topic(2, 99, 2, NOW - 2 * HOUR).await;
    forum.directory.deny_category(1, 99);

    assert_eq!(forum.unread(1).await, vec![1]);
    assert_eq!(forum.unread(5).await, vec![1, 2]);
}

#[tokio::test]
async fn topics_by_blocked_authors_are_hidden() {
    let forum = TestForum::new();
    forum.topic(1, 10, 66, NOW - HOUR).await;
    forum.topic(2, 10, 2, NOW - 2 * HOUR).await;
    forum.directory.block(1, 66);

    assert_eq!(forum.unread(1).await, vec![2]);
}

#[tokio::test]
async fn tids_without_topic_records_are_dropped() {
    let forum = TestForum::new();
    forum.topic(1, 10, 2, NOW - HOUR).await;
    forum
        .store
        .add(keys::TOPICS_RECENT, &[(NOW - MINUTE, 404)])
        .await
        .unwrap();

    assert_eq!(forum.unread(1).await, vec![1]);
}

#[tokio::test]
async fn candidate_cap_applies_before_visibility() {
    let forum = TestForum::with_config(UnreadConfig {
        max_candidates: 3,
        ..Default::default()
    });
    for tid in 1..=5 {
        forum.topic(tid, 10, 2, NOW - tid * MINUTE).await;
    }
    forum.directory.deny_category(1, 10);
    forum.topic(6, 20, 2, NOW - HOUR).await;

    // Topic 6 falls outside the first three candidates.
    assert!(forum.unread(1).await.is_empty());
    assert_eq!(forum.unread(2).await, vec![1, 2, 3]);
}

#[tokio::test]
async fn hook_can_rewrite_tids() {
    let forum = TestForum::new();
    forum.topic(1, 10, 2, NOW - HOUR).await;
    forum.topic(2, 10, 2, NOW - 2 * HOUR).await;

    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    forum.service.hooks().unread_tids.register(move |mut ctx| {
        counter.fetch_add(1, Ordering::SeqCst);
        assert_eq!(ctx.filter, UnreadFilter::All);
        assert!(ctx.cid.is_any());
        ctx.tids.retain(|&tid| tid != 1);
        ctx
    });

    assert_eq!(forum.unread(1).await, vec![2]);
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn hook_skipped_when_nothing_is_recent() {
    let forum = TestForum::new();
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    forum.service.hooks().unread_tids.register(move |ctx| {
        counter.fetch_add(1, Ordering::SeqCst);
        ctx
    });

    assert!(forum.unread(1).await.is_empty());
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn total_unread_matches_resolution() {
    let forum = TestForum::new();
    forum.topic(1, 10, 2, NOW - HOUR).await;
    forum.topic(2, 10, 2, NOW - 2 * HOUR).await;
    forum.follow(1, 1).await;

    assert_eq!(forum.service.total_unread(1, UnreadFilter::All).await.unwrap(), 2);
    assert_eq!(forum.service.total_unread(1, UnreadFilter::Watched).await.unwrap(), 1);
    assert_eq!(forum.service.total_unread(0, UnreadFilter::All).await.unwrap(), 0);
}

#[tokio::test]
async fn unread_topics_pages_through_sequence() {
    let forum = TestForum::new();
    for tid in 1..=5 {
        forum.topic(tid, 10, 2, NOW - tid * MINUTE).await;
    }

    let page = forum
        .service
        .unread_topics(&UnreadTopicsQuery::new(1).range(1, 2))
        .await
        .unwrap();
    assert!(page.show_select);
    assert_eq!(page.topic_count, 5);
    assert_eq!(page.next_start, 3);
    let tids: Vec<_> = page.topics.iter().map(|t| t.tid).collect();
    assert_eq!(tids, vec![2, 3]);

    let rest = forum
        .service
        .unread_topics(&UnreadTopicsQuery::new(1).range(3, -1))
        .await
        .unwrap();
    let tids: Vec<_> = rest.topics.iter().map(|t: &TopicRecord| t.tid).collect();
    assert_eq!(tids, vec![4, 5]);
}

#[tokio::test]
async fn unread_topics_empty_page() {
    let forum = TestForum::new();
    forum.topic(1, 10, 2, NOW - HOUR).await;

    let past_end = forum
        .service
        .unread_topics(&UnreadTopicsQuery::new(1).range(5, 9))
        .await
        .unwrap();
    assert_eq!(past_end.topic_count, 1);
    assert_eq!(past_end.next_start, 0);
    assert!(past_end.topics.is_empty());

    let nothing = forum
        .service
        .unread_topics(&UnreadTopicsQuery::new(1).filter(UnreadFilter::Watched))
        .await
        .unwrap();
    assert_eq!(nothing.topic_count, 0);
    assert!(nothing.topics.is_empty());
}

#[tokio::test]
async fn unread_topics_page_serializes_camel_case() {
    let forum = TestForum::new();
    forum.topic(1, 10, 2, NOW - HOUR).await;

    let page = forum
        .service
        .unread_topics(&UnreadTopicsQuery::new(1).range(0, 19))
        .await
        .unwrap();
    let json = serde_json::to_value(&page).unwrap();
    assert_eq!(json["showSelect"], true);
    assert_eq!(json["nextStart"], 20);
    assert_eq!(json["topicCount"], 1);
}

#[tokio::test]
async fn collaborator_failure_propagates() {
    let forum = TestForum::new();
    forum.topic(1, 10, 2, NOW - HOUR).await;
    forum.directory.set_outage(Some("privileges"));

    let err = forum
        .service
        .resolve_unread_tids(1, UnreadFilter::All, &CategoryFilter::any(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, UnreadError::Service(_)));
}
