//! topic-unread - inspect a user's unread topics.
//!
//! Seeds the configured store and an in-process directory from a TOML
//! fixture, then reports the user's unread counts and first page of
//! unread topics as JSON.

use serde::Deserialize;
use std::sync::Arc;
use topic_unread::collaborators::{MemoryDirectory, TopicRecord};
use topic_unread::config::validation;
use topic_unread::store::{SortedSetStore, keys};
use topic_unread::{
    Cid, Clock, Collaborators, Config, Pid, SystemClock, Tid, Uid, UnreadService,
    UnreadTopicsQuery,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default, Deserialize)]
struct Fixture {
    #[serde(default)]
    topics: Vec<FixtureTopic>,
    #[serde(default)]
    posts: Vec<FixturePost>,
    #[serde(default)]
    follows: Vec<UserTopic>,
    #[serde(default)]
    reads: Vec<UserTopicAt>,
    #[serde(default)]
    ignored_categories: Vec<UserCategory>,
    #[serde(default)]
    blocks: Vec<UserBlock>,
}

#[derive(Debug, Deserialize)]
struct FixtureTopic {
    tid: Tid,
    uid: Uid,
    cid: Option<Cid>,
    #[serde(default)]
    title: String,
    #[serde(default = "default_post_count")]
    post_count: u64,
    /// Seconds since last activity.
    age_secs: i64,
}

#[derive(Debug, Deserialize)]
struct FixturePost {
    pid: Pid,
    tid: Tid,
    uid: Uid,
    age_secs: i64,
}

#[derive(Debug, Deserialize)]
struct UserTopic {
    uid: Uid,
    tid: Tid,
}

#[derive(Debug, Deserialize)]
struct UserTopicAt {
    uid: Uid,
    tid: Tid,
    age_secs: i64,
}

#[derive(Debug, Deserialize)]
struct UserCategory {
    uid: Uid,
    cid: Cid,
}

#[derive(Debug, Deserialize)]
struct UserBlock {
    uid: Uid,
    blocked: Uid,
}

fn default_post_count() -> u64 {
    1
}

async fn seed(
    fixture: &Fixture,
    store: &dyn SortedSetStore,
    directory: &MemoryDirectory,
    now: i64,
) -> anyhow::Result<()> {
    let ago = |secs: i64| now - secs * 1000;

    for topic in &fixture.topics {
        directory.insert_topic(TopicRecord {
            tid: topic.tid,
            uid: topic.uid,
            cid: topic.cid,
            title: topic.title.clone(),
            post_count: topic.post_count,
        });
        store
            .add(keys::TOPICS_RECENT, &[(ago(topic.age_secs), topic.tid)])
            .await?;
        store
            .add(keys::TOPICS_POSTS, &[(topic.post_count as i64, topic.tid)])
            .await?;
    }
    for post in &fixture.posts {
        directory.insert_post(post.pid, post.uid);
        store
            .add(&keys::topic_posts(post.tid), &[(ago(post.age_secs), post.pid)])
            .await?;
    }
    for follow in &fixture.follows {
        store
            .add(&keys::followed_tids(follow.uid), &[(now, follow.tid)])
            .await?;
    }
    for read in &fixture.reads {
        store
            .add(&keys::tids_read(read.uid), &[(ago(read.age_secs), read.tid)])
            .await?;
    }
    for ignore in &fixture.ignored_categories {
        directory.ignore_category(ignore.uid, ignore.cid);
    }
    for block in &fixture.blocks {
        directory.block(block.uid, block.blocked);
    }

    info!(
        topics = fixture.topics.len(),
        posts = fixture.posts.len(),
        "Seeded fixture"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(config_path), Some(fixture_path), Some(uid)) = (args.next(), args.next(), args.next())
    else {
        anyhow::bail!("usage: topic-unread <config.toml> <fixture.toml> <uid>");
    };
    let uid: Uid = uid.parse()?;

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;
    if let Err(errors) = validation::validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        anyhow::bail!("{} configuration error(s) in {}", errors.len(), config_path);
    }

    topic_unread::metrics::init();

    let fixture: Fixture = toml::from_str(&std::fs::read_to_string(&fixture_path)?)?;
    let store = topic_unread::store::open(&config.store)?;
    let directory = Arc::new(MemoryDirectory::new());
    seed(&fixture, store.as_ref(), &directory, SystemClock.now_millis()).await?;

    let service = UnreadService::new(
        store,
        Collaborators::from_directory(Arc::clone(&directory)),
        config.unread.clone(),
    );

    let counts = service.unread_counts(uid).await?;
    info!(uid, ?counts, "Unread counts");

    let page = service
        .unread_topics(&UnreadTopicsQuery::new(uid).range(0, 19))
        .await?;
    info!(uid, total = page.topic_count, "Unread topics");

    let report = serde_json::json!({
        "uid": uid,
        "counts": counts,
        "page": page,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
