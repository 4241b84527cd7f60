//! Sorted-set key layout.

use crate::{Tid, Uid};

/// Global recent activity: tid -> timestamp of last creation/reply/move.
pub const TOPICS_RECENT: &str = "topics:recent";

/// Global reply counts: tid -> number of posts in the topic.
pub const TOPICS_POSTS: &str = "topics:posts";

/// Per-user read set: tid -> timestamp the user last read it.
pub fn tids_read(uid: Uid) -> String {
    format!("uid:{}:tids_read", uid)
}

/// Per-user explicit unread overrides: tid -> timestamp it was marked unread.
pub fn tids_unread(uid: Uid) -> String {
    format!("uid:{}:tids_unread", uid)
}

/// Per-user follow set: tid -> timestamp followed.
pub fn followed_tids(uid: Uid) -> String {
    format!("uid:{}:followed_tids", uid)
}

/// Posts in a topic: pid -> post timestamp.
pub fn topic_posts(tid: Tid) -> String {
    format!("tid:{}:posts", tid)
}
