//! Request and result types for unread queries.

use crate::collaborators::TopicRecord;
use crate::{Cid, Score, Uid};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Named unread filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum UnreadFilter {
    /// Every unread topic (`""`).
    #[default]
    #[serde(rename = "")]
    All,
    /// Topics the user has never read.
    #[serde(rename = "new")]
    New,
    /// Unread topics the user follows.
    #[serde(rename = "watched")]
    Watched,
    /// Unread topics without replies.
    #[serde(rename = "unreplied")]
    Unreplied,
}

impl UnreadFilter {
    pub const ALL: [UnreadFilter; 4] = [Self::All, Self::New, Self::Watched, Self::Unreplied];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "",
            Self::New => "new",
            Self::Watched => "watched",
            Self::Unreplied => "unreplied",
        }
    }

    /// Parse a filter name. Unrecognised names behave like [`UnreadFilter::All`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "new" => Self::New,
            "watched" => Self::Watched,
            "unreplied" => Self::Unreplied,
            _ => Self::All,
        }
    }
}

impl From<String> for UnreadFilter {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl fmt::Display for UnreadFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category restriction for unread queries.
///
/// Ids are compared as strings. An empty restriction matches every category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryFilter {
    cids: Vec<String>,
}

impl CategoryFilter {
    /// No restriction.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn single(cid: impl ToString) -> Self {
        Self {
            cids: vec![cid.to_string()],
        }
    }

    pub fn of<I, T>(cids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToString,
    {
        Self {
            cids: cids.into_iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn is_any(&self) -> bool {
        self.cids.is_empty()
    }

    pub fn cids(&self) -> &[String] {
        &self.cids
    }

    pub fn matches(&self, cid: Cid) -> bool {
        if self.cids.is_empty() {
            return true;
        }
        let cid = cid.to_string();
        self.cids.iter().any(|c| *c == cid)
    }
}

/// Unread totals per filter bucket. Buckets overlap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadCounts {
    #[serde(rename = "")]
    pub all: usize,
    pub new: usize,
    pub watched: usize,
    pub unreplied: usize,
}

impl UnreadCounts {
    pub fn get(&self, filter: UnreadFilter) -> usize {
        match filter {
            UnreadFilter::All => self.all,
            UnreadFilter::New => self.new,
            UnreadFilter::Watched => self.watched,
            UnreadFilter::Unreplied => self.unreplied,
        }
    }
}

/// A page request over the resolved unread sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct UnreadTopicsQuery {
    pub uid: Uid,
    pub filter: UnreadFilter,
    pub cid: CategoryFilter,
    /// First index, inclusive.
    pub start: usize,
    /// Last index, inclusive. Negative means "to the end".
    pub stop: i64,
    /// Overrides the configured cutoff.
    pub cutoff: Option<Score>,
}

impl UnreadTopicsQuery {
    pub fn new(uid: Uid) -> Self {
        Self {
            uid,
            filter: UnreadFilter::All,
            cid: CategoryFilter::any(),
            start: 0,
            stop: -1,
            cutoff: None,
        }
    }

    pub fn filter(mut self, filter: UnreadFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn category(mut self, cid: CategoryFilter) -> Self {
        self.cid = cid;
        self
    }

    pub fn range(mut self, start: usize, stop: i64) -> Self {
        self.start = start;
        self.stop = stop;
        self
    }

    pub fn cutoff(mut self, cutoff: Score) -> Self {
        self.cutoff = Some(cutoff);
        self
    }
}

/// One page of hydrated unread topics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadTopicsPage {
    pub show_select: bool,
    pub next_start: i64,
    /// Length of the full resolved sequence, before slicing.
    pub topic_count: usize,
    pub topics: Vec<TopicRecord>,
}
