//! Redb-backed persistent sorted-set store.
//!
//! Implements [`SortedSetStore`] over two redb tables:
//! - `zset_members`: `key\0member` -> score, for point lookups
//! - `zset_index`: `key\0score\0member` -> member, for ordered range scans
//!
//! Scores and members are written as fixed-width, sign-flipped decimal so
//! that lexicographic key order matches numeric order.

use super::{Member, ScoredMember, SortedSetStore, StoreError, normalize_rank};
use crate::Score;
use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::sync::Arc;

const MEMBERS_TABLE: TableDefinition<&str, i64> = TableDefinition::new("zset_members");
const INDEX_TABLE: TableDefinition<&str, i64> = TableDefinition::new("zset_index");

fn db_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Database(e.to_string())
}

/// Order-preserving fixed-width encoding of an `i64`.
fn encode(value: i64) -> String {
    format!("{:020}", (value as u64) ^ (1 << 63))
}

fn decode(encoded: &str) -> Result<i64, StoreError> {
    encoded
        .parse::<u64>()
        .map(|v| (v ^ (1 << 63)) as i64)
        .map_err(|e| StoreError::Serialization(e.to_string()))
}

fn member_key(key: &str, member: Member) -> String {
    format!("{}\0{}", key, encode(member))
}

fn index_key(key: &str, score: Score, member: Member) -> String {
    format!("{}\0{}\0{}", key, encode(score), encode(member))
}

/// Bounds covering every entry of `key` in either table.
fn key_bounds(key: &str) -> (String, String) {
    (format!("{}\0", key), format!("{}\u{1}", key))
}

/// Parse `key\0score\0member` back into its score and member.
fn parse_index_key(raw: &str) -> Result<ScoredMember, StoreError> {
    let mut parts = raw.rsplitn(3, '\0');
    let member = parts.next().ok_or_else(|| bad_key(raw))?;
    let score = parts.next().ok_or_else(|| bad_key(raw))?;
    Ok(ScoredMember::new(decode(member)?, decode(score)?))
}

fn bad_key(raw: &str) -> StoreError {
    StoreError::Serialization(format!("malformed index key: {:?}", raw))
}

pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    pub fn new(path: &str) -> Result<Self, StoreError> {
        let db = Database::create(path).map_err(db_err)?;

        // Create both tables up front so read transactions never miss them.
        let write_txn = db.begin_write().map_err(db_err)?;
        {
            write_txn.open_table(MEMBERS_TABLE).map_err(db_err)?;
            write_txn.open_table(INDEX_TABLE).map_err(db_err)?;
        }
        write_txn.commit().map_err(db_err)?;

        Ok(Self { db: Arc::new(db) })
    }

    fn scan(&self, start: &str, end: &str, descending: bool) -> Result<Vec<ScoredMember>, StoreError> {
        let read_txn = self.db.begin_read().map_err(db_err)?;
        let index = read_txn.open_table(INDEX_TABLE).map_err(db_err)?;
        let range = index.range(start..end).map_err(db_err)?;

        let mut entries = Vec::new();
        if descending {
            for item in range.rev() {
                let (k, _) = item.map_err(db_err)?;
                entries.push(parse_index_key(k.value())?);
            }
        } else {
            for item in range {
                let (k, _) = item.map_err(db_err)?;
                entries.push(parse_index_key(k.value())?);
            }
        }
        Ok(entries)
    }
}

#[async_trait]
impl SortedSetStore for RedbStore {
    async fn scores_by_range(
        &self,
        key: &str,
        min: Score,
        max: Score,
        descending: bool,
    ) -> Result<Vec<ScoredMember>, StoreError> {
        if min > max {
            return Ok(Vec::new());
        }
        let start = format!("{}\0{}\0", key, encode(min));
        let end = format!("{}\0{}\u{1}", key, encode(max));
        self.scan(&start, &end, descending)
    }

    async fn range_with_scores(
        &self,
        key: &str,
        start: isize,
        stop: isize,
        descending: bool,
    ) -> Result<Vec<ScoredMember>, StoreError> {
        let (lo, hi) = key_bounds(key);
        let all = self.scan(&lo, &hi, descending)?;
        let Some((start, stop)) = normalize_rank(start, stop, all.len()) else {
            return Ok(Vec::new());
        };
        Ok(all[start..=stop].to_vec())
    }

    async fn score_of(&self, key: &str, member: Member) -> Result<Option<Score>, StoreError> {
        let read_txn = self.db.begin_read().map_err(db_err)?;
        let table = read_txn.open_table(MEMBERS_TABLE).map_err(db_err)?;
        let score = table
            .get(member_key(key, member).as_str())
            .map_err(db_err)?
            .map(|v| v.value());
        Ok(score)
    }

    async fn scores_of(
        &self,
        key: &str,
        members: &[Member],
    ) -> Result<Vec<Option<Score>>, StoreError> {
        let read_txn = self.db.begin_read().map_err(db_err)?;
        let table = read_txn.open_table(MEMBERS_TABLE).map_err(db_err)?;
        let mut scores = Vec::with_capacity(members.len());
        for &member in members {
            let score = table
                .get(member_key(key, member).as_str())
                .map_err(db_err)?
                .map(|v| v.value());
            scores.push(score);
        }
        Ok(scores)
    }

    async fn add(&self, key: &str, entries: &[(Score, Member)]) -> Result<(), StoreError> {
        if entries.is_empty() {
            return Ok(());
        }
        let write_txn = self.db.begin_write().map_err(db_err)?;
        {
            let mut members = write_txn.open_table(MEMBERS_TABLE).map_err(db_err)?;
            let mut index = write_txn.open_table(INDEX_TABLE).map_err(db_err)?;
            for &(score, member) in entries {
                let mkey = member_key(key, member);
                let old = members
                    .insert(mkey.as_str(), score)
                    .map_err(db_err)?
                    .map(|v| v.value());
                if let Some(old) = old {
                    index
                        .remove(index_key(key, old, member).as_str())
                        .map_err(db_err)?;
                }
                index
                    .insert(index_key(key, score, member).as_str(), member)
                    .map_err(db_err)?;
            }
        }
        write_txn.commit().map_err(db_err)?;
        Ok(())
    }

    async fn remove(&self, key: &str, members: &[Member]) -> Result<(), StoreError> {
        if members.is_empty() {
            return Ok(());
        }
        let write_txn = self.db.begin_write().map_err(db_err)?;
        {
            let mut member_table = write_txn.open_table(MEMBERS_TABLE).map_err(db_err)?;
            let mut index = write_txn.open_table(INDEX_TABLE).map_err(db_err)?;
            for &member in members {
                let old = member_table
                    .remove(member_key(key, member).as_str())
                    .map_err(db_err)?
                    .map(|v| v.value());
                if let Some(old) = old {
                    index
                        .remove(index_key(key, old, member).as_str())
                        .map_err(db_err)?;
                }
            }
        }
        write_txn.commit().map_err(db_err)?;
        Ok(())
    }

    async fn delete_key(&self, key: &str) -> Result<(), StoreError> {
        let (lo, hi) = key_bounds(key);
        let write_txn = self.db.begin_write().map_err(db_err)?;
        {
            let mut members = write_txn.open_table(MEMBERS_TABLE).map_err(db_err)?;
            let mut index = write_txn.open_table(INDEX_TABLE).map_err(db_err)?;

            let mut member_keys = Vec::new();
            for item in members.range(lo.as_str()..hi.as_str()).map_err(db_err)? {
                let (k, _) = item.map_err(db_err)?;
                member_keys.push(k.value().to_string());
            }
            let mut index_keys = Vec::new();
            for item in index.range(lo.as_str()..hi.as_str()).map_err(db_err)? {
                let (k, _) = item.map_err(db_err)?;
                index_keys.push(k.value().to_string());
            }

            for k in member_keys {
                members.remove(k.as_str()).map_err(db_err)?;
            }
            for k in index_keys {
                index.remove(k.as_str()).map_err(db_err)?;
            }
        }
        write_txn.commit().map_err(db_err)?;
        Ok(())
    }

    async fn card(&self, key: &str) -> Result<usize, StoreError> {
        let (lo, hi) = key_bounds(key);
        let read_txn = self.db.begin_read().map_err(db_err)?;
        let table = read_txn.open_table(MEMBERS_TABLE).map_err(db_err)?;
        let mut count = 0;
        for item in table.range(lo.as_str()..hi.as_str()).map_err(db_err)? {
            item.map_err(db_err)?;
            count += 1;
        }
        Ok(count)
    }
}
