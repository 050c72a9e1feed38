//! Corpus snapshot management.
//!
//! The message corpus is owned by an external ingestion job that refreshes
//! it periodically. The pipeline only ever sees immutable, versioned
//! snapshots swapped wholesale through `SnapshotStore`, so concurrent
//! readers always observe a consistent corpus, never a partial update.

use crate::names::NameIndex;
use crate::types::MessageRecord;
use chrono::{DateTime, Utc};
use concierge_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, RwLock};

/// The ingestion feed payload, as the message API returns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusFeed {
    /// Total record count claimed by the feed
    pub total: u64,

    /// The message records
    pub items: Vec<MessageRecord>,
}

impl CorpusFeed {
    /// Parse a feed from a JSON reader.
    pub fn from_reader<R: std::io::Read>(reader: R) -> AppResult<Self> {
        let feed: CorpusFeed = serde_json::from_reader(reader)
            .map_err(|e| AppError::Corpus(format!("Failed to parse corpus feed: {}", e)))?;
        Ok(feed)
    }

    /// Parse a feed from a JSON file.
    pub fn from_json_file(path: &Path) -> AppResult<Self> {
        let file = std::fs::File::open(path)
            .map_err(|e| AppError::Corpus(format!("Failed to open feed {:?}: {}", path, e)))?;
        Self::from_reader(std::io::BufReader::new(file))
    }
}

/// An immutable, versioned view of the message corpus.
#[derive(Debug, Clone)]
pub struct CorpusSnapshot {
    version: u64,
    loaded_at: DateTime<Utc>,
    records: Vec<MessageRecord>,
    record_ids: HashSet<String>,
    user_ids: HashSet<String>,
    name_index: NameIndex,
}

impl CorpusSnapshot {
    /// Build a snapshot from a feed.
    ///
    /// The feed may be stale or partially cleaned; records with a blank id
    /// or user name are skipped with a warning, and duplicate ids keep the
    /// first occurrence.
    pub fn build(feed: CorpusFeed, version: u64) -> Self {
        let mut records: Vec<MessageRecord> = Vec::with_capacity(feed.items.len());
        let mut record_ids = HashSet::new();
        let mut user_ids = HashSet::new();
        let mut members: Vec<(String, String)> = Vec::new();

        for record in feed.items {
            if record.id.trim().is_empty() || record.user_name.trim().is_empty() {
                tracing::warn!("Skipping malformed feed record (blank id or user name)");
                continue;
            }

            if !record_ids.insert(record.id.clone()) {
                tracing::warn!(record_id = %record.id, "Skipping duplicate feed record");
                continue;
            }

            if user_ids.insert(record.user_id.clone()) {
                members.push((record.user_id.clone(), record.user_name.clone()));
            }

            records.push(record);
        }

        if feed.total as usize != records.len() {
            tracing::debug!(
                claimed = feed.total,
                actual = records.len(),
                "Feed total differs from usable record count"
            );
        }

        Self {
            version,
            loaded_at: Utc::now(),
            name_index: NameIndex::build(members),
            records,
            record_ids,
            user_ids,
        }
    }

    /// An empty snapshot (version 0), used before the first installation.
    pub fn empty() -> Self {
        Self::build(
            CorpusFeed {
                total: 0,
                items: Vec::new(),
            },
            0,
        )
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn records(&self) -> &[MessageRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of distinct members in the snapshot.
    pub fn member_count(&self) -> usize {
        self.user_ids.len()
    }

    /// Whether a record id exists in this snapshot.
    pub fn contains_record(&self, record_id: &str) -> bool {
        self.record_ids.contains(record_id)
    }

    /// Whether a member id exists in this snapshot.
    pub fn contains_user(&self, user_id: &str) -> bool {
        self.user_ids.contains(user_id)
    }

    /// The name classifier index over this snapshot's members.
    pub fn name_index(&self) -> &NameIndex {
        &self.name_index
    }
}

/// Shared holder for the current corpus snapshot.
///
/// Readers take a cheap `Arc` clone; the ingestion job replaces the whole
/// snapshot atomically via `install`. In-flight requests keep the snapshot
/// they started with.
#[derive(Debug)]
pub struct SnapshotStore {
    current: RwLock<Arc<CorpusSnapshot>>,
}

impl SnapshotStore {
    /// Create a store holding an empty snapshot.
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(CorpusSnapshot::empty())),
        }
    }

    /// Create a store pre-populated from a feed.
    pub fn with_feed(feed: CorpusFeed) -> Self {
        let store = Self::new();
        store.install(feed);
        store
    }

    /// The current snapshot. Never blocks on installations for long: the
    /// lock only guards the pointer swap.
    pub fn current(&self) -> Arc<CorpusSnapshot> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Replace the corpus wholesale and return the new version.
    pub fn install(&self, feed: CorpusFeed) -> u64 {
        let next_version = self.current().version() + 1;
        let snapshot = Arc::new(CorpusSnapshot::build(feed, next_version));

        tracing::info!(
            version = snapshot.version(),
            records = snapshot.records().len(),
            members = snapshot.member_count(),
            "Installed corpus snapshot"
        );

        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = snapshot;

        next_version
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(id: &str, user_id: &str, user_name: &str) -> MessageRecord {
        MessageRecord {
            id: id.to_string(),
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 11, 1, 8, 0, 0).unwrap(),
            message: "book a table".to_string(),
        }
    }

    fn feed(items: Vec<MessageRecord>) -> CorpusFeed {
        CorpusFeed {
            total: items.len() as u64,
            items,
        }
    }

    #[test]
    fn test_snapshot_build_and_lookups() {
        let snapshot = CorpusSnapshot::build(
            feed(vec![
                record("m-1", "u-1", "Hans Müller"),
                record("m-2", "u-2", "Elena Petrova"),
                record("m-3", "u-1", "Hans Müller"),
            ]),
            1,
        );

        assert_eq!(snapshot.records().len(), 3);
        assert_eq!(snapshot.member_count(), 2);
        assert!(snapshot.contains_record("m-2"));
        assert!(!snapshot.contains_record("m-9"));
        assert!(snapshot.contains_user("u-1"));
        assert_eq!(snapshot.name_index().len(), 2);
    }

    #[test]
    fn test_duplicate_record_ids_skipped() {
        let snapshot = CorpusSnapshot::build(
            feed(vec![
                record("m-1", "u-1", "Hans Müller"),
                record("m-1", "u-1", "Hans Müller"),
            ]),
            1,
        );

        assert_eq!(snapshot.records().len(), 1);
    }

    #[test]
    fn test_malformed_records_tolerated() {
        let snapshot = CorpusSnapshot::build(
            feed(vec![
                record("", "u-1", "Hans Müller"),
                record("m-2", "u-2", "  "),
                record("m-3", "u-3", "Elena Petrova"),
            ]),
            1,
        );

        assert_eq!(snapshot.records().len(), 1);
        assert_eq!(snapshot.records()[0].id, "m-3");
    }

    #[test]
    fn test_store_install_bumps_version() {
        let store = SnapshotStore::new();
        assert_eq!(store.current().version(), 0);
        assert!(store.current().is_empty());

        let v1 = store.install(feed(vec![record("m-1", "u-1", "Hans Müller")]));
        assert_eq!(v1, 1);
        assert_eq!(store.current().records().len(), 1);

        let v2 = store.install(feed(vec![
            record("m-1", "u-1", "Hans Müller"),
            record("m-2", "u-2", "Elena Petrova"),
        ]));
        assert_eq!(v2, 2);
        assert_eq!(store.current().records().len(), 2);
    }

    #[test]
    fn test_readers_keep_their_snapshot_across_installs() {
        let store = SnapshotStore::with_feed(feed(vec![record("m-1", "u-1", "Hans Müller")]));

        let held = store.current();
        store.install(feed(vec![record("m-2", "u-2", "Elena Petrova")]));

        // The held snapshot is unchanged; new readers see the replacement.
        assert!(held.contains_record("m-1"));
        assert!(!held.contains_record("m-2"));
        assert!(store.current().contains_record("m-2"));
    }

    #[test]
    fn test_feed_from_reader() {
        let json = r#"{
            "total": 1,
            "items": [{
                "id": "m-1",
                "user_id": "u-1",
                "user_name": "Hans Müller",
                "timestamp": "2025-11-01T08:00:00Z",
                "message": "book the first class for two"
            }]
        }"#;

        let feed = CorpusFeed::from_reader(json.as_bytes()).unwrap();
        assert_eq!(feed.total, 1);
        assert_eq!(feed.items[0].user_name, "Hans Müller");
    }

    #[test]
    fn test_feed_parse_error_is_corpus_error() {
        let result = CorpusFeed::from_reader("not json".as_bytes());
        assert!(matches!(result, Err(AppError::Corpus(_))));
    }
}
