//! Prompt usage tracking.
//!
//! Records when each template was last used so listings can put recently
//! used prompts first. Usage never affects expansion output.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use crate::models::UsageRecord;
use crate::{Error, Result, current_timestamp};

/// On-disk format of the usage file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct UsageFile {
    #[serde(default)]
    records: Vec<UsageRecord>,
}

/// Tracks per-template last-use timestamps.
#[derive(Debug, Default)]
pub struct UsageTracker {
    records: RwLock<BTreeMap<String, u64>>,
    path: Option<PathBuf>,
}

impl UsageTracker {
    /// Creates a tracker that keeps records in memory only.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads a tracker persisted at `path`; a missing file starts empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => {
                let file: UsageFile = serde_json::from_str(&contents)
                    .map_err(|e| Error::operation("parse_usage_file", e))?;
                file.records
                    .into_iter()
                    .map(|r| (r.title, r.last_used))
                    .collect()
            },
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(Error::operation("read_usage_file", e)),
        };

        tracing::debug!(path = %path.display(), records = records.len(), "Loaded usage records");
        Ok(Self {
            records: RwLock::new(records),
            path: Some(path),
        })
    }

    /// Returns the persistence path, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Marks `title` as used now and returns the timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error if the records cannot be persisted.
    pub async fn touch(&self, title: &str) -> Result<u64> {
        let now = current_timestamp();
        self.record(title, now).await?;
        Ok(now)
    }

    /// Sets the last-use timestamp of `title`.
    ///
    /// # Errors
    ///
    /// Returns an error if the records cannot be persisted.
    pub async fn record(&self, title: &str, last_used: u64) -> Result<()> {
        let mut records = self.records.write().await;
        records.insert(title.to_string(), last_used);
        self.persist(&records).await
    }

    /// Returns the ranking score of `title` (its last-use epoch, 0 if never).
    pub async fn score(&self, title: &str) -> u64 {
        self.records.read().await.get(title).copied().unwrap_or(0)
    }

    /// Moves the record of `old` to `new`, if there is one.
    ///
    /// # Errors
    ///
    /// Returns an error if the records cannot be persisted.
    pub async fn rename(&self, old: &str, new: &str) -> Result<()> {
        let mut records = self.records.write().await;
        let Some(last_used) = records.remove(old) else {
            return Ok(());
        };
        records.insert(new.to_string(), last_used);
        self.persist(&records).await
    }

    /// Removes the record of `title`; returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the records cannot be persisted.
    pub async fn remove(&self, title: &str) -> Result<bool> {
        let mut records = self.records.write().await;
        if records.remove(title).is_none() {
            return Ok(false);
        }
        self.persist(&records).await?;
        Ok(true)
    }

    /// Drops records whose title is not in `existing`; returns how many.
    ///
    /// # Errors
    ///
    /// Returns an error if the records cannot be persisted.
    pub async fn prune(&self, existing: &BTreeSet<String>) -> Result<usize> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|title, _| existing.contains(title));
        let pruned = before - records.len();
        if pruned > 0 {
            tracing::debug!(pruned, "Pruned stale usage records");
            self.persist(&records).await?;
        }
        Ok(pruned)
    }

    /// Returns all records, ordered by title.
    pub async fn records(&self) -> Vec<UsageRecord> {
        self.records
            .read()
            .await
            .iter()
            .map(|(title, last_used)| UsageRecord {
                title: title.clone(),
                last_used: *last_used,
            })
            .collect()
    }

    /// Writes the records to disk through a temporary file.
    async fn persist(&self, records: &BTreeMap<String, u64>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let file = UsageFile {
            records: records
                .iter()
                .map(|(title, last_used)| UsageRecord {
                    title: title.clone(),
                    last_used: *last_used,
                })
                .collect(),
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| Error::operation("serialize_usage", e))?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::operation("write_usage_file", e))?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| Error::operation("write_usage_file", e))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| Error::operation("write_usage_file", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_record_rename_remove() {
        let tracker = UsageTracker::in_memory();
        tracker.record("A", 10).await.unwrap();
        tracker.record("B", 20).await.unwrap();

        assert_eq!(tracker.score("A").await, 10);
        assert_eq!(tracker.score("missing").await, 0);

        tracker.rename("A", "C").await.unwrap();
        assert_eq!(tracker.score("A").await, 0);
        assert_eq!(tracker.score("C").await, 10);

        assert!(tracker.remove("B").await.unwrap());
        assert!(!tracker.remove("B").await.unwrap());
    }

    #[tokio::test]
    async fn test_touch_uses_current_time() {
        let tracker = UsageTracker::in_memory();
        let stamped = tracker.touch("A").await.unwrap();
        assert!(stamped > 0);
        assert_eq!(tracker.score("A").await, stamped);
    }

    #[tokio::test]
    async fn test_prune() {
        let tracker = UsageTracker::in_memory();
        tracker.record("keep", 1).await.unwrap();
        tracker.record("gone", 2).await.unwrap();

        let existing: BTreeSet<String> = std::iter::once("keep".to_string()).collect();
        assert_eq!(tracker.prune(&existing).await.unwrap(), 1);

        let records = tracker.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "keep");
    }

    #[tokio::test]
    async fn test_persistence_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("usage.json");

        let tracker = UsageTracker::load(&path).await.unwrap();
        tracker.record("Summarize", 42).await.unwrap();
        assert!(path.exists());

        let reloaded = UsageTracker::load(&path).await.unwrap();
        assert_eq!(reloaded.score("Summarize").await, 42);
    }

    #[tokio::test]
    async fn test_load_rejects_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("usage.json");
        std::fs::write(&path, "not json").unwrap();

        let err = UsageTracker::load(&path).await.unwrap_err();
        assert!(err.to_string().contains("parse_usage_file"));
    }
}
