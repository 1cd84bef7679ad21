//! JSON-file backed tables.
//!
//! Every store in the gateway is a set of [`JsonTable`]s: an in-memory
//! `BTreeMap` behind a `tokio::sync::RwLock`, loaded once at startup and
//! written back as a pretty-printed JSON array after each mutation.
//! Writes go to a temporary file that is renamed over the old one, so a
//! crash mid-write leaves the previous snapshot intact.

pub mod cursor;
pub mod directory;
pub mod health;
pub mod records;

pub use cursor::SchedulerCursor;
pub use directory::ElderDirectory;
pub use health::{HealthDataStore, HealthRecordSink, RecordHealthData};
pub use records::CallRecordStore;

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};

use cc_domain::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};

/// A row type that knows its own primary key.
pub trait Keyed {
    type Key: Ord + Clone + Debug + Send + Sync;

    fn key(&self) -> Self::Key;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// JsonTable
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct JsonTable<T: Keyed> {
    name: &'static str,
    inner: RwLock<BTreeMap<T::Key, T>>,
    path: PathBuf,
    /// Serializes snapshot + write so an older snapshot never lands last.
    persist_lock: Mutex<()>,
}

impl<T> JsonTable<T>
where
    T: Keyed + Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Load `dir/file`, or start empty when the file does not exist yet.
    pub fn open(dir: &Path, name: &'static str) -> Result<Self> {
        let path = dir.join(format!("{name}.json"));
        let map = load_rows(&path)?;
        if !map.is_empty() {
            tracing::info!(table = name, count = map.len(), "loaded table from disk");
        }

        Ok(Self {
            name,
            inner: RwLock::new(map),
            path,
            persist_lock: Mutex::new(()),
        })
    }

    /// Replace the in-memory rows with the file's current contents.
    ///
    /// For tables another process may write to; the gateway's own tables
    /// are only ever written through `self`.
    pub async fn reload(&self) -> Result<()> {
        let _guard = self.persist_lock.lock().await;
        let path = self.path.clone();
        let map = tokio::task::spawn_blocking(move || load_rows::<T>(&path))
            .await
            .map_err(|e| Error::Other(format!("reload task for {} panicked: {e}", self.name)))??;
        *self.inner.write().await = map;
        Ok(())
    }

    pub async fn get(&self, key: &T::Key) -> Option<T> {
        self.inner.read().await.get(key).cloned()
    }

    pub async fn list(&self) -> Vec<T> {
        self.inner.read().await.values().cloned().collect()
    }

    pub async fn filter(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        self.inner
            .read()
            .await
            .values()
            .filter(|row| pred(row))
            .cloned()
            .collect()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn upsert(&self, row: T) -> Result<()> {
        self.write(|map| {
            map.insert(row.key(), row);
            Ok(())
        })
        .await
    }

    /// Mutate one row in place. `NotFound` when the key is absent; an
    /// error from `f` aborts the write without persisting.
    pub async fn update<R>(&self, key: &T::Key, f: impl FnOnce(&mut T) -> Result<R>) -> Result<R> {
        let name = self.name;
        self.write(|map| match map.get_mut(key) {
            Some(row) => f(row),
            None => Err(Error::NotFound(format!("{name} {key:?}"))),
        })
        .await
    }

    /// Drop every row for which `keep` returns false. Returns the number
    /// of rows removed.
    pub async fn retain(&self, keep: impl Fn(&T) -> bool) -> Result<usize> {
        self.write(|map| {
            let before = map.len();
            map.retain(|_, row| keep(row));
            Ok(before - map.len())
        })
        .await
    }

    /// Run `f` against the map under the write lock, then persist.
    ///
    /// Read-check-write sequences (idempotent inserts, version checks)
    /// belong inside `f` so they are atomic with respect to other writers.
    pub async fn write<R>(&self, f: impl FnOnce(&mut BTreeMap<T::Key, T>) -> Result<R>) -> Result<R> {
        let out = {
            let mut map = self.inner.write().await;
            f(&mut map)?
        };
        self.persist().await?;
        Ok(out)
    }

    async fn persist(&self) -> Result<()> {
        let _guard = self.persist_lock.lock().await;
        let json = {
            let map = self.inner.read().await;
            let rows: Vec<&T> = map.values().collect();
            serde_json::to_string_pretty(&rows)?
        };

        let path = self.path.clone();
        let table = self.name;
        tokio::task::spawn_blocking(move || write_atomic(&path, json.as_bytes()))
            .await
            .map_err(|e| Error::Other(format!("persist task for {table} panicked: {e}")))?
            .map_err(|e| {
                tracing::warn!(table, error = %e, "failed to persist table");
                Error::Io(e)
            })
    }
}

fn load_rows<T: Keyed + DeserializeOwned>(path: &Path) -> Result<BTreeMap<T::Key, T>> {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(e.into()),
    };
    let rows: Vec<T> = serde_json::from_str(&data)
        .map_err(|e| Error::Other(format!("corrupt table {}: {e}", path.display())))?;
    Ok(rows.into_iter().map(|row| (row.key(), row)).collect())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IdSequence
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Monotonic integer ids, seeded past the largest id already on disk.
pub struct IdSequence(AtomicI64);

impl IdSequence {
    pub fn after(max_existing: Option<i64>) -> Self {
        Self(AtomicI64::new(max_existing.unwrap_or(0) + 1))
    }

    pub fn next(&self) -> i64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Row {
        id: i64,
        label: String,
    }

    impl Keyed for Row {
        type Key = i64;
        fn key(&self) -> i64 {
            self.id
        }
    }

    fn row(id: i64, label: &str) -> Row {
        Row { id, label: label.into() }
    }

    #[tokio::test]
    async fn rows_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let table = JsonTable::<Row>::open(dir.path(), "rows").unwrap();
            table.upsert(row(2, "b")).await.unwrap();
            table.upsert(row(1, "a")).await.unwrap();
        }
        let table = JsonTable::<Row>::open(dir.path(), "rows").unwrap();
        assert_eq!(table.list().await, vec![row(1, "a"), row(2, "b")]);
        assert!(!dir.path().join("rows.json.tmp").exists());
    }

    #[tokio::test]
    async fn failed_update_does_not_mutate() {
        let dir = tempfile::tempdir().unwrap();
        let table = JsonTable::<Row>::open(dir.path(), "rows").unwrap();
        table.upsert(row(1, "a")).await.unwrap();

        let err = table
            .update(&1, |r| {
                if r.label == "a" {
                    return Err(Error::Conflict("stale".into()));
                }
                r.label = "changed".into();
                Ok(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(table.get(&1).await.unwrap().label, "a");

        let missing = table.update(&9, |_| Ok(())).await.unwrap_err();
        assert!(matches!(missing, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn retain_reports_removed_rows() {
        let dir = tempfile::tempdir().unwrap();
        let table = JsonTable::<Row>::open(dir.path(), "rows").unwrap();
        for i in 1..=4 {
            table.upsert(row(i, "x")).await.unwrap();
        }
        assert_eq!(table.retain(|r| r.id % 2 == 0).await.unwrap(), 2);
        assert_eq!(table.len().await, 2);
    }

    #[tokio::test]
    async fn reload_picks_up_writes_from_another_handle() {
        let dir = tempfile::tempdir().unwrap();
        let reader = JsonTable::<Row>::open(dir.path(), "rows").unwrap();
        let writer = JsonTable::<Row>::open(dir.path(), "rows").unwrap();
        writer.upsert(row(1, "a")).await.unwrap();

        assert!(reader.get(&1).await.is_none());
        reader.reload().await.unwrap();
        assert_eq!(reader.get(&1).await, Some(row(1, "a")));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("rows.json"), "{not json").unwrap();
        assert!(JsonTable::<Row>::open(dir.path(), "rows").is_err());
    }

    #[test]
    fn id_sequence_starts_after_max() {
        let ids = IdSequence::after(Some(41));
        assert_eq!(ids.next(), 42);
        assert_eq!(ids.next(), 43);
        assert_eq!(IdSequence::after(None).next(), 1);
    }
}
