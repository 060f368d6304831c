//! File-backed topic: an ordered table snapshotted to one JSON file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::db::{drive, IterCallback, NoSqlDb, Table};
use crate::{write_atomic, StorageError};

/// Topic persisted as a JSON object of strings.
///
/// Every mutation rewrites the snapshot through [`write_atomic`] while the
/// table's write lock is held, so physical writes happen in the same order as
/// the in-memory ones and the last commit wins on disk as well.
///
/// A failed snapshot leaves the table dirty: memory keeps the new value and
/// [`NoSqlDb::flush`] retries the write, returning the error until it lands.
#[derive(Debug)]
pub struct FileDb {
    path: PathBuf,
    table: Table,
    dirty: AtomicBool,
}

impl FileDb {
    /// Open a topic file, loading it if it exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let rows = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str::<BTreeMap<String, String>>(&content)?
            }
        } else {
            BTreeMap::new()
        };

        tracing::debug!("Opened topic file {} ({} keys)", path.display(), rows.len());
        Ok(Self {
            path,
            table: Table::from_rows(rows),
            dirty: AtomicBool::new(false),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, rows: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let data = serde_json::to_vec(rows)?;
        let result = write_atomic(&self.path, &data);
        self.dirty.store(result.is_err(), Ordering::SeqCst);
        result
    }

    fn mutate(&self, op: impl FnOnce(&mut BTreeMap<String, String>)) {
        let mut rows = self.table.rows().write();
        op(&mut rows);
        if let Err(e) = self.persist(&rows) {
            tracing::error!("Failed to persist topic file {}: {}", self.path.display(), e);
        }
    }
}

impl NoSqlDb for FileDb {
    fn get(&self, key: &str) -> String {
        self.table.get(key)
    }

    fn delete(&self, key: &str) {
        self.mutate(|rows| {
            rows.remove(key);
        });
    }

    fn commit(&self, key: &str, value: &str) {
        self.mutate(|rows| {
            rows.insert(key.to_owned(), value.to_owned());
        });
    }

    fn iter_all(&self, cb: IterCallback<'_>) {
        drive(self.table.snapshot_all(), cb);
    }

    fn iter_with_prefix(&self, cb: IterCallback<'_>, prefix: &str) {
        drive(self.table.snapshot_prefix(prefix), cb);
    }

    fn iter_with_range(&self, cb: IterCallback<'_>, start: &str, end: &str) {
        drive(self.table.snapshot_range(start, end), cb);
    }

    fn flush(&self) -> Result<(), StorageError> {
        let rows = self.table.rows().read();
        self.persist(&rows)
    }

    fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }
}
