//! The per-topic key-value contract and the ordered table both engines share.

use std::collections::BTreeMap;
use std::ops::Bound;

use parking_lot::RwLock;

use crate::StorageError;

/// Iteration callback. Returning `true` stops the iteration.
pub type IterCallback<'a> = &'a mut dyn FnMut(&str, &str) -> bool;

/// Key-value table for one topic.
///
/// `get` returns an empty string for a missing key. All iteration is in
/// lexicographic key order and runs over a snapshot, so callbacks may write to
/// the same table.
pub trait NoSqlDb: Send + Sync {
    fn get(&self, key: &str) -> String;

    fn delete(&self, key: &str);

    fn commit(&self, key: &str, value: &str);

    fn iter_all(&self, cb: IterCallback<'_>);

    fn iter_with_prefix(&self, cb: IterCallback<'_>, prefix: &str);

    /// Iterate keys in `[start, end)`.
    fn iter_with_range(&self, cb: IterCallback<'_>, start: &str, end: &str);

    /// Push buffered state to durable storage, if the engine has any.
    fn flush(&self) -> Result<(), StorageError> {
        Ok(())
    }

    /// Whether the last write failed to reach durable storage. A successful
    /// [`flush`](Self::flush) clears it.
    fn is_dirty(&self) -> bool {
        false
    }
}

/// Ordered in-memory table.
#[derive(Debug, Default)]
pub(crate) struct Table {
    rows: RwLock<BTreeMap<String, String>>,
}

impl Table {
    pub(crate) fn from_rows(rows: BTreeMap<String, String>) -> Self {
        Self {
            rows: RwLock::new(rows),
        }
    }

    pub(crate) fn get(&self, key: &str) -> String {
        self.rows.read().get(key).cloned().unwrap_or_default()
    }

    pub(crate) fn rows(&self) -> &RwLock<BTreeMap<String, String>> {
        &self.rows
    }

    pub(crate) fn snapshot_all(&self) -> Vec<(String, String)> {
        self.rows
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub(crate) fn snapshot_prefix(&self, prefix: &str) -> Vec<(String, String)> {
        self.rows
            .read()
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub(crate) fn snapshot_range(&self, start: &str, end: &str) -> Vec<(String, String)> {
        // BTreeMap::range panics on an inverted range.
        if start >= end {
            return Vec::new();
        }
        self.rows
            .read()
            .range::<str, _>((Bound::Included(start), Bound::Excluded(end)))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Feed a snapshot to a callback until it asks to stop.
pub(crate) fn drive(rows: Vec<(String, String)>, cb: IterCallback<'_>) {
    for (key, value) in &rows {
        if cb(key, value) {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        let mut rows = BTreeMap::new();
        for key in ["apple", "apricot", "banana", "m", "zebra"] {
            rows.insert(key.to_owned(), key.to_uppercase());
        }
        Table::from_rows(rows)
    }

    #[test]
    fn test_prefix_snapshot() {
        let keys: Vec<_> = table()
            .snapshot_prefix("ap")
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["apple", "apricot"]);
    }

    #[test]
    fn test_range_excludes_end() {
        let keys: Vec<_> = table()
            .snapshot_range("a", "m")
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["apple", "apricot", "banana"]);
    }

    #[test]
    fn test_inverted_range_is_empty() {
        assert!(table().snapshot_range("z", "a").is_empty());
        assert!(table().snapshot_range("m", "m").is_empty());
    }

    #[test]
    fn test_drive_stops_early() {
        let mut seen = Vec::new();
        drive(table().snapshot_all(), &mut |k, _| {
            seen.push(k.to_owned());
            seen.len() == 2
        });
        assert_eq!(seen, vec!["apple", "apricot"]);
    }
}
