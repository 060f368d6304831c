use crate::db::{drive, IterCallback, NoSqlDb, Table};

/// A topic that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryDb {
    table: Table,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NoSqlDb for MemoryDb {
    fn get(&self, key: &str) -> String {
        self.table.get(key)
    }

    fn delete(&self, key: &str) {
        self.table.rows().write().remove(key);
    }

    fn commit(&self, key: &str, value: &str) {
        self.table
            .rows()
            .write()
            .insert(key.to_owned(), value.to_owned());
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_get_delete() {
        let db = MemoryDb::new();
        db.commit("score", "10");
        assert_eq!(db.get("score"), "10");

        db.delete("score");
        assert_eq!(db.get("score"), "");
    }

    #[test]
    fn test_callback_may_write_during_iteration() {
        let db = MemoryDb::new();
        db.commit("a", "1");
        db.commit("b", "2");

        db.iter_all(&mut |key, _| {
            db.delete(key);
            false
        });

        assert_eq!(db.get("a"), "");
        assert_eq!(db.get("b"), "");
    }
}
