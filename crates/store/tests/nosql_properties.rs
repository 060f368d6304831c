//! Contract tests run against every engine.

use std::sync::Arc;

use tether_store::{FileEngine, MemoryEngine, NoSqlDb, StorageEngine};

fn engines(dir: &tempfile::TempDir) -> Vec<(&'static str, Box<dyn StorageEngine>)> {
    vec![
        ("memory", Box::new(MemoryEngine)),
        ("file", Box::new(FileEngine::new(dir.path()))),
    ]
}

fn collect_range(db: &Arc<dyn NoSqlDb>, start: &str, end: &str) -> Vec<String> {
    let mut keys = Vec::new();
    db.iter_with_range(
        &mut |k, _| {
            keys.push(k.to_owned());
            false
        },
        start,
        end,
    );
    keys
}

#[test]
fn test_commit_then_get_returns_value() {
    let dir = tempfile::tempdir().unwrap();
    for (name, engine) in engines(&dir) {
        let db = engine.open("pluginA").unwrap();
        for (k, v) in [("score", "10"), ("", "empty-key"), ("unicode", "方块"), ("blank", "")] {
            db.commit(k, v);
            assert_eq!(db.get(k), v, "engine {name}, key {k:?}");
        }
    }
}

#[test]
fn test_delete_then_get_returns_sentinel() {
    let dir = tempfile::tempdir().unwrap();
    for (name, engine) in engines(&dir) {
        let db = engine.open("pluginA").unwrap();
        db.commit("score", "10");
        assert_eq!(db.get("score"), "10", "engine {name}");
        db.delete("score");
        assert_eq!(db.get("score"), "", "engine {name}");

        // Deleting a missing key is not an error.
        db.delete("never-written");
        assert_eq!(db.get("never-written"), "", "engine {name}");
    }
}

#[test]
fn test_range_is_half_open_and_ordered() {
    let dir = tempfile::tempdir().unwrap();
    for (name, engine) in engines(&dir) {
        let db = engine.open("ranges").unwrap();
        for key in ["m", "b", "a", "lz", "zz", "A", "ma"] {
            db.commit(key, "x");
        }
        assert_eq!(collect_range(&db, "a", "m"), vec!["a", "b", "lz"], "engine {name}");
        assert!(collect_range(&db, "m", "a").is_empty(), "engine {name}");
    }
}

#[test]
fn test_prefix_iteration_stops_on_request() {
    let dir = tempfile::tempdir().unwrap();
    for (name, engine) in engines(&dir) {
        let db = engine.open("prefix").unwrap();
        for key in ["log/1", "log/2", "log/3", "other"] {
            db.commit(key, key);
        }

        let mut visited = Vec::new();
        db.iter_with_prefix(
            &mut |k, _| {
                visited.push(k.to_owned());
                true
            },
            "log/",
        );
        assert_eq!(visited, vec!["log/1"], "engine {name}");

        let mut all = 0;
        db.iter_all(&mut |_, _| {
            all += 1;
            false
        });
        assert_eq!(all, 4, "engine {name}");
    }
}

#[test]
fn test_topics_are_independent() {
    let dir = tempfile::tempdir().unwrap();
    for (name, engine) in engines(&dir) {
        let a = engine.open("pluginA").unwrap();
        let b = engine.open("pluginB").unwrap();
        a.commit("shared-key", "from-a");
        assert_eq!(b.get("shared-key"), "", "engine {name}");
    }
}

#[test]
fn test_concurrent_commits_are_not_lost() {
    let dir = tempfile::tempdir().unwrap();
    let db = FileEngine::new(dir.path()).open("busy").unwrap();

    std::thread::scope(|scope| {
        for worker in 0..4 {
            let db = Arc::clone(&db);
            scope.spawn(move || {
                for i in 0..25 {
                    db.commit(&format!("w{worker}-{i:02}"), "1");
                }
            });
        }
    });

    let mut count = 0;
    db.iter_all(&mut |_, _| {
        count += 1;
        false
    });
    assert_eq!(count, 100);

    let reopened = FileEngine::new(dir.path()).open("busy").unwrap();
    assert_eq!(reopened.get("w3-24"), "1");
}
