//! Namespaced persistence and per-topic log sinks.
//!
//! Each plugin picks a topic and gets three things under it: a key-value
//! table, an append-only log, and a flat data file (raw bytes or JSON). Topics
//! are shared by design; two plugins that pick the same topic see the same
//! data.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use store::{
    sanitize_topic, write_atomic, EngineKind, FileEngine, IterCallback, MemoryEngine, NoSqlDb, StorageEngine,
    StorageError,
};

use crate::config::StorageSettings;
use crate::logger::{FileLineSink, LineDst};

const DATA_DIR: &str = "data";
const DB_DIR: &str = "db";

/// Table handle handed out by the provider. Once the provider is sealed,
/// writes through it are dropped.
struct SealableDb {
    topic: String,
    inner: Arc<dyn NoSqlDb>,
    sealed: Arc<AtomicBool>,
}

impl SealableDb {
    fn writable(&self, op: &str, key: &str) -> bool {
        if self.sealed.load(Ordering::SeqCst) {
            tracing::warn!("Dropped {} of '{}' in sealed topic '{}'", op, key, self.topic);
            return false;
        }
        true
    }
}

impl NoSqlDb for SealableDb {
    fn get(&self, key: &str) -> String {
        self.inner.get(key)
    }

    fn delete(&self, key: &str) {
        if self.writable("delete", key) {
            self.inner.delete(key);
        }
    }

    fn commit(&self, key: &str, value: &str) {
        if self.writable("commit", key) {
            self.inner.commit(key, value);
        }
    }

    fn iter_all(&self, cb: IterCallback<'_>) {
        self.inner.iter_all(cb);
    }

    fn iter_with_prefix(&self, cb: IterCallback<'_>, prefix: &str) {
        self.inner.iter_with_prefix(cb, prefix);
    }

    fn iter_with_range(&self, cb: IterCallback<'_>, start: &str, end: &str) {
        self.inner.iter_with_range(cb, start, end);
    }

    fn flush(&self) -> Result<(), StorageError> {
        self.inner.flush()
    }

    fn is_dirty(&self) -> bool {
        self.inner.is_dirty()
    }
}

pub struct StorageProvider {
    root: PathBuf,
    log_dir: PathBuf,
    engine: Box<dyn StorageEngine>,
    topics: DashMap<String, Arc<dyn NoSqlDb>>,
    loggers: DashMap<String, Arc<FileLineSink>>,
    file_locks: DashMap<PathBuf, Arc<Mutex<()>>>,
    sealed: Arc<AtomicBool>,
}

impl StorageProvider {
    pub fn new(root: impl Into<PathBuf>, log_dir: impl Into<PathBuf>, engine: Box<dyn StorageEngine>) -> Self {
        Self {
            root: root.into(),
            log_dir: log_dir.into(),
            engine,
            topics: DashMap::new(),
            loggers: DashMap::new(),
            file_locks: DashMap::new(),
            sealed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Provider with the engine selected in the settings.
    pub fn from_settings(settings: &StorageSettings) -> Self {
        let engine: Box<dyn StorageEngine> = match settings.engine {
            EngineKind::Memory => Box::new(MemoryEngine),
            EngineKind::File => Box::new(FileEngine::new(settings.root.join(DB_DIR))),
        };
        Self::new(settings.root.clone(), settings.resolved_log_dir(), engine)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Refuse every later write. Reads and [`flush`](Self::flush) keep working.
    pub fn seal(&self) {
        self.sealed.store(true, Ordering::SeqCst);
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::SeqCst)
    }

    fn ensure_writable(&self) -> Result<(), StorageError> {
        if self.is_sealed() {
            return Err(StorageError::Sealed);
        }
        Ok(())
    }

    /// The topic's table, opened on first use and cached afterwards.
    pub fn get_nosql_db(&self, topic: &str) -> Result<Arc<dyn NoSqlDb>, StorageError> {
        if let Some(db) = self.topics.get(topic) {
            return Ok(Arc::clone(db.value()));
        }

        match self.topics.entry(topic.to_owned()) {
            dashmap::mapref::entry::Entry::Occupied(e) => Ok(Arc::clone(e.get())),
            dashmap::mapref::entry::Entry::Vacant(e) => {
                let db: Arc<dyn NoSqlDb> = Arc::new(SealableDb {
                    topic: topic.to_owned(),
                    inner: self.engine.open(topic)?,
                    sealed: Arc::clone(&self.sealed),
                });
                tracing::debug!("Opened storage topic '{}'", topic);
                e.insert(Arc::clone(&db));
                Ok(db)
            }
        }
    }

    /// Value under `key`, or `""` when absent.
    pub fn get(&self, topic: &str, key: &str) -> Result<String, StorageError> {
        Ok(self.get_nosql_db(topic)?.get(key))
    }

    /// Commit through the topic's table. A write that did not reach disk is
    /// retried once and its error returned.
    pub fn commit(&self, topic: &str, key: &str, value: &str) -> Result<(), StorageError> {
        self.ensure_writable()?;
        let db = self.get_nosql_db(topic)?;
        db.commit(key, value);
        Self::settle(&db)
    }

    pub fn delete(&self, topic: &str, key: &str) -> Result<(), StorageError> {
        self.ensure_writable()?;
        let db = self.get_nosql_db(topic)?;
        db.delete(key);
        Self::settle(&db)
    }

    fn settle(db: &Arc<dyn NoSqlDb>) -> Result<(), StorageError> {
        if db.is_dirty() {
            db.flush()?;
        }
        Ok(())
    }

    pub fn get_logger(&self, topic: &str) -> Result<Arc<dyn LineDst>, StorageError> {
        let name = sanitize_topic(topic)?;
        let sink = self
            .loggers
            .entry(name.clone())
            .or_insert_with(|| Arc::new(FileLineSink::new(self.log_dir.join(format!("{name}.log")))));
        let sink: Arc<dyn LineDst> = Arc::clone(sink.value()) as Arc<dyn LineDst>;
        Ok(sink)
    }

    /// `data/<sanitized topic>`, relative to the storage root.
    pub fn get_relative_file_name(&self, topic: &str) -> Result<PathBuf, StorageError> {
        Ok(Path::new(DATA_DIR).join(sanitize_topic(topic)?))
    }

    fn data_path(&self, topic: &str) -> Result<PathBuf, StorageError> {
        Ok(self.root.join(self.get_relative_file_name(topic)?))
    }

    fn file_lock(&self, path: &Path) -> Arc<Mutex<()>> {
        Arc::clone(
            self.file_locks
                .entry(path.to_path_buf())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        )
    }

    /// Contents of the topic's data file; a missing file reads as empty.
    pub fn get_file_data(&self, topic: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.data_path(topic)?;
        match std::fs::read(&path) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn write_file_data(&self, topic: &str, data: &[u8]) -> Result<(), StorageError> {
        self.ensure_writable()?;
        let path = self.data_path(topic)?;
        let lock = self.file_lock(&path);
        let _guard = lock.lock();
        write_atomic(&path, data)
    }

    /// Parsed JSON data file, `None` when missing or empty.
    pub fn get_json_data(&self, topic: &str) -> Result<Option<serde_json::Value>, StorageError> {
        let data = self.get_file_data(topic)?;
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(&data)?))
    }

    pub fn write_json_data(&self, topic: &str, value: &serde_json::Value) -> Result<(), StorageError> {
        let data = serde_json::to_vec_pretty(value)?;
        self.write_file_data(topic, &data)
    }

    /// Flush every open topic and logger. All are attempted; the first error
    /// is returned.
    pub fn flush(&self) -> Result<(), StorageError> {
        let mut first_error = None;

        let topics: Vec<(String, Arc<dyn NoSqlDb>)> = self
            .topics
            .iter()
            .map(|e| (e.key().clone(), Arc::clone(e.value())))
            .collect();
        for (topic, db) in topics {
            if let Err(e) = db.flush() {
                tracing::error!("Failed to flush storage topic '{}': {}", topic, e);
                first_error.get_or_insert(e);
            }
        }

        let loggers: Vec<Arc<FileLineSink>> = self.loggers.iter().map(|e| Arc::clone(e.value())).collect();
        for logger in loggers {
            if let Err(e) = logger.flush() {
                tracing::error!("Failed to flush log {}: {}", logger.path().display(), e);
                first_error.get_or_insert(StorageError::Io(e));
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn open_topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.topics.iter().map(|e| e.key().clone()).collect();
        topics.sort();
        topics
    }
}
