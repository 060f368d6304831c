//! Engines open topics on demand and hand out shared handles.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{sanitize_topic, FileDb, MemoryDb, NoSqlDb, StorageError};

/// Factory for topic tables. Implementations need not cache; the storage
/// provider keeps one handle per topic.
pub trait StorageEngine: Send + Sync {
    fn open(&self, topic: &str) -> Result<Arc<dyn NoSqlDb>, StorageError>;
}

/// Engine selector used in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    Memory,
    #[default]
    File,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryEngine;

impl StorageEngine for MemoryEngine {
    fn open(&self, topic: &str) -> Result<Arc<dyn NoSqlDb>, StorageError> {
        sanitize_topic(topic)?;
        Ok(Arc::new(MemoryDb::new()))
    }
}

/// Stores each topic as `<root>/<sanitized topic>.json`.
#[derive(Debug, Clone)]
pub struct FileEngine {
    root: PathBuf,
}

impl FileEngine {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl StorageEngine for FileEngine {
    fn open(&self, topic: &str) -> Result<Arc<dyn NoSqlDb>, StorageError> {
        let name = sanitize_topic(topic)?;
        let db = FileDb::open(self.root.join(format!("{name}.json")))?;
        Ok(Arc::new(db))
    }
}
