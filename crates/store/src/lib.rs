//! Key-value storage engines for Tether
//!
//! Every plugin (and every player kit) gets its own topic: a lazily opened,
//! string-keyed, string-valued table. Two engines are provided: a purely
//! in-memory one and a file-backed one that snapshots each topic to JSON.
//!
//! Absence is reported with an empty string. A key holding `""` and a missing
//! key look the same to callers; this is part of the contract.

pub mod atomic;
pub mod db;
pub mod engine;
pub mod error;
pub mod file;
pub mod memory;
pub mod topic;

pub use atomic::write_atomic;
pub use db::{IterCallback, NoSqlDb};
pub use engine::{EngineKind, FileEngine, MemoryEngine, StorageEngine};
pub use error::StorageError;
pub use file::FileDb;
pub use memory::MemoryDb;
pub use topic::sanitize_topic;
