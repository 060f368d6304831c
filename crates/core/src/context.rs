//! Cross-plugin context map.
//!
//! Plugins publish small values (flags, counters, shared handles) under string
//! keys for other plugins to pick up. Values are tagged so a reader that
//! expects the wrong kind gets an error instead of a silent default.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    Bool,
    Int,
    Float,
    Text,
    Bytes,
    Json,
    Handle,
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Text => "text",
            Self::Bytes => "bytes",
            Self::Json => "json",
            Self::Handle => "handle",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("No context value under key '{0}'")]
    Missing(String),

    #[error("Context value has type {found}, expected {expected}")]
    TypeMismatch {
        expected: ContextKind,
        found: ContextKind,
    },
}

/// A value shared between plugins.
#[derive(Clone)]
pub enum ContextValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
    /// Any shared object; readers downcast it with [`ContextValue::downcast`].
    Handle(Arc<dyn Any + Send + Sync>),
}

impl ContextValue {
    pub fn handle<T: Any + Send + Sync>(value: T) -> Self {
        Self::Handle(Arc::new(value))
    }

    pub fn kind(&self) -> ContextKind {
        match self {
            Self::Bool(_) => ContextKind::Bool,
            Self::Int(_) => ContextKind::Int,
            Self::Float(_) => ContextKind::Float,
            Self::Text(_) => ContextKind::Text,
            Self::Bytes(_) => ContextKind::Bytes,
            Self::Json(_) => ContextKind::Json,
            Self::Handle(_) => ContextKind::Handle,
        }
    }

    fn mismatch(&self, expected: ContextKind) -> ContextError {
        ContextError::TypeMismatch {
            expected,
            found: self.kind(),
        }
    }

    pub fn as_bool(&self) -> Result<bool, ContextError> {
        match self {
            Self::Bool(v) => Ok(*v),
            other => Err(other.mismatch(ContextKind::Bool)),
        }
    }

    pub fn as_int(&self) -> Result<i64, ContextError> {
        match self {
            Self::Int(v) => Ok(*v),
            other => Err(other.mismatch(ContextKind::Int)),
        }
    }

    pub fn as_float(&self) -> Result<f64, ContextError> {
        match self {
            Self::Float(v) => Ok(*v),
            other => Err(other.mismatch(ContextKind::Float)),
        }
    }

    pub fn as_text(&self) -> Result<&str, ContextError> {
        match self {
            Self::Text(v) => Ok(v),
            other => Err(other.mismatch(ContextKind::Text)),
        }
    }

    pub fn as_bytes(&self) -> Result<&[u8], ContextError> {
        match self {
            Self::Bytes(v) => Ok(v),
            other => Err(other.mismatch(ContextKind::Bytes)),
        }
    }

    pub fn as_json(&self) -> Result<&serde_json::Value, ContextError> {
        match self {
            Self::Json(v) => Ok(v),
            other => Err(other.mismatch(ContextKind::Json)),
        }
    }

    /// Downcast a handle. A handle of another concrete type is a mismatch too.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Result<Arc<T>, ContextError> {
        match self {
            Self::Handle(h) => Arc::clone(h)
                .downcast::<T>()
                .map_err(|_| self.mismatch(ContextKind::Handle)),
            other => Err(other.mismatch(ContextKind::Handle)),
        }
    }
}

impl fmt::Debug for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Self::Int(v) => f.debug_tuple("Int").field(v).finish(),
            Self::Float(v) => f.debug_tuple("Float").field(v).finish(),
            Self::Text(v) => f.debug_tuple("Text").field(v).finish(),
            Self::Bytes(v) => f.debug_tuple("Bytes").field(&v.len()).finish(),
            Self::Json(v) => f.debug_tuple("Json").field(v).finish(),
            Self::Handle(_) => f.write_str("Handle(..)"),
        }
    }
}

impl From<bool> for ContextValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ContextValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for ContextValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<String> for ContextValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for ContextValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<Vec<u8>> for ContextValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<serde_json::Value> for ContextValue {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

/// Process-wide key/value map shared by all plugins.
#[derive(Debug, Default)]
pub struct ContextStore {
    values: RwLock<HashMap<String, ContextValue>>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value, returning the one it replaced.
    pub fn set(&self, key: impl Into<String>, value: impl Into<ContextValue>) -> Option<ContextValue> {
        self.values.write().insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<ContextValue> {
        self.values.read().get(key).cloned()
    }

    /// Like [`get`](Self::get) but absence is an error.
    pub fn require(&self, key: &str) -> Result<ContextValue, ContextError> {
        self.get(key)
            .ok_or_else(|| ContextError::Missing(key.to_owned()))
    }

    pub fn remove(&self, key: &str) -> Option<ContextValue> {
        self.values.write().remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.read().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.values.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}
