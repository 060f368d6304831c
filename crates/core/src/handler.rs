//! Ordered, revocable handler lists shared by every registry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

static NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(1);

/// Receipt for a registration, used to revoke it later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

impl HandlerId {
    pub(crate) fn next() -> Self {
        Self(NEXT_HANDLER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for HandlerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Handler({})", self.0)
    }
}

/// Handlers kept in registration order.
///
/// Dispatch works on a [`snapshot`](Self::snapshot) so no lock is held while a
/// handler runs; handlers may therefore register or revoke others.
pub struct HandlerList<T: ?Sized> {
    entries: RwLock<Vec<(HandlerId, Arc<T>)>>,
}

impl<T: ?Sized> HandlerList<T> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    pub fn push(&self, handler: Arc<T>) -> HandlerId {
        let id = HandlerId::next();
        self.entries.write().push((id, handler));
        id
    }

    pub fn remove(&self, id: HandlerId) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|(existing, _)| *existing != id);
        entries.len() != before
    }

    pub fn snapshot(&self) -> Vec<Arc<T>> {
        self.entries
            .read()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl<T: ?Sized> Default for HandlerList<T> {
    fn default() -> Self {
        Self::new()
    }
}
