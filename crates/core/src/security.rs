use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::handler::{HandlerId, HandlerList};

/// Receives the text of a security alert.
pub type AlertHandler = dyn Fn(&str) -> anyhow::Result<()> + Send + Sync;

/// Broadcast channel for security alerts.
///
/// Every handler registered at firing time runs, in order, on the caller's
/// thread. A handler that errors or panics is logged and skipped over.
#[derive(Default)]
pub struct SecurityBus {
    handlers: HandlerList<AlertHandler>,
}

impl SecurityBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, handler: Box<AlertHandler>) -> HandlerId {
        self.handlers.push(Arc::from(handler))
    }

    pub fn remove(&self, id: HandlerId) -> bool {
        self.handlers.remove(id)
    }

    /// Deliver `info` to all handlers. Returns how many completed without error.
    pub fn red_alert(&self, info: &str) -> usize {
        tracing::warn!("Security alert: {}", info);
        let mut delivered = 0;
        for (index, handler) in self.handlers.snapshot().into_iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| handler(info))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => tracing::error!("Alert handler #{} failed: {:#}", index, e),
                Err(_) => tracing::error!("Alert handler #{} panicked", index),
            }
        }
        delivered
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
