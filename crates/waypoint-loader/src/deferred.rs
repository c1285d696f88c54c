//! Deferred values: data that settles after the route renders
//!
//! A loader can return its critical data immediately and hand back named
//! deferred slots for slow secondary data. Each slot settles exactly once;
//! observers poll the current state or await settlement.

use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::watch;

use crate::context::BoxFuture;

/// Settlement state of one deferred slot
#[derive(Debug, Clone, PartialEq)]
pub enum DeferredState {
    Pending,
    Ready(Value),
    Failed(String),
}

impl DeferredState {
    pub fn is_settled(&self) -> bool {
        !matches!(self, DeferredState::Pending)
    }
}

/// Handle to a value still being produced
///
/// Cloning shares the same slot. A deferred failure is scoped to its slot
/// and never fails the route that produced it.
#[derive(Debug, Clone)]
pub struct DeferredValue {
    rx: watch::Receiver<DeferredState>,
}

impl DeferredValue {
    /// Spawns `future` and returns the handle observing its settlement
    pub fn spawn(future: BoxFuture<Result<Value, String>>) -> Self {
        let (tx, rx) = watch::channel(DeferredState::Pending);
        tokio::spawn(async move {
            let state = match future.await {
                Ok(value) => DeferredState::Ready(value),
                Err(message) => DeferredState::Failed(message),
            };
            // All handles may be dropped already; nothing to do then.
            let _ = tx.send(state);
        });
        Self { rx }
    }

    /// An already-settled deferred, mainly for tests and cached replays
    pub fn ready(value: Value) -> Self {
        let (tx, rx) = watch::channel(DeferredState::Ready(value));
        drop(tx);
        Self { rx }
    }

    /// Current state without waiting
    pub fn try_read(&self) -> DeferredState {
        self.rx.borrow().clone()
    }

    /// Waits for settlement and returns the final state
    pub async fn resolved(&mut self) -> DeferredState {
        // An error here means the producer task is gone; whatever state it
        // last published is final.
        let _ = self.rx.wait_for(DeferredState::is_settled).await;
        self.rx.borrow().clone()
    }
}

/// What a loader hands back: immediate data plus named deferred slots
#[derive(Debug, Clone, Default)]
pub struct LoaderResult {
    pub data: Value,
    pub deferred: HashMap<String, DeferredValue>,
}

impl LoaderResult {
    pub fn immediate(data: Value) -> Self {
        Self {
            data,
            deferred: HashMap::new(),
        }
    }

    pub fn with_deferred(mut self, name: impl Into<String>, value: DeferredValue) -> Self {
        self.deferred.insert(name.into(), value);
        self
    }
}

impl Default for DeferredValue {
    fn default() -> Self {
        Self::ready(Value::Null)
    }
}
