//! Invalidation bus
//!
//! Active routes subscribe with their pathname; callers signal with an
//! optional path prefix. A signal wakes every subscriber whose pathname
//! falls under the prefix (or everyone, when no prefix is given). The bus
//! only delivers wake-ups; evicting cache entries and refetching are the
//! subscriber's job.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;

use crate::cache::path_under_prefix;

struct Subscriber {
    pathname: String,
    tx: mpsc::UnboundedSender<()>,
}

/// Fan-out registry of invalidation listeners
#[derive(Default)]
pub struct InvalidationBus {
    subscribers: DashMap<u64, Subscriber>,
    next_id: AtomicU64,
}

impl InvalidationBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener for a pathname
    ///
    /// The subscription unregisters itself when dropped.
    pub fn subscribe(self: &Arc<Self>, pathname: impl Into<String>) -> InvalidationSubscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.insert(
            id,
            Subscriber {
                pathname: pathname.into(),
                tx,
            },
        );
        InvalidationSubscription {
            bus: Arc::clone(self),
            id,
            rx,
        }
    }

    /// Wakes subscribers under `prefix`, or all of them when `None`
    ///
    /// Returns how many listeners were notified.
    pub fn signal(&self, prefix: Option<&str>) -> usize {
        let mut notified = 0;
        for entry in self.subscribers.iter() {
            let matches = match prefix {
                Some(prefix) => path_under_prefix(&entry.pathname, prefix),
                None => true,
            };
            // A closed channel just means the subscription is mid-drop.
            if matches && entry.tx.send(()).is_ok() {
                notified += 1;
            }
        }
        debug!(?prefix, notified, "invalidation signalled");
        notified
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn unsubscribe(&self, id: u64) {
        self.subscribers.remove(&id);
    }
}

impl std::fmt::Debug for InvalidationBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvalidationBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

/// A live registration on the bus; drop to unsubscribe
pub struct InvalidationSubscription {
    bus: Arc<InvalidationBus>,
    id: u64,
    rx: mpsc::UnboundedReceiver<()>,
}

impl InvalidationSubscription {
    /// Waits for the next invalidation aimed at this pathname
    pub async fn invalidated(&mut self) {
        // None only if the bus dropped our sender, which cannot happen while
        // we hold the registration.
        let _ = self.rx.recv().await;
    }

    /// Non-blocking check, draining at most one pending wake-up
    pub fn try_invalidated(&mut self) -> bool {
        self.rx.try_recv().is_ok()
    }
}

impl Drop for InvalidationSubscription {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.id);
    }
}
