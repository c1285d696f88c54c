//! Loader engine: the shared cache and invalidation bus
//!
//! One engine per application. Runners and prefetchers hold clones and go
//! through it for every cache read, write, and invalidation, so a signal
//! from anywhere reaches every active route.

use std::sync::Arc;

use tracing::info;

use crate::bus::{InvalidationBus, InvalidationSubscription};
use crate::cache::LoaderCache;

/// Shared loading infrastructure
///
/// Cloning is cheap and shares the same cache and bus.
///
/// # Examples
///
/// ```
/// use waypoint_loader::engine::LoaderEngine;
///
/// let engine = LoaderEngine::new();
/// engine.invalidate(Some("/users"));
/// engine.invalidate_all();
/// ```
#[derive(Debug, Clone, Default)]
pub struct LoaderEngine {
    cache: Arc<LoaderCache>,
    bus: Arc<InvalidationBus>,
}

impl LoaderEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache(&self) -> &Arc<LoaderCache> {
        &self.cache
    }

    /// Subscribes a pathname to invalidation wake-ups
    pub fn subscribe(&self, pathname: impl Into<String>) -> InvalidationSubscription {
        self.bus.subscribe(pathname)
    }

    /// Invalidates routes under a path prefix
    ///
    /// Synchronous: cache entries are evicted and subscribers signalled
    /// before this returns. The refetches themselves happen on the
    /// subscribers' own tasks. `None` invalidates everything.
    pub fn invalidate(&self, prefix: Option<&str>) {
        let evicted = match prefix {
            Some(prefix) => self.cache.evict_prefix(prefix),
            None => self.cache.clear(),
        };
        let notified = self.bus.signal(prefix);
        info!(?prefix, evicted, notified, "invalidated");
    }

    /// Invalidates every active route
    pub fn invalidate_all(&self) {
        self.invalidate(None);
    }
}
