//! Route prefetching
//!
//! Warms the cache ahead of navigation, typically on link hover or when a
//! link scrolls into view. Prefetching is best effort: failures are logged
//! and swallowed, never surfaced to route state. Duplicate requests for the
//! same key while one is in flight are coalesced.

use std::sync::Arc;

use dashmap::DashSet;
use tracing::debug;

use crate::cancel::cancel_pair;
use crate::config::RouteConfig;
use crate::context::{LoaderContext, RouteHandlers};
use crate::engine::LoaderEngine;
use crate::runner::RouteKey;

/// Warms the loader cache for routes the user is likely to visit next
///
/// # Examples
///
/// ```no_run
/// use waypoint_loader::config::RouteConfig;
/// use waypoint_loader::context::RouteHandlers;
/// use waypoint_loader::engine::LoaderEngine;
/// use waypoint_loader::prefetch::Prefetcher;
/// use waypoint_loader::runner::RouteKey;
/// use serde_json::json;
///
/// # #[tokio::main] async fn main() {
/// let engine = LoaderEngine::new();
/// let prefetcher = Prefetcher::new(engine);
/// let handlers = RouteHandlers::new()
///     .with_loader(|_ctx| async move { Ok(json!({"posts": []})) });
///
/// prefetcher.prefetch(RouteKey::new("/posts"), &handlers, &RouteConfig::default());
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Prefetcher {
    engine: LoaderEngine,
    in_flight: Arc<DashSet<String>>,
}

impl Prefetcher {
    pub fn new(engine: LoaderEngine) -> Self {
        Self {
            engine,
            in_flight: Arc::new(DashSet::new()),
        }
    }

    /// Starts a background fetch for `key` unless one is unnecessary
    ///
    /// Skipped when the route opts out of preloading, has no loader, is
    /// already cached, or already has a prefetch in flight. Returns whether
    /// a fetch was started.
    pub fn prefetch(&self, key: RouteKey, handlers: &RouteHandlers, config: &RouteConfig) -> bool {
        if !config.preload {
            return false;
        }
        let Some(loader) = handlers.loader.clone() else {
            return false;
        };

        let cache_key = key.cache_key();
        if self.engine.cache().contains(&cache_key) {
            return false;
        }
        // insert() is the claim; a second caller loses and backs off.
        if !self.in_flight.insert(cache_key.clone()) {
            return false;
        }

        let engine = self.engine.clone();
        let in_flight = Arc::clone(&self.in_flight);
        let gc_time = config.gc_time();
        tokio::spawn(async move {
            // The handle must outlive the fetch or the signal trips.
            let (_cancel, signal) = cancel_pair();
            let ctx = LoaderContext {
                pathname: key.pathname.clone(),
                params: key.params.clone(),
                search: key.search.clone(),
                signal,
            };

            match loader(ctx).await {
                Ok(result) => {
                    engine.cache().insert(
                        cache_key.clone(),
                        key.pathname.clone(),
                        result.data,
                        gc_time,
                    );
                    debug!(key = %key.pathname, "prefetch completed");
                }
                Err(err) => {
                    debug!(key = %key.pathname, error = %err, "prefetch failed");
                }
            }
            in_flight.remove(&cache_key);
        });
        true
    }

    /// Number of prefetches currently in flight
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_disabled_preload_is_skipped() {
        let prefetcher = Prefetcher::new(LoaderEngine::new());
        let handlers = RouteHandlers::new().with_loader(|_ctx| async move { Ok(json!(1)) });
        let config = RouteConfig::new().with_preload(false);

        assert!(!prefetcher.prefetch(RouteKey::new("/a"), &handlers, &config));
    }

    #[tokio::test]
    async fn test_missing_loader_is_skipped() {
        let prefetcher = Prefetcher::new(LoaderEngine::new());
        assert!(!prefetcher.prefetch(
            RouteKey::new("/a"),
            &RouteHandlers::new(),
            &RouteConfig::new().with_preload(true)
        ));
    }

    #[tokio::test]
    async fn test_cached_key_is_skipped() {
        let engine = LoaderEngine::new();
        let key = RouteKey::new("/a");
        engine.cache().insert(
            key.cache_key(),
            "/a".into(),
            json!(1),
            std::time::Duration::from_secs(300),
        );
        let prefetcher = Prefetcher::new(engine);
        let handlers = RouteHandlers::new().with_loader(|_ctx| async move { Ok(json!(2)) });

        assert!(!prefetcher.prefetch(key, &handlers, &RouteConfig::new().with_preload(true)));
    }
}
