//! # Waypoint Loader
//!
//! Route data loading for single-page applications, built around a
//! stale-while-revalidate cache:
//!
//! - A shared [`engine::LoaderEngine`] holding the cache and invalidation
//!   bus
//! - Per-route [`runner::LoaderRunner`] actors driving the
//!   guard/validate/load pipeline and publishing state snapshots
//! - Named [`deferred::DeferredValue`] slots for data that settles after
//!   the route renders
//! - A [`prefetch::Prefetcher`] warming the cache before navigation
//!
//! ## Read policy
//!
//! Every read is one of three outcomes. A miss fetches and waits. A fresh
//! hit (younger than the route's stale time) serves the cache without
//! fetching. A stale hit serves the cache immediately and revalidates in
//! the background, swapping the result in when it lands. Stale time
//! defaults to zero, so by default every revisit shows cached data
//! instantly while refetching behind it.
//!
//! ## Supersession
//!
//! Navigating while a load is in flight cancels it. A superseded load's
//! completion is dropped entirely: no cache write, no state update, no
//! error. Route state only ever reflects the newest navigation.
//!
//! ## Example
//!
//! ```no_run
//! use serde_json::json;
//! use waypoint_loader::config::RouteConfig;
//! use waypoint_loader::context::RouteHandlers;
//! use waypoint_loader::engine::LoaderEngine;
//! use waypoint_loader::runner::{LoaderRunner, LoadStatus, RouteKey};
//!
//! # #[tokio::main] async fn main() {
//! let engine = LoaderEngine::new();
//! let handlers = RouteHandlers::new()
//!     .with_loader(|ctx| async move { Ok(json!({ "path": ctx.pathname })) });
//! let config = RouteConfig::new().with_stale_time_ms(30_000);
//!
//! let runner = LoaderRunner::spawn(handlers, config, engine.clone());
//! runner.navigate(RouteKey::new("/users"));
//!
//! let mut snapshots = runner.snapshots();
//! let _ = snapshots.wait_for(|s| s.status == LoadStatus::Ready).await;
//!
//! // Later, after a mutation elsewhere:
//! engine.invalidate(Some("/users"));
//! # }
//! ```

pub mod bus;
pub mod cache;
pub mod cancel;
pub mod config;
pub mod context;
pub mod deferred;
pub mod engine;
pub mod error;
pub mod key;
pub mod prefetch;
pub mod runner;

pub use bus::{InvalidationBus, InvalidationSubscription};
pub use cache::{CacheEntry, CacheLookup, CacheStats, LoaderCache};
pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use config::{Backoff, RetryConfig, RouteConfig};
pub use context::{ActionContext, ActionPayload, BoxFuture, LoaderContext, RouteHandlers};
pub use deferred::{DeferredState, DeferredValue, LoaderResult};
pub use engine::LoaderEngine;
pub use error::{LoadError, SharedError};
pub use key::cache_key;
pub use prefetch::Prefetcher;
pub use runner::{LoadStatus, LoaderRunner, LoaderSnapshot, RouteKey};
