//! Per-route load runner
//!
//! One runner drives the loading lifecycle of one mounted route: it owns
//! the current navigation target, runs the guard/validate/load pipeline,
//! applies the stale-while-revalidate read policy against the shared
//! engine, and publishes immutable snapshots through a watch channel.
//!
//! The runner is an actor. Commands arrive on an unbounded channel and are
//! applied serially, so state transitions never race. Fetches and actions
//! run on spawned tasks and report back as internal messages carrying the
//! generation they were started under; a message whose generation is no
//! longer current is dropped without touching the cache or the snapshot.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use waypoint_router::{Params, SearchParams};

use crate::cancel::{cancel_pair, CancelHandle};
use crate::cache::CacheLookup;
use crate::config::RouteConfig;
use crate::context::{ActionContext, ActionPayload, LoaderContext, RouteHandlers};
use crate::deferred::{DeferredValue, LoaderResult};
use crate::engine::LoaderEngine;
use crate::error::{LoadError, SharedError};
use crate::key::cache_key;

/// The concrete navigation a runner is serving
#[derive(Debug, Clone, PartialEq)]
pub struct RouteKey {
    pub pathname: String,
    pub params: Params,
    pub search: SearchParams,
}

impl RouteKey {
    pub fn new(pathname: impl Into<String>) -> Self {
        Self {
            pathname: pathname.into(),
            params: Params::new(),
            search: SearchParams::new(),
        }
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn with_search(mut self, search: SearchParams) -> Self {
        self.search = search;
        self
    }

    /// Cache key for this navigation
    pub fn cache_key(&self) -> String {
        cache_key(&self.pathname, &self.params, &self.search.build())
    }
}

/// Loading lifecycle of the route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadStatus {
    /// No navigation yet, or a guard declined with nothing to show
    #[default]
    Idle,
    /// First load in flight, nothing to show
    Loading,
    /// Data available and no fetch in flight
    Ready,
    /// Data available, background refetch in flight
    Revalidating,
    /// First load failed, nothing to show
    Error,
}

/// Immutable view of the route's loading state
///
/// A revalidation failure keeps the last good `data` and surfaces through
/// `error` with status staying `Ready`. Action state is tracked separately
/// so a failed submission never clobbers loaded data.
#[derive(Debug, Clone, Default)]
pub struct LoaderSnapshot {
    pub status: LoadStatus,
    pub data: Option<Value>,
    pub deferred: HashMap<String, DeferredValue>,
    pub error: Option<SharedError>,
    pub action_data: Option<Value>,
    pub action_error: Option<SharedError>,
    pub is_submitting: bool,
}

impl LoaderSnapshot {
    pub fn is_loading(&self) -> bool {
        matches!(self.status, LoadStatus::Loading | LoadStatus::Revalidating)
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }
}

enum Msg {
    Navigate(RouteKey),
    Refetch { force: bool },
    Retry,
    Submit(ActionPayload),
    Focus,
    Reconnect,
    Teardown,
    FetchDone { generation: u64, outcome: FetchOutcome },
    ActionDone { key: RouteKey, outcome: Result<Value, LoadError> },
}

enum FetchOutcome {
    GuardRefused,
    Success(LoaderResult),
    Failure(LoadError),
}

/// Handle to a running route loader
///
/// # Examples
///
/// ```no_run
/// use waypoint_loader::context::RouteHandlers;
/// use waypoint_loader::config::RouteConfig;
/// use waypoint_loader::engine::LoaderEngine;
/// use waypoint_loader::runner::{LoaderRunner, RouteKey};
/// use serde_json::json;
///
/// # #[tokio::main] async fn main() {
/// let engine = LoaderEngine::new();
/// let handlers = RouteHandlers::new()
///     .with_loader(|_ctx| async move { Ok(json!({"users": []})) });
///
/// let runner = LoaderRunner::spawn(handlers, RouteConfig::default(), engine);
/// runner.navigate(RouteKey::new("/users"));
///
/// let mut snapshots = runner.snapshots();
/// let _ = snapshots.wait_for(|s| s.has_data()).await;
/// # }
/// ```
pub struct LoaderRunner {
    tx: mpsc::UnboundedSender<Msg>,
    snapshot_rx: watch::Receiver<LoaderSnapshot>,
    active: Arc<AtomicBool>,
}

impl LoaderRunner {
    /// Spawns the runner's actor task
    pub fn spawn(handlers: RouteHandlers, config: RouteConfig, engine: LoaderEngine) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(LoaderSnapshot::default());
        let active = Arc::new(AtomicBool::new(true));

        let actor = Actor {
            handlers,
            config,
            engine,
            snapshot: snapshot_tx,
            tx: tx.clone(),
            active: Arc::clone(&active),
            generation: 0,
            key: None,
            cancel: None,
            invalidation_task: None,
            polling_task: None,
        };
        tokio::spawn(actor.run(rx));

        Self {
            tx,
            snapshot_rx,
            active,
        }
    }

    /// Points the runner at a new navigation, superseding any load in flight
    pub fn navigate(&self, key: RouteKey) {
        let _ = self.tx.send(Msg::Navigate(key));
    }

    /// Refetches the current navigation
    ///
    /// `force` bypasses freshness; otherwise a fresh cache entry is served
    /// without fetching.
    pub fn refetch(&self, force: bool) {
        let _ = self.tx.send(Msg::Refetch { force });
    }

    /// Evicts the current cache entry and refetches from scratch
    pub fn retry(&self) {
        let _ = self.tx.send(Msg::Retry);
    }

    /// Submits to the route's action
    pub fn submit(&self, payload: ActionPayload) {
        let _ = self.tx.send(Msg::Submit(payload));
    }

    /// Tells the runner the host regained focus
    pub fn notify_focus(&self) {
        let _ = self.tx.send(Msg::Focus);
    }

    /// Tells the runner connectivity returned
    pub fn notify_reconnect(&self) {
        let _ = self.tx.send(Msg::Reconnect);
    }

    /// Stops the runner; in-flight work is cancelled and discarded
    pub fn teardown(&self) {
        let _ = self.tx.send(Msg::Teardown);
    }

    /// Watch channel of state snapshots
    pub fn snapshots(&self) -> watch::Receiver<LoaderSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Current snapshot
    pub fn current(&self) -> LoaderSnapshot {
        self.snapshot_rx.borrow().clone()
    }
}

impl Drop for LoaderRunner {
    fn drop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        let _ = self.tx.send(Msg::Teardown);
    }
}

struct Actor {
    handlers: RouteHandlers,
    config: RouteConfig,
    engine: LoaderEngine,
    snapshot: watch::Sender<LoaderSnapshot>,
    tx: mpsc::UnboundedSender<Msg>,
    active: Arc<AtomicBool>,
    /// Bumped on every navigation and refetch; stale completions carry an
    /// older value and are dropped.
    generation: u64,
    key: Option<RouteKey>,
    cancel: Option<CancelHandle>,
    invalidation_task: Option<JoinHandle<()>>,
    polling_task: Option<JoinHandle<()>>,
}

impl Actor {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Msg>) {
        while let Some(msg) = rx.recv().await {
            match msg {
                Msg::Navigate(key) => self.navigate(key),
                Msg::Refetch { force } => self.begin_load(force),
                Msg::Retry => self.retry(),
                Msg::Submit(payload) => self.submit(payload),
                Msg::Focus => {
                    if self.config.refetch_on_focus {
                        self.begin_load(true);
                    }
                }
                Msg::Reconnect => {
                    if self.config.refetch_on_reconnect {
                        self.begin_load(true);
                    }
                }
                Msg::FetchDone {
                    generation,
                    outcome,
                } => self.apply_fetch(generation, outcome),
                Msg::ActionDone { key, outcome } => self.apply_action(key, outcome),
                Msg::Teardown => break,
            }
        }
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        if let Some(task) = self.invalidation_task.take() {
            task.abort();
        }
        if let Some(task) = self.polling_task.take() {
            task.abort();
        }
        debug!("runner shut down");
    }

    fn navigate(&mut self, key: RouteKey) {
        debug!(pathname = %key.pathname, "navigate");
        self.watch_invalidations(&key.pathname);
        self.start_polling();
        self.key = Some(key);
        // Leaving a page discards its action state.
        self.snapshot.send_modify(|s| {
            s.action_data = None;
            s.action_error = None;
            s.is_submitting = false;
        });
        self.begin_load(self.config.refetch_on_mount);
    }

    /// Replaces the invalidation forwarder with one for the new pathname.
    /// Aborting the old task drops its subscription, which unregisters it.
    fn watch_invalidations(&mut self, pathname: &str) {
        if let Some(task) = self.invalidation_task.take() {
            task.abort();
        }
        let mut subscription = self.engine.subscribe(pathname);
        let tx = self.tx.clone();
        self.invalidation_task = Some(tokio::spawn(async move {
            loop {
                subscription.invalidated().await;
                if tx.send(Msg::Refetch { force: true }).is_err() {
                    break;
                }
            }
        }));
    }

    fn start_polling(&mut self) {
        if let Some(task) = self.polling_task.take() {
            task.abort();
        }
        let Some(millis) = self.config.polling_interval_ms else {
            return;
        };
        let tx = self.tx.clone();
        self.polling_task = Some(tokio::spawn(async move {
            let period = std::time::Duration::from_millis(millis);
            let mut interval = tokio::time::interval(period);
            // The immediate first tick would double the navigation load.
            interval.tick().await;
            loop {
                interval.tick().await;
                if tx.send(Msg::Refetch { force: true }).is_err() {
                    break;
                }
            }
        }));
    }

    fn retry(&mut self) {
        if let Some(key) = &self.key {
            self.engine.cache().evict(&key.cache_key());
        }
        self.begin_load(true);
    }

    /// Starts the guard/validate/load pipeline for the current key
    fn begin_load(&mut self, force: bool) {
        let Some(key) = self.key.clone() else {
            return;
        };

        self.generation += 1;
        let generation = self.generation;
        if let Some(previous) = self.cancel.take() {
            previous.cancel();
        }
        let (handle, signal) = cancel_pair();
        self.cancel = Some(handle);

        let lookup = if force {
            // Forced refetch still shows cached data while it runs.
            match self.engine.cache().get(&key.cache_key(), self.config.stale_time()) {
                CacheLookup::Miss => CacheLookup::Miss,
                CacheLookup::Fresh(data) | CacheLookup::Stale(data) => CacheLookup::Stale(data),
            }
        } else {
            self.engine.cache().get(&key.cache_key(), self.config.stale_time())
        };

        match lookup {
            CacheLookup::Fresh(data) => {
                self.snapshot.send_modify(|s| {
                    s.status = LoadStatus::Ready;
                    s.data = Some(data);
                    s.deferred.clear();
                    s.error = None;
                });
                return;
            }
            CacheLookup::Stale(data) => {
                self.snapshot.send_modify(|s| {
                    s.status = LoadStatus::Revalidating;
                    s.data = Some(data);
                    s.deferred.clear();
                    s.error = None;
                });
            }
            CacheLookup::Miss => {
                self.snapshot.send_modify(|s| {
                    s.status = LoadStatus::Loading;
                    s.data = None;
                    s.deferred.clear();
                    s.error = None;
                });
            }
        }

        let Some(loader) = self.handlers.loader.clone() else {
            // Route without a loader: nothing to fetch, navigation is done.
            self.snapshot.send_modify(|s| {
                s.status = LoadStatus::Ready;
            });
            return;
        };

        let guard = self.handlers.guard.clone();
        let validate = self.handlers.validate.clone();
        let retry = self.config.retry;
        let tx = self.tx.clone();
        let ctx = LoaderContext {
            pathname: key.pathname.clone(),
            params: key.params.clone(),
            search: key.search.clone(),
            signal,
        };

        tokio::spawn(async move {
            let outcome = async {
                if let Some(guard) = guard {
                    if !guard(ctx.clone()).await {
                        return FetchOutcome::GuardRefused;
                    }
                }
                if let Some(validate) = validate {
                    if let Err(message) = validate(&ctx.params) {
                        return FetchOutcome::Failure(LoadError::Validation(message));
                    }
                }

                let mut attempt = 0u32;
                loop {
                    if ctx.signal.is_cancelled() {
                        return FetchOutcome::Failure(LoadError::Cancelled);
                    }
                    match loader(ctx.clone()).await {
                        Ok(result) => return FetchOutcome::Success(result),
                        Err(err) if err.is_retryable() && attempt < retry.max_retries => {
                            attempt += 1;
                            warn!(attempt, error = %err, "loader failed, retrying");
                            let mut signal = ctx.signal.clone();
                            tokio::select! {
                                _ = tokio::time::sleep(retry.delay_for(attempt)) => {}
                                _ = signal.cancelled() => {
                                    return FetchOutcome::Failure(LoadError::Cancelled);
                                }
                            }
                        }
                        Err(err) => return FetchOutcome::Failure(err),
                    }
                }
            }
            .await;
            let _ = tx.send(Msg::FetchDone {
                generation,
                outcome,
            });
        });
    }

    /// Applies a completed fetch, unless it has been superseded
    fn apply_fetch(&mut self, generation: u64, outcome: FetchOutcome) {
        if !self.active.load(Ordering::SeqCst) || generation != self.generation {
            debug!(generation, current = self.generation, "dropping superseded fetch");
            return;
        }

        match outcome {
            FetchOutcome::Success(result) => {
                if let Some(key) = &self.key {
                    self.engine.cache().insert(
                        key.cache_key(),
                        key.pathname.clone(),
                        result.data.clone(),
                        self.config.gc_time(),
                    );
                }
                self.snapshot.send_modify(|s| {
                    s.status = LoadStatus::Ready;
                    s.data = Some(result.data);
                    s.deferred = result.deferred;
                    s.error = None;
                });
            }
            FetchOutcome::Failure(err) => {
                if err.is_cancelled() {
                    return;
                }
                let err: SharedError = Arc::new(err);
                self.snapshot.send_modify(|s| {
                    if s.data.is_some() {
                        // Revalidation failure keeps the last good data.
                        s.status = LoadStatus::Ready;
                    } else {
                        s.status = LoadStatus::Error;
                    }
                    s.error = Some(err);
                });
            }
            FetchOutcome::GuardRefused => {
                self.snapshot.send_modify(|s| {
                    s.status = if s.data.is_some() {
                        LoadStatus::Ready
                    } else {
                        LoadStatus::Idle
                    };
                });
            }
        }
    }

    fn submit(&mut self, payload: ActionPayload) {
        let Some(key) = self.key.clone() else {
            return;
        };
        let Some(action) = self.handlers.action.clone() else {
            warn!(pathname = %key.pathname, "submit on route without an action");
            return;
        };

        self.snapshot.send_modify(|s| {
            s.is_submitting = true;
            s.action_error = None;
        });

        let tx = self.tx.clone();
        let ctx = ActionContext {
            pathname: key.pathname.clone(),
            params: key.params.clone(),
            payload,
        };
        tokio::spawn(async move {
            let outcome = action(ctx).await;
            let _ = tx.send(Msg::ActionDone { key, outcome });
        });
    }

    /// Applies a completed action, unless the runner has navigated away
    /// from the route it was submitted on
    fn apply_action(&mut self, key: RouteKey, outcome: Result<Value, LoadError>) {
        if !self.active.load(Ordering::SeqCst) || self.key.as_ref() != Some(&key) {
            debug!(pathname = %key.pathname, "dropping stale action completion");
            return;
        }
        match outcome {
            Ok(value) => {
                self.snapshot.send_modify(|s| {
                    s.is_submitting = false;
                    s.action_data = Some(value);
                    s.action_error = None;
                });
                // A successful mutation makes the loaded data suspect.
                if let Some(key) = &self.key {
                    self.engine.cache().evict(&key.cache_key());
                }
                self.begin_load(true);
            }
            Err(err) => {
                let err: SharedError = Arc::new(err);
                self.snapshot.send_modify(|s| {
                    s.is_submitting = false;
                    s.action_error = Some(err);
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_key_cache_key_is_stable() {
        let mut params = Params::new();
        params.insert("id".into(), "1".into());
        let a = RouteKey::new("/users/1").with_params(params.clone());
        let b = RouteKey::new("/users/1").with_params(params);
        assert_eq!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn test_snapshot_defaults() {
        let snapshot = LoaderSnapshot::default();
        assert_eq!(snapshot.status, LoadStatus::Idle);
        assert!(!snapshot.is_loading());
        assert!(!snapshot.has_data());
    }
}
