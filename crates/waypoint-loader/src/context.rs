//! Handler signatures and the contexts passed to them
//!
//! A route declares up to four async hooks: a guard deciding whether loading
//! may proceed, a validator checking extracted params, the loader itself,
//! and an action handling submissions. All are stored as reference-counted
//! boxed closures so the runner can clone them into spawned tasks.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use waypoint_router::{Params, SearchParams};

use crate::cancel::CancelSignal;
use crate::deferred::LoaderResult;
use crate::error::LoadError;

/// Boxed future returned by route handlers
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Everything a loader sees about the request it serves
#[derive(Debug, Clone)]
pub struct LoaderContext {
    /// Pathname being navigated to
    pub pathname: String,
    /// Params extracted by route matching
    pub params: Params,
    /// Parsed search parameters
    pub search: SearchParams,
    /// Cooperative cancellation signal; long loaders should poll it
    pub signal: CancelSignal,
}

/// Submission body handed to an action
#[derive(Debug, Clone, PartialEq)]
pub enum ActionPayload {
    /// Key/value form fields
    Form(HashMap<String, String>),
    /// Structured JSON body
    Json(Value),
}

/// Everything an action sees about the submission it serves
#[derive(Debug, Clone)]
pub struct ActionContext {
    pub pathname: String,
    pub params: Params,
    pub payload: ActionPayload,
}

pub type LoaderFn =
    Arc<dyn Fn(LoaderContext) -> BoxFuture<Result<LoaderResult, LoadError>> + Send + Sync>;
pub type ActionFn = Arc<dyn Fn(ActionContext) -> BoxFuture<Result<Value, LoadError>> + Send + Sync>;
pub type GuardFn = Arc<dyn Fn(LoaderContext) -> BoxFuture<bool> + Send + Sync>;
pub type ValidateFn = Arc<dyn Fn(&Params) -> Result<(), String> + Send + Sync>;

/// The hooks registered for one route
///
/// # Examples
///
/// ```
/// use waypoint_loader::context::RouteHandlers;
/// use serde_json::json;
///
/// let handlers = RouteHandlers::new()
///     .with_loader(|ctx| async move { Ok(json!({ "path": ctx.pathname })) })
///     .with_validate(|params| {
///         params.contains_key("id").then_some(()).ok_or("missing id".to_string())
///     });
/// assert!(handlers.loader.is_some());
/// ```
#[derive(Clone, Default)]
pub struct RouteHandlers {
    pub loader: Option<LoaderFn>,
    pub action: Option<ActionFn>,
    pub guard: Option<GuardFn>,
    pub validate: Option<ValidateFn>,
}

impl RouteHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the loader from a closure returning plain data
    pub fn with_loader<F, Fut>(mut self, loader: F) -> Self
    where
        F: Fn(LoaderContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, LoadError>> + Send + 'static,
    {
        self.loader = Some(Arc::new(move |ctx| {
            let fut = loader(ctx);
            Box::pin(async move { fut.await.map(LoaderResult::immediate) })
        }));
        self
    }

    /// Sets the loader from a closure returning data plus deferred slots
    pub fn with_loader_result<F, Fut>(mut self, loader: F) -> Self
    where
        F: Fn(LoaderContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<LoaderResult, LoadError>> + Send + 'static,
    {
        self.loader = Some(Arc::new(move |ctx| Box::pin(loader(ctx))));
        self
    }

    /// Sets the action from a plain async closure
    pub fn with_action<F, Fut>(mut self, action: F) -> Self
    where
        F: Fn(ActionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, LoadError>> + Send + 'static,
    {
        self.action = Some(Arc::new(move |ctx| Box::pin(action(ctx))));
        self
    }

    /// Sets the guard from a plain async closure
    ///
    /// Returning `false` stops loading without recording an error.
    pub fn with_guard<F, Fut>(mut self, guard: F) -> Self
    where
        F: Fn(LoaderContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        self.guard = Some(Arc::new(move |ctx| Box::pin(guard(ctx))));
        self
    }

    /// Sets the synchronous param validator
    ///
    /// A validation failure surfaces as a route error and is never retried.
    pub fn with_validate<F>(mut self, validate: F) -> Self
    where
        F: Fn(&Params) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validate = Some(Arc::new(validate));
        self
    }
}

impl std::fmt::Debug for RouteHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteHandlers")
            .field("loader", &self.loader.is_some())
            .field("action", &self.action.is_some())
            .field("guard", &self.guard.is_some())
            .field("validate", &self.validate.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::cancel_pair;
    use serde_json::json;

    fn context(pathname: &str) -> LoaderContext {
        let (_handle, signal) = cancel_pair();
        LoaderContext {
            pathname: pathname.to_string(),
            params: Params::new(),
            search: SearchParams::new(),
            signal,
        }
    }

    #[tokio::test]
    async fn test_loader_closure_wrapping() {
        let handlers =
            RouteHandlers::new().with_loader(|ctx| async move { Ok(json!(ctx.pathname)) });
        let loader = handlers.loader.unwrap();
        let result = loader(context("/about")).await.unwrap();
        assert_eq!(result.data, json!("/about"));
        assert!(result.deferred.is_empty());
    }

    #[tokio::test]
    async fn test_guard_closure_wrapping() {
        let handlers = RouteHandlers::new()
            .with_guard(|ctx| std::future::ready(ctx.pathname.starts_with("/admin")));
        let guard = handlers.guard.unwrap();
        assert!(guard(context("/admin/users")).await);
        assert!(!guard(context("/public")).await);
    }

    #[test]
    fn test_validate_closure() {
        let handlers = RouteHandlers::new().with_validate(|params| {
            params
                .get("id")
                .and_then(|id| id.parse::<u64>().ok())
                .map(|_| ())
                .ok_or_else(|| "id must be numeric".to_string())
        });
        let validate = handlers.validate.unwrap();

        let mut params = Params::new();
        params.insert("id".into(), "42".into());
        assert!(validate(&params).is_ok());

        params.insert("id".into(), "abc".into());
        assert!(validate(&params).is_err());
    }
}
