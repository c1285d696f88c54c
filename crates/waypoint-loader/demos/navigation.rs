//! End-to-end walkthrough: resolve a path, load its data, revisit it to see
//! the stale-while-revalidate policy, then invalidate after a mutation.
//!
//! Run with: cargo run --example navigation

use std::collections::HashMap;
use std::time::Duration;

use serde_json::json;
use tracing::info;
use waypoint_loader::{
    ActionPayload, LoadStatus, LoaderEngine, LoaderRunner, RouteConfig, RouteHandlers, RouteKey,
};
use waypoint_router::{Resolver, Route, SearchParams};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,waypoint_loader=debug".into()),
        )
        .init();

    // Route table.
    let resolver = Resolver::new()
        .with_route(Route::new("/").with_title("Home"))
        .with_route(Route::new("/users/:id").with_title("User detail"))
        .with_route(Route::new("/docs/*"))
        .with_layout("/")
        .with_not_found("");

    let resolved = resolver
        .resolve("/users/42")
        .ok_or_else(|| anyhow::anyhow!("no route for /users/42"))?;
    info!(pattern = %resolved.route.pattern, params = ?resolved.params, "resolved");

    // Shared loading infrastructure plus one runner for the user route.
    let engine = LoaderEngine::new();
    let handlers = RouteHandlers::new()
        .with_loader(|ctx| async move {
            // Stand-in for a network fetch.
            tokio::time::sleep(Duration::from_millis(150)).await;
            let id = ctx.params.get("id").cloned().unwrap_or_default();
            Ok(json!({ "id": id, "name": format!("user-{id}") }))
        })
        .with_action(|ctx| async move {
            let name = match &ctx.payload {
                ActionPayload::Form(fields) => fields.get("name").cloned(),
                ActionPayload::Json(body) => {
                    body.get("name").and_then(|v| v.as_str()).map(String::from)
                }
            };
            Ok(json!({ "renamed_to": name }))
        });
    let config = RouteConfig::new()
        .with_stale_time_ms(5_000)
        .with_retries(2, 250);

    let runner = LoaderRunner::spawn(handlers, config, engine.clone());
    let mut snapshots = runner.snapshots();

    let key = RouteKey::new("/users/42")
        .with_params(resolved.params.clone())
        .with_search(SearchParams::parse("?tab=posts"));

    // First visit: miss, loading, ready.
    runner.navigate(key.clone());
    let snapshot = snapshots
        .wait_for(|s| s.status == LoadStatus::Ready)
        .await?
        .clone();
    info!(data = %snapshot.data.as_ref().map(ToString::to_string).unwrap_or_default(), "first load");

    // Submit the route's action; the loader refetches behind it.
    let mut fields = HashMap::new();
    fields.insert("name".to_string(), "grace".to_string());
    runner.submit(ActionPayload::Form(fields));
    let snapshot = snapshots
        .wait_for(|s| s.action_data.is_some() && !s.is_submitting)
        .await?
        .clone();
    info!(action = ?snapshot.action_data, "action settled");

    // A mutation elsewhere invalidates everything under /users.
    engine.invalidate(Some("/users"));
    tokio::time::sleep(Duration::from_millis(300)).await;
    info!(hit_rate = engine.cache().stats().hit_rate(), "done");

    runner.teardown();
    Ok(())
}
