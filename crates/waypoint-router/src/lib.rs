//! # Waypoint Router
//!
//! Client-side route resolution for single-page applications:
//! - Static routes (`/about`)
//! - Dynamic parameters (`/users/:id`)
//! - Catch-all routes (`/docs/*`, binding the remainder to `slug`)
//! - Layout scoping by path prefix, outermost first
//! - Scoped not-found fallbacks
//! - Structured search parameters with multi-value keys
//!
//! Matching and resolution are pure: no shared state, no errors. A path
//! with no matching route resolves to `None` and falls through to the
//! not-found lookup.
//!
//! ## Precedence
//!
//! Routes are sorted once when registered: catch-all routes last, routes
//! with any dynamic segment after fully literal routes, remaining ties by
//! descending pattern length. The first pattern to match in that order wins,
//! so literal beats dynamic beats catch-all. The dynamic test is a
//! per-route boolean rather than a per-segment specificity score; routes
//! mixing literal and dynamic segments at different depths keep this simple
//! ordering deliberately.
//!
//! ## Example
//!
//! ```
//! use waypoint_router::{Resolver, Route};
//!
//! let resolver = Resolver::new()
//!     .with_route(Route::new("/users/new"))
//!     .with_route(Route::new("/users/:id"))
//!     .with_route(Route::new("/users/*"));
//!
//! // Literal beats dynamic beats catch-all.
//! let resolved = resolver.resolve("/users/new").unwrap();
//! assert_eq!(resolved.route.pattern, "/users/new");
//!
//! let resolved = resolver.resolve("/users/42").unwrap();
//! assert_eq!(resolved.params.get("id"), Some(&"42".to_string()));
//! ```

use std::cmp::Ordering;
use std::collections::HashMap;

pub mod path;
pub mod pattern;
pub mod search;

pub use path::{is_valid_path, normalize_path};
pub use pattern::{classify_segment, match_pattern, parse_pattern, Segment, CATCH_ALL_PARAM};
pub use search::{SearchParams, SearchValue};

/// Parameters extracted from a matched path
pub type Params = HashMap<String, String>;

/// Document metadata attached to a route
///
/// The resolver only carries this through; applying it (titles, meta tags)
/// is the host's concern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub keywords: Vec<String>,
}

/// A registered route: pattern plus metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Normalized URL pattern like `/users/:id`
    pub pattern: String,
    /// Whether the pattern contains a catch-all segment
    pub has_catch_all: bool,
    /// Whether the pattern contains any named dynamic segment
    pub has_dynamic: bool,
    /// Document metadata for the route
    pub metadata: RouteMetadata,
    segments: Vec<Segment>,
}

impl Route {
    /// Creates a route from a pattern string
    ///
    /// The pattern is normalized before parsing, so `/users/123/` and
    /// `/users/123` register identically.
    ///
    /// # Examples
    ///
    /// ```
    /// use waypoint_router::Route;
    ///
    /// let route = Route::new("/users/:id");
    /// assert!(route.has_dynamic);
    /// assert!(!route.has_catch_all);
    /// ```
    pub fn new(pattern: impl AsRef<str>) -> Self {
        let pattern = normalize_path(pattern.as_ref()).into_owned();
        let segments = parse_pattern(&pattern);
        let has_catch_all = segments.iter().any(|s| matches!(s, Segment::CatchAll));
        let has_dynamic = segments.iter().any(|s| matches!(s, Segment::Param(_)));

        Self {
            pattern,
            has_catch_all,
            has_dynamic,
            metadata: RouteMetadata::default(),
            segments,
        }
    }

    /// Sets the route's document title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.metadata.title = Some(title.into());
        self
    }

    /// Sets the route's meta description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.metadata.description = Some(description.into());
        self
    }

    /// Sets the route's meta keywords
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metadata.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Matches this route against a path, extracting parameters
    ///
    /// # Examples
    ///
    /// ```
    /// use waypoint_router::Route;
    ///
    /// let route = Route::new("/users/:id");
    /// let params = route.matches("/users/123").unwrap();
    /// assert_eq!(params.get("id"), Some(&"123".to_string()));
    /// ```
    pub fn matches(&self, path: &str) -> Option<Params> {
        match_pattern(&self.segments, path)
    }
}

/// A route resolved for a concrete path
#[derive(Debug, Clone)]
pub struct ResolvedRoute {
    /// The route that matched
    pub route: Route,
    /// Parameters extracted from the path
    pub params: Params,
}

/// Orders registered routes and resolves paths against them
///
/// Also answers which layout prefixes wrap a path and which not-found
/// fallback applies when nothing matches. Recomputed lookups are cheap;
/// sorting happens once per registration.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    routes: Vec<Route>,
    layouts: Vec<String>,
    not_found: Vec<String>,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a route (builder style)
    pub fn with_route(mut self, route: Route) -> Self {
        self.add_route(route);
        self
    }

    /// Registers multiple routes at once
    pub fn with_routes<I>(mut self, routes: I) -> Self
    where
        I: IntoIterator<Item = Route>,
    {
        for route in routes {
            self.add_route(route);
        }
        self
    }

    /// Registers a layout at a path prefix
    pub fn with_layout(mut self, prefix: impl AsRef<str>) -> Self {
        self.add_layout(prefix);
        self
    }

    /// Registers a not-found fallback at a path prefix
    ///
    /// The empty prefix acts as the application-wide fallback.
    pub fn with_not_found(mut self, prefix: impl Into<String>) -> Self {
        self.add_not_found(prefix);
        self
    }

    /// Registers a route, keeping the route list in precedence order
    pub fn add_route(&mut self, route: Route) {
        self.routes.push(route);
        self.routes.sort_by(compare_routes);
    }

    pub fn add_layout(&mut self, prefix: impl AsRef<str>) {
        self.layouts.push(normalize_path(prefix.as_ref()).into_owned());
    }

    pub fn add_not_found(&mut self, prefix: impl Into<String>) {
        self.not_found.push(prefix.into());
    }

    /// Registered routes in precedence order
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Resolves a path to at most one route
    ///
    /// Routes are tried in precedence order; the first match wins.
    pub fn resolve(&self, path: &str) -> Option<ResolvedRoute> {
        let path = normalize_path(path);
        self.routes.iter().find_map(|route| {
            route.matches(&path).map(|params| ResolvedRoute {
                route: route.clone(),
                params,
            })
        })
    }

    /// Layout prefixes that wrap a path, outermost (shortest prefix) first
    ///
    /// A layout registered at prefix `P` applies to path `X` iff `P` is the
    /// root, `X == P`, or `X` starts with `P + "/"`.
    ///
    /// # Examples
    ///
    /// ```
    /// use waypoint_router::Resolver;
    ///
    /// let resolver = Resolver::new()
    ///     .with_layout("/")
    ///     .with_layout("/dashboard");
    ///
    /// assert_eq!(
    ///     resolver.matching_layouts("/dashboard/settings"),
    ///     vec!["/", "/dashboard"]
    /// );
    /// assert_eq!(resolver.matching_layouts("/about"), vec!["/"]);
    /// ```
    pub fn matching_layouts(&self, path: &str) -> Vec<&str> {
        let path = normalize_path(path);
        let mut matching: Vec<&str> = self
            .layouts
            .iter()
            .filter(|prefix| layout_scope_matches(prefix, &path))
            .map(String::as_str)
            .collect();
        matching.sort_by_key(|prefix| prefix.len());
        matching
    }

    /// Not-found fallback prefix for a path, most specific first
    ///
    /// Candidates are tried by descending prefix length; the first whose
    /// prefix is a literal ancestor of the path (or empty, acting as the
    /// catch-all fallback) wins.
    pub fn resolve_not_found(&self, path: &str) -> Option<&str> {
        let path = normalize_path(path);
        let mut candidates: Vec<&String> = self.not_found.iter().collect();
        candidates.sort_by(|a, b| b.len().cmp(&a.len()));

        candidates
            .into_iter()
            .find(|prefix| {
                prefix.is_empty()
                    || path.as_ref() == prefix.as_str()
                    || path.starts_with(&format!("{}/", prefix))
            })
            .map(String::as_str)
    }
}

/// Route precedence: catch-all last, dynamic after literal, longer patterns
/// before shorter
fn compare_routes(a: &Route, b: &Route) -> Ordering {
    match a.has_catch_all.cmp(&b.has_catch_all) {
        Ordering::Equal => {}
        other => return other,
    }
    match a.has_dynamic.cmp(&b.has_dynamic) {
        Ordering::Equal => {}
        other => return other,
    }
    b.pattern.len().cmp(&a.pattern.len())
}

/// Whether a layout at `prefix` wraps `path`
pub fn layout_scope_matches(prefix: &str, path: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    path == prefix || path.starts_with(&format!("{}/", prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_normalizes_pattern() {
        let route = Route::new("/users/123/");
        assert_eq!(route.pattern, "/users/123");
    }

    #[test]
    fn test_route_flags() {
        assert!(!Route::new("/about").has_dynamic);
        assert!(Route::new("/users/:id").has_dynamic);
        assert!(Route::new("/docs/*").has_catch_all);
    }

    #[test]
    fn test_compare_routes_ordering() {
        let mut routes = vec![
            Route::new("/users/*"),
            Route::new("/users/:id"),
            Route::new("/users/new"),
        ];
        routes.sort_by(compare_routes);

        let patterns: Vec<&str> = routes.iter().map(|r| r.pattern.as_str()).collect();
        assert_eq!(patterns, vec!["/users/new", "/users/:id", "/users/*"]);
    }

    #[test]
    fn test_compare_routes_length_tiebreak() {
        let mut routes = vec![Route::new("/a"), Route::new("/a/b/c")];
        routes.sort_by(compare_routes);
        assert_eq!(routes[0].pattern, "/a/b/c");
    }

    #[test]
    fn test_resolver_at_most_one_match() {
        let resolver = Resolver::new()
            .with_route(Route::new("/users/:id"))
            .with_route(Route::new("/users/new"))
            .with_route(Route::new("/users/*"));

        let resolved = resolver.resolve("/users/new").unwrap();
        assert_eq!(resolved.route.pattern, "/users/new");
        assert!(resolved.params.is_empty());
    }

    #[test]
    fn test_resolver_dynamic_beats_catch_all() {
        let resolver = Resolver::new()
            .with_route(Route::new("/users/:id"))
            .with_route(Route::new("/users/*"));

        let resolved = resolver.resolve("/users/42").unwrap();
        assert_eq!(resolved.route.pattern, "/users/:id");
    }

    #[test]
    fn test_resolver_no_match() {
        let resolver = Resolver::new().with_route(Route::new("/about"));
        assert!(resolver.resolve("/missing").is_none());
    }

    #[test]
    fn test_resolver_root() {
        let resolver = Resolver::new().with_route(Route::new("/"));
        assert!(resolver.resolve("/").is_some());
        assert!(resolver.resolve("/about").is_none());
    }

    #[test]
    fn test_layout_scope() {
        assert!(layout_scope_matches("/", "/anything/at/all"));
        assert!(layout_scope_matches("/docs", "/docs"));
        assert!(layout_scope_matches("/docs", "/docs/guide"));
        assert!(!layout_scope_matches("/docs", "/docsx"));
        assert!(!layout_scope_matches("/docs", "/doc"));
    }

    #[test]
    fn test_matching_layouts_outermost_first() {
        let resolver = Resolver::new()
            .with_layout("/dashboard/admin")
            .with_layout("/")
            .with_layout("/dashboard");

        assert_eq!(
            resolver.matching_layouts("/dashboard/admin/users"),
            vec!["/", "/dashboard", "/dashboard/admin"]
        );
    }

    #[test]
    fn test_not_found_most_specific() {
        let resolver = Resolver::new()
            .with_not_found("")
            .with_not_found("/api")
            .with_not_found("/api/v2");

        assert_eq!(resolver.resolve_not_found("/api/v2/missing"), Some("/api/v2"));
        assert_eq!(resolver.resolve_not_found("/api/missing"), Some("/api"));
        assert_eq!(resolver.resolve_not_found("/elsewhere"), Some(""));
    }

    #[test]
    fn test_not_found_requires_segment_boundary() {
        let resolver = Resolver::new().with_not_found("/api");
        assert_eq!(resolver.resolve_not_found("/apiary"), None);
        assert_eq!(resolver.resolve_not_found("/api"), Some("/api"));
    }

    #[test]
    fn test_metadata_builders() {
        let route = Route::new("/about")
            .with_title("About")
            .with_description("About the app")
            .with_keywords(["about", "info"]);

        assert_eq!(route.metadata.title.as_deref(), Some("About"));
        assert_eq!(route.metadata.keywords.len(), 2);
    }
}
