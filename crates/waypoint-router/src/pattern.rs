//! Pattern parsing and segment-level path matching
//!
//! Pure functional core of the router: same input, same output, no side
//! effects, and no error values. A path that does not match is `None`,
//! never a failure.

use std::collections::HashMap;

use crate::Params;

/// Parameter name a catch-all segment binds its remainder to.
pub const CATCH_ALL_PARAM: &str = "slug";

/// A single segment of a route pattern
///
/// # Examples
///
/// ```
/// use waypoint_router::pattern::{classify_segment, Segment};
///
/// assert!(matches!(classify_segment("users"), Segment::Literal(_)));
/// assert!(matches!(classify_segment(":id"), Segment::Param(_)));
/// assert!(matches!(classify_segment("*"), Segment::CatchAll));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Static text that must match exactly (case-sensitive)
    Literal(String),
    /// Named parameter capturing a single path segment: `:id`
    Param(String),
    /// Catch-all absorbing every remaining path segment: `*`
    CatchAll,
}

/// Classifies one pattern segment (pure function)
///
/// Rules, evaluated in order:
/// 1. `*` becomes [`Segment::CatchAll`]
/// 2. `:name` becomes [`Segment::Param`]
/// 3. anything else becomes [`Segment::Literal`]
pub fn classify_segment(segment: &str) -> Segment {
    if segment == "*" {
        return Segment::CatchAll;
    }
    match segment.strip_prefix(':') {
        Some(name) => Segment::Param(name.to_string()),
        None => Segment::Literal(segment.to_string()),
    }
}

/// Parses a full pattern string into segments
///
/// Empty segments from leading/trailing/duplicate slashes are discarded, so
/// the root pattern `/` parses to an empty segment list.
///
/// # Examples
///
/// ```
/// use waypoint_router::pattern::{parse_pattern, Segment};
///
/// let segments = parse_pattern("/users/:id");
/// assert_eq!(segments.len(), 2);
/// assert_eq!(segments[1], Segment::Param("id".to_string()));
///
/// assert!(parse_pattern("/").is_empty());
/// ```
pub fn parse_pattern(pattern: &str) -> Vec<Segment> {
    pattern
        .split('/')
        .filter(|s| !s.is_empty())
        .map(classify_segment)
        .collect()
}

/// Matches parsed pattern segments against a candidate path
///
/// Walks pattern and path segments pairwise:
/// - [`Segment::CatchAll`] succeeds immediately, joining every remaining path
///   segment with `/` into the `slug` parameter. Zero remaining segments
///   still succeed, with `slug == ""`.
/// - [`Segment::Param`] binds exactly one path segment.
/// - [`Segment::Literal`] must equal the path segment exactly.
///
/// A path shorter than the pattern fails before a catch-all is reached; extra
/// trailing path segments with no catch-all to absorb them also fail. The
/// empty segment list (root pattern) matches only the empty path.
///
/// # Examples
///
/// ```
/// use waypoint_router::pattern::{match_pattern, parse_pattern};
///
/// let docs = parse_pattern("/docs/*");
/// let params = match_pattern(&docs, "/docs/a/b/c").unwrap();
/// assert_eq!(params.get("slug"), Some(&"a/b/c".to_string()));
///
/// let params = match_pattern(&docs, "/docs").unwrap();
/// assert_eq!(params.get("slug"), Some(&String::new()));
/// ```
pub fn match_pattern(segments: &[Segment], path: &str) -> Option<Params> {
    let path_segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let mut params = HashMap::new();

    for (i, segment) in segments.iter().enumerate() {
        if let Segment::CatchAll = segment {
            let remainder = path_segments
                .get(i..)
                .map(|rest| rest.join("/"))
                .unwrap_or_default();
            params.insert(CATCH_ALL_PARAM.to_string(), remainder);
            return Some(params);
        }

        let part = path_segments.get(i)?;

        match segment {
            Segment::Param(name) => {
                params.insert(name.clone(), (*part).to_string());
            }
            Segment::Literal(expected) => {
                if expected != part {
                    return None;
                }
            }
            Segment::CatchAll => unreachable!("catch-all handled above"),
        }
    }

    // No catch-all absorbed the remainder, so every path segment must be
    // consumed exactly.
    if path_segments.len() > segments.len() {
        return None;
    }

    Some(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_literal() {
        assert_eq!(
            classify_segment("about"),
            Segment::Literal("about".to_string())
        );
    }

    #[test]
    fn test_classify_param() {
        assert_eq!(classify_segment(":id"), Segment::Param("id".to_string()));
    }

    #[test]
    fn test_classify_catch_all() {
        assert_eq!(classify_segment("*"), Segment::CatchAll);
    }

    #[test]
    fn test_parse_pattern_root() {
        assert!(parse_pattern("/").is_empty());
        assert!(parse_pattern("").is_empty());
    }

    #[test]
    fn test_parse_pattern_mixed() {
        let segments = parse_pattern("/users/:id/posts/*");
        assert_eq!(
            segments,
            vec![
                Segment::Literal("users".to_string()),
                Segment::Param("id".to_string()),
                Segment::Literal("posts".to_string()),
                Segment::CatchAll,
            ]
        );
    }

    #[test]
    fn test_match_literal_exact() {
        let segments = parse_pattern("/about");
        assert!(match_pattern(&segments, "/about").is_some());
        assert!(match_pattern(&segments, "/other").is_none());
        assert!(match_pattern(&segments, "/about/more").is_none());
    }

    #[test]
    fn test_match_literal_case_sensitive() {
        let segments = parse_pattern("/About");
        assert!(match_pattern(&segments, "/about").is_none());
    }

    #[test]
    fn test_match_root() {
        let segments = parse_pattern("/");
        assert!(match_pattern(&segments, "/").is_some());
        assert!(match_pattern(&segments, "").is_some());
        assert!(match_pattern(&segments, "/about").is_none());
    }

    #[test]
    fn test_match_param_binds_segment() {
        let segments = parse_pattern("/users/:id");
        let params = match_pattern(&segments, "/users/123").unwrap();
        assert_eq!(params.get("id"), Some(&"123".to_string()));
    }

    #[test]
    fn test_match_param_requires_segment() {
        let segments = parse_pattern("/users/:id");
        assert!(match_pattern(&segments, "/users").is_none());
        assert!(match_pattern(&segments, "/users/123/posts").is_none());
    }

    #[test]
    fn test_match_catch_all_joins_remainder() {
        let segments = parse_pattern("/docs/*");
        let params = match_pattern(&segments, "/docs/a/b/c").unwrap();
        assert_eq!(params.get("slug"), Some(&"a/b/c".to_string()));
    }

    #[test]
    fn test_match_catch_all_empty_remainder() {
        // Zero remaining segments still succeed with an empty slug.
        let segments = parse_pattern("/docs/*");
        let params = match_pattern(&segments, "/docs").unwrap();
        assert_eq!(params.get("slug"), Some(&String::new()));
    }

    #[test]
    fn test_match_catch_all_needs_literal_prefix() {
        let segments = parse_pattern("/a/b/*");
        assert!(match_pattern(&segments, "/a").is_none());
        assert!(match_pattern(&segments, "/x/b/c").is_none());
    }

    #[test]
    fn test_match_multiple_params() {
        let segments = parse_pattern("/posts/:year/:slug");
        let params = match_pattern(&segments, "/posts/2024/hello-world").unwrap();
        assert_eq!(params.get("year"), Some(&"2024".to_string()));
        assert_eq!(params.get("slug"), Some(&"hello-world".to_string()));
    }
}
