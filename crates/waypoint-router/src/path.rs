//! Path validation and normalization utilities
//!
//! All functions are pure: same input, same output, no side effects.

use std::borrow::Cow;

/// Validates that a path is in canonical form
///
/// # Rules
///
/// - Must start with `/`
/// - Must not contain `//` or `\`
/// - Must not end with `/` (except root `/`)
/// - Must not be empty
///
/// # Examples
///
/// ```
/// use waypoint_router::path::is_valid_path;
///
/// assert!(is_valid_path("/"));
/// assert!(is_valid_path("/users/123"));
///
/// assert!(!is_valid_path(""));
/// assert!(!is_valid_path("about"));
/// assert!(!is_valid_path("/about/"));
/// assert!(!is_valid_path("/about//page"));
/// ```
pub fn is_valid_path(path: &str) -> bool {
    if path.is_empty() {
        return false;
    }

    if !path.starts_with('/') {
        return false;
    }

    if path.contains("//") || path.contains('\\') {
        return false;
    }

    if path == "/" {
        return true;
    }

    !path.ends_with('/')
}

/// Normalizes a path to canonical form
///
/// Zero-copy on the fast path: already-canonical input is returned as
/// `Cow::Borrowed` without allocating. Otherwise trailing slashes, duplicate
/// slashes, backslashes, and missing leading slashes are repaired with a
/// single allocation.
///
/// # Examples
///
/// ```
/// use waypoint_router::path::normalize_path;
/// use std::borrow::Cow;
///
/// let path = normalize_path("/about");
/// assert!(matches!(path, Cow::Borrowed("/about")));
///
/// assert_eq!(normalize_path("/about/"), "/about");
/// assert_eq!(normalize_path("/path//to///page"), "/path/to/page");
/// assert_eq!(normalize_path(""), "/");
/// ```
pub fn normalize_path(path: &str) -> Cow<'_, str> {
    if is_valid_path(path) {
        return Cow::Borrowed(path);
    }

    let normalized = path
        .replace('\\', "/")
        .split('/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    if normalized.is_empty() {
        Cow::Borrowed("/")
    } else {
        Cow::Owned(format!("/{}", normalized))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_path() {
        assert!(is_valid_path("/"));
        assert!(is_valid_path("/about"));
        assert!(is_valid_path("/users/123"));

        assert!(!is_valid_path(""));
        assert!(!is_valid_path("about"));
        assert!(!is_valid_path("/about/"));
        assert!(!is_valid_path("/about//page"));
        assert!(!is_valid_path("/about\\page"));
    }

    #[test]
    fn test_normalize_valid_is_borrowed() {
        let path = normalize_path("/users/123");
        assert!(matches!(path, Cow::Borrowed("/users/123")));
    }

    #[test]
    fn test_normalize_repairs_input() {
        assert_eq!(normalize_path("/about/"), "/about");
        assert_eq!(normalize_path("about"), "/about");
        assert_eq!(normalize_path("/path//to///page"), "/path/to/page");
        assert_eq!(normalize_path("\\users\\123"), "/users/123");
    }

    #[test]
    fn test_normalize_empty_is_root() {
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path("///"), "/");
    }
}
