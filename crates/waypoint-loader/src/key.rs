//! Cache key derivation
//!
//! A key identifies one logical route-data request: pathname, extracted
//! params, and search string. Components are joined with the ASCII unit
//! separator (U+001F), which cannot appear in a URL path or query, so keys
//! never collide across component boundaries.

use std::collections::BTreeMap;

use serde_json::Value;
use waypoint_router::Params;

/// Separator between key components. Not a valid URL character.
const KEY_SEPARATOR: char = '\u{1F}';

/// Derives the cache key for a request
///
/// Params are serialized as a JSON object with sorted keys, so two param
/// maps with the same entries produce the same key regardless of insertion
/// order.
///
/// # Examples
///
/// ```
/// use waypoint_loader::key::cache_key;
/// use waypoint_router::Params;
///
/// let mut a = Params::new();
/// a.insert("id".into(), "1".into());
/// a.insert("tab".into(), "posts".into());
///
/// let mut b = Params::new();
/// b.insert("tab".into(), "posts".into());
/// b.insert("id".into(), "1".into());
///
/// assert_eq!(cache_key("/users/1", &a, "q=x"), cache_key("/users/1", &b, "q=x"));
/// ```
pub fn cache_key(pathname: &str, params: &Params, search: &str) -> String {
    let sorted: BTreeMap<&str, &str> = params
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    let json = Value::Object(
        sorted
            .into_iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect(),
    );

    format!(
        "{pathname}{sep}{params}{sep}{search}",
        sep = KEY_SEPARATOR,
        params = json,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params_of(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_key_differs_by_pathname() {
        let params = Params::new();
        assert_ne!(
            cache_key("/a", &params, ""),
            cache_key("/b", &params, "")
        );
    }

    #[test]
    fn test_key_differs_by_search() {
        let params = Params::new();
        assert_ne!(
            cache_key("/a", &params, "q=1"),
            cache_key("/a", &params, "q=2")
        );
    }

    #[test]
    fn test_key_ignores_param_insertion_order() {
        let a = params_of(&[("x", "1"), ("y", "2")]);
        let b = params_of(&[("y", "2"), ("x", "1")]);
        assert_eq!(cache_key("/p", &a, ""), cache_key("/p", &b, ""));
    }

    #[test]
    fn test_key_component_boundaries() {
        // A path ending where the search begins must not collide with the
        // search folded into the path.
        let params = Params::new();
        assert_ne!(
            cache_key("/a", &params, "b"),
            cache_key("/ab", &params, "")
        );
    }

    #[test]
    fn test_empty_params_serialize_as_empty_object() {
        let key = cache_key("/a", &Params::new(), "");
        assert!(key.contains("{}"));
    }
}
