//! Query-string parsing and building
//!
//! Bidirectional codec between a raw query string and [`SearchParams`].
//! Repeated keys become [`SearchValue::Multiple`] preserving wire order;
//! building flattens them back into repeated `key=value` pairs. Keys iterate
//! in sorted order, which makes the built string canonical: two logically
//! identical parameter sets always build to the same string.

use std::collections::BTreeMap;

/// Value of one search-param key: a single string or an ordered sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchValue {
    Single(String),
    Multiple(Vec<String>),
}

impl SearchValue {
    /// First value, regardless of arity
    pub fn first(&self) -> Option<&str> {
        match self {
            SearchValue::Single(v) => Some(v),
            SearchValue::Multiple(values) => values.first().map(String::as_str),
        }
    }

    /// All values in order
    pub fn values(&self) -> Vec<&str> {
        match self {
            SearchValue::Single(v) => vec![v.as_str()],
            SearchValue::Multiple(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for SearchValue {
    fn from(value: &str) -> Self {
        SearchValue::Single(value.to_string())
    }
}

impl From<String> for SearchValue {
    fn from(value: String) -> Self {
        SearchValue::Single(value)
    }
}

impl From<Vec<String>> for SearchValue {
    fn from(values: Vec<String>) -> Self {
        SearchValue::Multiple(values)
    }
}

/// Structured search parameters
///
/// Backed by a `BTreeMap` so key iteration order is canonical; per-key value
/// order is the order the values appeared in the query string.
///
/// # Examples
///
/// ```
/// use waypoint_router::search::SearchParams;
///
/// let params = SearchParams::parse("?tag=a&tag=b&page=2");
/// assert_eq!(params.first("page"), Some("2"));
/// assert_eq!(params.get("tag").unwrap().values(), vec!["a", "b"]);
///
/// // Canonical build: keys sorted, values in wire order.
/// assert_eq!(params.build(), "page=2&tag=a&tag=b");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
    entries: BTreeMap<String, SearchValue>,
}

impl SearchParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a query string, with or without the leading `?`
    ///
    /// Percent-escapes are decoded and `+` is treated as a space. Repeated
    /// keys collapse into [`SearchValue::Multiple`] preserving order.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);

        let mut params = Self::new();
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = match pair.split_once('=') {
                Some((k, v)) => (decode_component(k), decode_component(v)),
                None => (decode_component(pair), String::new()),
            };
            params.append(key, value);
        }
        params
    }

    /// Builds the canonical query string, without a leading `?`
    ///
    /// Empty parameters build to the empty string; sequence values flatten
    /// into repeated `key=value` pairs in order.
    pub fn build(&self) -> String {
        let mut pairs = Vec::new();
        for (key, value) in &self.entries {
            for v in value.values() {
                pairs.push(format!(
                    "{}={}",
                    urlencoding::encode(key),
                    urlencoding::encode(v)
                ));
            }
        }
        pairs.join("&")
    }

    /// Builds the query string with a leading `?`, or an empty string when
    /// there are no parameters (no dangling separator)
    pub fn build_with_prefix(&self) -> String {
        let built = self.build();
        if built.is_empty() {
            built
        } else {
            format!("?{}", built)
        }
    }

    pub fn get(&self, key: &str) -> Option<&SearchValue> {
        self.entries.get(key)
    }

    /// First value for a key
    pub fn first(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(SearchValue::first)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Sets or removes a key: `None` removes it, mirroring a merge where a
    /// null value deletes the parameter
    pub fn set<V: Into<SearchValue>>(&mut self, key: impl Into<String>, value: Option<V>) {
        let key = key.into();
        match value {
            Some(v) => {
                self.entries.insert(key, v.into());
            }
            None => {
                self.entries.remove(&key);
            }
        }
    }

    /// Appends a value, promoting an existing single value to a sequence
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.remove(&key) {
            Some(SearchValue::Single(existing)) => {
                self.entries
                    .insert(key, SearchValue::Multiple(vec![existing, value]));
            }
            Some(SearchValue::Multiple(mut values)) => {
                values.push(value);
                self.entries.insert(key, SearchValue::Multiple(values));
            }
            None => {
                self.entries.insert(key, SearchValue::Single(value));
            }
        }
    }

    /// Merges a patch into these parameters: `Some` overwrites, `None` removes
    pub fn merge<K, V>(&mut self, patch: impl IntoIterator<Item = (K, Option<V>)>)
    where
        K: Into<String>,
        V: Into<SearchValue>,
    {
        for (key, value) in patch {
            self.set(key, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SearchValue)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        // Invalid escape sequences pass through untouched.
        Err(_) => spaced,
    }
}

impl std::str::FromStr for SearchParams {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_values() {
        let params = SearchParams::parse("a=1&b=2");
        assert_eq!(params.first("a"), Some("1"));
        assert_eq!(params.first("b"), Some("2"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_parse_leading_question_mark() {
        let params = SearchParams::parse("?a=1");
        assert_eq!(params.first("a"), Some("1"));
    }

    #[test]
    fn test_parse_repeated_keys_preserve_order() {
        let params = SearchParams::parse("tag=rust&tag=web&tag=router");
        assert_eq!(
            params.get("tag"),
            Some(&SearchValue::Multiple(vec![
                "rust".to_string(),
                "web".to_string(),
                "router".to_string()
            ]))
        );
    }

    #[test]
    fn test_parse_empty() {
        assert!(SearchParams::parse("").is_empty());
        assert!(SearchParams::parse("?").is_empty());
    }

    #[test]
    fn test_parse_decodes_escapes() {
        let params = SearchParams::parse("q=hello%20world&title=a+b");
        assert_eq!(params.first("q"), Some("hello world"));
        assert_eq!(params.first("title"), Some("a b"));
    }

    #[test]
    fn test_build_empty_has_no_separator() {
        let params = SearchParams::new();
        assert_eq!(params.build(), "");
        assert_eq!(params.build_with_prefix(), "");
    }

    #[test]
    fn test_build_flattens_multi_values() {
        let mut params = SearchParams::new();
        params.set("tag", Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(params.build(), "tag=a&tag=b");
        assert_eq!(params.build_with_prefix(), "?tag=a&tag=b");
    }

    #[test]
    fn test_build_is_canonical() {
        let mut a = SearchParams::new();
        a.set("b", Some("2"));
        a.set("a", Some("1"));

        let mut b = SearchParams::new();
        b.set("a", Some("1"));
        b.set("b", Some("2"));

        assert_eq!(a.build(), b.build());
        assert_eq!(a.build(), "a=1&b=2");
    }

    #[test]
    fn test_set_none_removes() {
        let mut params = SearchParams::parse("a=1&b=2");
        params.set::<&str>("a", None);
        assert!(!params.contains_key("a"));
        assert_eq!(params.build(), "b=2");
    }

    #[test]
    fn test_merge_patch() {
        let mut params = SearchParams::parse("page=1&sort=asc");
        params.merge(vec![
            ("page", Some(SearchValue::from("2"))),
            ("sort", None),
        ]);
        assert_eq!(params.first("page"), Some("2"));
        assert!(!params.contains_key("sort"));
    }

    #[test]
    fn test_round_trip() {
        let mut params = SearchParams::new();
        params.set("single", Some("value"));
        params.set(
            "multi",
            Some(vec!["one".to_string(), "two".to_string()]),
        );

        assert_eq!(SearchParams::parse(&params.build()), params);

        let empty = SearchParams::new();
        assert_eq!(SearchParams::parse(&empty.build()), empty);
    }

    #[test]
    fn test_round_trip_with_escapes() {
        let mut params = SearchParams::new();
        params.set("q", Some("a b/c&d"));
        assert_eq!(SearchParams::parse(&params.build()), params);
    }
}
