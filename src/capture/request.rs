//! Captured request representation and raw-context parsing

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::config::BodyParsing;

/// Lower-cased header name to value
pub type HeaderMap = BTreeMap<String, String>;

/// Decoded query parameter name to value
pub type QueryMap = BTreeMap<String, String>;

/// Raw request as handed over by the engine
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Path including the query string, as received
    pub raw_path: String,
    /// Header pairs in received order, original casing
    pub headers: Vec<(String, String)>,
    /// Body bytes
    pub body: Vec<u8>,
}

/// A captured request body
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CapturedBody {
    /// Body that parsed as JSON
    Json(Value),
    /// Anything else, decoded as (lossy) UTF-8
    Text(String),
}

impl CapturedBody {
    /// Parse body bytes according to the configured strategy
    #[must_use]
    pub fn parse(bytes: &[u8], parsing: BodyParsing) -> Self {
        if parsing == BodyParsing::Auto && !bytes.is_empty() {
            if let Ok(value) = serde_json::from_slice(bytes) {
                return CapturedBody::Json(value);
            }
        }

        CapturedBody::Text(String::from_utf8_lossy(bytes).into_owned())
    }

    /// JSON value, if the body parsed as JSON
    #[must_use]
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            CapturedBody::Json(value) => Some(value),
            CapturedBody::Text(_) => None,
        }
    }

    /// Text, if the body was kept as text
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CapturedBody::Json(_) => None,
            CapturedBody::Text(text) => Some(text),
        }
    }

    /// Check whether the request carried no body
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, CapturedBody::Text(text) if text.is_empty())
    }
}

impl PartialEq<Value> for CapturedBody {
    fn eq(&self, other: &Value) -> bool {
        match self {
            CapturedBody::Json(value) => value == other,
            CapturedBody::Text(text) => other.as_str() == Some(text.as_str()),
        }
    }
}

impl PartialEq<&str> for CapturedBody {
    fn eq(&self, other: &&str) -> bool {
        self.as_text() == Some(*other)
    }
}

/// One observed request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapturedRequest {
    /// Headers, names lower-cased
    pub headers: HeaderMap,
    /// Path without query; `None` when the raw path had no usable path
    pub path: Option<String>,
    /// Decoded query parameters
    pub query: QueryMap,
    /// Parsed body
    pub body: CapturedBody,
}

impl CapturedRequest {
    /// Build a capture from the raw engine context
    ///
    /// Never fails: missing or malformed pieces degrade to empty values.
    #[must_use]
    pub fn from_context(context: &RequestContext, parsing: BodyParsing) -> Self {
        let (path, query) = split_path(&context.raw_path);

        Self {
            headers: lowercase_headers(&context.headers),
            path,
            query,
            body: CapturedBody::parse(&context.body, parsing),
        }
    }
}

/// Lower-case header names, joining repeated headers with ", "
fn lowercase_headers(headers: &[(String, String)]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        map.entry(name.to_ascii_lowercase())
            .and_modify(|existing: &mut String| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.clone());
    }
    map
}

/// Split a raw request target into path and decoded query
///
/// Origin-form (`/a/b?x=1`) and absolute-form (`http://host/a/b?x=1`) targets
/// yield a path. Anything else (`*`, empty, garbage) yields `None`.
pub(crate) fn split_path(raw: &str) -> (Option<String>, QueryMap) {
    let target = raw.split('#').next().unwrap_or_default();
    let (path_part, query_part) = match target.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (target, None),
    };

    let path = if path_part.starts_with('/') {
        Some(path_part.to_string())
    } else {
        path_part
            .split_once("://")
            .and_then(|(_, rest)| rest.find('/').map(|start| rest[start..].to_string()))
    };

    let query = query_part.map(parse_query).unwrap_or_default();
    (path, query)
}

fn parse_query(query: &str) -> QueryMap {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(key), decode_component(value))
        })
        .collect()
}

fn decode_component(component: &str) -> String {
    let spaced = component.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(Cow::Borrowed(decoded)) => decoded.to_string(),
        Ok(Cow::Owned(decoded)) => decoded,
        Err(_) => String::from_utf8_lossy(&urlencoding::decode_binary(spaced.as_bytes()))
            .into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_split_origin_form() {
        let (path, query) = split_path("/some/path?param1=198447&param2=ifjkhh,dhd");
        assert_eq!(path.as_deref(), Some("/some/path"));
        assert_eq!(query.len(), 2);
        assert_eq!(query["param1"], "198447");
        assert_eq!(query["param2"], "ifjkhh,dhd");
    }

    #[test]
    fn test_split_without_query() {
        let (path, query) = split_path("/some/path");
        assert_eq!(path.as_deref(), Some("/some/path"));
        assert!(query.is_empty());
    }

    #[test]
    fn test_split_absolute_form() {
        let (path, query) = split_path("http://api.example.com/v1/items?limit=10");
        assert_eq!(path.as_deref(), Some("/v1/items"));
        assert_eq!(query["limit"], "10");
    }

    #[test]
    fn test_split_unparseable_paths() {
        for raw in ["", "*", "no-slash", "http://host-only", "?only=query"] {
            let (path, _) = split_path(raw);
            assert!(path.is_none(), "expected no path for {raw:?}");
        }

        let (_, query) = split_path("?only=query");
        assert_eq!(query["only"], "query");
    }

    #[test]
    fn test_query_decoding() {
        let (_, query) = split_path("/p?name=Walter+White&city=Albuquerque%2C%20NM&flag&=x&a=1&a=2");
        assert_eq!(query["name"], "Walter White");
        assert_eq!(query["city"], "Albuquerque, NM");
        assert_eq!(query["flag"], "");
        assert_eq!(query[""], "x");
        assert_eq!(query["a"], "2");
    }

    #[test]
    fn test_query_invalid_utf8_is_lossy() {
        let (_, query) = split_path("/p?bad=%FF");
        assert_eq!(query["bad"], "\u{FFFD}");
    }

    #[test]
    fn test_fragment_is_dropped() {
        let (path, query) = split_path("/p?x=1#section");
        assert_eq!(path.as_deref(), Some("/p"));
        assert_eq!(query["x"], "1");
    }

    #[test]
    fn test_lowercase_headers() {
        let headers = lowercase_headers(&[
            ("Content-Type".to_string(), "application/json".to_string()),
            ("X-Trace".to_string(), "a".to_string()),
            ("x-trace".to_string(), "b".to_string()),
        ]);
        assert_eq!(headers["content-type"], "application/json");
        assert_eq!(headers["x-trace"], "a, b");
        assert!(!headers.contains_key("Content-Type"));
    }

    #[test]
    fn test_body_parsing() {
        let body = CapturedBody::parse(br#"{"message":"Say my name"}"#, BodyParsing::Auto);
        assert_eq!(body, json!({"message": "Say my name"}));
        assert!(body.as_text().is_none());

        let body = CapturedBody::parse(b"plain words", BodyParsing::Auto);
        assert_eq!(body, "plain words");

        let body = CapturedBody::parse(br#"{"a":1}"#, BodyParsing::Text);
        assert_eq!(body.as_text(), Some(r#"{"a":1}"#));

        let body = CapturedBody::parse(b"", BodyParsing::Auto);
        assert!(body.is_empty());
    }

    #[test]
    fn test_from_context() {
        let context = RequestContext {
            raw_path: "/some/path?q=1".to_string(),
            headers: vec![("Authorization".to_string(), "Bearer xyz".to_string())],
            body: b"[1,2,3]".to_vec(),
        };

        let captured = CapturedRequest::from_context(&context, BodyParsing::Auto);
        assert_eq!(captured.path.as_deref(), Some("/some/path"));
        assert_eq!(captured.query["q"], "1");
        assert_eq!(captured.headers["authorization"], "Bearer xyz");
        assert_eq!(captured.body, json!([1, 2, 3]));
    }

    proptest! {
        #[test]
        fn prop_split_path_yields_clean_paths(raw in ".*") {
            let (path, _) = split_path(&raw);
            if let Some(path) = path {
                prop_assert!(path.starts_with('/'));
                prop_assert!(!path.contains('?'));
                prop_assert!(!path.contains('#'));
            }
        }

        #[test]
        fn prop_split_path_keeps_origin_form(
            path in "(/[a-z0-9._~-]{0,12}){1,4}",
            key in "[a-z]{1,8}",
            value in "[a-zA-Z0-9,._-]{0,12}",
        ) {
            let (parsed, query) = split_path(&format!("{path}?{key}={value}"));
            prop_assert_eq!(parsed.as_deref(), Some(path.as_str()));
            prop_assert_eq!(query.get(&key), Some(&value));
        }

        #[test]
        fn prop_from_context_never_fails(
            raw_path in ".*",
            body in proptest::collection::vec(any::<u8>(), 0..64),
        ) {
            let context = RequestContext {
                raw_path,
                headers: vec![("X-Any".to_string(), "v".to_string())],
                body,
            };

            let captured = CapturedRequest::from_context(&context, BodyParsing::Auto);
            prop_assert_eq!(captured.headers.len(), 1);
        }
    }
}
