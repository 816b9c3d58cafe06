// File: src/request.rs
// Purpose: Request context with path parameters, query params, headers,
// and cookies

use std::collections::HashMap;

use axum::body::Bytes;
use axum::http::{HeaderMap, Method};

use asterism_router::PathParams;

/// Per-request state passed to middleware, loaders, renders, and actions.
///
/// Dispatch is stateless across requests: every request gets its own
/// context and nothing here is shared.
#[derive(Clone)]
pub struct RequestContext {
    /// HTTP method (GET, POST, PUT, DELETE, ...)
    pub method: Method,

    /// Request path as matched, e.g. `/users/42`
    pub path: String,

    /// Parameters captured from the matched route pattern
    pub params: PathParams,

    /// Query parameters from the URL (?key=value)
    pub query: QueryParams,

    /// Request headers
    pub headers: HeaderMap,

    /// Parsed cookies
    pub cookies: HashMap<String, String>,

    /// Raw request body
    pub body: Bytes,
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("params", &self.params)
            .finish()
    }
}

impl RequestContext {
    pub fn new(
        method: Method,
        path: String,
        query: QueryParams,
        headers: HeaderMap,
        body: Bytes,
    ) -> Self {
        let cookies = Self::parse_cookies(&headers);

        Self {
            method,
            path,
            params: PathParams::new(),
            query,
            headers,
            cookies,
            body,
        }
    }

    /// Attaches the parameters captured by route matching.
    pub fn with_params(mut self, params: PathParams) -> Self {
        self.params = params;
        self
    }

    /// Parse cookies from the Cookie header
    fn parse_cookies(headers: &HeaderMap) -> HashMap<String, String> {
        let mut cookies = HashMap::new();

        if let Some(cookie_header) = headers.get("cookie") {
            if let Ok(cookie_str) = cookie_header.to_str() {
                for cookie in cookie_str.split(';') {
                    if let Some((key, value)) = cookie.trim().split_once('=') {
                        cookies.insert(key.to_string(), value.to_string());
                    }
                }
            }
        }

        cookies
    }

    /// Get a captured path parameter
    pub fn param(&self, name: &str) -> Option<&String> {
        self.params.get(name)
    }

    /// Get a header value
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// Get a cookie value
    pub fn get_cookie(&self, name: &str) -> Option<&String> {
        self.cookies.get(name)
    }

    pub fn is_get(&self) -> bool {
        self.method == Method::GET
    }

    pub fn is_post(&self) -> bool {
        self.method == Method::POST
    }
}

/// Query parameters from the URL
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    params: HashMap<String, String>,
}

impl QueryParams {
    pub fn new(params: HashMap<String, String>) -> Self {
        Self { params }
    }

    /// Get a query parameter value
    pub fn get(&self, key: &str) -> Option<&String> {
        self.params.get(key)
    }

    /// Get a query parameter as a specific type
    pub fn get_as<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        self.params.get(key)?.parse().ok()
    }

    /// Check if a parameter exists
    pub fn has(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Get as HashMap
    pub fn as_map(&self) -> &HashMap<String, String> {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_with_headers(headers: HeaderMap) -> RequestContext {
        RequestContext::new(
            Method::GET,
            "/".to_string(),
            QueryParams::default(),
            headers,
            Bytes::new(),
        )
    }

    #[test]
    fn parses_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert("cookie", "session=abc123; theme=dark".parse().unwrap());

        let ctx = context_with_headers(headers);
        assert_eq!(ctx.get_cookie("session"), Some(&"abc123".to_string()));
        assert_eq!(ctx.get_cookie("theme"), Some(&"dark".to_string()));
        assert_eq!(ctx.get_cookie("missing"), None);
    }

    #[test]
    fn query_params_typed_access() {
        let mut map = HashMap::new();
        map.insert("page".to_string(), "3".to_string());
        let query = QueryParams::new(map);

        assert_eq!(query.get_as::<u32>("page"), Some(3));
        assert!(query.has("page"));
        assert!(!query.has("limit"));
    }
}
