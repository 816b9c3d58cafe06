//! Route segment classification.
//!
//! Directory names in the routes tree follow a small grammar. Each path
//! component maps to exactly one [`RouteSegment`] variant:
//!
//! - `users`        → static literal
//! - `[id]`         → dynamic parameter
//! - `[...slug]`    → required catch-all (one or more trailing segments)
//! - `[[...slug]]`  → optional catch-all (zero or more trailing segments)
//! - `(marketing)`  → route group, invisible in the URL
//!
//! Group segments are kept through compilation so that ancestor resolution
//! can walk the real directory tree; they are only dropped when the URL
//! string is synthesized.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A single typed segment of a compiled route path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "kebab-case")]
pub enum RouteSegment {
    /// Literal text segment, matched verbatim.
    Static(String),
    /// Dynamic parameter capturing a single path segment: `[id]`.
    Dynamic(String),
    /// Catch-all capturing one or more trailing segments: `[...slug]`.
    CatchAll(String),
    /// Optional catch-all capturing zero or more trailing segments: `[[...slug]]`.
    OptionalCatchAll(String),
    /// Route group directory: `(name)`. Zero-width in the URL.
    Group(String),
}

impl RouteSegment {
    /// Parameter name for dynamic and catch-all segments, `None` otherwise.
    pub fn param_name(&self) -> Option<&str> {
        match self {
            RouteSegment::Dynamic(name)
            | RouteSegment::CatchAll(name)
            | RouteSegment::OptionalCatchAll(name) => Some(name),
            RouteSegment::Static(_) | RouteSegment::Group(_) => None,
        }
    }

    /// Whether this segment is a route group.
    pub fn is_group(&self) -> bool {
        matches!(self, RouteSegment::Group(_))
    }

    /// Whether this segment captures the remainder of the path.
    pub fn is_catch_all(&self) -> bool {
        matches!(
            self,
            RouteSegment::CatchAll(_) | RouteSegment::OptionalCatchAll(_)
        )
    }

    /// Whether this segment captures a parameter of any shape.
    pub fn is_wildcard(&self) -> bool {
        self.param_name().is_some()
    }

    /// The token this segment contributes to the URL pattern.
    ///
    /// Group segments contribute nothing and return `None`.
    pub fn url_token(&self) -> Option<String> {
        match self {
            RouteSegment::Static(value) => Some(value.clone()),
            RouteSegment::Dynamic(name) => Some(format!(":{name}")),
            RouteSegment::CatchAll(name) => Some(format!("*{name}")),
            RouteSegment::OptionalCatchAll(name) => Some(format!("*{name}?")),
            RouteSegment::Group(_) => None,
        }
    }
}

/// Classifies a single directory component into a [`RouteSegment`].
///
/// Bracket forms are tried from most to least specific; anything that does
/// not parse as a bracket or group form is a static literal, including
/// malformed brackets like `[id` (the validator rejects those by name).
///
/// # Examples
///
/// ```
/// use asterism_router::segment::{classify_segment, RouteSegment};
///
/// assert_eq!(classify_segment("about"), RouteSegment::Static("about".into()));
/// assert_eq!(classify_segment("[id]"), RouteSegment::Dynamic("id".into()));
/// assert_eq!(classify_segment("[...slug]"), RouteSegment::CatchAll("slug".into()));
/// assert_eq!(
///     classify_segment("[[...slug]]"),
///     RouteSegment::OptionalCatchAll("slug".into())
/// );
/// assert_eq!(
///     classify_segment("(marketing)"),
///     RouteSegment::Group("marketing".into())
/// );
/// ```
pub fn classify_segment(component: &str) -> RouteSegment {
    // Optional catch-all: [[...name]] (double brackets)
    if let Some(inner) = component
        .strip_prefix("[[")
        .and_then(|s| s.strip_suffix("]]"))
    {
        if let Some(name) = inner.strip_prefix("...") {
            return RouteSegment::OptionalCatchAll(name.to_string());
        }
    }

    if let Some(inner) = component.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        if let Some(name) = inner.strip_prefix("...") {
            return RouteSegment::CatchAll(name.to_string());
        }
        return RouteSegment::Dynamic(inner.to_string());
    }

    if let Some(inner) = component.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        return RouteSegment::Group(inner.to_string());
    }

    RouteSegment::Static(component.to_string())
}

/// Checks whether a captured parameter name is a usable identifier.
///
/// Names like `id`, `user_id`, or `slug2` pass; empty names and names with
/// path metacharacters fail and surface as pattern errors in validation.
pub fn is_valid_param_name(name: &str) -> bool {
    static PARAM_NAME: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

    PARAM_NAME.is_match(name)
}
