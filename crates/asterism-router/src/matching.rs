//! Request-path matching against compiled segment sequences.

use std::collections::HashMap;

use crate::segment::RouteSegment;

/// Parameters captured from a matched request path.
pub type PathParams = HashMap<String, String>;

/// Matches a request path against a route's typed segments.
///
/// Group segments are zero-width and skipped. Dynamic segments capture one
/// path segment, a catch-all captures every remaining segment joined with
/// `/` (at least one; an optional catch-all also matches none). Returns
/// `None` when the path does not fit the shape.
///
/// # Examples
///
/// ```
/// use asterism_router::compile::compile_path;
/// use asterism_router::matching::match_params;
///
/// let compiled = compile_path(&["users", "[id]"]);
/// let params = match_params(&compiled.segments, "/users/42").unwrap();
/// assert_eq!(params.get("id"), Some(&"42".to_string()));
/// assert!(match_params(&compiled.segments, "/users").is_none());
/// ```
pub fn match_params(segments: &[RouteSegment], path: &str) -> Option<PathParams> {
    let pattern: Vec<&RouteSegment> = segments.iter().filter(|s| !s.is_group()).collect();
    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    fn walk(
        pattern: &[&RouteSegment],
        parts: &[&str],
        params: PathParams,
    ) -> Option<PathParams> {
        let Some((segment, rest_pattern)) = pattern.split_first() else {
            // Pattern consumed; the path must be too.
            return parts.is_empty().then_some(params);
        };

        match segment {
            RouteSegment::Static(value) => {
                let (part, rest_parts) = parts.split_first()?;
                (value == part)
                    .then(|| walk(rest_pattern, rest_parts, params))
                    .flatten()
            }
            RouteSegment::Dynamic(name) => {
                let (part, rest_parts) = parts.split_first()?;
                let mut params = params;
                params.insert(name.clone(), (*part).to_string());
                walk(rest_pattern, rest_parts, params)
            }
            RouteSegment::CatchAll(name) => {
                if parts.is_empty() {
                    return None;
                }
                let mut params = params;
                params.insert(name.clone(), parts.join("/"));
                Some(params)
            }
            RouteSegment::OptionalCatchAll(name) => {
                let mut params = params;
                params.insert(name.clone(), parts.join("/"));
                Some(params)
            }
            RouteSegment::Group(_) => walk(rest_pattern, parts, params),
        }
    }

    walk(&pattern, &parts, PathParams::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile_path;
    use pretty_assertions::assert_eq;

    #[test]
    fn matches_static_exactly() {
        let compiled = compile_path(&["about"]);
        assert!(match_params(&compiled.segments, "/about").is_some());
        assert!(match_params(&compiled.segments, "/about/").is_some());
        assert!(match_params(&compiled.segments, "/other").is_none());
        assert!(match_params(&compiled.segments, "/about/team").is_none());
    }

    #[test]
    fn root_matches_only_root() {
        let compiled = compile_path(&[]);
        assert!(match_params(&compiled.segments, "/").is_some());
        assert!(match_params(&compiled.segments, "/anything").is_none());
    }

    #[test]
    fn captures_dynamic_parameters() {
        let compiled = compile_path(&["users", "[id]", "posts", "[post]"]);
        let params = match_params(&compiled.segments, "/users/7/posts/42").unwrap();
        assert_eq!(params.get("id"), Some(&"7".to_string()));
        assert_eq!(params.get("post"), Some(&"42".to_string()));
    }

    #[test]
    fn catch_all_requires_at_least_one_segment() {
        let compiled = compile_path(&["docs", "[...slug]"]);
        let params = match_params(&compiled.segments, "/docs/guide/intro").unwrap();
        assert_eq!(params.get("slug"), Some(&"guide/intro".to_string()));
        assert!(match_params(&compiled.segments, "/docs").is_none());
    }

    #[test]
    fn optional_catch_all_matches_zero_segments() {
        let compiled = compile_path(&["docs", "[[...slug]]"]);
        let params = match_params(&compiled.segments, "/docs").unwrap();
        assert_eq!(params.get("slug"), Some(&"".to_string()));
        let params = match_params(&compiled.segments, "/docs/a/b").unwrap();
        assert_eq!(params.get("slug"), Some(&"a/b".to_string()));
    }

    #[test]
    fn groups_are_skipped_when_matching() {
        let compiled = compile_path(&["(shop)", "products", "[id]"]);
        let params = match_params(&compiled.segments, "/products/3").unwrap();
        assert_eq!(params.get("id"), Some(&"3".to_string()));
    }
}
