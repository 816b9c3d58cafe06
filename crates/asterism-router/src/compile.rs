//! Path compilation: directory components → URL pattern + typed segments.
//!
//! The compiler never rejects input. Malformed shapes (duplicate parameter
//! names, misplaced catch-alls) are compiled as-is and reported by the
//! validator so that a broken route shows up in the manifest's error list
//! instead of aborting the build.

use crate::segment::{classify_segment, RouteSegment};

/// Output of compiling one file's directory path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPath {
    /// URL pattern with a leading `/`: `/users/:id/profile`.
    pub url_pattern: String,
    /// Typed segments in directory order, groups included.
    pub segments: Vec<RouteSegment>,
    /// Match priority. Lower sorts earlier (matched first).
    pub priority: u64,
}

/// Compiles the directory components of a route file (file name already
/// removed) into a URL pattern and typed segment list.
///
/// Group segments are carried in `segments` but excluded from the URL, so
/// `(shop)/products/[id]` and `products/[id]` synthesize the same pattern
/// while keeping distinct directory paths for ancestor resolution.
///
/// # Examples
///
/// ```
/// use asterism_router::compile::compile_path;
///
/// let compiled = compile_path(&["users", "[id]", "profile"]);
/// assert_eq!(compiled.url_pattern, "/users/:id/profile");
///
/// let root = compile_path(&[]);
/// assert_eq!(root.url_pattern, "/");
/// ```
pub fn compile_path(components: &[&str]) -> CompiledPath {
    let segments: Vec<RouteSegment> = components
        .iter()
        .filter(|c| !c.is_empty())
        .map(|c| classify_segment(c))
        .collect();

    let tokens: Vec<String> = segments.iter().filter_map(|s| s.url_token()).collect();

    let url_pattern = if tokens.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", tokens.join("/"))
    };

    let priority = calculate_priority(&segments);

    CompiledPath {
        url_pattern,
        segments,
        priority,
    }
}

/// Specificity rank of a single segment. Lower matches earlier.
fn segment_rank(segment: &RouteSegment) -> u64 {
    match segment {
        RouteSegment::Static(_) => 0,
        RouteSegment::Dynamic(_) => 1,
        RouteSegment::CatchAll(_) => 2,
        RouteSegment::OptionalCatchAll(_) => 3,
        // Groups are zero-width and never ranked; filtered before packing.
        RouteSegment::Group(_) => 0,
    }
}

/// Number of leading segments whose ranks fit in the packed priority.
const RANKED_SEGMENTS: usize = 28;

/// Calculates the match priority of a segment sequence. Lower = earlier.
///
/// The priority is a single packed key that realizes position-wise
/// specificity: a static segment outranks a dynamic one at the same
/// position, a dynamic segment outranks a catch-all, and a required
/// catch-all outranks an optional one. Layout: the ranks of the first 28
/// non-group segments, two bits each and most significant first, with the
/// segment count in the low byte so that a route sharing a prefix with a
/// longer route sorts before it (fewer remaining wildcards win).
///
/// Ties between routes with identical priorities are broken by scan order
/// when the manifest sorts its table.
///
/// # Examples
///
/// ```
/// use asterism_router::compile::compile_path;
///
/// let fixed = compile_path(&["users", "new"]);
/// let param = compile_path(&["users", "[id]"]);
/// let rest = compile_path(&["users", "[...rest]"]);
/// assert!(fixed.priority < param.priority);
/// assert!(param.priority < rest.priority);
/// ```
pub fn calculate_priority(segments: &[RouteSegment]) -> u64 {
    let ranks: Vec<u64> = segments
        .iter()
        .filter(|s| !s.is_group())
        .map(segment_rank)
        .collect();

    let mut packed: u64 = 0;
    for i in 0..RANKED_SEGMENTS {
        packed = (packed << 2) | ranks.get(i).copied().unwrap_or(0);
    }

    (packed << 8) | (ranks.len().min(255) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn compiles_static_path() {
        let compiled = compile_path(&["blog", "archive"]);
        assert_eq!(compiled.url_pattern, "/blog/archive");
        assert_eq!(
            compiled.segments,
            vec![
                RouteSegment::Static("blog".into()),
                RouteSegment::Static("archive".into()),
            ]
        );
    }

    #[test]
    fn compiles_dynamic_path() {
        let compiled = compile_path(&["users", "[id]", "profile"]);
        assert_eq!(compiled.url_pattern, "/users/:id/profile");
        assert_eq!(
            compiled.segments,
            vec![
                RouteSegment::Static("users".into()),
                RouteSegment::Dynamic("id".into()),
                RouteSegment::Static("profile".into()),
            ]
        );
    }

    #[test]
    fn groups_are_invisible_in_url_but_kept_in_segments() {
        let compiled = compile_path(&["(shop)", "products", "[id]"]);
        assert_eq!(compiled.url_pattern, "/products/:id");
        assert_eq!(compiled.segments.len(), 3);
        assert!(compiled.segments[0].is_group());
    }

    #[test]
    fn group_only_path_maps_to_root() {
        let compiled = compile_path(&["(marketing)"]);
        assert_eq!(compiled.url_pattern, "/");
    }

    #[test]
    fn catch_all_tokens() {
        assert_eq!(
            compile_path(&["docs", "[...slug]"]).url_pattern,
            "/docs/*slug"
        );
        assert_eq!(
            compile_path(&["docs", "[[...slug]]"]).url_pattern,
            "/docs/*slug?"
        );
    }

    #[test]
    fn static_beats_dynamic_at_same_position() {
        // /a/[b]/[c] must sort before /[x]/b/c: position 0 decides.
        let early = compile_path(&["a", "[b]", "[c]"]);
        let late = compile_path(&["[x]", "b", "c"]);
        assert!(early.priority < late.priority);
    }

    #[test]
    fn shared_prefix_fewer_wildcards_wins() {
        let shorter = compile_path(&["a", "[b]"]);
        let longer = compile_path(&["a", "[b]", "[...rest]"]);
        assert!(shorter.priority < longer.priority);
    }

    #[test]
    fn required_catch_all_beats_optional() {
        let required = compile_path(&["docs", "[...slug]"]);
        let optional = compile_path(&["docs", "[[...slug]]"]);
        assert!(required.priority < optional.priority);
    }

    #[test]
    fn groups_do_not_affect_priority() {
        let grouped = compile_path(&["(shop)", "products"]);
        let plain = compile_path(&["products"]);
        assert_eq!(grouped.priority, plain.priority);
    }
}
