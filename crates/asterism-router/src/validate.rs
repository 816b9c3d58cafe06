//! Route validation: single-route well-formedness and cross-route
//! conflict/shadow analysis.
//!
//! Validation never aborts a build. Problems accumulate as values in the
//! manifest; errors make the offending route unservable while warnings
//! leave both routes live. The caller decides what to do with them — the
//! CLI exits non-zero in build mode, the dev server serves what it can.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::manifest::RouteEntry;
use crate::segment::{is_valid_param_name, RouteSegment};

/// Build-blocking problem classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// Filesystem access failure during scanning.
    Scan,
    /// Malformed single-route pattern.
    Pattern,
    /// Two files resolving to the same URL pattern.
    Conflict,
}

/// Informational problem classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningKind {
    /// A catch-all route that can intercept a later, more specific route.
    Shadow,
}

/// A build-blocking validation finding. The route(s) named in `files` are
/// excluded from the servable table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub kind: ErrorKind,
    pub message: String,
    pub files: Vec<String>,
}

impl ValidationError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, files: Vec<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            files,
        }
    }
}

/// An informational validation finding. All named routes stay servable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub kind: WarningKind,
    pub message: String,
    pub files: Vec<String>,
}

impl ValidationWarning {
    pub fn new(kind: WarningKind, message: impl Into<String>, files: Vec<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            files,
        }
    }
}

/// Per-route checks. A non-empty result excludes the route from the
/// servable table.
pub fn validate_entry(entry: &RouteEntry) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let file = entry.file_path.clone();

    if entry.url_pattern.is_empty()
        || !entry.url_pattern.starts_with('/')
        || entry.url_pattern.contains("//")
    {
        errors.push(ValidationError::new(
            ErrorKind::Pattern,
            format!("malformed URL pattern `{}`", entry.url_pattern),
            vec![file.clone()],
        ));
    }

    for name in entry.segments.iter().filter_map(|s| s.param_name()) {
        if !is_valid_param_name(name) {
            errors.push(ValidationError::new(
                ErrorKind::Pattern,
                format!("invalid parameter name `{name}`"),
                vec![file.clone()],
            ));
        }
    }

    let mut seen = HashSet::new();
    for name in entry.segments.iter().filter_map(|s| s.param_name()) {
        if !seen.insert(name) {
            errors.push(ValidationError::new(
                ErrorKind::Pattern,
                format!("parameter name `{name}` used more than once"),
                vec![file.clone()],
            ));
        }
    }

    let ranked: Vec<&RouteSegment> =
        entry.segments.iter().filter(|s| !s.is_group()).collect();
    let catch_alls = ranked.iter().filter(|s| s.is_catch_all()).count();

    if catch_alls > 1 {
        errors.push(ValidationError::new(
            ErrorKind::Pattern,
            "more than one catch-all segment".to_string(),
            vec![file.clone()],
        ));
    }

    if let Some(pos) = ranked.iter().position(|s| s.is_catch_all()) {
        if pos + 1 != ranked.len() {
            errors.push(ValidationError::new(
                ErrorKind::Pattern,
                "catch-all segment must be the final segment".to_string(),
                vec![file],
            ));
        }
    }

    errors
}

/// Cross-route conflict detection over pattern-valid entries.
///
/// Returns one error per colliding URL pattern plus the scan indices of
/// every entry involved; none of them are servable. The page-versus-handler
/// case is the classic collision, but same-kind collisions are possible
/// through route groups and get the same treatment.
pub fn find_conflicts(entries: &[RouteEntry]) -> (Vec<ValidationError>, HashSet<usize>) {
    let mut by_pattern: HashMap<&str, Vec<&RouteEntry>> = HashMap::new();
    for entry in entries {
        by_pattern
            .entry(entry.url_pattern.as_str())
            .or_default()
            .push(entry);
    }

    let mut errors = Vec::new();
    let mut dropped = HashSet::new();

    let mut patterns: Vec<&&str> = by_pattern
        .keys()
        .filter(|p| by_pattern[**p].len() > 1)
        .collect();
    patterns.sort();

    for pattern in patterns {
        let group = &by_pattern[*pattern];
        let files: Vec<String> = group.iter().map(|e| e.file_path.clone()).collect();
        for entry in group {
            dropped.insert(entry.scan_index);
        }
        errors.push(ValidationError::new(
            ErrorKind::Conflict,
            format!(
                "{} files resolve to the same URL pattern `{}`",
                group.len(),
                pattern
            ),
            files,
        ));
    }

    (errors, dropped)
}

/// Whether a catch-all route's fixed prefix is compatible with the leading
/// segments of another route, meaning both can match the same request path.
fn prefix_overlaps(prefix: &[&RouteSegment], other: &[&RouteSegment]) -> bool {
    if other.len() < prefix.len() {
        return false;
    }
    prefix.iter().zip(other).all(|(a, b)| match (a, b) {
        (RouteSegment::Static(x), RouteSegment::Static(y)) => x == y,
        // A wildcard on either side can always meet the other segment.
        _ => true,
    })
}

/// Shadow detection over the servable table in final match order.
///
/// An earlier catch-all route that can match paths a later route also
/// matches intercepts those requests; first match wins, so the later route
/// is unreachable for the overlap. Pairwise scan, quadratic in the route
/// count — fine for the tens-to-hundreds of routes this targets.
pub fn find_shadows(entries: &[RouteEntry]) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    for (i, earlier) in entries.iter().enumerate() {
        let ranked: Vec<&RouteSegment> =
            earlier.segments.iter().filter(|s| !s.is_group()).collect();
        let Some(wild_pos) = ranked.iter().position(|s| s.is_catch_all()) else {
            continue;
        };
        let prefix = &ranked[..wild_pos];
        let required = matches!(ranked[wild_pos], RouteSegment::CatchAll(_));

        for later in &entries[i + 1..] {
            let other: Vec<&RouteSegment> =
                later.segments.iter().filter(|s| !s.is_group()).collect();

            // The catch-all needs at least one remaining segment unless it
            // is optional, so a later route must be deep enough to overlap.
            let min_len = wild_pos + usize::from(required);
            let deep_enough =
                other.len() >= min_len || other.iter().any(|s| s.is_catch_all());

            if deep_enough && prefix_overlaps(prefix, &other) {
                warnings.push(ValidationWarning::new(
                    WarningKind::Shadow,
                    format!(
                        "`{}` matches first and can intercept requests intended for `{}`",
                        earlier.url_pattern, later.url_pattern
                    ),
                    vec![earlier.file_path.clone(), later.file_path.clone()],
                ));
            }
        }
    }

    warnings
}
