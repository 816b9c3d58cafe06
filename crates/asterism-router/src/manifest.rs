//! Route manifest: the immutable, validated output of one build pass.
//!
//! The builder orchestrates scan → compile → resolve → validate and hands
//! back a [`RouteManifest`] value. Nothing mutates a manifest after
//! construction; a rebuild produces a brand-new value that consumers swap
//! in wholesale. Given an unchanged tree, two builds produce the same
//! route order and resolved paths.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::compile::compile_path;
use crate::hierarchy::{inherited_chain, nearest_ancestor};
use crate::matching::{match_params, PathParams};
use crate::scan::{scan_routes, FileKind, ScannedFile};
use crate::segment::RouteSegment;
use crate::validate::{
    find_conflicts, find_shadows, validate_entry, ValidationError, ValidationWarning,
};

/// Which kind of servable file produced a route entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteKind {
    /// A `page` file: rendered markup, composed into layouts.
    #[serde(rename = "page")]
    Page,
    /// A `route` file: a raw handler keyed by HTTP verb.
    #[serde(rename = "route")]
    Handler,
}

/// One servable route with everything resolved: URL pattern, typed
/// segments, layout and middleware chains (root first), and the nearest
/// boundary of each kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteEntry {
    pub url_pattern: String,
    /// Path relative to the routes root, forward-slash separated.
    pub file_path: String,
    pub absolute_path: PathBuf,
    pub kind: RouteKind,
    pub segments: Vec<RouteSegment>,
    /// Layout files that wrap this route, outermost first.
    pub layouts: Vec<PathBuf>,
    /// Middleware files that run before this route, outermost first.
    pub middleware: Vec<PathBuf>,
    /// Nearest-ancestor error boundary, if any.
    pub error_boundary: Option<PathBuf>,
    /// Nearest-ancestor loading boundary, if any. Published for tooling.
    pub loading_boundary: Option<PathBuf>,
    /// Nearest-ancestor not-found boundary, if any.
    pub not_found_boundary: Option<PathBuf>,
    /// Match priority; lower matches first. Ties fall back to scan order.
    pub priority: u64,
    #[serde(skip)]
    pub(crate) scan_index: usize,
}

impl RouteEntry {
    /// Attempts to match a request path, returning captured parameters.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        match_params(&self.segments, path)
    }
}

/// A matched route plus the parameters captured from the request path.
#[derive(Debug, Clone)]
pub struct RouteMatch<'a> {
    pub entry: &'a RouteEntry,
    pub params: PathParams,
}

/// The compiled, validated route table for one scan of the routes root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteManifest {
    /// Servable routes in final match order.
    pub routes: Vec<RouteEntry>,
    /// Layout registrations: directory → absolute path.
    pub layouts: BTreeMap<String, PathBuf>,
    /// Middleware registrations: directory → absolute path.
    pub middleware: BTreeMap<String, PathBuf>,
    /// Error boundary registrations: directory → absolute path.
    pub error_boundaries: BTreeMap<String, PathBuf>,
    /// Loading boundary registrations: directory → absolute path.
    pub loading_boundaries: BTreeMap<String, PathBuf>,
    /// Not-found boundary registrations: directory → absolute path.
    pub not_found_boundaries: BTreeMap<String, PathBuf>,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    pub generated_at: DateTime<Utc>,
    pub root_dir: PathBuf,
}

impl RouteManifest {
    /// Matches a request path against the servable table in priority
    /// order; first match wins.
    pub fn match_path(&self, path: &str) -> Option<RouteMatch<'_>> {
        self.routes.iter().find_map(|entry| {
            entry
                .matches(path)
                .map(|params| RouteMatch { entry, params })
        })
    }

    /// Looks up a servable route by its exact URL pattern.
    pub fn route(&self, pattern: &str) -> Option<&RouteEntry> {
        self.routes.iter().find(|r| r.url_pattern == pattern)
    }

    /// Whether the build recorded any build-blocking errors.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Nearest not-found boundary for a request path that matched no
    /// route.
    ///
    /// Without a matched entry there is no filesystem directory to anchor
    /// the walk, so this falls back to the deepest boundary registered at
    /// a static directory prefix of the URL, and ultimately to the root
    /// boundary. Group and parameter directories cannot be recovered from
    /// an unmatched URL; routes under them still degrade through their own
    /// resolved boundary when matched.
    pub fn not_found_boundary_for_path(&self, path: &str) -> Option<&PathBuf> {
        let mut best = self.not_found_boundaries.get("");
        let mut prefix = String::new();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(segment);
            if let Some(found) = self.not_found_boundaries.get(prefix.as_str()) {
                best = Some(found);
            }
        }
        best
    }
}

/// Builds [`RouteManifest`] values from a routes directory.
///
/// ```no_run
/// use asterism_router::ManifestBuilder;
///
/// let manifest = ManifestBuilder::new("app").build();
/// for route in &manifest.routes {
///     println!("{} -> {}", route.url_pattern, route.file_path);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ManifestBuilder {
    root: PathBuf,
}

impl ManifestBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Runs one full build pass. Never fails: problems are reported inside
    /// the returned manifest.
    pub fn build(&self) -> RouteManifest {
        let outcome = scan_routes(&self.root);
        let mut errors = outcome.errors;

        let layouts = registry_for(&outcome.files, FileKind::Layout);
        let middleware = registry_for(&outcome.files, FileKind::Middleware);
        let error_boundaries = registry_for(&outcome.files, FileKind::Error);
        let loading_boundaries = registry_for(&outcome.files, FileKind::Loading);
        let not_found_boundaries = registry_for(&outcome.files, FileKind::NotFound);

        // Compile every servable file into an entry skeleton, resolving
        // chains and boundaries from the full directory path.
        let mut entries: Vec<RouteEntry> = outcome
            .files
            .iter()
            .enumerate()
            .filter(|(_, file)| file.kind.is_routable())
            .map(|(scan_index, file)| {
                let compiled = compile_path(&file.dir_components());
                let kind = match file.kind {
                    FileKind::Handler => RouteKind::Handler,
                    _ => RouteKind::Page,
                };

                RouteEntry {
                    url_pattern: compiled.url_pattern,
                    file_path: file.relative_path.clone(),
                    absolute_path: file.absolute_path.clone(),
                    kind,
                    segments: compiled.segments,
                    layouts: inherited_chain(&file.relative_path, &layouts),
                    middleware: inherited_chain(&file.relative_path, &middleware),
                    error_boundary: nearest_ancestor(&file.relative_path, &error_boundaries),
                    loading_boundary: nearest_ancestor(&file.relative_path, &loading_boundaries),
                    not_found_boundary: nearest_ancestor(
                        &file.relative_path,
                        &not_found_boundaries,
                    ),
                    priority: compiled.priority,
                    scan_index,
                }
            })
            .collect();

        // Per-route validation drops malformed entries.
        entries.retain(|entry| {
            let entry_errors = validate_entry(entry);
            if entry_errors.is_empty() {
                true
            } else {
                errors.extend(entry_errors);
                false
            }
        });

        // Cross-route conflicts drop every entry involved.
        let (conflict_errors, dropped) = find_conflicts(&entries);
        errors.extend(conflict_errors);
        entries.retain(|entry| !dropped.contains(&entry.scan_index));

        // Final match order: packed priority, scan order as the tiebreak.
        entries.sort_by_key(|entry| (entry.priority, entry.scan_index));

        let warnings = find_shadows(&entries);

        for warning in &warnings {
            warn!(files = ?warning.files, "{}", warning.message);
        }
        debug!(
            routes = entries.len(),
            errors = errors.len(),
            "manifest build complete"
        );

        RouteManifest {
            routes: entries,
            layouts,
            middleware,
            error_boundaries,
            loading_boundaries,
            not_found_boundaries,
            errors,
            warnings,
            generated_at: Utc::now(),
            root_dir: self.root.clone(),
        }
    }
}

/// Collects directory → absolute path registrations for one file kind.
/// With two recognized extensions in one directory the first scanned file
/// wins; scan order is sorted, so the choice is stable.
fn registry_for(files: &[ScannedFile], kind: FileKind) -> BTreeMap<String, PathBuf> {
    let mut registry = BTreeMap::new();
    for file in files.iter().filter(|f| f.kind == kind) {
        let dir = file.dir_components().join("/");
        registry
            .entry(dir)
            .or_insert_with(|| file.absolute_path.clone());
    }
    registry
}
