//! Filesystem scanner for the routes directory.
//!
//! Walks the routes root, keeps files whose base name is one of the
//! recognized route-file names with a recognized extension, and records
//! group membership for each hit. Everything else is silently ignored so
//! that colocated helpers (styles, fixtures, readme files) never break a
//! build.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;
use walkdir::WalkDir;

use crate::segment::{classify_segment, RouteSegment};
use crate::validate::{ErrorKind, ValidationError};

/// File extensions the scanner accepts for route files.
pub const RECOGNIZED_EXTENSIONS: &[&str] = &["rsx", "rs"];

/// Directories never descended into.
const SKIPPED_DIRS: &[&str] = &["node_modules", "target", "dist"];

/// What a recognized file contributes to its route directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileKind {
    /// `page` (or its alias `index`): a renderable page.
    Page,
    /// `route`: a raw request handler keyed by HTTP verb.
    Handler,
    /// `layout`: wraps the rendered output of everything beneath it.
    Layout,
    /// `middleware`: runs before the handler for everything beneath it.
    Middleware,
    /// `loading`: pending-state boundary, published for tooling.
    Loading,
    /// `error`: nearest-ancestor error boundary.
    Error,
    /// `not-found`: nearest-ancestor absence boundary.
    NotFound,
}

impl FileKind {
    /// Maps a file's base name to its kind. `index` is an alias for `page`.
    pub fn from_base_name(base: &str) -> Option<Self> {
        match base {
            "page" | "index" => Some(FileKind::Page),
            "route" => Some(FileKind::Handler),
            "layout" => Some(FileKind::Layout),
            "middleware" => Some(FileKind::Middleware),
            "loading" => Some(FileKind::Loading),
            "error" => Some(FileKind::Error),
            "not-found" => Some(FileKind::NotFound),
            _ => None,
        }
    }

    /// Whether this kind produces a servable route entry.
    pub fn is_routable(&self) -> bool {
        matches!(self, FileKind::Page | FileKind::Handler)
    }
}

/// One recognized file found during a scan. Built once per scan and
/// discarded wholesale on the next one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannedFile {
    /// Path relative to the scan root, forward-slash separated.
    pub relative_path: String,
    /// Absolute path on disk.
    pub absolute_path: PathBuf,
    /// File name without extension.
    pub base_name: String,
    /// File extension without the dot.
    pub extension: String,
    /// Recognized role of the file.
    pub kind: FileKind,
    /// Whether any ancestor directory is a route group.
    pub in_group: bool,
    /// Names of enclosing groups, outermost first.
    pub group_names: Vec<String>,
}

impl ScannedFile {
    /// Directory components of the file's relative path, file name removed.
    pub fn dir_components(&self) -> Vec<&str> {
        let mut parts: Vec<&str> = self.relative_path.split('/').collect();
        parts.pop();
        parts
    }
}

/// Result of one scan pass. Filesystem failures land in `errors`; the file
/// list is whatever could still be read.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub files: Vec<ScannedFile>,
    pub errors: Vec<ValidationError>,
}

/// Test, spec, and declaration files are never route files even when their
/// base name would otherwise match.
fn is_excluded_file(file_name: &str) -> bool {
    let stem = file_name.rsplit_once('.').map(|(s, _)| s).unwrap_or(file_name);
    stem.ends_with("_test")
        || stem.ends_with(".test")
        || stem.ends_with(".spec")
        || stem.ends_with(".d")
}

fn is_skipped_dir(name: &str) -> bool {
    name.starts_with('.') || SKIPPED_DIRS.contains(&name)
}

/// Scans `root` for route files.
///
/// A missing root is not a crash: the outcome carries an empty file list
/// plus a scan error, and the manifest builder reports "no routes found"
/// from there. Unreadable subtrees are skipped the same way.
pub fn scan_routes(root: &Path) -> ScanOutcome {
    let mut outcome = ScanOutcome::default();

    if !root.is_dir() {
        outcome.errors.push(ValidationError::new(
            ErrorKind::Scan,
            format!("routes directory not found: {}", root.display()),
            vec![root.display().to_string()],
        ));
        return outcome;
    }

    let canonical_root = fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            !(entry.file_type().is_dir()
                && entry.depth() > 0
                && entry
                    .file_name()
                    .to_str()
                    .map(is_skipped_dir)
                    .unwrap_or(false))
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                outcome.errors.push(ValidationError::new(
                    ErrorKind::Scan,
                    format!("failed to read routes directory entry: {err}"),
                    err.path()
                        .map(|p| vec![p.display().to_string()])
                        .unwrap_or_default(),
                ));
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let file_name = match entry.file_name().to_str() {
            Some(name) => name,
            None => continue,
        };

        if is_excluded_file(file_name) {
            debug!(file = file_name, "skipping test/declaration file");
            continue;
        }

        let (base_name, extension) = match file_name.rsplit_once('.') {
            Some((base, ext)) => (base, ext),
            None => continue,
        };

        if !RECOGNIZED_EXTENSIONS.contains(&extension) {
            continue;
        }

        let kind = match FileKind::from_base_name(base_name) {
            Some(kind) => kind,
            None => continue,
        };

        let relative_path = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .components()
            .filter_map(|c| c.as_os_str().to_str())
            .collect::<Vec<_>>()
            .join("/");

        let group_names: Vec<String> = relative_path
            .split('/')
            .take(relative_path.split('/').count().saturating_sub(1))
            .filter_map(|component| match classify_segment(component) {
                RouteSegment::Group(name) => Some(name),
                _ => None,
            })
            .collect();

        outcome.files.push(ScannedFile {
            absolute_path: canonical_root.join(&relative_path),
            relative_path,
            base_name: base_name.to_string(),
            extension: extension.to_string(),
            kind,
            in_group: !group_names.is_empty(),
            group_names,
        });
    }

    debug!(
        files = outcome.files.len(),
        errors = outcome.errors.len(),
        root = %root.display(),
        "scan complete"
    );

    outcome
}
