//! # Asterism Router
//!
//! File-system route table compiler: turns a directory tree of
//! conventionally-named files into a validated, immutable
//! [`RouteManifest`].
//!
//! Recognized file names (any recognized extension): `page` (alias
//! `index`), `route`, `layout`, `middleware`, `loading`, `error`,
//! `not-found`. Directory names follow the usual bracket grammar:
//! `[id]` dynamic, `[...slug]` catch-all, `[[...slug]]` optional
//! catch-all, `(name)` route group.
//!
//! The build pipeline runs one direction: scan → compile → resolve →
//! validate → manifest. Validation accumulates errors and warnings as
//! values instead of failing the build, so a manifest with problems is
//! still an inspectable result.
//!
//! ## Example
//!
//! ```no_run
//! use asterism_router::ManifestBuilder;
//!
//! let manifest = ManifestBuilder::new("app").build();
//! let m = manifest.match_path("/users/42").unwrap();
//! assert_eq!(m.params.get("id"), Some(&"42".to_string()));
//! ```

pub mod compile;
pub mod hierarchy;
pub mod manifest;
pub mod matching;
pub mod scan;
pub mod segment;
pub mod validate;

pub use compile::{calculate_priority, compile_path, CompiledPath};
pub use hierarchy::{ancestor_directories, inherited_chain, nearest_ancestor, AncestorDirs};
pub use manifest::{ManifestBuilder, RouteEntry, RouteKind, RouteManifest, RouteMatch};
pub use matching::{match_params, PathParams};
pub use scan::{scan_routes, FileKind, ScanOutcome, ScannedFile, RECOGNIZED_EXTENSIONS};
pub use segment::{classify_segment, RouteSegment};
pub use validate::{ErrorKind, ValidationError, ValidationWarning, WarningKind};
