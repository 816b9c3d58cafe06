pub mod check;
pub mod routes;

use anyhow::Result;
use asterism::{Config, ManifestBuilder, RouteManifest};

/// Builds the manifest for a command, preferring an explicit `--dir` over
/// the configured routes directory.
pub fn build_manifest(dir: Option<&str>) -> Result<RouteManifest> {
    let routes_dir = match dir {
        Some(dir) => dir.to_string(),
        None => Config::load_default()?.routing.routes_dir,
    };
    Ok(ManifestBuilder::new(routes_dir).build())
}
