// File: src/cache.rs
// Purpose: Compiled-module cache keyed by (path, modification time)

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use anyhow::Result;
use tracing::debug;

use crate::module::{CompiledModule, ModuleCompiler};

struct CacheSlot {
    modified: SystemTime,
    module: Arc<CompiledModule>,
}

/// Shared cache of compiled modules.
///
/// Entries are keyed by absolute path and validated against the file's
/// modification time, so an edited component recompiles on next use
/// without any watcher involvement. The cache is passed by reference to
/// whoever needs it; invalidation is an explicit operation, not ambient
/// process state.
///
/// The lock is never held across a compile. Two requests missing on the
/// same key may both compile; recompilation for a fixed key is
/// deterministic and side-effect-free, so the last writer winning is fine.
#[derive(Default)]
pub struct ModuleCache {
    entries: RwLock<HashMap<PathBuf, CacheSlot>>,
}

impl ModuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached module for `path`, compiling through `compiler`
    /// on a miss or when the file changed on disk.
    pub fn get_or_compile(
        &self,
        path: &Path,
        compiler: &dyn ModuleCompiler,
    ) -> Result<Arc<CompiledModule>> {
        let modified = fs::metadata(path)
            .and_then(|meta| meta.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);

        {
            let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
            if let Some(slot) = entries.get(path) {
                if slot.modified == modified {
                    return Ok(slot.module.clone());
                }
            }
        }

        debug!(path = %path.display(), "compiling module");
        let module = Arc::new(compiler.compile(path)?);

        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            path.to_path_buf(),
            CacheSlot {
                modified,
                module: module.clone(),
            },
        );

        Ok(module)
    }

    /// Drops one cached entry.
    pub fn invalidate(&self, path: &Path) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(path);
    }

    /// Drops every cached entry.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{BoundaryModule, CompiledModule};
    use std::fs::File;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct CountingCompiler {
        compiles: AtomicUsize,
    }

    impl CountingCompiler {
        fn new() -> Self {
            Self {
                compiles: AtomicUsize::new(0),
            }
        }
    }

    impl ModuleCompiler for CountingCompiler {
        fn compile(&self, _path: &Path) -> Result<CompiledModule> {
            self.compiles.fetch_add(1, Ordering::SeqCst);
            Ok(CompiledModule::Boundary(BoundaryModule {
                render: Arc::new(|_| Box::pin(async { Ok(String::new()) })),
            }))
        }
    }

    #[test]
    fn caches_by_path_until_invalidated() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("error.rsx");
        File::create(&path).unwrap();

        let cache = ModuleCache::new();
        let compiler = CountingCompiler::new();

        cache.get_or_compile(&path, &compiler).unwrap();
        cache.get_or_compile(&path, &compiler).unwrap();
        assert_eq!(compiler.compiles.load(Ordering::SeqCst), 1);

        cache.invalidate(&path);
        cache.get_or_compile(&path, &compiler).unwrap();
        assert_eq!(compiler.compiles.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn recompiles_when_the_file_changes() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("page.rsx");
        File::create(&path).unwrap();

        let cache = ModuleCache::new();
        let compiler = CountingCompiler::new();
        cache.get_or_compile(&path, &compiler).unwrap();

        // Push the mtime forward instead of sleeping.
        let file = File::options().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() + std::time::Duration::from_secs(5))
            .unwrap();
        drop(file);

        cache.get_or_compile(&path, &compiler).unwrap();
        assert_eq!(compiler.compiles.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn clear_empties_the_cache() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("layout.rsx");
        let mut file = File::create(&path).unwrap();
        file.write_all(b"x").unwrap();

        let cache = ModuleCache::new();
        let compiler = CountingCompiler::new();
        cache.get_or_compile(&path, &compiler).unwrap();
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }
}
