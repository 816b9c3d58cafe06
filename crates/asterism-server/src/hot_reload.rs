use anyhow::Result;
use asterism::router::RECOGNIZED_EXTENSIONS;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::path::PathBuf;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Represents a route file change event
#[derive(Debug, Clone)]
pub struct FileChange {
    pub path: PathBuf,
}

/// Watcher that triggers a manifest rebuild when route files change
pub struct RouteWatcher {
    tx: broadcast::Sender<FileChange>,
    _watcher: notify::RecommendedWatcher,
}

impl RouteWatcher {
    /// Create a watcher over the given paths
    pub fn new(watch_paths: Vec<PathBuf>) -> Result<Self> {
        let (tx, _) = broadcast::channel(100);
        let tx_clone = tx.clone();

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) => {
                    // Create, modify, and remove all change the route table
                    if matches!(
                        event.kind,
                        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                    ) {
                        for path in event.paths {
                            let recognized = path
                                .extension()
                                .and_then(|s| s.to_str())
                                .map(|ext| RECOGNIZED_EXTENSIONS.contains(&ext))
                                .unwrap_or(false);
                            if !recognized {
                                continue;
                            }

                            info!("route file changed: {:?}", path);

                            // Broadcast change event (ignore if no receivers)
                            let _ = tx_clone.send(FileChange { path: path.clone() });
                        }
                    }
                }
                Err(e) => error!("watch error: {:?}", e),
            }
        })?;

        for path in watch_paths {
            if path.exists() {
                watcher.watch(&path, RecursiveMode::Recursive)?;
                info!("watching: {:?}", path);
            } else {
                warn!("watch path does not exist: {:?}", path);
            }
        }

        Ok(Self {
            tx,
            _watcher: watcher,
        })
    }

    /// Subscribe to file change events
    pub fn subscribe(&self) -> broadcast::Receiver<FileChange> {
        self.tx.subscribe()
    }
}
