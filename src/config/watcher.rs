//! Configuration file watcher for hot reload.
//!
//! Only reloads that change the ledger binding are forwarded; edits to log
//! level or display settings never cause a reconnect.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::BoardConfig;

/// Watches the config file and emits configs that require a new binding.
pub struct ConfigWatcher {
    path: PathBuf,
    current: BoardConfig,
    update_tx: mpsc::UnboundedSender<BoardConfig>,
}

impl ConfigWatcher {
    /// Create a new watcher seeded with the config currently in use.
    ///
    /// Returns the watcher and a receiver for connection-relevant updates.
    pub fn new(path: &Path, current: BoardConfig) -> (Self, mpsc::UnboundedReceiver<BoardConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                current,
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. The returned handle must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx;
        let path = self.path.clone();
        let mut last = self.current;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    let new_config = match load_config(&path) {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to reload config, keeping current binding");
                            return;
                        }
                    };
                    if forward_if_changed(&mut last, new_config, &tx) {
                        tracing::info!("Connection settings changed, requesting rebind");
                    } else {
                        tracing::debug!("Config reloaded without connection changes");
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

fn forward_if_changed(
    last: &mut BoardConfig,
    new_config: BoardConfig,
    tx: &mpsc::UnboundedSender<BoardConfig>,
) -> bool {
    let changed = last.connection_differs(&new_config);
    if changed {
        let _ = tx.send(new_config.clone());
    }
    *last = new_config;
    changed
}
