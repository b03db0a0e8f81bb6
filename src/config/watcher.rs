//! Configuration file watcher for hot-reload support

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::AppConfig;

/// Delay between a file event and the reload, lets editors finish writing
const RELOAD_DEBOUNCE: Duration = Duration::from_millis(100);

/// Config watcher that monitors file changes and sends reload notifications
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<AppConfig>,
}

impl ConfigWatcher {
    /// Create a new config watcher for the specified file.
    ///
    /// The parent directory is watched rather than the file itself, so the
    /// file may be created later or replaced atomically by an editor.
    pub async fn new(config_path: PathBuf) -> Result<(Self, Arc<AppConfig>)> {
        let (tx, rx) = mpsc::channel(10);

        let initial_config = AppConfig::load_or_default(&config_path)
            .await
            .context("Failed to load initial config")?;
        let initial_config = Arc::new(initial_config);

        let watch_dir = config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let file_name = config_path.file_name().map(|n| n.to_os_string());
        let config_path_clone = config_path.clone();

        // notify callbacks run on their own OS thread, not in Tokio context
        let runtime_handle = tokio::runtime::Handle::current();

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) => {
                    if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                        return;
                    }
                    let touches_config = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                    if !touches_config {
                        return;
                    }
                    debug!("Config file modified: {:?}", event.paths);

                    let config_path = config_path_clone.clone();
                    let tx = tx.clone();

                    runtime_handle.spawn(async move {
                        tokio::time::sleep(RELOAD_DEBOUNCE).await;

                        match AppConfig::load(&config_path).await {
                            Ok(new_config) => {
                                info!("Configuration reloaded successfully");
                                if let Err(e) = tx.send(new_config).await {
                                    error!("Failed to send config update: {}", e);
                                }
                            }
                            Err(e) => {
                                warn!("Failed to reload config (keeping old config): {:#}", e);
                            }
                        }
                    });
                }
                Err(e) => {
                    error!("Watch error: {}", e);
                }
            }
        })?;

        watcher
            .watch(&watch_dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch config directory: {}", watch_dir.display()))?;

        info!("Config file watcher started for: {}", config_path.display());

        Ok((
            Self {
                _watcher: watcher,
                rx,
            },
            initial_config,
        ))
    }

    /// Wait for the next config update.
    /// Returns None if the watcher has been closed
    pub async fn next_config(&mut self) -> Option<AppConfig> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendKind;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_config_watcher_reloads_timings() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.yaml");

        fs::write(&config_path, "engine:\n  debounce_ms: 40\n")?;

        let (mut watcher, config) = ConfigWatcher::new(config_path.clone()).await?;
        assert_eq!(config.engine.debounce_ms, 40);
        assert_eq!(config.backend.kind, BackendKind::Command);

        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::write(
            &config_path,
            "engine:\n  debounce_ms: 75\n  poll_interval_ms: 500\n",
        )?;

        let new_config = tokio::time::timeout(Duration::from_secs(2), watcher.next_config()).await?;

        // Some platforms report several events per write; any of them carries the new file
        if let Some(new_config) = new_config {
            assert_eq!(new_config.engine.debounce_ms, 75);
            assert_eq!(new_config.engine.poll_interval_ms, 500);
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_missing_config_starts_with_defaults() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.yaml");

        let (_watcher, config) = ConfigWatcher::new(config_path).await?;
        assert_eq!(*config, AppConfig::default());

        Ok(())
    }
}
