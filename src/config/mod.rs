//! Configuration management for Volume Dial
//!
//! Handles loading, parsing, and hot-reloading of the YAML configuration file.
//! Every section has defaults, so an absent file or an empty document is a
//! valid configuration.

pub mod watcher;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;

use crate::backend::command::VOLUME_PLACEHOLDER;
use crate::backend::{CommandBackend, SimulatedBackend, VolumeBackend};
use crate::engine::{
    EngineTimings, DEFAULT_CALL_TIMEOUT_MS, DEFAULT_DEBOUNCE_MS, DEFAULT_POLL_INTERVAL_MS,
    UNKNOWN_BASELINE,
};

pub use watcher::ConfigWatcher;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub backend: BackendConfig,
}

/// Engine timing configuration (applied live on reload)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Rotation coalescing window
    pub debounce_ms: u64,
    /// Reconciliation read interval while at least one dial is visible
    pub poll_interval_ms: u64,
    /// Upper bound on a single backend call
    pub call_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            call_timeout_ms: DEFAULT_CALL_TIMEOUT_MS,
        }
    }
}

impl EngineConfig {
    pub fn timings(&self) -> EngineTimings {
        EngineTimings {
            debounce: Duration::from_millis(self.debounce_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            call_timeout: Duration::from_millis(self.call_timeout_ms),
        }
    }
}

/// Which mixer implementation to drive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// External commands (osascript, pamixer, ...)
    #[default]
    Command,
    /// In-memory mixer, for trying the plugin without touching the system volume
    Simulated,
}

/// Mixer backend configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: BackendKind,
    /// Argv printing the current volume (0-100) on stdout
    pub read_command: Vec<String>,
    /// Argv setting the volume; `{volume}` is replaced by the target
    pub write_command: Vec<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        let (read_command, write_command) = default_commands();
        Self {
            kind: BackendKind::default(),
            read_command,
            write_command,
        }
    }
}

#[cfg(target_os = "macos")]
fn default_commands() -> (Vec<String>, Vec<String>) {
    (
        argv(&["osascript", "-e", "output volume of (get volume settings)"]),
        argv(&["osascript", "-e", "set volume output volume {volume}"]),
    )
}

#[cfg(not(target_os = "macos"))]
fn default_commands() -> (Vec<String>, Vec<String>) {
    (
        argv(&["pamixer", "--get-volume"]),
        argv(&["pamixer", "--set-volume", "{volume}"]),
    )
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

impl BackendConfig {
    /// Instantiate the configured backend
    pub fn build(&self) -> Arc<dyn VolumeBackend> {
        match self.kind {
            BackendKind::Command => Arc::new(CommandBackend::new(
                self.read_command.clone(),
                self.write_command.clone(),
            )),
            BackendKind::Simulated => Arc::new(SimulatedBackend::new(UNKNOWN_BASELINE)),
        }
    }
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        // An empty document deserializes to unit, not to an empty map
        let config: AppConfig = if contents.trim().is_empty() {
            AppConfig::default()
        } else {
            serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?
        };

        config.validate()?;

        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to defaults
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if fs::try_exists(path).await.unwrap_or(false) {
            Self::load(path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config to YAML")?;

        fs::write(path, yaml)
            .await
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        if self.engine.poll_interval_ms == 0 {
            anyhow::bail!("engine.poll_interval_ms must be greater than zero");
        }
        if self.engine.call_timeout_ms == 0 {
            anyhow::bail!("engine.call_timeout_ms must be greater than zero");
        }

        if self.backend.kind == BackendKind::Command {
            if self.backend.read_command.is_empty() {
                anyhow::bail!("backend.read_command cannot be empty");
            }
            if self.backend.write_command.is_empty() {
                anyhow::bail!("backend.write_command cannot be empty");
            }
            if !self
                .backend
                .write_command
                .iter()
                .any(|arg| arg.contains(VOLUME_PLACEHOLDER))
            {
                anyhow::bail!(
                    "backend.write_command must contain the {} placeholder",
                    VOLUME_PLACEHOLDER
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::load_or_default(dir.path().join("absent.yaml"))
            .await
            .unwrap();

        assert_eq!(config, AppConfig::default());
        assert_eq!(config.engine.timings(), EngineTimings::default());
        assert_eq!(config.backend.kind, BackendKind::Command);
    }

    #[tokio::test]
    async fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "engine:\n  debounce_ms: 80\nbackend:\n  kind: simulated\n",
        )
        .unwrap();

        let config = AppConfig::load(&path).await.unwrap();
        assert_eq!(config.engine.debounce_ms, 80);
        assert_eq!(config.engine.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        assert_eq!(config.backend.kind, BackendKind::Simulated);
        assert_eq!(config.backend.build().name(), "simulated");
    }

    #[tokio::test]
    async fn test_empty_file_is_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "\n").unwrap();

        assert_eq!(AppConfig::load(&path).await.unwrap(), AppConfig::default());
    }

    #[tokio::test]
    async fn test_invalid_yaml_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "engine: [not, a, map").unwrap();

        let err = AppConfig::load(&path).await.unwrap_err();
        assert!(err.to_string().contains("Failed to parse YAML config"));
    }

    #[test]
    fn test_validation() {
        let mut config = AppConfig::default();
        assert!(config.validate().is_ok());

        config.engine.call_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.backend.write_command = vec!["pamixer".to_string(), "--set-volume".to_string()];
        assert!(config.validate().is_err());

        // Simulated backend ignores the command lines
        config.backend.kind = BackendKind::Simulated;
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");

        let mut config = AppConfig::default();
        config.engine.poll_interval_ms = 500;
        config.backend.read_command = vec!["mixer-cli".to_string(), "get".to_string()];
        config.backend.write_command = vec!["mixer-cli".to_string(), "{volume}".to_string()];
        config.save(&path).await.unwrap();

        assert_eq!(AppConfig::load(&path).await.unwrap(), config);
    }
}
