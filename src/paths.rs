//! Application path management for portable and installed modes.
//!
//! A plugin is launched by the host with an arbitrary working directory and
//! no visible stdout, so config and log locations must be resolvable without
//! relying on either.
//!
//! ## Mode Detection
//!
//! - **Portable mode**: If a `.portable` marker file exists next to the
//!   executable (inside the plugin bundle), config and logs live there.
//! - **Installed mode** (default): Data is stored in the platform data
//!   directory under `Volume Dial`.

use std::path::{Path, PathBuf};
use tracing::debug;

/// Application name used for directories in installed mode
const APP_NAME: &str = "Volume Dial";

/// Config file name, both in portable and installed mode
const CONFIG_FILE: &str = "config.yaml";

/// Application paths for config and logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    /// Path to the configuration file
    pub config: PathBuf,
    /// Path to the logs directory
    pub logs_dir: PathBuf,
    /// Whether running in portable mode (config next to exe)
    pub is_portable: bool,
}

impl AppPaths {
    /// Detect the appropriate paths based on environment.
    ///
    /// **Debug mode**: If `config.yaml` exists in the current working directory
    /// (typical when running with `cargo run`), use that directory.
    ///
    /// Note: This is called before logging is initialized, so we use eprintln
    /// for early diagnostic output.
    pub fn detect() -> Self {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."));

        #[cfg(debug_assertions)]
        {
            let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            if cwd.join(CONFIG_FILE).exists() {
                eprintln!(
                    "[paths] Running in DEV mode ({} found in cwd: {})",
                    CONFIG_FILE,
                    cwd.display()
                );
                return Self::portable(&cwd);
            }
        }

        if exe_dir.join(".portable").exists() {
            #[cfg(debug_assertions)]
            eprintln!("[paths] Running in PORTABLE mode (.portable marker found)");
            return Self::portable(&exe_dir);
        }

        let app_data = dirs::data_dir()
            .unwrap_or_else(|| {
                eprintln!("[paths] WARNING: dirs::data_dir() returned None, falling back to exe dir");
                exe_dir.clone()
            })
            .join(APP_NAME);

        #[cfg(debug_assertions)]
        eprintln!(
            "[paths] Running in INSTALLED mode (data dir: {})",
            app_data.display()
        );

        Self::installed(&app_data)
    }

    fn portable(base: &Path) -> Self {
        Self {
            config: base.join(CONFIG_FILE),
            logs_dir: base.join("logs"),
            is_portable: true,
        }
    }

    fn installed(app_data: &Path) -> Self {
        Self {
            config: app_data.join(CONFIG_FILE),
            logs_dir: app_data.join("logs"),
            is_portable: false,
        }
    }

    /// Use an explicit config file instead of the detected one
    pub fn with_config(mut self, config: impl Into<PathBuf>) -> Self {
        self.config = config.into();
        self
    }

    /// Get the base directory (for displaying in logs)
    pub fn base_dir(&self) -> PathBuf {
        self.config
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Ensure the logs and config directories exist.
    pub fn ensure_directories(&self) -> anyhow::Result<()> {
        if !self.logs_dir.exists() {
            debug!("Creating logs directory: {}", self.logs_dir.display());
            std::fs::create_dir_all(&self.logs_dir)?;
        }

        let config_parent = self.base_dir();
        if !config_parent.exists() {
            debug!("Creating config directory: {}", config_parent.display());
            std::fs::create_dir_all(&config_parent)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_layouts() {
        let portable = AppPaths::portable(Path::new("bundle"));
        assert!(portable.is_portable);
        assert_eq!(portable.config, PathBuf::from("bundle/config.yaml"));
        assert_eq!(portable.logs_dir, PathBuf::from("bundle/logs"));

        let installed = AppPaths::installed(Path::new("data/Volume Dial"));
        assert!(!installed.is_portable);
        assert_eq!(installed.base_dir(), PathBuf::from("data/Volume Dial"));
    }

    #[test]
    fn test_config_override_keeps_logs() {
        let paths = AppPaths::portable(Path::new("bundle")).with_config("/etc/dial.yaml");
        assert_eq!(paths.config, PathBuf::from("/etc/dial.yaml"));
        assert_eq!(paths.logs_dir, PathBuf::from("bundle/logs"));
    }

    #[test]
    fn test_ensure_directories_creates_tree() {
        let temp = TempDir::new().unwrap();
        let paths = AppPaths::installed(&temp.path().join("Volume Dial"));

        paths.ensure_directories().unwrap();
        assert!(paths.logs_dir.is_dir());
        assert!(paths.base_dir().is_dir());
    }
}
