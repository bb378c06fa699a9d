use std::path::{Path, PathBuf};

use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use serde::Deserialize;

const APP_DIR: &str = "reminder-tui";

/// Contents of `config.toml`. Every field is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database_path: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    /// Used when `RUST_LOG` is not set.
    pub log_level: String,
    /// When false, one-shot reminders are scheduled without asking for the
    /// precise-timing permission.
    pub require_exact_alarm_permission: bool,
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub app_name: String,
    /// Program and arguments run when a notification is clicked.
    pub open_command: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            log_file: None,
            log_level: "info".to_string(),
            require_exact_alarm_permission: true,
            notifications: NotificationConfig::default(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            app_name: "Reminders".to_string(),
            open_command: None,
        }
    }
}

impl Config {
    /// Load the config file, or defaults when there is none.
    pub fn load() -> Result<Self> {
        match config_dir().map(|d| d.join("config.toml")) {
            Some(path) if path.exists() => Self::from_path(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).wrap_err_with(|| format!("Invalid config in {}", path.display()))
    }

    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(crate::reminder::store::default_db_path)
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_file.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR)
                .join("reminder-tui.log")
        })
    }
}

pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR))
}
