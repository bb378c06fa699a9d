use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::PermissionError;

/// Whether the user has allowed alarms that fire at an exact instant.
pub trait ExactAlarmAccess: Send + Sync {
    fn can_schedule_exact(&self) -> bool;
}

/// Used when the config turns the precise-timing gate off.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysGranted;

impl ExactAlarmAccess for AlwaysGranted {
    fn can_schedule_exact(&self) -> bool {
        true
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PermissionSettings {
    #[serde(default)]
    exact_alarms: bool,
}

/// The precise-timing grant, kept in `permissions.toml`.
///
/// A missing or unreadable file counts as "not granted". The value is read on
/// every check so a change made while the app runs is picked up on recheck.
#[derive(Debug, Clone)]
pub struct PermissionFile {
    path: PathBuf,
}

impl PermissionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("reminder-tui").join("permissions.toml"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn set_exact_alarms(&self, granted: bool) -> Result<(), PermissionError> {
        let write_err = |source| PermissionError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }

        let content = toml::to_string(&PermissionSettings {
            exact_alarms: granted,
        })?;
        std::fs::write(&self.path, content).map_err(write_err)?;

        info!(
            "Exact alarm permission set to {} in {}",
            granted,
            self.path.display()
        );
        Ok(())
    }

    fn load(&self) -> Option<PermissionSettings> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        match toml::from_str(&content) {
            Ok(settings) => Some(settings),
            Err(e) => {
                debug!("Ignoring malformed {}: {}", self.path.display(), e);
                None
            }
        }
    }
}

impl ExactAlarmAccess for PermissionFile {
    fn can_schedule_exact(&self) -> bool {
        self.load().map(|s| s.exact_alarms).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_not_granted() {
        let dir = tempfile::tempdir().unwrap();
        let file = PermissionFile::new(dir.path().join("permissions.toml"));
        assert!(!file.can_schedule_exact());
    }

    #[test]
    fn test_grant_and_revoke() {
        let dir = tempfile::tempdir().unwrap();
        let file = PermissionFile::new(dir.path().join("sub").join("permissions.toml"));

        file.set_exact_alarms(true).unwrap();
        assert!(file.can_schedule_exact());

        file.set_exact_alarms(false).unwrap();
        assert!(!file.can_schedule_exact());
    }

    #[test]
    fn test_malformed_file_is_not_granted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("permissions.toml");
        std::fs::write(&path, "exact_alarms = \"yes please\"").unwrap();
        assert!(!PermissionFile::new(path).can_schedule_exact());
    }
}
