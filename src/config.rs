//! Launcher locations used by backup and restore.
//!
//! ```toml
//! registry_file = 'C:\ProgramData\Epic\UnrealEngineLauncher\LauncherInstalled.dat'
//! manifests_dir = 'C:\ProgramData\Epic\EpicGamesLauncher\Data\Manifests'
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_REGISTRY_FILE: &str = r"C:\ProgramData\Epic\UnrealEngineLauncher\LauncherInstalled.dat";
const DEFAULT_MANIFESTS_DIR: &str = r"C:\ProgramData\Epic\EpicGamesLauncher\Data\Manifests";

/// Where the launcher keeps its install registry and per-game manifests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherPaths {
    /// `LauncherInstalled.dat`, the JSON install registry
    pub registry_file: PathBuf,

    /// Directory holding one `<id>.item` manifest per installed game
    pub manifests_dir: PathBuf,
}

impl Default for LauncherPaths {
    fn default() -> Self {
        Self {
            registry_file: PathBuf::from(DEFAULT_REGISTRY_FILE),
            manifests_dir: PathBuf::from(DEFAULT_MANIFESTS_DIR),
        }
    }
}

impl LauncherPaths {
    pub fn new(registry_file: impl Into<PathBuf>, manifests_dir: impl Into<PathBuf>) -> Self {
        Self {
            registry_file: registry_file.into(),
            manifests_dir: manifests_dir.into(),
        }
    }

    /// Parse from TOML; missing keys keep their defaults
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let paths = LauncherPaths::default();
        assert!(paths.registry_file.to_string_lossy().ends_with("LauncherInstalled.dat"));
        assert!(paths.manifests_dir.to_string_lossy().ends_with("Manifests"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let paths = LauncherPaths::from_toml_str("manifests_dir = '/srv/launcher/Manifests'").unwrap();
        assert_eq!(paths.manifests_dir, PathBuf::from("/srv/launcher/Manifests"));
        assert_eq!(paths.registry_file, LauncherPaths::default().registry_file);
    }

    #[test]
    fn test_invalid_toml() {
        let err = LauncherPaths::from_toml_str("registry_file = [").unwrap_err();
        assert!(matches!(err, crate::error::VaultError::Config(_)));
    }
}
