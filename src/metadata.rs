//! Typed views of the launcher's JSON sidecars.
//!
//! Only the fields backup and restore read or rewrite are modelled; every
//! other field is carried through untouched so a rewritten file differs from
//! the original only where a location changed.

use crate::error::{Result, VaultError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Extension of launcher manifest files
pub const MANIFEST_EXTENSION: &str = "item";

/// A game's launcher manifest (`<id>.item`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameManifest {
    #[serde(rename = "DisplayName", default)]
    pub display_name: String,

    #[serde(rename = "AppName")]
    pub app_name: String,

    #[serde(rename = "InstallLocation")]
    pub install_location: String,

    #[serde(rename = "ManifestLocation", default)]
    pub manifest_location: String,

    #[serde(rename = "StagingLocation", default)]
    pub staging_location: String,

    #[serde(rename = "ExpectingDLCInstalled", default)]
    pub expecting_dlc_installed: Map<String, Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,

    /// File the manifest was loaded from
    #[serde(skip)]
    pub file_path: PathBuf,
}

impl GameManifest {
    /// Parse and validate manifest JSON
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        let manifest: GameManifest = serde_json::from_slice(data)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Load a manifest file, remembering where it came from
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut manifest = Self::from_slice(&fs::read(path)?).map_err(|e| match e {
            VaultError::InvalidMetadata(msg) => {
                VaultError::InvalidMetadata(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;
        manifest.file_path = path.to_path_buf();
        Ok(manifest)
    }

    /// Reject manifests missing the identity or install root
    pub fn validate(&self) -> Result<()> {
        if self.app_name.trim().is_empty() {
            return Err(VaultError::InvalidMetadata("AppName is empty".to_string()));
        }
        if self.install_location.trim().is_empty() {
            return Err(VaultError::InvalidMetadata(format!(
                "InstallLocation is empty for {}",
                self.app_name
            )));
        }
        Ok(())
    }

    /// Whether the launcher expects DLC alongside this game
    pub fn has_dlc(&self) -> bool {
        !self.expecting_dlc_installed.is_empty()
    }

    /// Name shown to users, falling back to the app identity
    pub fn title(&self) -> &str {
        if self.display_name.is_empty() {
            &self.app_name
        } else {
            &self.display_name
        }
    }

    pub fn to_json_pretty(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}

/// One game's record in the launcher install registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallationRecord {
    #[serde(rename = "InstallLocation")]
    pub install_location: String,

    #[serde(rename = "AppName")]
    pub app_name: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InstallationRecord {
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        let record: InstallationRecord = serde_json::from_slice(data)?;
        if record.app_name.trim().is_empty() {
            return Err(VaultError::InvalidMetadata(
                "installation record has no AppName".to_string(),
            ));
        }
        Ok(record)
    }
}

/// The launcher install registry (`LauncherInstalled.dat`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LauncherRegistry {
    #[serde(rename = "InstallationList", default)]
    pub installation_list: Vec<InstallationRecord>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LauncherRegistry {
    /// Load the registry; a missing file is an empty registry
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("no launcher registry at {}, starting empty", path.display());
            return Ok(Self::default());
        }
        Ok(serde_json::from_slice(&fs::read(path)?)?)
    }

    pub fn find(&self, app_name: &str) -> Option<&InstallationRecord> {
        self.installation_list
            .iter()
            .find(|record| record.app_name == app_name)
    }

    pub fn contains_app(&self, app_name: &str) -> bool {
        self.find(app_name).is_some()
    }

    /// Write the registry, keeping the previous file as `<name>.bak`
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        write_with_backup(path, &serde_json::to_vec_pretty(self)?)
    }
}

/// Copy an existing file to `<name>.bak`, then replace it with `data`
pub fn write_with_backup(path: &Path, data: &[u8]) -> Result<()> {
    if path.exists() {
        fs::copy(path, backup_path(path))?;
    } else if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, data)?;
    Ok(())
}

/// `<path>.bak`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".bak");
    PathBuf::from(name)
}

/// Load every `*.item` manifest in the launcher's manifest directory
pub fn load_installed_manifests<P: AsRef<Path>>(dir: P) -> Result<Vec<GameManifest>> {
    let mut manifests = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some(MANIFEST_EXTENSION) {
            continue;
        }

        match GameManifest::load(&path) {
            Ok(manifest) => manifests.push(manifest),
            Err(e) => tracing::warn!("skipping manifest {}: {}", path.display(), e),
        }
    }

    manifests.sort_by(|a, b| a.title().cmp(b.title()));
    Ok(manifests)
}
