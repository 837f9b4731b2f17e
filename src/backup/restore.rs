//! Restoring a backed-up game to a new location.

use super::location::{join_location, leaf_name, relative_to};
use super::progress::{ByteProgress, Progress};
use super::{GAME_FILES_PREFIX, LAUNCHER_RECORD_ENTRY};
use crate::archive::{normalize_path, resolve_entry_path, Archive, OpenMode, COPY_CHUNK_SIZE};
use crate::config::LauncherPaths;
use crate::error::{Result, VaultError};
use crate::metadata::{write_with_backup, GameManifest, InstallationRecord, LauncherRegistry, MANIFEST_EXTENSION};
use crate::registry::open_archive;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Share of the progress range covered by game content
const CONTENT_SHARE: f64 = 0.95;

/// Outcome of a successful restore
#[derive(Debug, Clone, PartialEq)]
pub struct RestoreSummary {
    pub app_name: String,
    /// New install root written to the launcher metadata
    pub install_location: String,
    pub files_restored: usize,
    pub bytes_restored: u64,
    /// Where the rewritten manifest was placed
    pub manifest_path: PathBuf,
}

/// Install root for a game formerly at `old_location`, restored into `destination`.
///
/// The leaf directory name is kept: `C:\Old\Game` into `D:\New` is `D:\New\Game`.
pub fn rebased_install_root(old_location: &str, destination: &str) -> Result<String> {
    let leaf = leaf_name(old_location).ok_or_else(|| {
        VaultError::InvalidMetadata(format!("install location has no leaf name: {}", old_location))
    })?;
    Ok(join_location(destination, leaf))
}

/// Point `manifest` at `new_root`.
///
/// Manifest and staging locations that lived inside the old install root
/// move with it; locations elsewhere are left alone.
pub fn rebase_manifest(manifest: &mut GameManifest, new_root: &str) {
    let old_root = manifest.install_location.clone();
    for location in [&mut manifest.manifest_location, &mut manifest.staging_location] {
        if location.is_empty() {
            continue;
        }
        if let Some(relative) = relative_to(&old_root, location) {
            *location = join_location(new_root, &relative);
        }
    }
    manifest.install_location = new_root.to_string();
}

/// Restore the game in `archive_path` under `destination`.
///
/// Fails with [`VaultError::MissingAuxiliary`] if the archive lacks the
/// launcher record or manifest, and with [`VaultError::AlreadyInstalled`] if
/// the launcher already knows the game. Both are checked before anything is
/// written.
pub fn restore_game(
    archive_path: &Path,
    destination: &Path,
    paths: &LauncherPaths,
    progress: &mut dyn FnMut(Progress),
) -> Result<RestoreSummary> {
    let mut archive = open_archive(archive_path, OpenMode::Read)?;

    let record: InstallationRecord = read_auxiliary(archive.as_mut(), LAUNCHER_RECORD_ENTRY)
        .and_then(|data| InstallationRecord::from_slice(&data))?;

    let mut registry = LauncherRegistry::load(&paths.registry_file)?;
    if registry.contains_app(&record.app_name) {
        return Err(VaultError::AlreadyInstalled(record.app_name));
    }

    let item_entry = find_manifest_entry(&archive.list_entries()).ok_or_else(|| {
        VaultError::MissingAuxiliary(format!("manifest (*.{}) entry", MANIFEST_EXTENSION))
    })?;
    let mut manifest = GameManifest::from_slice(&read_auxiliary(archive.as_mut(), &item_entry)?)?;

    let new_root = rebased_install_root(&record.install_location, &destination.to_string_lossy())?;
    info!(
        "restoring {} from {} to {}",
        record.app_name,
        archive_path.display(),
        new_root
    );

    let total = game_content_size(archive.as_mut())?;
    let mut tracker = ByteProgress::new(total, CONTENT_SHARE, progress);
    let files_restored = extract_game_files(archive.as_mut(), Path::new(&new_root), &mut tracker)?;
    let bytes_restored = tracker.processed();

    tracker.phase("Restoring manifest", 0.97);
    rebase_manifest(&mut manifest, &new_root);
    let manifest_path = paths.manifests_dir.join(&item_entry);
    write_with_backup(&manifest_path, &manifest.to_json_pretty()?)?;

    tracker.phase("Updating launcher registry", 0.99);
    let mut record = record;
    record.install_location = new_root.clone();
    let app_name = record.app_name.clone();
    registry.installation_list.push(record);
    registry.save(&paths.registry_file)?;

    archive.close()?;
    tracker.phase("Restore complete", 1.0);
    info!("restored {} ({} files, {} bytes)", app_name, files_restored, bytes_restored);

    Ok(RestoreSummary {
        app_name,
        install_location: new_root,
        files_restored,
        bytes_restored,
        manifest_path,
    })
}

/// Top-level `*.item` entry holding the game manifest
fn find_manifest_entry(entries: &[String]) -> Option<String> {
    entries
        .iter()
        .map(|name| normalize_path(name))
        .find(|name| {
            !name.contains('/')
                && Path::new(name).extension().and_then(|e| e.to_str()) == Some(MANIFEST_EXTENSION)
        })
}

fn read_auxiliary(archive: &mut dyn Archive, name: &str) -> Result<Vec<u8>> {
    let mut reader = match archive.get_entry(name) {
        Ok(Some(reader)) => reader,
        Ok(None) | Err(VaultError::EntryNotFound(_)) => {
            return Err(VaultError::MissingAuxiliary(name.to_string()))
        }
        Err(e) => return Err(e),
    };
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    Ok(data)
}

fn game_files(archive: &dyn Archive) -> Vec<(String, String)> {
    archive
        .list_entries()
        .into_iter()
        .filter_map(|name| {
            let normalized = normalize_path(&name);
            let relative = normalized.strip_prefix(GAME_FILES_PREFIX)?.to_string();
            (!relative.is_empty()).then_some((name, relative))
        })
        .collect()
}

fn game_content_size(archive: &mut dyn Archive) -> Result<u64> {
    let mut total = 0;
    for (name, _) in game_files(archive) {
        if let Some(reader) = archive.get_entry(&name)? {
            total += reader.content_length();
        }
    }
    Ok(total)
}

fn extract_game_files(
    archive: &mut dyn Archive,
    root: &Path,
    tracker: &mut ByteProgress<'_>,
) -> Result<usize> {
    fs::create_dir_all(root)?;
    let mut buffer = vec![0u8; COPY_CHUNK_SIZE];
    let mut files = 0;

    for (name, relative) in game_files(archive) {
        let target = resolve_entry_path(root, &relative)?;
        let Some(mut reader) = archive.get_entry(&name)? else {
            fs::create_dir_all(&target)?;
            continue;
        };

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        debug!("restoring {}", target.display());

        let description = format!("Restoring: {}", relative);
        let mut output = File::create(&target)?;
        loop {
            let n = reader.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            output.write_all(&buffer[..n])?;
            tracker.advance(&description, n as u64);
        }
        files += 1;
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn manifest(install: &str, manifest_location: &str, staging: &str) -> GameManifest {
        GameManifest {
            display_name: "Sample".to_string(),
            app_name: "SampleApp".to_string(),
            install_location: install.to_string(),
            manifest_location: manifest_location.to_string(),
            staging_location: staging.to_string(),
            expecting_dlc_installed: Map::new(),
            extra: Map::new(),
            file_path: PathBuf::new(),
        }
    }

    #[test]
    fn test_rebased_install_root() {
        assert_eq!(
            rebased_install_root(r"C:\Old\Game", r"D:\New").unwrap(),
            r"D:\New\Game"
        );
        assert!(matches!(
            rebased_install_root(r"C:\", r"D:\New"),
            Err(VaultError::InvalidMetadata(_))
        ));
    }

    #[test]
    fn test_rebase_moves_inner_locations_only() {
        let mut m = manifest(
            r"C:\Old\Game",
            r"C:\Old\Game/.egstore",
            r"E:\Staging\Game",
        );
        rebase_manifest(&mut m, r"D:\New\Game");

        assert_eq!(m.install_location, r"D:\New\Game");
        assert_eq!(m.manifest_location, r"D:\New\Game\.egstore");
        assert_eq!(m.staging_location, r"E:\Staging\Game");
    }

    #[test]
    fn test_manifest_entry_must_be_top_level() {
        let entries = vec![
            "GameFiles/Data/level.item".to_string(),
            "LauncherInstalled.json".to_string(),
            "ABC123.item".to_string(),
        ];
        assert_eq!(find_manifest_entry(&entries).as_deref(), Some("ABC123.item"));
        assert_eq!(find_manifest_entry(&entries[..2]), None);
    }
}
