//! Backing up one installed game into an archive.

use super::location::is_within;
use super::progress::{ByteProgress, Progress};
use super::{GAME_FILES_PREFIX, LAUNCHER_RECORD_ENTRY, MANIFESTS_PREFIX, STAGING_PREFIX};
use crate::archive::{Archive, OpenMode, COPY_CHUNK_SIZE};
use crate::config::LauncherPaths;
use crate::error::{Result, VaultError};
use crate::metadata::{GameManifest, InstallationRecord, LauncherRegistry};
use crate::registry::ArchiveFormat;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Outcome of a successful backup
#[derive(Debug, Clone, PartialEq)]
pub struct BackupSummary {
    pub archive_path: PathBuf,
    pub format: ArchiveFormat,
    /// Entries written, auxiliary entries included
    pub entry_count: usize,
    /// Uncompressed bytes of game content
    pub total_bytes: u64,
}

/// A directory tree copied into the archive under `prefix`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTree {
    pub root: PathBuf,
    pub prefix: &'static str,
}

/// Trees a backup of `manifest` covers.
///
/// The install tree is always included. The manifest and staging locations
/// are only added when they exist outside the install tree.
pub fn plan_sources(manifest: &GameManifest) -> Vec<SourceTree> {
    let mut sources = vec![SourceTree {
        root: PathBuf::from(&manifest.install_location),
        prefix: GAME_FILES_PREFIX,
    }];

    let extra = [
        (&manifest.manifest_location, MANIFESTS_PREFIX),
        (&manifest.staging_location, STAGING_PREFIX),
    ];
    for (location, prefix) in extra {
        if location.trim().is_empty() || is_within(&manifest.install_location, location) {
            continue;
        }
        let root = PathBuf::from(location);
        if root.is_dir() {
            sources.push(SourceTree { root, prefix });
        } else {
            debug!("skipping {}: {} does not exist", prefix, location);
        }
    }

    sources
}

/// Back up `manifest`'s game into a new archive at `output`.
///
/// The archive format follows `output`'s extension. Preconditions and the
/// source trees are checked before the output file is created; if writing
/// fails afterwards the partial archive is removed.
pub fn backup_game(
    manifest: &GameManifest,
    paths: &LauncherPaths,
    output: &Path,
    progress: &mut dyn FnMut(Progress),
) -> Result<BackupSummary> {
    let format = ArchiveFormat::from_path(output)?;
    manifest.validate()?;

    if !Path::new(&manifest.install_location).is_dir() {
        return Err(VaultError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("install location not found: {}", manifest.install_location),
        )));
    }
    if !manifest.file_path.is_file() {
        return Err(VaultError::InvalidMetadata(format!(
            "manifest file for {} is not available",
            manifest.app_name
        )));
    }

    let registry = LauncherRegistry::load(&paths.registry_file)?;
    let record = registry
        .find(&manifest.app_name)
        .cloned()
        .ok_or_else(|| VaultError::NotInstalled(manifest.app_name.clone()))?;

    info!(
        "backing up {} from {} to {}",
        manifest.title(),
        manifest.install_location,
        output.display()
    );

    let sources = plan_sources(manifest);
    let mut total_bytes = 0;
    for source in &sources {
        total_bytes += tree_size(&source.root)?;
    }

    let result = write_backup(format, manifest, &record, &sources, total_bytes, output, progress);
    match &result {
        Ok(summary) => info!(
            "backup of {} complete: {} entries, {} bytes",
            manifest.app_name, summary.entry_count, summary.total_bytes
        ),
        Err(e) => {
            warn!("backup of {} failed: {}", manifest.app_name, e);
            if let Err(remove_err) = fs::remove_file(output) {
                if remove_err.kind() != io::ErrorKind::NotFound {
                    warn!(
                        "could not remove partial archive {}: {}",
                        output.display(),
                        remove_err
                    );
                }
            }
        }
    }
    result
}

fn write_backup(
    format: ArchiveFormat,
    manifest: &GameManifest,
    record: &InstallationRecord,
    sources: &[SourceTree],
    total_bytes: u64,
    output: &Path,
    progress: &mut dyn FnMut(Progress),
) -> Result<BackupSummary> {
    let mut archive = format.open(output, OpenMode::Write)?;
    let mut tracker = ByteProgress::new(total_bytes, 1.0, progress);

    let mut entry_count = 0;
    for source in sources {
        entry_count += add_tree(archive.as_mut(), source, &mut tracker)?;
    }

    let record_json = serde_json::to_vec_pretty(record)?;
    archive.add_entry(LAUNCHER_RECORD_ENTRY, Some(&mut record_json.as_slice()))?;

    let item_name = manifest
        .file_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| VaultError::InvalidMetadata("manifest file has no name".to_string()))?;
    let mut item = File::open(&manifest.file_path)?;
    archive.add_entry(&item_name, Some(&mut item))?;
    entry_count += 2;

    archive.close()?;
    tracker.phase("Backup complete", 1.0);

    Ok(BackupSummary {
        archive_path: output.to_path_buf(),
        format,
        entry_count,
        total_bytes,
    })
}

/// Total size of the regular files below `root`
pub fn tree_size(root: &Path) -> Result<u64> {
    let mut total = 0;
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if entry.file_type().is_file() {
            total += entry.metadata()?.len();
        }
    }
    Ok(total)
}

fn add_tree(
    archive: &mut dyn Archive,
    source: &SourceTree,
    tracker: &mut ByteProgress<'_>,
) -> Result<usize> {
    let mut added = 0;

    for entry in WalkDir::new(&source.root).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(&source.root)
            .map_err(|e| VaultError::Internal(e.to_string()))?;
        let name = format!(
            "{}{}",
            source.prefix,
            relative.to_string_lossy().replace('\\', "/")
        );

        let file_type = entry.file_type();
        if file_type.is_dir() {
            if fs::read_dir(entry.path())?.next().is_none() {
                archive.add_entry(&format!("{}/", name), None)?;
                added += 1;
            }
        } else if file_type.is_file() {
            let length = entry.metadata()?.len();
            copy_file(archive, entry.path(), &name, length, tracker)?;
            added += 1;
        } else {
            debug!("skipping non-regular file {}", entry.path().display());
        }
    }

    Ok(added)
}

fn copy_file(
    archive: &mut dyn Archive,
    source: &Path,
    name: &str,
    length: u64,
    tracker: &mut ByteProgress<'_>,
) -> Result<()> {
    let description = format!("Compressing: {}", name);
    let mut input = File::open(source)?;
    let mut writer = archive.create_entry(name, length)?;
    let mut buffer = vec![0u8; COPY_CHUNK_SIZE];

    loop {
        let n = input.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        writer.write_all(&buffer[..n])?;
        tracker.advance(&description, n as u64);
    }

    writer.finish()
}
