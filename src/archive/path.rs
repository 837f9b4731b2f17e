use crate::error::{Result, VaultError};
use std::path::{Path, PathBuf};

/// Normalize path to forward slashes (cross-platform compatibility)
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Resolve an archive entry path under `root`.
///
/// Entry paths are relative and slash-separated; a trailing slash (directory
/// marker) is allowed. Parent references, absolute paths and drive prefixes
/// are refused so extraction cannot escape `root`.
pub fn resolve_entry_path(root: &Path, entry: &str) -> Result<PathBuf> {
    let normalized = normalize_path(entry);
    if normalized.starts_with('/') {
        return Err(VaultError::UnsafePath(entry.to_string()));
    }

    let mut resolved = root.to_path_buf();
    for (i, component) in normalized.split('/').enumerate() {
        match component {
            "" | "." => continue,
            ".." => return Err(VaultError::UnsafePath(entry.to_string())),
            c if i == 0 && (c.ends_with(':') || c.as_bytes().get(1) == Some(&b':')) => {
                return Err(VaultError::UnsafePath(entry.to_string()))
            }
            c => resolved.push(c),
        }
    }

    Ok(resolved)
}
