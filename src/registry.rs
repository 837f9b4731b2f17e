//! Archive format selection by file extension.

use crate::archive::{Archive, IndexedArchive, OpenMode, ZipBackedArchive};
use crate::error::{Result, VaultError};
use std::fmt;
use std::path::Path;

/// Container formats known to this build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// Trailer-indexed LZ4 container
    Indexed,
    /// Conventional deflate ZIP
    Zip,
}

impl ArchiveFormat {
    /// Every supported format, in preference order
    pub const ALL: [ArchiveFormat; 2] = [ArchiveFormat::Indexed, ArchiveFormat::Zip];

    /// File extension (without the dot)
    pub fn extension(self) -> &'static str {
        match self {
            ArchiveFormat::Indexed => "epiclz4",
            ArchiveFormat::Zip => "epiczip",
        }
    }

    /// Resolve an extension, with or without its leading dot
    pub fn from_extension(extension: &str) -> Result<Self> {
        let ext = extension.trim_start_matches('.');
        Self::ALL
            .into_iter()
            .find(|format| format.extension().eq_ignore_ascii_case(ext))
            .ok_or_else(|| VaultError::UnsupportedExtension(extension.to_string()))
    }

    /// Resolve the format from a path's extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| VaultError::UnsupportedExtension(path.display().to_string()))?;
        Self::from_extension(ext)
    }

    /// Open `path` with this format's implementation
    pub fn open<P: AsRef<Path>>(self, path: P, mode: OpenMode) -> Result<Box<dyn Archive>> {
        Ok(match self {
            ArchiveFormat::Indexed => Box::new(IndexedArchive::open(path, mode)?),
            ArchiveFormat::Zip => Box::new(ZipBackedArchive::open(path, mode)?),
        })
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ".{}", self.extension())
    }
}

/// Open an archive, choosing the implementation from the path's extension
pub fn open_archive<P: AsRef<Path>>(path: P, mode: OpenMode) -> Result<Box<dyn Archive>> {
    let path = path.as_ref();
    ArchiveFormat::from_path(path)?.open(path, mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extension() {
        assert_eq!(ArchiveFormat::from_extension("epiclz4").unwrap(), ArchiveFormat::Indexed);
        assert_eq!(ArchiveFormat::from_extension(".epiczip").unwrap(), ArchiveFormat::Zip);
        assert_eq!(ArchiveFormat::from_extension("EPICLZ4").unwrap(), ArchiveFormat::Indexed);
    }

    #[test]
    fn test_unknown_extension_is_format_error() {
        let err = ArchiveFormat::from_extension("7z").unwrap_err();
        assert!(err.is_format_error());

        let err = ArchiveFormat::from_path("backup").unwrap_err();
        assert!(matches!(err, VaultError::UnsupportedExtension(_)));
    }

    #[test]
    fn test_unknown_extension_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.tar");

        assert!(open_archive(&path, OpenMode::Write).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_display() {
        assert_eq!(ArchiveFormat::Zip.to_string(), ".epiczip");
    }
}
