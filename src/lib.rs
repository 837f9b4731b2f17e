//! epicvault: indexed LZ4 archives and game backup/restore
//!
//! This library provides:
//! - The `.epiclz4` container: one LZ4 frame per entry, a path index and a
//!   fixed 20-byte trailer at the end of the file
//! - A `.epiczip` adapter exposing ordinary ZIP files through the same
//!   [`Archive`] interface
//! - Extension-based format selection ([`ArchiveFormat`])
//! - Backup and restore of launcher-installed games, rewriting the
//!   launcher's metadata for the new install location
//!
//! # Example
//!
//! ```no_run
//! use epicvault::{open_archive, Archive, OpenMode};
//! use std::path::Path;
//!
//! // Create an archive
//! let mut archive = open_archive("example.epiclz4", OpenMode::Write)?;
//! archive.add_entry("data.txt", Some(&mut &b"Hello, World!"[..]))?;
//! archive.add_entry("empty/", None)?;
//! archive.close()?;
//!
//! // Extract it again
//! let mut archive = open_archive("example.epiclz4", OpenMode::Read)?;
//! archive.extract_all(Path::new("out"), &mut |_, _| {})?;
//! # Ok::<(), epicvault::VaultError>(())
//! ```

// Core modules
pub mod archive;
pub mod backup;
pub mod config;
pub mod error;
pub mod metadata;
pub mod registry;

// Re-export commonly used types
pub use archive::{
    Archive, EntryReader, EntryWriter, IndexEntry, IndexedArchive, OpenMode, Trailer,
    ZipBackedArchive, COPY_CHUNK_SIZE, DIRECTORY_SENTINEL, FORMAT_VERSION, MAGIC,
    MAX_PATH_LENGTH, TRAILER_SIZE,
};
pub use backup::{backup_game, restore_game, BackupSummary, Progress, RestoreSummary};
pub use config::LauncherPaths;
pub use error::{Result, VaultError};
pub use metadata::{GameManifest, InstallationRecord, LauncherRegistry};
pub use registry::{open_archive, ArchiveFormat};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_basics() {
        // Ensure core types are accessible
        assert_eq!(TRAILER_SIZE, 20);
        assert_eq!(ArchiveFormat::Indexed.extension(), "epiclz4");
        let _paths = LauncherPaths::default();
    }
}
