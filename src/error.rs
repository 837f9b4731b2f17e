use crate::archive::OpenMode;
use std::io;
use thiserror::Error;

/// Result type for epicvault operations
pub type Result<T> = std::result::Result<T, VaultError>;

/// Unified error type for archive, codec and backup operations
#[derive(Debug, Error)]
pub enum VaultError {
    // Format errors
    #[error("Invalid archive format: {0}")]
    InvalidFormat(String),

    #[error("Invalid magic number in archive trailer: {found:#x}")]
    InvalidMagic { found: u32 },

    #[error("Unsupported archive version: {0}")]
    UnsupportedVersion(u32),

    #[error("Unsupported archive extension: {0}")]
    UnsupportedExtension(String),

    // Entry errors
    #[error("Entry not found in archive: {0}")]
    EntryNotFound(String),

    #[error("Cannot {operation}: archive is open in {mode} mode")]
    InvalidMode {
        operation: &'static str,
        mode: OpenMode,
    },

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Unsafe entry path: {0}")]
    UnsafePath(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    // Backup errors
    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error("Invalid backup: missing {0}")]
    MissingAuxiliary(String),

    #[error("{0} is already installed")]
    AlreadyInstalled(String),

    #[error("{0} is not registered with the launcher")]
    NotInstalled(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl VaultError {
    /// True for errors describing a bad or unrecognized container
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            VaultError::InvalidFormat(_)
                | VaultError::InvalidMagic { .. }
                | VaultError::UnsupportedVersion(_)
                | VaultError::UnsupportedExtension(_)
        )
    }
}

impl From<toml::de::Error> for VaultError {
    fn from(err: toml::de::Error) -> Self {
        VaultError::Config(err.to_string())
    }
}

impl From<walkdir::Error> for VaultError {
    fn from(err: walkdir::Error) -> Self {
        VaultError::Io(err.into())
    }
}

impl From<zip::result::ZipError> for VaultError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(err) => VaultError::Io(err),
            zip::result::ZipError::FileNotFound => {
                VaultError::EntryNotFound("<unnamed zip entry>".to_string())
            }
            other => VaultError::InvalidFormat(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_family() {
        assert!(VaultError::InvalidMagic { found: 0 }.is_format_error());
        assert!(VaultError::UnsupportedExtension(".rar".into()).is_format_error());
        assert!(!VaultError::EntryNotFound("a.txt".into()).is_format_error());
    }

    #[test]
    fn test_invalid_mode_message() {
        let err = VaultError::InvalidMode {
            operation: "add entry",
            mode: OpenMode::Read,
        };
        assert_eq!(err.to_string(), "Cannot add entry: archive is open in read mode");
    }
}
