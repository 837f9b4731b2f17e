use crate::error::{Result, VaultError};
use std::io::{Read, Write};

/// Content length marking an empty-directory entry (no payload frame)
pub const DIRECTORY_SENTINEL: i64 = -1;

/// Maximum path length in bytes (UTF-8) accepted when reading an index
pub const MAX_PATH_LENGTH: usize = 32 * 1024;

/// Smallest possible encoded index record (empty path)
pub(crate) const MIN_RECORD_SIZE: u64 = 4 + 8 + 8;

/// One index record: where an entry's frame lives and how large it decodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub path: String,
    pub content_length: i64,
    pub offset: u64,
}

impl IndexEntry {
    pub fn file(path: impl Into<String>, content_length: u64, offset: u64) -> Result<Self> {
        Ok(Self {
            path: path.into(),
            content_length: encode_length(content_length)?,
            offset,
        })
    }

    pub fn directory(path: impl Into<String>, offset: u64) -> Self {
        Self {
            path: path.into(),
            content_length: DIRECTORY_SENTINEL,
            offset,
        }
    }

    pub fn is_directory(&self) -> bool {
        self.content_length == DIRECTORY_SENTINEL
    }

    /// Uncompressed size, `None` for directory markers
    pub fn size(&self) -> Option<u64> {
        if self.is_directory() {
            None
        } else {
            Some(self.content_length.max(0) as u64)
        }
    }

    /// Write entry to the index
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<usize> {
        let path_bytes = self.path.as_bytes();
        let path_len = i32::try_from(path_bytes.len()).map_err(|_| {
            VaultError::InvalidFormat(format!("Path too long: {} bytes", path_bytes.len()))
        })?;

        writer.write_all(&path_len.to_le_bytes())?;
        writer.write_all(path_bytes)?;
        writer.write_all(&self.content_length.to_le_bytes())?;
        writer.write_all(&self.offset.to_le_bytes())?;

        Ok(MIN_RECORD_SIZE as usize + path_bytes.len())
    }

    /// Read entry from the index
    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let path_len = read_i32(&mut reader)?;
        if path_len < 0 || path_len as usize > MAX_PATH_LENGTH {
            return Err(VaultError::InvalidFormat(format!(
                "Invalid index path length: {}",
                path_len
            )));
        }

        let mut path_buf = vec![0u8; path_len as usize];
        reader.read_exact(&mut path_buf)?;
        let path = String::from_utf8(path_buf)
            .map_err(|e| VaultError::InvalidFormat(format!("Invalid UTF-8 in path: {}", e)))?;

        let content_length = read_i64(&mut reader)?;
        if content_length < DIRECTORY_SENTINEL {
            return Err(VaultError::InvalidFormat(format!(
                "Invalid content length {} for {}",
                content_length, path
            )));
        }
        let offset = read_u64(&mut reader)?;

        Ok(Self {
            path,
            content_length,
            offset,
        })
    }
}

fn read_i32<R: Read>(mut reader: R) -> Result<i32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

/// Content length as stored in an index record; must stay clear of the sign bit
pub(crate) fn encode_length(content_length: u64) -> Result<i64> {
    i64::try_from(content_length).map_err(|_| {
        VaultError::InvalidFormat(format!("Entry too large: {} bytes", content_length))
    })
}

fn read_i64<R: Read>(mut reader: R) -> Result<i64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(i64::from_le_bytes(buf))
}

fn read_u64<R: Read>(mut reader: R) -> Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}
