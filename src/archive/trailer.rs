use crate::error::{Result, VaultError};
use std::io::{Read, Write};

/// Format identifier stored in the trailer ("ipe" read as little-endian bytes)
pub const MAGIC: u32 = 0x0065_7069;

/// Current trailer/index layout version
pub const FORMAT_VERSION: u32 = 1;

/// Trailer size in bytes (fixed)
pub const TRAILER_SIZE: usize = 20;

/// Fixed-size record at the very end of an indexed archive.
///
/// Readers locate it at `file_len - TRAILER_SIZE` and use it to find the
/// index without scanning the payload frames.
///
/// Structure (20 bytes, little-endian):
/// - Magic: uint32 (4 bytes)
/// - Version: uint32 (4 bytes)
/// - Entry Count: uint32 (4 bytes)
/// - Index Offset: uint64 (8 bytes)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trailer {
    pub version: u32,
    pub entry_count: u32,
    pub index_offset: u64,
}

impl Trailer {
    /// Create a trailer for the current format version
    pub fn new(entry_count: u32, index_offset: u64) -> Self {
        Self {
            version: FORMAT_VERSION,
            entry_count,
            index_offset,
        }
    }

    /// Write trailer to a writer
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<usize> {
        writer.write_all(&MAGIC.to_le_bytes())?;
        writer.write_all(&self.version.to_le_bytes())?;
        writer.write_all(&self.entry_count.to_le_bytes())?;
        writer.write_all(&self.index_offset.to_le_bytes())?;
        Ok(TRAILER_SIZE)
    }

    /// Read trailer from a reader, rejecting a foreign magic before anything else
    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let mut buf = [0u8; TRAILER_SIZE];
        reader.read_exact(&mut buf)?;

        let magic = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        if magic != MAGIC {
            return Err(VaultError::InvalidMagic { found: magic });
        }

        let version = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
        let entry_count = u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]);
        let mut offset = [0u8; 8];
        offset.copy_from_slice(&buf[12..20]);

        Ok(Self {
            version,
            entry_count,
            index_offset: u64::from_le_bytes(offset),
        })
    }

    /// Validate version and index placement against the trailer's own position
    pub fn validate(&self, trailer_start: u64) -> Result<()> {
        if self.version > FORMAT_VERSION {
            return Err(VaultError::UnsupportedVersion(self.version));
        }

        if self.index_offset > trailer_start {
            return Err(VaultError::InvalidFormat(format!(
                "index offset {} lies beyond trailer at {}",
                self.index_offset, trailer_start
            )));
        }

        Ok(())
    }
}
