//! Archive containers behind one capability interface.
//!
//! Two implementations exist: [`IndexedArchive`], the trailer-indexed LZ4
//! container, and [`ZipBackedArchive`], a thin adapter over an ordinary ZIP
//! file. Callers normally obtain one through [`crate::ArchiveFormat::open`].

mod codec_stream;
mod format;
mod indexed;
mod path;
mod trailer;
mod zip_backed;

use crate::error::Result;
use std::fmt;
use std::io::{Read, Write};
use std::path::Path;

pub use codec_stream::{wrap_decoder, wrap_encoder, DecodeStream, EncodeStream};
pub use format::{IndexEntry, DIRECTORY_SENTINEL, MAX_PATH_LENGTH};
pub use indexed::IndexedArchive;
pub use path::{normalize_path, resolve_entry_path};
pub use trailer::{Trailer, FORMAT_VERSION, MAGIC, TRAILER_SIZE};
pub use zip_backed::ZipBackedArchive;

/// Buffer size used for every chunked copy (and progress tick)
pub const COPY_CHUNK_SIZE: usize = 81_920;

/// Progress sink for bulk extraction: `(description, bytes_just_written)`
pub type ExtractProgress<'a> = dyn FnMut(&str, u64) + 'a;

/// Open mode of an archive, fixed for its lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Create (or truncate) and append entries
    Write,
    /// Open an existing, finalized archive
    Read,
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpenMode::Write => f.write_str("write"),
            OpenMode::Read => f.write_str("read"),
        }
    }
}

/// Readable view of one entry's uncompressed content
pub trait EntryReader: Read {
    /// Uncompressed size declared for the entry
    fn content_length(&self) -> u64;
}

/// Writable stream for one entry, returned by [`Archive::create_entry`]
pub trait EntryWriter: Write {
    /// Finish the entry. The archive cannot be used until this returns
    /// (or the writer is dropped).
    fn finish(self: Box<Self>) -> Result<()>;
}

/// Capability set shared by every archive implementation
pub trait Archive {
    /// Mode the archive was opened in
    fn mode(&self) -> OpenMode;

    /// Entry paths in archive order
    fn list_entries(&self) -> Vec<String>;

    /// Open an entry for reading.
    ///
    /// Returns `Ok(None)` for directory entries.
    fn get_entry(&mut self, path: &str) -> Result<Option<Box<dyn EntryReader + '_>>>;

    /// Sum of the uncompressed sizes of all file entries
    fn total_extracted_size(&mut self) -> Result<u64>;

    /// Extract every entry under `destination`, reporting each written chunk
    fn extract_all(&mut self, destination: &Path, progress: &mut ExtractProgress<'_>)
        -> Result<()>;

    /// Extract a single entry to `destination`; directory entries become directories
    fn extract_to_file(&mut self, path: &str, destination: &Path) -> Result<()>;

    /// Add a complete entry. `None` records an empty directory.
    fn add_entry(&mut self, path: &str, content: Option<&mut dyn Read>) -> Result<()>;

    /// Start an entry whose content the caller streams in
    fn create_entry(
        &mut self,
        path: &str,
        content_length: u64,
    ) -> Result<Box<dyn EntryWriter + '_>>;

    /// Finalize (write mode) or release (read mode) the archive
    fn close(self: Box<Self>) -> Result<()>;
}
