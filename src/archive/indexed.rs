//! The trailer-indexed LZ4 container (`.epiclz4`).
//!
//! Layout, in file order:
//!
//! ```text
//! [reserved: 20 zero bytes][frame 0][frame 1]...[index records][trailer: 20 bytes]
//! ```
//!
//! Frames are written as entries are added, so payload offsets only grow.
//! The index and trailer are appended by [`IndexedArchive::close`]; until then
//! the file is not a readable archive. The reserved region at the start is
//! never filled in and readers ignore it.

use crate::archive::codec_stream::{wrap_decoder, wrap_encoder, DecodeStream, EncodeStream};
use crate::archive::format::{encode_length, IndexEntry, MIN_RECORD_SIZE};
use crate::archive::path::{normalize_path, resolve_entry_path};
use crate::archive::trailer::{Trailer, TRAILER_SIZE};
use crate::archive::{
    Archive, EntryReader, EntryWriter, ExtractProgress, OpenMode, COPY_CHUNK_SIZE,
};
use crate::error::{Result, VaultError};
use lz4_flex::frame::BlockSize;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Writer that tracks the absolute file offset of everything passed through it
#[derive(Debug)]
struct PositionWriter<W: Write> {
    inner: W,
    position: u64,
}

impl<W: Write> Write for PositionWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.position += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

type FrameSink = PositionWriter<BufWriter<File>>;

#[derive(Debug)]
enum Handle {
    Write(FrameSink),
    Read(File),
}

impl Handle {
    fn mode(&self) -> OpenMode {
        match self {
            Handle::Write(_) => OpenMode::Write,
            Handle::Read(_) => OpenMode::Read,
        }
    }
}

fn sink_of<'a>(handle: &'a mut Handle, operation: &'static str) -> Result<&'a mut FrameSink> {
    match handle {
        Handle::Write(sink) => Ok(sink),
        Handle::Read(_) => Err(VaultError::InvalidMode {
            operation,
            mode: OpenMode::Read,
        }),
    }
}

fn file_of<'a>(handle: &'a mut Handle, operation: &'static str) -> Result<&'a mut File> {
    match handle {
        Handle::Read(file) => Ok(file),
        Handle::Write(_) => Err(VaultError::InvalidMode {
            operation,
            mode: OpenMode::Write,
        }),
    }
}

/// First entry whose path matches `path`, either separator style on both sides
fn find_entry<'a>(entries: &'a [IndexEntry], path: &str) -> Result<&'a IndexEntry> {
    let normalized = normalize_path(path);
    entries
        .iter()
        .find(|e| normalize_path(&e.path) == normalized)
        .ok_or_else(|| VaultError::EntryNotFound(path.to_string()))
}

/// Indexed archive, open for either writing or reading
#[derive(Debug)]
pub struct IndexedArchive {
    path: PathBuf,
    handle: Handle,
    entries: Vec<IndexEntry>,
    block_size: BlockSize,
}

impl IndexedArchive {
    /// Open an archive in the given mode
    pub fn open<P: AsRef<Path>>(path: P, mode: OpenMode) -> Result<Self> {
        match mode {
            OpenMode::Write => Self::create(path),
            OpenMode::Read => Self::open_read(path),
        }
    }

    /// Create (or truncate) an archive for writing
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)?;
        let mut sink = PositionWriter {
            inner: BufWriter::new(file),
            position: 0,
        };

        // Reserved region, kept for layout compatibility with existing archives
        sink.write_all(&[0u8; TRAILER_SIZE])?;

        tracing::debug!("created indexed archive {}", path.display());

        Ok(Self {
            path: path.to_path_buf(),
            handle: Handle::Write(sink),
            entries: Vec::new(),
            block_size: BlockSize::Max64KB,
        })
    }

    /// Open a finalized archive for reading
    pub fn open_read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path)?;

        let file_len = file.metadata()?.len();
        if file_len < TRAILER_SIZE as u64 {
            return Err(VaultError::InvalidFormat(format!(
                "file is {} bytes, smaller than the {}-byte trailer",
                file_len, TRAILER_SIZE
            )));
        }

        let trailer_start = file_len - TRAILER_SIZE as u64;
        file.seek(SeekFrom::Start(trailer_start))?;
        let trailer = Trailer::read_from(&mut file)?;
        trailer.validate(trailer_start)?;

        let index_len = trailer_start - trailer.index_offset;
        if u64::from(trailer.entry_count) * MIN_RECORD_SIZE > index_len {
            return Err(VaultError::InvalidFormat(format!(
                "{} entries cannot fit in a {}-byte index",
                trailer.entry_count, index_len
            )));
        }

        file.seek(SeekFrom::Start(trailer.index_offset))?;
        let mut index = BufReader::new((&mut file).take(index_len));
        let mut entries = Vec::with_capacity(trailer.entry_count as usize);
        for _ in 0..trailer.entry_count {
            let entry = IndexEntry::read_from(&mut index).map_err(|e| match e {
                VaultError::Io(err) if err.kind() == io::ErrorKind::UnexpectedEof => {
                    VaultError::InvalidFormat("index runs into the trailer".to_string())
                }
                other => other,
            })?;
            tracing::trace!(
                "index entry {} ({} bytes at {})",
                entry.path,
                entry.content_length,
                entry.offset
            );
            entries.push(entry);
        }
        drop(index);

        tracing::debug!(
            "opened indexed archive {} ({} entries, index at {})",
            path.display(),
            entries.len(),
            trailer.index_offset
        );

        Ok(Self {
            path: path.to_path_buf(),
            handle: Handle::Read(file),
            entries,
            block_size: BlockSize::Max64KB,
        })
    }

    /// Select the LZ4 block size used for frames written from now on
    pub fn with_block_size(mut self, block_size: BlockSize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Path of the archive file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw index records in archive order
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Get number of entries in archive
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Open an entry's frame for decoding; `None` for directory markers
    pub fn open_entry(&mut self, path: &str) -> Result<Option<DecodeStream<&mut File>>> {
        let file = file_of(&mut self.handle, "read entry")?;
        let entry = find_entry(&self.entries, path)?;

        let Some(size) = entry.size() else {
            return Ok(None);
        };

        file.seek(SeekFrom::Start(entry.offset))?;
        Ok(Some(wrap_decoder(file, size)))
    }

    /// Read a whole entry into memory
    pub fn read_entry(&mut self, path: &str) -> Result<Option<Vec<u8>>> {
        match self.open_entry(path)? {
            Some(mut stream) => {
                let mut data = Vec::with_capacity(stream.content_length().min(1 << 20) as usize);
                stream.read_to_end(&mut data)?;
                Ok(Some(data))
            }
            None => Ok(None),
        }
    }

    /// Start a streamed entry
    pub fn begin_entry(&mut self, path: &str, content_length: u64) -> Result<IndexedEntryWriter<'_>> {
        let sink = sink_of(&mut self.handle, "create entry")?;
        let path = normalize_path(path);

        tracing::trace!("creating entry {} at {}", path, sink.position);
        self.entries
            .push(IndexEntry::file(path, content_length, sink.position)?);
        let entry = self
            .entries
            .last_mut()
            .ok_or_else(|| VaultError::Internal("index entry vanished".to_string()))?;

        Ok(IndexedEntryWriter {
            stream: wrap_encoder(sink, self.block_size),
            entry,
            declared_length: content_length,
            finished: false,
        })
    }
}

impl Archive for IndexedArchive {
    fn mode(&self) -> OpenMode {
        self.handle.mode()
    }

    fn list_entries(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.path.clone()).collect()
    }

    fn get_entry(&mut self, path: &str) -> Result<Option<Box<dyn EntryReader + '_>>> {
        Ok(self
            .open_entry(path)?
            .map(|stream| Box::new(stream) as Box<dyn EntryReader + '_>))
    }

    fn total_extracted_size(&mut self) -> Result<u64> {
        Ok(self.entries.iter().filter_map(IndexEntry::size).sum())
    }

    fn extract_all(
        &mut self,
        destination: &Path,
        progress: &mut ExtractProgress<'_>,
    ) -> Result<()> {
        let file = file_of(&mut self.handle, "extract entries")?;
        let mut buffer = vec![0u8; COPY_CHUNK_SIZE];

        for entry in &self.entries {
            let full_path = resolve_entry_path(destination, &entry.path)?;

            let Some(size) = entry.size() else {
                fs::create_dir_all(&full_path)?;
                continue;
            };

            if let Some(parent) = full_path.parent() {
                fs::create_dir_all(parent)?;
            }

            file.seek(SeekFrom::Start(entry.offset))?;
            let mut decoder = wrap_decoder(&mut *file, size);
            let mut output = BufWriter::new(File::create(&full_path)?);
            let description = format!("Extracting: {}", entry.path);

            loop {
                let n = decoder.read(&mut buffer)?;
                if n == 0 {
                    break;
                }
                output.write_all(&buffer[..n])?;
                progress(&description, n as u64);
            }
            output.flush()?;
        }

        Ok(())
    }

    fn extract_to_file(&mut self, path: &str, destination: &Path) -> Result<()> {
        let file = file_of(&mut self.handle, "extract entry")?;
        let entry = find_entry(&self.entries, path)?;

        let Some(size) = entry.size() else {
            fs::create_dir_all(destination)?;
            return Ok(());
        };

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }

        file.seek(SeekFrom::Start(entry.offset))?;
        let mut decoder = wrap_decoder(file, size);
        let mut output = BufWriter::new(File::create(destination)?);
        io::copy(&mut decoder, &mut output)?;
        output.flush()?;
        Ok(())
    }

    fn add_entry(&mut self, path: &str, content: Option<&mut dyn Read>) -> Result<()> {
        let sink = sink_of(&mut self.handle, "add entry")?;
        let path = normalize_path(path);
        let offset = sink.position;

        let entry = match content {
            None => IndexEntry::directory(path, offset),
            Some(reader) => {
                let mut stream = wrap_encoder(&mut *sink, self.block_size);
                let written = io::copy(reader, &mut stream)?;
                stream.finish()?;
                IndexEntry::file(path, written, offset)?
            }
        };

        tracing::trace!(
            "added entry {} ({} bytes at {})",
            entry.path,
            entry.content_length,
            entry.offset
        );
        self.entries.push(entry);
        Ok(())
    }

    fn create_entry(
        &mut self,
        path: &str,
        content_length: u64,
    ) -> Result<Box<dyn EntryWriter + '_>> {
        Ok(Box::new(self.begin_entry(path, content_length)?))
    }

    fn close(self: Box<Self>) -> Result<()> {
        let IndexedArchive {
            path,
            handle,
            entries,
            ..
        } = *self;

        let mut sink = match handle {
            Handle::Read(_) => {
                tracing::debug!("closed indexed archive {}", path.display());
                return Ok(());
            }
            Handle::Write(sink) => sink,
        };

        let entry_count = u32::try_from(entries.len()).map_err(|_| {
            VaultError::InvalidFormat(format!("too many entries: {}", entries.len()))
        })?;

        let index_offset = sink.position;
        for entry in &entries {
            entry.write_to(&mut sink)?;
        }
        Trailer::new(entry_count, index_offset).write_to(&mut sink)?;
        sink.flush()?;

        let file = sink.inner.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;

        tracing::debug!(
            "finalized indexed archive {} ({} entries, index at {})",
            path.display(),
            entry_count,
            index_offset
        );
        Ok(())
    }
}

/// Streamed entry in an indexed archive.
///
/// Finishing (or dropping) the writer terminates the entry's frame and
/// records the number of bytes actually written.
pub struct IndexedEntryWriter<'a> {
    stream: EncodeStream<&'a mut FrameSink>,
    entry: &'a mut IndexEntry,
    declared_length: u64,
    finished: bool,
}

impl IndexedEntryWriter<'_> {
    fn complete(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        let written = self.stream.bytes_written();
        if written != self.declared_length {
            tracing::warn!(
                "entry {} declared {} bytes but received {}",
                self.entry.path,
                self.declared_length,
                written
            );
        }
        let content_length = encode_length(written);
        self.stream.finish_frame()?;
        self.entry.content_length = content_length?;
        Ok(())
    }
}

impl Write for IndexedEntryWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

impl EntryWriter for IndexedEntryWriter<'_> {
    fn finish(mut self: Box<Self>) -> Result<()> {
        self.complete()
    }
}

impl Drop for IndexedEntryWriter<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.complete() {
            tracing::warn!("failed to finish entry {}: {}", self.entry.path, e);
        }
    }
}
