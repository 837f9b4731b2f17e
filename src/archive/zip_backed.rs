//! Adapter exposing an ordinary deflate ZIP file (`.epiczip`) through [`Archive`].
//!
//! Directory entries are ZIP directory records (trailing slash) rather than a
//! sentinel length.

use crate::archive::path::{normalize_path, resolve_entry_path};
use crate::archive::{
    Archive, EntryReader, EntryWriter, ExtractProgress, OpenMode, COPY_CHUNK_SIZE,
};
use crate::error::{Result, VaultError};
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

enum Inner {
    Write(ZipWriter<File>),
    Read(ZipArchive<File>),
}

/// Name and size of an entry added in write mode (`None` for directories)
struct WrittenEntry {
    name: String,
    size: Option<u64>,
}

fn writer_of<'a>(inner: &'a mut Inner, operation: &'static str) -> Result<&'a mut ZipWriter<File>> {
    match inner {
        Inner::Write(writer) => Ok(writer),
        Inner::Read(_) => Err(VaultError::InvalidMode {
            operation,
            mode: OpenMode::Read,
        }),
    }
}

fn archive_of<'a>(inner: &'a mut Inner, operation: &'static str) -> Result<&'a mut ZipArchive<File>> {
    match inner {
        Inner::Read(archive) => Ok(archive),
        Inner::Write(_) => Err(VaultError::InvalidMode {
            operation,
            mode: OpenMode::Write,
        }),
    }
}

/// Index of the first member named `path`.
///
/// Archives written on Windows may store backslash-separated names, so both
/// sides are compared in normalized form.
fn locate(archive: &mut ZipArchive<File>, path: &str) -> Result<usize> {
    let normalized = normalize_path(path);
    for i in 0..archive.len() {
        if normalize_path(archive.by_index_raw(i)?.name()) == normalized {
            return Ok(i);
        }
    }
    Err(VaultError::EntryNotFound(path.to_string()))
}

/// `add_entry` content up to this size is buffered so its length is known up front
const BUFFERED_ENTRY_LIMIT: u64 = 1 << 20;

fn file_options(content_length: u64) -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(content_length >= u64::from(u32::MAX))
}

fn directory_name(path: &str) -> String {
    let mut name = normalize_path(path);
    if !name.ends_with('/') {
        name.push('/');
    }
    name
}

/// ZIP archive open for either writing or reading
pub struct ZipBackedArchive {
    path: PathBuf,
    inner: Inner,
    written: Vec<WrittenEntry>,
}

impl ZipBackedArchive {
    /// Open a ZIP archive in the given mode
    pub fn open<P: AsRef<Path>>(path: P, mode: OpenMode) -> Result<Self> {
        let path = path.as_ref();
        let inner = match mode {
            OpenMode::Write => Inner::Write(ZipWriter::new(File::create(path)?)),
            OpenMode::Read => Inner::Read(ZipArchive::new(File::open(path)?)?),
        };

        tracing::debug!("opened zip archive {} for {}", path.display(), mode);

        Ok(Self {
            path: path.to_path_buf(),
            inner,
            written: Vec::new(),
        })
    }

    /// Path of the archive file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Archive for ZipBackedArchive {
    fn mode(&self) -> OpenMode {
        match self.inner {
            Inner::Write(_) => OpenMode::Write,
            Inner::Read(_) => OpenMode::Read,
        }
    }

    fn list_entries(&self) -> Vec<String> {
        match &self.inner {
            Inner::Read(archive) => archive.file_names().map(str::to_string).collect(),
            Inner::Write(_) => self.written.iter().map(|e| e.name.clone()).collect(),
        }
    }

    fn get_entry(&mut self, path: &str) -> Result<Option<Box<dyn EntryReader + '_>>> {
        let archive = archive_of(&mut self.inner, "read entry")?;
        let index = locate(archive, path)?;
        let file = archive.by_index(index)?;

        if file.is_dir() {
            return Ok(None);
        }

        Ok(Some(Box::new(ZipEntryStream {
            size: file.size(),
            inner: file,
        })))
    }

    fn total_extracted_size(&mut self) -> Result<u64> {
        match &mut self.inner {
            Inner::Write(_) => Ok(self.written.iter().filter_map(|e| e.size).sum()),
            Inner::Read(archive) => {
                let mut total = 0;
                for i in 0..archive.len() {
                    let file = archive.by_index_raw(i)?;
                    if !file.is_dir() {
                        total += file.size();
                    }
                }
                Ok(total)
            }
        }
    }

    fn extract_all(
        &mut self,
        destination: &Path,
        progress: &mut ExtractProgress<'_>,
    ) -> Result<()> {
        let archive = archive_of(&mut self.inner, "extract entries")?;
        let mut buffer = vec![0u8; COPY_CHUNK_SIZE];

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            let name = file.name().to_string();
            let full_path = resolve_entry_path(destination, &name)?;

            if file.is_dir() {
                fs::create_dir_all(&full_path)?;
                continue;
            }

            if let Some(parent) = full_path.parent() {
                fs::create_dir_all(parent)?;
            }

            let mut output = BufWriter::new(File::create(&full_path)?);
            let description = format!("Extracting: {}", name);
            loop {
                let n = file.read(&mut buffer)?;
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
        let archive = archive_of(&mut self.inner, "extract entry")?;
        let index = locate(archive, path)?;
        let mut file = archive.by_index(index)?;

        if file.is_dir() {
            fs::create_dir_all(destination)?;
            return Ok(());
        }

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut output = BufWriter::new(File::create(destination)?);
        io::copy(&mut file, &mut output)?;
        output.flush()?;
        Ok(())
    }

    fn add_entry(&mut self, path: &str, content: Option<&mut dyn Read>) -> Result<()> {
        let writer = writer_of(&mut self.inner, "add entry")?;

        let entry = match content {
            None => {
                let name = directory_name(path);
                writer.add_directory(name.as_str(), SimpleFileOptions::default())?;
                WrittenEntry { name, size: None }
            }
            Some(reader) => {
                let name = normalize_path(path);
                let mut head = Vec::new();
                (&mut *reader).take(BUFFERED_ENTRY_LIMIT).read_to_end(&mut head)?;

                // Only content that did not fit the buffer may need ZIP64
                let complete = (head.len() as u64) < BUFFERED_ENTRY_LIMIT;
                let hint = if complete { head.len() as u64 } else { u64::MAX };
                writer.start_file(name.as_str(), file_options(hint))?;
                writer.write_all(&head)?;
                let rest = if complete { 0 } else { io::copy(reader, writer)? };
                let size = head.len() as u64 + rest;
                WrittenEntry {
                    name,
                    size: Some(size),
                }
            }
        };

        tracing::trace!("added zip entry {}", entry.name);
        self.written.push(entry);
        Ok(())
    }

    fn create_entry(
        &mut self,
        path: &str,
        content_length: u64,
    ) -> Result<Box<dyn EntryWriter + '_>> {
        let writer = writer_of(&mut self.inner, "create entry")?;
        let name = normalize_path(path);
        writer.start_file(name.as_str(), file_options(content_length))?;

        self.written.push(WrittenEntry {
            name,
            size: Some(0),
        });
        let entry = self
            .written
            .last_mut()
            .ok_or_else(|| VaultError::Internal("zip entry vanished".to_string()))?;

        Ok(Box::new(ZipEntryWriter {
            writer,
            entry,
            declared_length: content_length,
        }))
    }

    fn close(self: Box<Self>) -> Result<()> {
        let ZipBackedArchive {
            path,
            inner,
            written,
        } = *self;

        if let Inner::Write(writer) = inner {
            writer.finish()?.sync_all()?;
            tracing::debug!(
                "finalized zip archive {} ({} entries)",
                path.display(),
                written.len()
            );
        }
        Ok(())
    }
}

/// Uncompressed view of one ZIP member
struct ZipEntryStream<R: Read> {
    inner: R,
    size: u64,
}

impl<R: Read> Read for ZipEntryStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R: Read> EntryReader for ZipEntryStream<R> {
    fn content_length(&self) -> u64 {
        self.size
    }
}

/// Streamed ZIP member; the member is closed by the next `start_file` or `finish`
struct ZipEntryWriter<'a> {
    writer: &'a mut ZipWriter<File>,
    entry: &'a mut WrittenEntry,
    declared_length: u64,
}

impl Write for ZipEntryWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.writer.write(buf)?;
        if let Some(size) = self.entry.size.as_mut() {
            *size += n as u64;
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl EntryWriter for ZipEntryWriter<'_> {
    fn finish(self: Box<Self>) -> Result<()> {
        let written = self.entry.size.unwrap_or(0);
        if written != self.declared_length {
            tracing::warn!(
                "entry {} declared {} bytes but received {}",
                self.entry.name,
                self.declared_length,
                written
            );
        }
        Ok(())
    }
}
