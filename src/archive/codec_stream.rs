//! LZ4 frame streams with an externally declared length.
//!
//! An LZ4 frame marks its own end, but its header does not tell a reader how
//! many bytes it will decode to. The index records that length, so the
//! decode view carries it and stops after exactly that many bytes. Because
//! the decoder only consumes whole blocks, it never reads into the next
//! entry's frame.

use crate::archive::EntryReader;
use crate::error::{Result, VaultError};
use lz4_flex::frame::{BlockSize, FrameDecoder, FrameEncoder, FrameInfo};
use std::io::{self, Read, Seek, SeekFrom, Write};

/// Wrap `reader` (positioned at a frame start) as a bounded decode stream
pub fn wrap_decoder<R: Read>(reader: R, declared_length: u64) -> DecodeStream<R> {
    DecodeStream {
        decoder: FrameDecoder::new(reader),
        declared_length,
        position: 0,
    }
}

/// Wrap `writer` as an encoder producing one self-delimiting frame
pub fn wrap_encoder<W: Write>(writer: W, block_size: BlockSize) -> EncodeStream<W> {
    let info = FrameInfo::new().block_size(block_size);
    EncodeStream {
        encoder: Some(FrameEncoder::with_frame_info(info, writer)),
        written: 0,
    }
}

/// Decode-direction view of one entry's frame
pub struct DecodeStream<R: Read> {
    decoder: FrameDecoder<R>,
    declared_length: u64,
    position: u64,
}

impl<R: Read> DecodeStream<R> {
    /// Bytes decoded so far
    pub fn position(&self) -> u64 {
        self.position
    }

    fn remaining(&self) -> u64 {
        self.declared_length - self.position
    }
}

impl<R: Read> Read for DecodeStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.remaining();
        if remaining == 0 || buf.is_empty() {
            return Ok(0);
        }

        let limit = buf.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
        let n = self.decoder.read(&mut buf[..limit])?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "frame ended after {} of {} declared bytes",
                    self.position, self.declared_length
                ),
            ));
        }

        self.position += n as u64;
        Ok(n)
    }
}

impl<R: Read> Seek for DecodeStream<R> {
    /// Forward seeks decode and discard; backward seeks are unsupported.
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => Some(n),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
            SeekFrom::End(delta) => self.declared_length.checked_add_signed(delta),
        }
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "seek before start"))?;

        if target < self.position {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "cannot seek backwards in a compressed entry",
            ));
        }

        let skip = target.min(self.declared_length) - self.position;
        io::copy(&mut self.by_ref().take(skip), &mut io::sink())?;
        Ok(self.position)
    }
}

impl<R: Read> EntryReader for DecodeStream<R> {
    fn content_length(&self) -> u64 {
        self.declared_length
    }
}

/// Encode-direction view of one entry's frame
pub struct EncodeStream<W: Write> {
    encoder: Option<FrameEncoder<W>>,
    written: u64,
}

impl<W: Write> EncodeStream<W> {
    /// Uncompressed bytes accepted so far
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Write the frame end mark and return the underlying writer,
    /// positioned immediately after the frame
    pub fn finish(mut self) -> Result<W> {
        self.finish_frame()?
            .ok_or_else(|| VaultError::Codec("frame already finished".to_string()))
    }

    pub(crate) fn finish_frame(&mut self) -> Result<Option<W>> {
        match self.encoder.take() {
            Some(encoder) => encoder
                .finish()
                .map(Some)
                .map_err(|e| VaultError::Codec(format!("LZ4 frame finish failed: {}", e))),
            None => Ok(None),
        }
    }

    fn encoder(&mut self) -> io::Result<&mut FrameEncoder<W>> {
        self.encoder
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "frame already finished"))
    }
}

impl<W: Write> Write for EncodeStream<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.encoder()?.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.encoder()?.flush()
    }
}

impl<W: Write> Drop for EncodeStream<W> {
    fn drop(&mut self) {
        if let Err(e) = self.finish_frame() {
            tracing::warn!("dropping unfinished LZ4 frame: {}", e);
        }
    }
}
