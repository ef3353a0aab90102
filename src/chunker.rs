//! [src/chunker.rs]
//! APARATO: CHUNKER
//! RESPONSABILIDAD: Particiona un archivo en una secuencia perezosa de (offset, bytes).

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// One unit of the chunked byte stream: the chunk's starting offset in the
/// source file, paired with its body.
pub type RawChunk = (u64, Vec<u8>);

/// A capability that produces a lazy, contiguous, non-overlapping cover of a
/// file's bytes. Implementations hold whatever buffering state they need
/// privately; the analyzer consumes the iterator exactly once.
pub trait Chunker {
    /// Opens `path` and returns an iterator over its `(offset, bytes)` chunks.
    fn chunks(&self, path: &Path) -> io::Result<Box<dyn Iterator<Item = RawChunk>>>;
}

/// Splits a file into fixed-size blocks. The final block may be shorter.
pub struct FixedChunker {
    block_size: usize,
}

impl FixedChunker {
    pub fn new(block_size: usize) -> Self {
        Self { block_size }
    }
}

impl Chunker for FixedChunker {
    fn chunks(&self, path: &Path) -> io::Result<Box<dyn Iterator<Item = RawChunk>>> {
        let file = File::open(path)?;
        Ok(Box::new(FixedChunkIter { file, offset: 0, block_size: self.block_size }))
    }
}

struct FixedChunkIter {
    file: File,
    offset: u64,
    block_size: usize,
}

impl Iterator for FixedChunkIter {
    type Item = RawChunk;

    fn next(&mut self) -> Option<Self::Item> {
        let mut buffer = vec![0u8; self.block_size];
        let mut filled = 0usize;
        while filled < self.block_size {
            match self.file.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
        if filled == 0 {
            return None;
        }
        buffer.truncate(filled);
        let chunk_offset = self.offset;
        self.offset += filled as u64;
        Some((chunk_offset, buffer))
    }
}

/// Splits a file at `delimiter` bytes, never emitting a chunk longer than `max_size`.
///
/// Every non-final, non-`max_size`-clamped chunk ends exactly on a delimiter byte
/// (retained as its last byte). Maintains a rolling internal buffer filled in
/// 64 KiB slabs so the delimiter search never re-reads the file.
pub struct SentinelChunker {
    delimiter: u8,
    max_size: usize,
}

const READ_SLAB_SIZE: usize = 64 * 1024;

impl SentinelChunker {
    pub fn new(delimiter: u8, max_size: usize) -> Self {
        Self { delimiter, max_size }
    }
}

impl Chunker for SentinelChunker {
    fn chunks(&self, path: &Path) -> io::Result<Box<dyn Iterator<Item = RawChunk>>> {
        let file = File::open(path)?;
        Ok(Box::new(SentinelChunkIter {
            file,
            delimiter: self.delimiter,
            max_size: self.max_size,
            buffer: Vec::new(),
            offset: 0,
            eof: false,
        }))
    }
}

struct SentinelChunkIter {
    file: File,
    delimiter: u8,
    max_size: usize,
    buffer: Vec<u8>,
    offset: u64,
    eof: bool,
}

impl SentinelChunkIter {
    fn fill_buffer(&mut self) -> io::Result<()> {
        let mut slab = vec![0u8; READ_SLAB_SIZE];
        let mut total_read = 0usize;
        while total_read < READ_SLAB_SIZE {
            match self.file.read(&mut slab[total_read..]) {
                Ok(0) => {
                    self.eof = true;
                    break;
                }
                Ok(n) => total_read += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
        self.buffer.extend_from_slice(&slab[..total_read]);
        Ok(())
    }

    /// Tries to cut one chunk off the front of `buffer`. Returns `None` when the
    /// buffer doesn't yet hold enough to make a decision and more data must be read.
    fn try_cut(&mut self) -> Option<Vec<u8>> {
        if self.buffer.is_empty() {
            return None;
        }
        match memchr(self.delimiter, &self.buffer) {
            Some(index) => {
                let cut_len = (index + 1).min(self.max_size);
                Some(self.buffer.drain(..cut_len).collect())
            }
            None if self.buffer.len() >= self.max_size => {
                Some(self.buffer.drain(..self.max_size).collect())
            }
            None if self.eof => Some(std::mem::take(&mut self.buffer)),
            None => None,
        }
    }
}

fn memchr(needle: u8, haystack: &[u8]) -> Option<usize> {
    haystack.iter().position(|&b| b == needle)
}

impl Iterator for SentinelChunkIter {
    type Item = RawChunk;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(body) = self.try_cut() {
                if body.is_empty() {
                    return None;
                }
                let chunk_offset = self.offset;
                self.offset += body.len() as u64;
                return Some((chunk_offset, body));
            }
            if self.eof {
                return None;
            }
            if self.fill_buffer().is_err() {
                return None;
            }
        }
    }
}
