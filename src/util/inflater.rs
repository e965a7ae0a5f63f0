//! Reusable zlib decompression into a growable scratch buffer.

use flate2::{Decompress, FlushDecompress, Status};
use tracing::debug;

use crate::error::{Error, Result};

/// Output capacity reserved by [`Inflater::allocate`].
///
/// Declared uncompressed sizes are trusted, so this only has to cover the
/// common case without a reallocation per entry.
pub const DEFAULT_CAPACITY: usize = 64 * 1024 * 1024;

/// A zlib decompressor owning one output buffer.
///
/// After a successful [`Inflater::decompress`] the returned slice (and
/// [`Inflater::output`]) holds the decompressed bytes until the next call
/// overwrites them. The borrow returned by `decompress` ties the result to
/// `&mut self`, so a previous result cannot be held across the next call.
///
/// The output buffer is allocated on the first call to `decompress`, so an
/// inflater that never sees a compressed entry costs no memory.
pub struct Inflater {
    decompressor: Decompress,
    buffer: Vec<u8>,
    /// Minimum buffer size allocated on first use.
    reserved: usize,
    len: usize,
}

impl Inflater {
    /// Creates an inflater that reserves [`DEFAULT_CAPACITY`] bytes of output space.
    pub fn allocate() -> Result<Self> {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Ok(Self {
            decompressor: Decompress::new(true),
            buffer: Vec::new(),
            reserved: capacity,
            len: 0,
        })
    }

    /// Output space available to the next call, allocated or not.
    pub fn capacity(&self) -> usize {
        self.buffer.len().max(self.reserved)
    }

    /// Bytes produced by the last successful call, empty after a failure.
    pub fn output(&self) -> &[u8] {
        &self.buffer[..self.len]
    }

    fn grow(&mut self, size_hint: usize) -> Result<()> {
        let new_size = size_hint.max(self.reserved);
        if new_size > self.buffer.len() {
            // Old contents are scratch data, so allocate fresh instead of copying.
            self.buffer = zeroed(new_size)?;
            debug!(capacity = new_size, "grew inflate output buffer");
        }
        Ok(())
    }

    /// Decompresses one complete zlib stream.
    ///
    /// The output buffer is grown to at least `size_hint` bytes first. No
    /// retry happens when the hint turns out too small; the caller gets
    /// [`Error::InsufficientSpace`] and may call again with a larger hint.
    pub fn decompress(&mut self, input: &[u8], size_hint: usize) -> Result<&[u8]> {
        self.len = 0;
        self.grow(size_hint)?;

        self.decompressor.reset(true);
        let status = self
            .decompressor
            .decompress(input, &mut self.buffer, FlushDecompress::Finish)
            .map_err(|e| Error::BadData(e.to_string()))?;

        let written = self.decompressor.total_out() as usize;
        let consumed = self.decompressor.total_in() as usize;
        match status {
            Status::StreamEnd => {
                self.len = written;
                Ok(&self.buffer[..written])
            }
            Status::Ok | Status::BufError if written == self.buffer.len() => {
                Err(Error::InsufficientSpace {
                    capacity: self.buffer.len(),
                })
            }
            Status::Ok | Status::BufError if consumed == input.len() => {
                Err(Error::BadData(format!(
                    "stream ended after {consumed} bytes without a final block"
                )))
            }
            Status::Ok | Status::BufError => unreachable!(
                "inflate stopped with {} input bytes and {} output bytes left",
                input.len() - consumed,
                self.buffer.len() - written
            ),
        }
    }
}

fn zeroed(size: usize) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(size)
        .map_err(|_| Error::OutOfMemory(size))?;
    buffer.resize(size, 0);
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use flate2::Compression;
    use flate2::write::ZlibEncoder;
    use std::io::Write;

    fn compress(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_decompress_known_payload() {
        let original: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        let compressed = compress(&original);

        let mut inflater = Inflater::with_capacity(1024).unwrap();
        let out = inflater.decompress(&compressed, original.len()).unwrap();
        assert_eq!(out, &original[..]);
        assert_eq!(inflater.output().len(), original.len());
        assert!(inflater.capacity() >= original.len());
    }

    #[test]
    fn test_buffer_allocated_on_first_use() {
        let mut inflater = Inflater::with_capacity(usize::MAX).unwrap();
        assert!(inflater.buffer.is_empty());
        assert_eq!(inflater.capacity(), usize::MAX);

        let err = inflater.decompress(&compress(b"abcd"), 4).unwrap_err();
        assert!(matches!(err, Error::OutOfMemory(usize::MAX)));

        let mut inflater = Inflater::allocate().unwrap();
        assert!(inflater.buffer.is_empty());
        assert_eq!(inflater.decompress(&compress(b"abcd"), 4).unwrap(), b"abcd");
        assert_eq!(inflater.buffer.len(), DEFAULT_CAPACITY);
    }

    #[test]
    fn test_small_hint_keeps_capacity() {
        let compressed = compress(b"abcd");
        let mut inflater = Inflater::with_capacity(64).unwrap();
        assert_eq!(inflater.decompress(&compressed, 4).unwrap(), b"abcd");
        assert_eq!(inflater.capacity(), 64);
    }

    #[test]
    fn test_insufficient_space() {
        let original = vec![7u8; 10_000];
        let compressed = compress(&original);

        let mut inflater = Inflater::with_capacity(16).unwrap();
        let err = inflater.decompress(&compressed, 16).unwrap_err();
        assert!(matches!(err, Error::InsufficientSpace { capacity: 16 }));
        assert_eq!(err.kind(), ErrorKind::Resource);
        assert!(inflater.output().is_empty());

        // A larger hint succeeds on the same session.
        let out = inflater.decompress(&compressed, original.len()).unwrap();
        assert_eq!(out.len(), original.len());
    }

    #[test]
    fn test_malformed_input() {
        let mut inflater = Inflater::with_capacity(64).unwrap();
        inflater.decompress(&compress(b"first"), 5).unwrap();

        // Valid zlib header followed by a reserved block type.
        let err = inflater.decompress(&[0x78, 0x9C, 0xFF, 0xFF, 0xFF], 64).unwrap_err();
        assert!(matches!(err, Error::BadData(_)));
        assert_eq!(err.kind(), ErrorKind::FormatIntegrity);
        assert!(inflater.output().is_empty());

        assert_eq!(inflater.decompress(&compress(b"second"), 6).unwrap(), b"second");
    }

    #[test]
    fn test_truncated_stream() {
        let original: Vec<u8> = (0..2000u32).map(|i| (i * 7 % 256) as u8).collect();
        let compressed = compress(&original);

        let mut inflater = Inflater::with_capacity(4096).unwrap();
        let err = inflater
            .decompress(&compressed[..compressed.len() / 2], original.len())
            .unwrap_err();
        assert!(matches!(err, Error::BadData(_)));
    }
}
