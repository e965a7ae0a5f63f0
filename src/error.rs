//! Error types shared by the binary I/O layer and the archive codec.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad category of an [`Error`].
///
/// Callers use this to decide how to report a failure. None of the
/// categories are retried automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input is not a valid instance of the format.
    FormatIntegrity,
    /// An allocation or output buffer was too small.
    Resource,
    /// The operating system refused a file or mapping operation.
    Os,
}

#[derive(Debug, Error)]
pub enum Error {
    /// The archive does not start with the `KIWAD` tag.
    #[error("archive does not start with KIWAD magic, got {0:02X?}")]
    BadMagic(Vec<u8>),

    /// A header or table record runs past the end of the archive.
    #[error("archive truncated while reading {what}: need {needed} bytes, {remaining} remaining")]
    Truncated {
        what: &'static str,
        needed: usize,
        remaining: usize,
    },

    /// An entry path is empty or not NUL-terminated.
    #[error("corrupt file path string in entry {index}")]
    CorruptPath { index: usize },

    /// An entry path is absolute or walks out of the output directory.
    #[error("refusing to extract entry with unsafe path {0:?}")]
    UnsafePath(String),

    /// An entry's payload range lies outside of the archive.
    #[error("entry {path:?} spans {start}..{end} but the archive is only {len} bytes")]
    EntryOutOfBounds {
        path: String,
        start: u64,
        end: u64,
        len: usize,
    },

    /// The CRC32 of the extracted bytes does not match the table.
    #[error("checksum mismatch for {path:?}: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch {
        path: String,
        expected: u32,
        actual: u32,
    },

    /// The compressed payload is not a valid zlib stream.
    #[error("malformed zlib stream: {0}")]
    BadData(String),

    /// Hex input could not be decoded.
    #[error("invalid hex input: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// Growing a buffer to the requested size failed.
    #[error("out of memory allocating {0} bytes")]
    OutOfMemory(usize),

    /// The decompressed data does not fit into the output buffer.
    #[error("decompression needs more than {capacity} bytes of output space")]
    InsufficientSpace { capacity: usize },

    /// A file system or mapping operation failed.
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The taxonomy category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::BadMagic(_)
            | Error::Truncated { .. }
            | Error::CorruptPath { .. }
            | Error::UnsafePath(_)
            | Error::EntryOutOfBounds { .. }
            | Error::ChecksumMismatch { .. }
            | Error::BadData(_)
            | Error::InvalidHex(_) => ErrorKind::FormatIntegrity,
            Error::OutOfMemory(_) | Error::InsufficientSpace { .. } => ErrorKind::Resource,
            Error::Io { .. } => ErrorKind::Os,
        }
    }

    /// The platform error code of an [`ErrorKind::Os`] error, if any.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Error::Io { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }
}
