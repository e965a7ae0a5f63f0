use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::info;

use super::mapped::{MemoryMapped, ReadOnly};
use crate::error::{Error, Result};

/// Where the raw input bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Hexadecimal text, e.g. `"4b 49 57 41 44"`.
    Hex(String),
    /// A file on disk.
    File(PathBuf),
}

/// Archive bytes, either mapped from disk or decoded into memory.
#[derive(Debug)]
pub enum ArchiveSource {
    Mapped {
        path: PathBuf,
        map: MemoryMapped<ReadOnly>,
    },
    Memory(Vec<u8>),
}

impl ArchiveSource {
    pub fn load(input: &Input) -> Result<Self> {
        match input {
            Input::Hex(text) => Self::from_hex(text),
            Input::File(path) => Self::open(path),
        }
    }

    /// Maps a file read-only.
    ///
    /// The file handle is closed once the mapping exists; the mapping
    /// stays valid on its own.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        let map = MemoryMapped::map(&file).map_err(|e| Error::io(path, e))?;

        info!("mapped {} ({} bytes)", path.display(), map.len());
        Ok(Self::Mapped {
            path: path.to_path_buf(),
            map,
        })
    }

    /// Decodes hex text into an in-memory buffer.
    ///
    /// Whitespace between digits and a leading `0x` are ignored.
    pub fn from_hex(text: &str) -> Result<Self> {
        let digits: String = text.split_whitespace().collect();
        let digits = digits
            .strip_prefix("0x")
            .or_else(|| digits.strip_prefix("0X"))
            .unwrap_or(&digits);

        let bytes = hex::decode(digits)?;
        info!("decoded {} bytes of hex input", bytes.len());
        Ok(Self::Memory(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Mapped { map, .. } => map.as_slice(),
            Self::Memory(bytes) => bytes,
        }
    }

    /// Human-readable origin for log and error messages.
    pub fn describe(&self) -> String {
        match self {
            Self::Mapped { path, .. } => path.display().to_string(),
            Self::Memory(bytes) => format!("<{} bytes of hex input>", bytes.len()),
        }
    }
}
