use std::ops::Range;
use std::path::Path;

/// Tag every KIWAD archive starts with.
pub const ARCHIVE_MAGIC: &[u8; 5] = b"KIWAD";

/// First format version carrying the archive flags byte.
pub const FLAGS_MIN_VERSION: u32 = 2;

/// Progress of reading and extracting one archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveState {
    Unopened,
    HeaderRead,
    EntriesRead,
    Extracting,
    Done,
}

/// Archive-level flag bits (format version 2 and later).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct ArchiveFlags(u8);

impl ArchiveFlags {
    pub const NONE: Self = Self(0);
    pub const MEMORY_MAPPED: Self = Self(1 << 0);
    pub const PREFETCH_HANDLE: Self = Self(1 << 1);

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

/// KIWAD header: magic, version, entry count and optional flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveHeader {
    pub version: u32,
    pub entry_count: u32,
    /// Only present when `version >= 2`.
    pub flags: Option<ArchiveFlags>,
}

impl ArchiveHeader {
    /// Bytes following the magic up to the optional flags byte.
    pub const FIXED_SIZE: usize = 4 + 4;

    pub fn has_flags(version: u32) -> bool {
        version >= FLAGS_MIN_VERSION
    }
}

/// One record of the entry table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Absolute offset of the payload inside the archive.
    pub start_offset: u32,
    pub uncompressed_size: u32,
    pub compressed_size: u32,
    pub is_compressed: bool,
    /// CRC32 of the contents. Advisory, only checked on request.
    pub checksum: u32,
    /// Archive-relative path without the terminating NUL.
    pub relative_path: String,
}

impl ArchiveEntry {
    /// Fixed part of a record: offsets, sizes, flag, checksum and the
    /// path length prefix.
    pub const FIXED_SIZE: usize = 4 + 4 + 4 + 1 + 4 + 4;

    /// Number of payload bytes stored in the archive.
    pub fn stored_size(&self) -> u32 {
        if self.is_compressed {
            self.compressed_size
        } else {
            self.uncompressed_size
        }
    }

    /// Byte range of the payload inside the archive.
    pub fn payload_range(&self) -> Range<u64> {
        let start = self.start_offset as u64;
        start..start + self.stored_size() as u64
    }

    pub fn path(&self) -> &Path {
        Path::new(&self.relative_path)
    }

    /// Space saved by compression, in percent.
    pub fn compression_ratio(&self) -> u64 {
        if !self.is_compressed || self.uncompressed_size == 0 {
            return 0;
        }
        100u64.saturating_sub(self.compressed_size as u64 * 100 / self.uncompressed_size as u64)
    }
}
