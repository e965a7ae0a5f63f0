//! Low-level KIWAD table parser.
//!
//! The parser walks a [`BitBuffer`] over the raw archive bytes:
//!
//! 1. `KIWAD` magic, then version and entry count (`u32` LE each)
//! 2. one flags byte if the version is 2 or later
//! 3. `entry_count` fixed-layout records, each followed by a
//!    length-prefixed, NUL-terminated path
//!
//! Every record is bounds-checked against the remaining bytes before it is
//! read, so a truncated or lying table becomes [`Error::Truncated`] rather
//! than a buffer underrun.

use tracing::debug;

use super::structures::*;
use crate::error::{Error, Result};
use crate::io::BitBuffer;

pub struct WadParser<'a> {
    buffer: BitBuffer<&'a [u8]>,
    state: ArchiveState,
}

impl<'a> WadParser<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            buffer: BitBuffer::from_storage(data),
            state: ArchiveState::Unopened,
        }
    }

    pub fn state(&self) -> ArchiveState {
        self.state
    }

    /// Offset of the first byte after what has been parsed so far.
    pub fn position(&self) -> usize {
        self.buffer.cursor_offset()
    }

    fn require(&self, what: &'static str, needed: usize) -> Result<()> {
        if self.buffer.has_space_for_bytes(needed) {
            Ok(())
        } else {
            Err(Error::Truncated {
                what,
                needed,
                remaining: self.buffer.remaining_bytes(),
            })
        }
    }

    /// Validates the magic and reads the header fields.
    ///
    /// # Panics
    ///
    /// Panics if the header was already read.
    pub fn read_header(&mut self) -> Result<ArchiveHeader> {
        assert_eq!(self.state, ArchiveState::Unopened, "header already read");

        let magic_len = ARCHIVE_MAGIC.len().min(self.buffer.remaining_bytes());
        let magic = self.buffer.read_slice(magic_len);
        if magic != ARCHIVE_MAGIC {
            return Err(Error::BadMagic(magic.to_vec()));
        }

        self.require("archive header", ArchiveHeader::FIXED_SIZE)?;
        let version = self.buffer.read_value::<u32>();
        let entry_count = self.buffer.read_value::<u32>();

        let flags = if ArchiveHeader::has_flags(version) {
            self.require("archive flags", 1)?;
            Some(ArchiveFlags::from_bits(self.buffer.read_value::<u8>()))
        } else {
            None
        };

        debug!(version, entry_count, ?flags, "read KIWAD header");
        self.state = ArchiveState::HeaderRead;
        Ok(ArchiveHeader {
            version,
            entry_count,
            flags,
        })
    }

    /// Reads the record at table position `index`.
    pub fn read_entry(&mut self, index: usize) -> Result<ArchiveEntry> {
        self.require("entry record", ArchiveEntry::FIXED_SIZE)?;

        let start_offset = self.buffer.read_value::<u32>();
        let uncompressed_size = self.buffer.read_value::<u32>();
        let compressed_size = self.buffer.read_value::<u32>();
        let is_compressed = self.buffer.read_value::<u8>() != 0;
        let checksum = self.buffer.read_value::<u32>();
        let relative_path = self.read_path(index)?;

        Ok(ArchiveEntry {
            start_offset,
            uncompressed_size,
            compressed_size,
            is_compressed,
            checksum,
            relative_path,
        })
    }

    fn read_path(&mut self, index: usize) -> Result<String> {
        let len = self.buffer.read_value::<u32>() as usize;
        self.require("entry path", len)?;

        match self.buffer.read_slice(len).split_last() {
            Some((0, path)) => std::str::from_utf8(path)
                .map(str::to_owned)
                .map_err(|_| Error::CorruptPath { index }),
            _ => Err(Error::CorruptPath { index }),
        }
    }

    /// Reads the whole entry table in storage order.
    ///
    /// # Panics
    ///
    /// Panics unless the header was read first.
    pub fn read_entries(&mut self, header: &ArchiveHeader) -> Result<Vec<ArchiveEntry>> {
        assert_eq!(self.state, ArchiveState::HeaderRead, "entries read before header");

        // Bound the allocation by what the remaining bytes could possibly hold.
        let count = header.entry_count as usize;
        let max_fit = self.buffer.remaining_bytes() / ArchiveEntry::FIXED_SIZE;
        let mut entries = Vec::with_capacity(count.min(max_fit));

        for index in 0..count {
            entries.push(self.read_entry(index)?);
        }

        self.state = ArchiveState::EntriesRead;
        Ok(entries)
    }
}

/// Slices the stored payload of `entry` out of the archive bytes.
pub fn entry_contents<'a>(data: &'a [u8], entry: &ArchiveEntry) -> Result<&'a [u8]> {
    let range = entry.payload_range();
    if range.end > data.len() as u64 {
        return Err(Error::EntryOutOfBounds {
            path: entry.relative_path.clone(),
            start: range.start,
            end: range.end,
            len: data.len(),
        });
    }
    Ok(&data[range.start as usize..range.end as usize])
}
