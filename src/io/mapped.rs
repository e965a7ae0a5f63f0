//! Memory-mapped views of file ranges.
//!
//! [`MemoryMapped`] maps `[offset, offset + len)` of a file into memory and
//! exposes exactly that span, whatever the platform alignment rules are. The
//! OS call itself is made at `offset` rounded down to
//! [`allocation_granularity`]; the returned view is shifted back by the
//! difference.
//!
//! The access mode is a type parameter. Flushing only exists on
//! [`MemoryMapped<ReadWrite>`], and a writable mapping flushes itself before
//! it is unmapped.

use std::fmt;
use std::fs::File;
use std::io;
use std::ops::Deref;
use std::sync::OnceLock;

use memmap2::{Mmap, MmapMut, MmapOptions};
use tracing::{debug, warn};

use crate::util::{align_down, is_aligned};

/// Alignment the OS requires for mapping offsets.
///
/// This is the page size on Unix-like systems and the 64 KiB allocation
/// granularity elsewhere.
pub fn allocation_granularity() -> usize {
    static GRANULARITY: OnceLock<usize> = OnceLock::new();
    *GRANULARITY.get_or_init(query_granularity)
}

#[cfg(unix)]
fn query_granularity() -> usize {
    // SAFETY: sysconf has no preconditions.
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 { size as usize } else { 4096 }
}

#[cfg(not(unix))]
fn query_granularity() -> usize {
    64 * 1024
}

mod sealed {
    pub trait Sealed {}

    impl Sealed for super::ReadOnly {}
    impl Sealed for super::ReadWrite {}
}

/// How a [`MemoryMapped`] region may be accessed.
pub trait AccessMode: sealed::Sealed {
    #[doc(hidden)]
    type Map: Deref<Target = [u8]>;

    #[doc(hidden)]
    const WRITABLE: bool;

    #[doc(hidden)]
    fn map(options: &MmapOptions, file: &File) -> io::Result<Self::Map>;

    #[doc(hidden)]
    fn release(map: &mut Self::Map);
}

/// Shared read-only mapping.
#[derive(Debug)]
pub enum ReadOnly {}

/// Shared writable mapping, flushed on drop.
#[derive(Debug)]
pub enum ReadWrite {}

impl AccessMode for ReadOnly {
    type Map = Mmap;

    const WRITABLE: bool = false;

    fn map(options: &MmapOptions, file: &File) -> io::Result<Mmap> {
        // SAFETY: the view is never written through. Another process
        // truncating the file underneath us is not something we guard
        // against.
        unsafe { options.map(file) }
    }

    fn release(_map: &mut Mmap) {}
}

impl AccessMode for ReadWrite {
    type Map = MmapMut;

    const WRITABLE: bool = true;

    fn map(options: &MmapOptions, file: &File) -> io::Result<MmapMut> {
        // SAFETY: the mapping is exclusively owned by one MemoryMapped.
        unsafe { options.map_mut(file) }
    }

    fn release(map: &mut MmapMut) {
        if let Err(e) = map.flush() {
            warn!("failed to flush mapping before unmap: {e}");
        }
    }
}

/// An owned mapping of one file range.
///
/// Not clonable; dropping it unmaps the range.
pub struct MemoryMapped<M: AccessMode = ReadOnly> {
    map: Option<M::Map>,
    /// Distance between the OS mapping start and the requested offset.
    alignment: usize,
    len: usize,
    /// Duplicate of the mapped file handle, held by writable mappings.
    _handle: Option<File>,
}

impl<M: AccessMode> MemoryMapped<M> {
    /// Maps the whole file.
    pub fn map(file: &File) -> io::Result<Self> {
        Self::map_with_offset(file, 0)
    }

    /// Maps everything from `offset` to the end of the file.
    pub fn map_with_offset(file: &File, offset: u64) -> io::Result<Self> {
        let file_size = file.metadata()?.len();
        if offset > file_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("mapping offset {offset} lies past the end of a {file_size} byte file"),
            ));
        }

        let len = usize::try_from(file_size - offset).map_err(|_| {
            io::Error::new(
                io::ErrorKind::OutOfMemory,
                "file range does not fit into the address space",
            )
        })?;

        Self::map_range(file, offset, len)
    }

    /// Maps `len` bytes starting at `offset`.
    ///
    /// A zero-length request produces an empty view without calling the OS.
    /// A range reaching past the end of the file is rejected, since touching
    /// its tail would fault instead of failing.
    pub fn map_range(file: &File, offset: u64, len: usize) -> io::Result<Self> {
        if len == 0 {
            return Ok(Self::empty());
        }

        let file_size = file.metadata()?.len();
        if offset.checked_add(len as u64).is_none_or(|end| end > file_size) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("mapping {len} bytes at {offset} exceeds a {file_size} byte file"),
            ));
        }

        let granularity = allocation_granularity() as u64;
        let aligned_offset = align_down(offset, granularity);
        let alignment = (offset - aligned_offset) as usize;
        let aligned_len = len.checked_add(alignment).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "mapping length overflows")
        })?;

        // Writable mappings keep their own handle so the caller may close theirs.
        let handle = if M::WRITABLE {
            Some(file.try_clone()?)
        } else {
            None
        };

        let mut options = MmapOptions::new();
        options.offset(aligned_offset).len(aligned_len);
        let map = M::map(&options, handle.as_ref().unwrap_or(file))?;

        debug!(offset, len, aligned_offset, writable = M::WRITABLE, "mapped file range");

        Ok(Self {
            map: Some(map),
            alignment,
            len,
            _handle: handle,
        })
    }

    fn empty() -> Self {
        Self {
            map: None,
            alignment: 0,
            len: 0,
            _handle: None,
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        match &self.map {
            Some(map) => &map[self.alignment..self.alignment + self.len],
            None => &[],
        }
    }

    /// Pointer to the first requested byte.
    pub fn as_ptr(&self) -> *const u8 {
        self.as_slice().as_ptr()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Start and length of `[offset, offset + len)` widened to granularity
    /// boundaries, relative to the underlying OS mapping.
    fn aligned_range(&self, offset: usize, len: usize) -> (usize, usize) {
        assert!(
            offset.checked_add(len).is_some_and(|end| end <= self.len),
            "flush range {offset}+{len} exceeds mapping of {} bytes",
            self.len
        );

        let start = self.alignment + offset;
        let aligned = align_down(start, allocation_granularity());
        debug_assert!(is_aligned(aligned, allocation_granularity()));
        (aligned, len + (start - aligned))
    }
}

impl MemoryMapped<ReadWrite> {
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        match &mut self.map {
            Some(map) => &mut map[self.alignment..self.alignment + self.len],
            None => &mut [],
        }
    }

    /// Synchronously writes the whole view back to the file.
    pub fn flush(&self) -> io::Result<()> {
        self.flush_range(0, self.len)
    }

    /// Schedules the whole view for write-back without waiting.
    pub fn flush_async(&self) -> io::Result<()> {
        self.flush_async_range(0, self.len)
    }

    pub fn flush_range(&self, offset: usize, len: usize) -> io::Result<()> {
        let Some(map) = &self.map else {
            return Ok(());
        };
        let (start, len) = self.aligned_range(offset, len);
        map.flush_range(start, len)
    }

    pub fn flush_async_range(&self, offset: usize, len: usize) -> io::Result<()> {
        let Some(map) = &self.map else {
            return Ok(());
        };
        let (start, len) = self.aligned_range(offset, len);
        map.flush_async_range(start, len)
    }
}

impl<M: AccessMode> Drop for MemoryMapped<M> {
    fn drop(&mut self) {
        if let Some(map) = self.map.as_mut() {
            M::release(map);
        }
    }
}

impl<M: AccessMode> Deref for MemoryMapped<M> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl<M: AccessMode> AsRef<[u8]> for MemoryMapped<M> {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl<M: AccessMode> fmt::Debug for MemoryMapped<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryMapped")
            .field("ptr", &self.as_ptr())
            .field("len", &self.len)
            .field("alignment", &self.alignment)
            .field("writable", &M::WRITABLE)
            .finish()
    }
}
