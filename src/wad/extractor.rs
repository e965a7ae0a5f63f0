use std::fs;
use std::path::{Component, Path, PathBuf};

use flate2::Crc;
use tracing::{debug, info, warn};

use super::filter::EntryFilter;
use super::parser::{WadParser, entry_contents};
use super::structures::{ArchiveEntry, ArchiveHeader, ArchiveState};
use crate::error::{Error, Result};
use crate::util::{DEFAULT_CAPACITY, Inflater};

/// Receives extraction progress.
///
/// Closures taking `(current, total)` implement this directly.
pub trait Progress {
    fn begin(&mut self, _total: usize) {}

    fn update(&mut self, current: usize, total: usize);

    fn finish(&mut self) {}
}

impl<F: FnMut(usize, usize)> Progress for F {
    fn update(&mut self, current: usize, total: usize) {
        self(current, total)
    }
}

/// Progress sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn update(&mut self, _current: usize, _total: usize) {}
}

#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Compare the CRC32 of each written file against the table.
    pub verify_checksums: bool,
    /// Report progress every this many entries (and after the last one).
    pub progress_interval: usize,
    /// Initial inflate output capacity.
    pub inflate_capacity: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            verify_checksums: false,
            progress_interval: 64,
            inflate_capacity: DEFAULT_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub entries: usize,
    pub bytes_written: u64,
}

/// KIWAD archive extractor over borrowed archive bytes.
pub struct WadExtractor<'a> {
    data: &'a [u8],
    header: ArchiveHeader,
    entries: Vec<ArchiveEntry>,
    options: ExtractOptions,
    state: ArchiveState,
}

impl<'a> WadExtractor<'a> {
    /// Parses the header and the complete entry table.
    pub fn new(data: &'a [u8], options: ExtractOptions) -> Result<Self> {
        let mut parser = WadParser::new(data);
        let header = parser.read_header()?;
        let entries = parser.read_entries(&header)?;

        info!(
            version = header.version,
            entries = entries.len(),
            "opened KIWAD archive"
        );

        Ok(Self {
            data,
            header,
            entries,
            options,
            state: parser.state(),
        })
    }

    pub fn header(&self) -> &ArchiveHeader {
        &self.header
    }

    /// All entries in table order.
    pub fn list_entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn state(&self) -> ArchiveState {
        self.state
    }

    /// Returns the contents of `entry`, inflating them if needed.
    ///
    /// Compressed entries are decompressed into `inflater`, so the returned
    /// slice is only valid until the inflater is used again.
    pub fn extract_to_memory<'b>(
        &'b self,
        inflater: &'b mut Inflater,
        entry: &ArchiveEntry,
    ) -> Result<&'b [u8]> {
        let stored = entry_contents(self.data, entry)?;
        if !entry.is_compressed {
            return Ok(stored);
        }

        let contents = inflater.decompress(stored, entry.uncompressed_size as usize)?;
        if contents.len() != entry.uncompressed_size as usize {
            warn!(
                "{}: inflated to {} bytes, table says {}",
                entry.relative_path,
                contents.len(),
                entry.uncompressed_size
            );
        }
        Ok(contents)
    }

    /// Extracts `entry` to `output_dir/relative_path`.
    ///
    /// Returns the number of bytes written.
    pub fn extract_to_file(
        &self,
        inflater: &mut Inflater,
        entry: &ArchiveEntry,
        output_dir: &Path,
    ) -> Result<u64> {
        let output_path = output_path(output_dir, entry)?;
        let contents = self.extract_to_memory(inflater, entry)?;

        if self.options.verify_checksums {
            verify_checksum(entry, contents)?;
        }

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        fs::write(&output_path, contents).map_err(|e| Error::io(&output_path, e))?;

        debug!("extracted {} ({} bytes)", entry.relative_path, contents.len());
        Ok(contents.len() as u64)
    }

    /// Extracts every entry in table order.
    pub fn extract_all(
        &mut self,
        output_dir: &Path,
        progress: &mut impl Progress,
    ) -> Result<ExtractSummary> {
        self.extract_matching(output_dir, &EntryFilter::default(), progress)
    }

    /// Extracts the entries selected by `filter`, in table order.
    ///
    /// Stops at the first failing entry. Files written before the failure
    /// stay on disk.
    pub fn extract_matching(
        &mut self,
        output_dir: &Path,
        filter: &EntryFilter,
        progress: &mut impl Progress,
    ) -> Result<ExtractSummary> {
        let mut inflater = Inflater::with_capacity(self.options.inflate_capacity)?;
        fs::create_dir_all(output_dir).map_err(|e| Error::io(output_dir, e))?;

        let selected: Vec<&ArchiveEntry> =
            self.entries.iter().filter(|e| filter.matches(e)).collect();
        let total = selected.len();
        let interval = self.options.progress_interval.max(1);

        self.state = ArchiveState::Extracting;
        progress.begin(total);

        let mut summary = ExtractSummary::default();
        for (i, entry) in selected.into_iter().enumerate() {
            summary.bytes_written += self.extract_to_file(&mut inflater, entry, output_dir)?;
            summary.entries += 1;

            let current = i + 1;
            if current % interval == 0 || current == total {
                progress.update(current, total);
            }
        }

        progress.finish();
        self.state = ArchiveState::Done;

        info!(
            "extracted {} entries ({} bytes) to {}",
            summary.entries,
            summary.bytes_written,
            output_dir.display()
        );
        Ok(summary)
    }
}

/// Joins `entry`'s path onto `output_dir`, refusing paths that would land
/// outside of it.
fn output_path(output_dir: &Path, entry: &ArchiveEntry) -> Result<PathBuf> {
    let relative = entry.path();
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes || entry.relative_path.is_empty() {
        return Err(Error::UnsafePath(entry.relative_path.clone()));
    }
    Ok(output_dir.join(relative))
}

fn verify_checksum(entry: &ArchiveEntry, contents: &[u8]) -> Result<()> {
    let mut crc = Crc::new();
    crc.update(contents);
    if crc.sum() != entry.checksum {
        return Err(Error::ChecksumMismatch {
            path: entry.relative_path.clone(),
            expected: entry.checksum,
            actual: crc.sum(),
        });
    }
    Ok(())
}
