//! KIWAD archive support.
//!
//! A KIWAD archive is a `KIWAD` magic, a small header and a flat entry
//! table, followed by the stored (raw or zlib-compressed) payloads. The
//! table is parsed up front by [`WadParser`]; [`WadExtractor`] then walks
//! it in storage order and writes each entry below an output directory.

mod extractor;
mod filter;
mod parser;
mod structures;

pub use extractor::{ExtractOptions, ExtractSummary, NoProgress, Progress, WadExtractor};
pub use filter::EntryFilter;
pub use parser::{WadParser, entry_contents};
pub use structures::{
    ARCHIVE_MAGIC, ArchiveEntry, ArchiveFlags, ArchiveHeader, ArchiveState, FLAGS_MIN_VERSION,
};
