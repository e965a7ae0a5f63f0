//! # printrospector
//!
//! Binary I/O building blocks and an extractor for KIWAD game archives.
//!
//! The crate is layered bottom-up:
//!
//! - [`util`]: power-of-two alignment, byte order conversion and a reusable
//!   zlib [`Inflater`](util::Inflater)
//! - [`io`]: the cursor-based [`BitBuffer`], file mappings via
//!   [`MemoryMapped`] and input sources (files or hex text)
//! - [`wad`]: the archive table parser and [`WadExtractor`]
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use printrospector::{ArchiveSource, ExtractOptions, Input, NoProgress, WadExtractor};
//!
//! fn main() -> printrospector::Result<()> {
//!     let source = ArchiveSource::load(&Input::File("Root.wad".into()))?;
//!     let mut extractor = WadExtractor::new(source.as_bytes(), ExtractOptions::default())?;
//!
//!     for entry in extractor.list_entries() {
//!         println!("{}", entry.relative_path);
//!     }
//!
//!     extractor.extract_all(Path::new("Root"), &mut NoProgress)?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod io;
pub mod util;
pub mod wad;

pub use cli::Cli;
pub use error::{Error, ErrorKind, Result};
pub use io::{ArchiveSource, BitBuffer, Input, MemoryMapped, ReadOnly, ReadWrite};
pub use util::Inflater;
pub use wad::{
    ArchiveEntry, ArchiveHeader, EntryFilter, ExtractOptions, ExtractSummary, NoProgress,
    Progress, WadExtractor,
};
