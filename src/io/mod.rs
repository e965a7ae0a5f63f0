mod buffer;
mod mapped;
mod source;

pub use buffer::{BitBuffer, DEFAULT_CAPACITY, GrowableStorage};
pub use mapped::{AccessMode, MemoryMapped, ReadOnly, ReadWrite, allocation_granularity};
pub use source::{ArchiveSource, Input};
