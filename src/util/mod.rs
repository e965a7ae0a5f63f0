//! Leaf utilities: alignment math, byte-order encoding and zlib inflation.

pub mod alignment;
pub mod endian;
mod inflater;

pub use alignment::{align_down, align_up, is_aligned};
pub use endian::{BigEndian, ByteOrder, LittleEndian, Primitive};
pub use inflater::{DEFAULT_CAPACITY, Inflater};
