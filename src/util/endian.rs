//! Fixed-width integer encoding in either byte order.
//!
//! The byte order is selected at the type level with the [`ByteOrder`]
//! implementations re-exported from the `byteorder` crate, so
//! `u32::decode::<LittleEndian>(buf)` compiles down to a single load.

pub use byteorder::{BigEndian, ByteOrder, LittleEndian, NativeEndian};

/// Integers that can be read from and written to raw bytes.
pub trait Primitive: Copy + Sized {
    /// Encoded width in bytes.
    const SIZE: usize;

    /// Decodes a value from the first [`Self::SIZE`] bytes of `buf`.
    ///
    /// Panics if `buf` is shorter than [`Self::SIZE`].
    fn decode<B: ByteOrder>(buf: &[u8]) -> Self;

    /// Encodes `self` into the first [`Self::SIZE`] bytes of `buf`.
    fn encode<B: ByteOrder>(self, buf: &mut [u8]);

    /// Reverses the byte order of `self`.
    fn swap_bytes(self) -> Self;
}

impl Primitive for u8 {
    const SIZE: usize = 1;

    #[inline]
    fn decode<B: ByteOrder>(buf: &[u8]) -> Self {
        buf[0]
    }

    #[inline]
    fn encode<B: ByteOrder>(self, buf: &mut [u8]) {
        buf[0] = self;
    }

    #[inline]
    fn swap_bytes(self) -> Self {
        self
    }
}

impl Primitive for i8 {
    const SIZE: usize = 1;

    #[inline]
    fn decode<B: ByteOrder>(buf: &[u8]) -> Self {
        buf[0] as i8
    }

    #[inline]
    fn encode<B: ByteOrder>(self, buf: &mut [u8]) {
        buf[0] = self as u8;
    }

    #[inline]
    fn swap_bytes(self) -> Self {
        self
    }
}

macro_rules! impl_primitive {
    ($($t:ty => $read:ident, $write:ident;)*) => {
        $(
            impl Primitive for $t {
                const SIZE: usize = std::mem::size_of::<$t>();

                #[inline]
                fn decode<B: ByteOrder>(buf: &[u8]) -> Self {
                    B::$read(buf)
                }

                #[inline]
                fn encode<B: ByteOrder>(self, buf: &mut [u8]) {
                    B::$write(buf, self)
                }

                #[inline]
                fn swap_bytes(self) -> Self {
                    <$t>::swap_bytes(self)
                }
            }
        )*
    };
}

impl_primitive! {
    u16 => read_u16, write_u16;
    u32 => read_u32, write_u32;
    u64 => read_u64, write_u64;
    i16 => read_i16, write_i16;
    i32 => read_i32, write_i32;
    i64 => read_i64, write_i64;
}

/// Converts a native value into its little-endian representation.
#[inline]
pub fn to_little_endian<T: Primitive>(value: T) -> T {
    if cfg!(target_endian = "little") {
        value
    } else {
        value.swap_bytes()
    }
}

/// Converts a native value into its big-endian representation.
#[inline]
pub fn to_big_endian<T: Primitive>(value: T) -> T {
    if cfg!(target_endian = "big") {
        value
    } else {
        value.swap_bytes()
    }
}

/// Decodes an unsigned integer stored in `nbytes` (1..=8) bytes.
#[inline]
pub fn decode_uint<B: ByteOrder>(buf: &[u8], nbytes: usize) -> u64 {
    B::read_uint(buf, nbytes)
}

/// Decodes a sign-extended integer stored in `nbytes` (1..=8) bytes.
#[inline]
pub fn decode_int<B: ByteOrder>(buf: &[u8], nbytes: usize) -> i64 {
    B::read_int(buf, nbytes)
}

/// Encodes the low `nbytes` (1..=8) bytes of `value`, truncating the rest.
#[inline]
pub fn encode_uint<B: ByteOrder>(buf: &mut [u8], value: u64, nbytes: usize) {
    B::write_uint(buf, truncate_to(value, nbytes), nbytes)
}

#[inline]
fn truncate_to(value: u64, nbytes: usize) -> u64 {
    match nbytes {
        0 => 0,
        1..8 => value & ((1 << (nbytes * 8)) - 1),
        _ => value,
    }
}

/// Encodes the low `nbytes` (1..=8) bytes of `value`, dropping the sign
/// extension.
#[inline]
pub fn encode_int<B: ByteOrder>(buf: &mut [u8], value: i64, nbytes: usize) {
    B::write_int(buf, value, nbytes)
}
