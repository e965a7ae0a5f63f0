//! Cursor-based byte and bit reader/writer.
//!
//! [`BitBuffer`] works over any byte storage. Reading only needs
//! `AsRef<[u8]>`, so a parser can run directly over a memory-mapped archive
//! without copying it. Writing needs [`GrowableStorage`]; an owned `Vec<u8>`
//! doubles its capacity on demand, while a borrowed `&mut [u8]` refuses to
//! grow.
//!
//! Bits are packed LSB-first within each byte. Byte-oriented operations
//! first realign the cursor to the next byte boundary, which skips whatever
//! is left of a partially consumed byte.
//!
//! Running out of data on a read is a contract violation and panics:
//! callers are expected to size their reads from lengths they validated
//! beforehand (see [`BitBuffer::has_space_for_bytes`]).

use crate::util::endian::{self, ByteOrder, LittleEndian, Primitive};

/// Capacity of a buffer created with [`BitBuffer::new`].
pub const DEFAULT_CAPACITY: usize = 4 * 1024;

/// Storage a [`BitBuffer`] can write into.
pub trait GrowableStorage: AsRef<[u8]> + AsMut<[u8]> {
    /// Resizes the storage to `new_capacity` bytes, zero-filling new space.
    ///
    /// Returns `false` if this storage cannot grow.
    fn try_grow(&mut self, new_capacity: usize) -> bool;
}

impl GrowableStorage for Vec<u8> {
    fn try_grow(&mut self, new_capacity: usize) -> bool {
        if new_capacity > self.len() {
            self.resize(new_capacity, 0);
        }
        true
    }
}

impl GrowableStorage for &mut [u8] {
    fn try_grow(&mut self, new_capacity: usize) -> bool {
        new_capacity <= self.len()
    }
}

#[derive(Debug, Clone)]
pub struct BitBuffer<S = Vec<u8>> {
    storage: S,
    /// Byte position of the cursor, `0..=capacity`.
    cursor: usize,
    /// Bit position inside the cursor byte, `0..8`.
    bit_offset: u8,
}

impl BitBuffer<Vec<u8>> {
    /// Creates a self-owned buffer with [`DEFAULT_CAPACITY`] zeroed bytes.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_storage(vec![0; capacity])
    }

    /// Grows the buffer to `new_capacity` bytes, keeping contents and
    /// cursor. Does nothing if the buffer is already large enough.
    pub fn grow(&mut self, new_capacity: usize) {
        self.storage.try_grow(new_capacity);
    }
}

impl Default for BitBuffer<Vec<u8>> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: AsRef<[u8]>> BitBuffer<S> {
    /// Wraps existing storage with the cursor at its start.
    ///
    /// Borrowed storage is never freed or resized by the buffer.
    pub fn from_storage(storage: S) -> Self {
        Self {
            storage,
            cursor: 0,
            bit_offset: 0,
        }
    }

    pub fn into_inner(self) -> S {
        self.storage
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        self.storage.as_ref()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.as_slice().len()
    }

    #[inline]
    pub fn cursor_offset(&self) -> usize {
        self.cursor
    }

    #[inline]
    pub fn bit_offset(&self) -> u8 {
        self.bit_offset
    }

    /// Bytes from the cursor to the end of the buffer.
    #[inline]
    pub fn cursor_slice(&self) -> &[u8] {
        &self.as_slice()[self.cursor..]
    }

    #[inline]
    pub fn remaining_bytes(&self) -> usize {
        debug_assert!(self.cursor <= self.capacity());
        self.capacity() - self.cursor
    }

    #[inline]
    pub fn remaining_bits(&self) -> usize {
        self.remaining_bytes() * 8 - self.bit_offset as usize
    }

    #[inline]
    pub fn passed_bytes(&self) -> usize {
        self.cursor
    }

    #[inline]
    pub fn passed_bits(&self) -> usize {
        self.cursor * 8 + self.bit_offset as usize
    }

    #[inline]
    pub fn has_space_for_bytes(&self, nbytes: usize) -> bool {
        self.remaining_bytes() >= nbytes
    }

    #[inline]
    pub fn has_space_for_bits(&self, nbits: usize) -> bool {
        self.remaining_bits() >= nbits
    }

    /// Moves the cursor back to byte `offset`, clearing the bit offset.
    ///
    /// # Panics
    ///
    /// Panics if `offset` lies past the current cursor. The buffer only
    /// moves forward through reads, writes and [`BitBuffer::skip_bytes`].
    pub fn rewind_cursor(&mut self, offset: usize) {
        assert!(
            offset <= self.cursor,
            "cannot rewind cursor forward from {} to {offset}",
            self.cursor
        );
        self.cursor = offset;
        self.bit_offset = 0;
    }

    #[inline]
    fn realign_cursor_to_byte(&mut self) {
        if self.bit_offset != 0 {
            self.cursor += 1;
            self.bit_offset = 0;
        }
    }

    #[inline]
    fn advance_cursor_by_bits(&mut self, nbits: usize) {
        self.cursor += nbits / 8;

        let bits = self.bit_offset as usize + (nbits & 7);
        self.cursor += bits / 8;
        self.bit_offset = (bits & 7) as u8;
    }

    #[inline]
    fn ensure_readable_bytes(&self, nbytes: usize) {
        assert!(
            self.has_space_for_bytes(nbytes),
            "buffer too short to read {nbytes} more bytes ({} remaining)",
            self.remaining_bytes()
        );
    }

    /// Skips `len` bytes after realigning to a byte boundary.
    pub fn skip_bytes(&mut self, len: usize) {
        self.realign_cursor_to_byte();
        self.ensure_readable_bytes(len);
        self.cursor += len;
    }

    /// Reads a little-endian value.
    #[inline]
    pub fn read_value<T: Primitive>(&mut self) -> T {
        self.read_value_with::<T, LittleEndian>()
    }

    /// Reads a value in byte order `B`.
    pub fn read_value_with<T: Primitive, B: ByteOrder>(&mut self) -> T {
        self.realign_cursor_to_byte();
        self.ensure_readable_bytes(T::SIZE);

        let value = T::decode::<B>(&self.as_slice()[self.cursor..]);
        self.cursor += T::SIZE;
        value
    }

    /// Reads an unsigned integer stored in `nbytes` (1..=8) bytes.
    pub fn read_uint_sized<B: ByteOrder>(&mut self, nbytes: usize) -> u64 {
        self.realign_cursor_to_byte();
        self.ensure_readable_bytes(nbytes);

        let value = endian::decode_uint::<B>(&self.as_slice()[self.cursor..], nbytes);
        self.cursor += nbytes;
        value
    }

    /// Reads a sign-extended integer stored in `nbytes` (1..=8) bytes.
    pub fn read_int_sized<B: ByteOrder>(&mut self, nbytes: usize) -> i64 {
        self.realign_cursor_to_byte();
        self.ensure_readable_bytes(nbytes);

        let value = endian::decode_int::<B>(&self.as_slice()[self.cursor..], nbytes);
        self.cursor += nbytes;
        value
    }

    /// Fills `out` with the next `out.len()` bytes.
    pub fn read_bytes(&mut self, out: &mut [u8]) {
        let bytes = self.read_slice(out.len());
        out.copy_from_slice(bytes);
    }

    /// Returns the next `len` bytes without copying them.
    pub fn read_slice(&mut self, len: usize) -> &[u8] {
        self.realign_cursor_to_byte();
        self.ensure_readable_bytes(len);

        let start = self.cursor;
        self.cursor += len;
        &self.as_slice()[start..start + len]
    }

    pub fn read_bit(&mut self) -> bool {
        assert!(self.has_space_for_bits(1), "buffer too short to read one bit");

        let value = self.as_slice()[self.cursor] & (1 << self.bit_offset) != 0;
        self.advance_cursor_by_bits(1);
        value
    }

    /// Reads `nbits` (at most 32) bits, LSB-first.
    pub fn read_bits(&mut self, nbits: usize) -> u32 {
        assert!(nbits <= 32, "cannot read {nbits} bits into a u32");
        assert!(
            self.has_space_for_bits(nbits),
            "buffer too short to read {nbits} bits ({} remaining)",
            self.remaining_bits()
        );

        let mut out = 0u32;
        let mut count = 0;
        let mut left = nbits;
        while left != 0 {
            let current = (8 - self.bit_offset as usize).min(left);
            let mask = ((1u16 << current) - 1) as u8;

            let chunk = (self.as_slice()[self.cursor] >> self.bit_offset) & mask;
            out |= (chunk as u32) << count;

            count += current;
            left -= current;
            self.advance_cursor_by_bits(current);
        }

        out
    }
}

impl<S: GrowableStorage> BitBuffer<S> {
    #[inline]
    fn as_mut_slice(&mut self) -> &mut [u8] {
        self.storage.as_mut()
    }

    /// Makes room for `nbits` more bits past the cursor, doubling the
    /// capacity until they fit.
    fn reserve_bits(&mut self, nbits: usize) {
        if self.has_space_for_bits(nbits) {
            return;
        }

        let needed = (self.passed_bits() + nbits).div_ceil(8);
        let mut new_capacity = self.capacity().max(1);
        while new_capacity < needed {
            new_capacity *= 2;
        }

        assert!(
            self.storage.try_grow(new_capacity),
            "borrowed buffer of {} bytes cannot grow to {new_capacity} bytes",
            self.capacity()
        );
    }

    /// Writes a little-endian value.
    #[inline]
    pub fn write_value<T: Primitive>(&mut self, value: T) {
        self.write_value_with::<T, LittleEndian>(value)
    }

    /// Writes a value in byte order `B`.
    pub fn write_value_with<T: Primitive, B: ByteOrder>(&mut self, value: T) {
        self.realign_cursor_to_byte();
        self.reserve_bits(T::SIZE * 8);

        let cursor = self.cursor;
        value.encode::<B>(&mut self.as_mut_slice()[cursor..]);
        self.cursor += T::SIZE;
    }

    /// Writes the low `nbytes` (1..=8) bytes of `value`.
    pub fn write_uint_sized<B: ByteOrder>(&mut self, value: u64, nbytes: usize) {
        self.realign_cursor_to_byte();
        self.reserve_bits(nbytes * 8);

        let cursor = self.cursor;
        endian::encode_uint::<B>(&mut self.as_mut_slice()[cursor..], value, nbytes);
        self.cursor += nbytes;
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.realign_cursor_to_byte();
        self.reserve_bits(bytes.len() * 8);

        let cursor = self.cursor;
        self.as_mut_slice()[cursor..cursor + bytes.len()].copy_from_slice(bytes);
        self.cursor += bytes.len();
    }

    pub fn write_bit(&mut self, value: bool) {
        self.write_bits(value as u32, 1);
    }

    /// Writes the low `nbits` (at most 32) bits of `value`, LSB-first.
    ///
    /// Bits of a partially written byte outside the written range are left
    /// untouched.
    pub fn write_bits(&mut self, value: u32, nbits: usize) {
        assert!(nbits <= 32, "cannot write {nbits} bits from a u32");
        self.reserve_bits(nbits);

        let mut count = 0;
        let mut left = nbits;
        while left != 0 {
            let current = (8 - self.bit_offset as usize).min(left);
            let mask = ((1u16 << current) - 1) as u8;

            let chunk = (value >> count) as u8 & mask;
            let (cursor, shift) = (self.cursor, self.bit_offset);
            let byte = &mut self.as_mut_slice()[cursor];
            *byte = (*byte & !(mask << shift)) | (chunk << shift);

            count += current;
            left -= current;
            self.advance_cursor_by_bits(current);
        }
    }
}
