//! Cursor provides a positioned, read-only view over a byte slice, with
//! primitive big-endian integer reads and zero-copy byte-slice reads.
//!
//! Unlike `std::io::Cursor`, this cursor forks cheaply: forked cursors
//! share the backing slice and advancing one does not move the other. That
//! is what lets the decoder follow a data-section pointer without losing
//! its place in the value it was in the middle of decoding.

use byteorder::{BigEndian, ByteOrder};

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("Read past the end of the database file.")]
    OutOfBounds,
}

/// A positioned view over a borrowed byte slice.
#[derive(Clone, Copy)]
pub struct Cursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Cursor<'a> {
        Cursor { bytes, offset: 0 }
    }

    pub fn at(bytes: &'a [u8], offset: usize) -> Cursor<'a> {
        Cursor { bytes, offset }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.offset)
    }

    /// Forks a new cursor over the same backing bytes, positioned at `offset`.
    /// Mutating the fork never affects `self`.
    pub fn fork_at(&self, offset: usize) -> Cursor<'a> {
        Cursor {
            bytes: self.bytes,
            offset,
        }
    }

    pub fn seek_to(&mut self, offset: usize) {
        self.offset = offset;
    }

    pub fn read_byte(&mut self) -> Result<u8, Error> {
        let b = *self.bytes.get(self.offset).ok_or(Error::OutOfBounds)?;
        self.offset += 1;
        Ok(b)
    }

    /// Reads `n` bytes as a zero-copy slice, advancing the cursor past them.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], Error> {
        let end = self.offset.checked_add(n).ok_or(Error::OutOfBounds)?;
        let s = self.bytes.get(self.offset..end).ok_or(Error::OutOfBounds)?;
        self.offset = end;
        Ok(s)
    }

    /// Reads `n` big-endian bytes (0 <= n <= 8) into the low-order bytes of
    /// a zero-initialized u64 and returns it host-endian. `n == 0` yields 0.
    pub fn read_uint(&mut self, n: usize) -> Result<u64, Error> {
        debug_assert!(n <= 8, "read_uint supports at most 8 bytes");
        if n == 0 {
            return Ok(0);
        }
        let bytes = self.read_bytes(n)?;
        Ok(BigEndian::read_uint(bytes, n))
    }
}

#[test]
fn test_read_byte_and_bytes() {
    let data = [0x01, 0x02, 0x03, 0x04];
    let mut c = Cursor::new(&data);
    assert_eq!(c.read_byte().unwrap(), 0x01);
    assert_eq!(c.read_bytes(2).unwrap(), &[0x02, 0x03]);
    assert_eq!(c.offset(), 3);
    assert_eq!(c.read_byte().unwrap(), 0x04);
    assert_eq!(c.read_byte(), Err(Error::OutOfBounds));
}

#[test]
fn test_read_uint_zero_extends() {
    let data = [0xFF, 0x01];
    let mut c = Cursor::new(&data);
    assert_eq!(c.read_uint(0).unwrap(), 0);
    assert_eq!(c.read_uint(2).unwrap(), 0xFF01);
}

#[test]
fn test_fork_does_not_move_original() {
    let data = [0x01, 0x02, 0x03, 0x04];
    let mut c = Cursor::new(&data);
    c.read_byte().unwrap();
    let mut forked = c.fork_at(3);
    assert_eq!(forked.read_byte().unwrap(), 0x04);
    assert_eq!(c.offset(), 1);
}

#[test]
fn test_out_of_bounds_on_slice_read() {
    let data = [0x01, 0x02];
    let mut c = Cursor::new(&data);
    assert_eq!(c.read_bytes(3), Err(Error::OutOfBounds));
}
