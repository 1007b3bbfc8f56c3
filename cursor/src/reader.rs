//! Little-endian byte reader with bounded operations.

use crate::error::{CursorError, CursorResult};

/// A byte-level reader for decoding little-endian binary layouts.
///
/// Every read is bounds-checked before any byte is consumed. A failed read
/// leaves the position untouched, so callers can report the exact offset of a
/// truncated field and carry on with the next item.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Creates a new `ByteReader` positioned at the start of `data`.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns the current position.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Returns the number of unread bytes.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Returns `true` if every byte has been consumed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Returns the full underlying buffer.
    #[must_use]
    pub const fn buffer(&self) -> &'a [u8] {
        self.data
    }

    /// Returns the unread tail of the buffer without consuming it.
    #[must_use]
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos.min(self.data.len())..]
    }

    /// Moves the cursor to an absolute position.
    ///
    /// Seeking to `len` is allowed (the reader is then empty).
    pub fn seek(&mut self, pos: usize) -> CursorResult<()> {
        if pos > self.data.len() {
            return Err(CursorError::OutOfBounds {
                offset: self.pos,
                requested: pos.saturating_sub(self.pos),
                available: self.remaining(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    /// Skips `n` bytes.
    pub fn skip(&mut self, n: usize) -> CursorResult<()> {
        self.ensure(n)?;
        self.pos += n;
        Ok(())
    }

    /// Returns the next byte without consuming it.
    pub fn peek_u8(&self) -> CursorResult<u8> {
        self.ensure(1)?;
        Ok(self.data[self.pos])
    }

    /// Reads a `u8`.
    pub fn read_u8(&mut self) -> CursorResult<u8> {
        let [value] = self.read_array::<1>()?;
        Ok(value)
    }

    /// Reads a little-endian `u16`.
    pub fn read_u16(&mut self) -> CursorResult<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    /// Reads a little-endian `u32`.
    pub fn read_u32(&mut self) -> CursorResult<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    /// Reads a little-endian `u64`.
    pub fn read_u64(&mut self) -> CursorResult<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Reads a little-endian `i16`.
    pub fn read_i16(&mut self) -> CursorResult<i16> {
        Ok(i16::from_le_bytes(self.read_array()?))
    }

    /// Reads a little-endian `i32`.
    pub fn read_i32(&mut self) -> CursorResult<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    /// Reads a little-endian `i64`.
    pub fn read_i64(&mut self) -> CursorResult<i64> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    /// Reads a little-endian IEEE-754 `f32`.
    pub fn read_f32(&mut self) -> CursorResult<f32> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }

    /// Reads a little-endian IEEE-754 `f64`.
    pub fn read_f64(&mut self) -> CursorResult<f64> {
        Ok(f64::from_le_bytes(self.read_array()?))
    }

    /// Reads exactly `N` bytes into an array.
    pub fn read_array<const N: usize>(&mut self) -> CursorResult<[u8; N]> {
        self.ensure(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.pos..self.pos + N]);
        self.pos += N;
        Ok(out)
    }

    /// Reads `n` bytes as a borrowed slice.
    pub fn read_bytes(&mut self, n: usize) -> CursorResult<&'a [u8]> {
        self.ensure(n)?;
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Reads a fixed-width string field of `len` bytes.
    ///
    /// Trailing NUL padding is stripped and invalid UTF-8 is replaced.
    pub fn read_fixed_string(&mut self, len: usize) -> CursorResult<String> {
        let bytes = self.read_bytes(len)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }

    /// Reads a string prefixed by its little-endian `u16` byte length.
    pub fn read_prefixed_string(&mut self) -> CursorResult<String> {
        let start = self.pos;
        let len = usize::from(self.read_u16()?);
        match self.read_bytes(len) {
            Ok(bytes) => Ok(String::from_utf8_lossy(bytes).into_owned()),
            Err(err) => {
                self.pos = start;
                Err(err)
            }
        }
    }

    /// Reads a NUL-terminated string; the terminator is consumed but not returned.
    pub fn read_cstring(&mut self) -> CursorResult<String> {
        let rest = self.rest();
        let Some(end) = rest.iter().position(|&b| b == 0) else {
            return Err(CursorError::UnterminatedString { offset: self.pos });
        };
        let value = String::from_utf8_lossy(&rest[..end]).into_owned();
        self.pos += end + 1;
        Ok(value)
    }

    fn ensure(&self, n: usize) -> CursorResult<()> {
        let available = self.remaining();
        if n > available {
            return Err(CursorError::OutOfBounds {
                offset: self.pos,
                requested: n,
                available,
            });
        }
        Ok(())
    }
}
