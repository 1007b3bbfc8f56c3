//! Little-endian byte writers.
//!
//! [`ByteWriter`] writes into a caller-provided slice and fails instead of
//! growing; [`ByteVecWriter`] owns a growable buffer.

use crate::error::{CursorError, CursorResult};

macro_rules! le_writes {
    ($($name:ident: $ty:ty),* $(,)?) => {
        $(
            #[doc = concat!("Writes a little-endian `", stringify!($ty), "`.")]
            pub fn $name(&mut self, value: $ty) -> CursorResult<()> {
                self.write_bytes(&value.to_le_bytes())
            }
        )*
    };
}

macro_rules! string_writes {
    () => {
        /// Writes a fixed-width string field, truncating or NUL-padding to `len`.
        pub fn write_fixed_string(&mut self, value: &str, len: usize) -> CursorResult<()> {
            let bytes = value.as_bytes();
            let take = bytes.len().min(len);
            self.write_bytes(&bytes[..take])?;
            for _ in take..len {
                self.write_u8(0)?;
            }
            Ok(())
        }

        /// Writes a string prefixed by its little-endian `u16` byte length.
        pub fn write_prefixed_string(&mut self, value: &str) -> CursorResult<()> {
            let len = u16::try_from(value.len()).map_err(|_| CursorError::LengthOverflow {
                length: value.len(),
                max: usize::from(u16::MAX),
            })?;
            self.write_u16(len)?;
            self.write_bytes(value.as_bytes())
        }

        /// Writes a string followed by a NUL terminator.
        pub fn write_cstring(&mut self, value: &str) -> CursorResult<()> {
            self.write_bytes(value.as_bytes())?;
            self.write_u8(0)
        }
    };
}

/// A bounded writer over a caller-provided buffer.
#[derive(Debug)]
pub struct ByteWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> ByteWriter<'a> {
    /// Creates a writer positioned at the start of `buf`.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Returns the number of bytes written so far.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Returns the remaining capacity in bytes.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Writes raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CursorError::OutOfBounds`] if the buffer cannot hold `bytes`;
    /// nothing is written in that case.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> CursorResult<()> {
        if bytes.len() > self.remaining() {
            return Err(CursorError::OutOfBounds {
                offset: self.pos,
                requested: bytes.len(),
                available: self.remaining(),
            });
        }
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
        Ok(())
    }

    le_writes! {
        write_u8: u8,
        write_u16: u16,
        write_u32: u32,
        write_u64: u64,
        write_i16: i16,
        write_i32: i32,
        write_i64: i64,
        write_f32: f32,
        write_f64: f64,
    }

    string_writes!();

    /// Finishes writing and returns the number of bytes used.
    #[must_use]
    pub const fn finish(self) -> usize {
        self.pos
    }
}

/// A growable writer that owns its buffer.
#[derive(Debug, Default, Clone)]
pub struct ByteVecWriter {
    bytes: Vec<u8>,
}

impl ByteVecWriter {
    /// Creates a new empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a writer with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(bytes),
        }
    }

    /// Returns the number of bytes written so far.
    #[must_use]
    pub fn position(&self) -> usize {
        self.bytes.len()
    }

    /// Returns the bytes written so far.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Writes raw bytes. Never fails; the signature matches [`ByteWriter`].
    pub fn write_bytes(&mut self, bytes: &[u8]) -> CursorResult<()> {
        self.bytes.extend_from_slice(bytes);
        Ok(())
    }

    le_writes! {
        write_u8: u8,
        write_u16: u16,
        write_u32: u32,
        write_u64: u64,
        write_i16: i16,
        write_i32: i32,
        write_i64: i64,
        write_f32: f32,
        write_f64: f64,
    }

    string_writes!();

    /// Overwrites four bytes at `offset` with a little-endian `u32`.
    ///
    /// Used to back-patch length and offset fields once their value is known.
    pub fn patch_u32(&mut self, offset: usize, value: u32) -> CursorResult<()> {
        let available = self.bytes.len().saturating_sub(offset);
        if available < 4 {
            return Err(CursorError::OutOfBounds {
                offset,
                requested: 4,
                available,
            });
        }
        self.bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Finishes writing and returns the byte buffer.
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }
}
