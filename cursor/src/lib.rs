//! Bounded little-endian byte cursor for the packet-peep decoders.
//!
//! This crate provides [`ByteReader`] for decoding and [`ByteWriter`] /
//! [`ByteVecWriter`] for encoding the fixed-width, little-endian layouts used
//! by the game transport and the replay file format.
//!
//! # Design Principles
//!
//! - **No unsafe code** - Safety is paramount.
//! - **Check before read** - Truncated captures are expected input, so every
//!   access is bounds-checked up front and a failed read never moves the cursor.
//! - **No domain knowledge** - This crate knows nothing about channels, entities or replays.
//!
//! # Example
//!
//! ```
//! use cursor::{ByteReader, ByteVecWriter};
//!
//! let mut writer = ByteVecWriter::new();
//! writer.write_u16(0xBEEF).unwrap();
//! writer.write_cstring("zone").unwrap();
//! let bytes = writer.finish();
//!
//! let mut reader = ByteReader::new(&bytes);
//! assert_eq!(reader.read_u16().unwrap(), 0xBEEF);
//! assert_eq!(reader.read_cstring().unwrap(), "zone");
//! ```

mod error;
mod reader;
mod writer;

pub use error::{CursorError, CursorResult};
pub use reader::ByteReader;
pub use writer::{ByteVecWriter, ByteWriter};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_roundtrip() {
        let writer = ByteVecWriter::new();
        let bytes = writer.finish();
        assert!(bytes.is_empty());

        let reader = ByteReader::new(&bytes);
        assert!(reader.is_empty());
    }

    #[test]
    fn mixed_roundtrip() {
        let mut writer = ByteVecWriter::new();
        writer.write_u8(0x05).unwrap();
        writer.write_u64(0x0102_0304_0506_0708).unwrap();
        writer.write_i32(-42).unwrap();
        writer.write_f32(0.5).unwrap();
        writer.write_cstring("Firefall").unwrap();
        let bytes = writer.finish();

        let mut reader = ByteReader::new(&bytes);
        assert_eq!(reader.read_u8().unwrap(), 0x05);
        assert_eq!(reader.read_u64().unwrap(), 0x0102_0304_0506_0708);
        assert_eq!(reader.read_i32().unwrap(), -42);
        assert_eq!(reader.read_f32().unwrap(), 0.5);
        assert_eq!(reader.read_cstring().unwrap(), "Firefall");
        assert!(reader.is_empty());
    }

    #[test]
    fn doctest_example() {
        let mut writer = ByteVecWriter::new();
        writer.write_u16(0xBEEF).unwrap();
        writer.write_cstring("zone").unwrap();
        let bytes = writer.finish();

        let mut reader = ByteReader::new(&bytes);
        assert_eq!(reader.read_u16().unwrap(), 0xBEEF);
        assert_eq!(reader.read_cstring().unwrap(), "zone");
    }
}
