//! The three header sections at the start of every replay file.
//!
//! Each section reads from a [`ByteReader`] positioned at its start and writes
//! itself back through a [`ByteVecWriter`] field for field, so a decoded header
//! re-encodes to the same bytes (for ASCII strings).

use cursor::{ByteReader, ByteVecWriter, CursorResult};

use crate::error::{MalformedKind, ReplayError, ReplayResult, Section};

/// Fixed-size leading section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Description {
    pub magic: [u8; 4],
    pub version: i32,
    pub header_len: i32,
    pub meta_len: i32,
    pub desc_len: i32,
    pub data_offset: i32,
    pub reserved: i32,
    pub protocol_version: i32,
    pub timestamp: u64,
    pub reserved2: u32,
    pub reserved3: u32,
}

impl Description {
    /// Encoded size in bytes.
    pub const ENCODED_LEN: usize = 48;

    pub fn read(reader: &mut ByteReader<'_>) -> ReplayResult<Self> {
        Self::read_fields(reader).map_err(ReplayError::cursor(Section::Description))
    }

    fn read_fields(reader: &mut ByteReader<'_>) -> CursorResult<Self> {
        Ok(Self {
            magic: reader.read_array()?,
            version: reader.read_i32()?,
            header_len: reader.read_i32()?,
            meta_len: reader.read_i32()?,
            desc_len: reader.read_i32()?,
            data_offset: reader.read_i32()?,
            reserved: reader.read_i32()?,
            protocol_version: reader.read_i32()?,
            timestamp: reader.read_u64()?,
            reserved2: reader.read_u32()?,
            reserved3: reader.read_u32()?,
        })
    }

    pub fn write(&self, writer: &mut ByteVecWriter) -> CursorResult<()> {
        writer.write_bytes(&self.magic)?;
        writer.write_i32(self.version)?;
        writer.write_i32(self.header_len)?;
        writer.write_i32(self.meta_len)?;
        writer.write_i32(self.desc_len)?;
        writer.write_i32(self.data_offset)?;
        writer.write_i32(self.reserved)?;
        writer.write_i32(self.protocol_version)?;
        writer.write_u64(self.timestamp)?;
        writer.write_u32(self.reserved2)?;
        writer.write_u32(self.reserved3)
    }

    /// Protocol version in the byte order the game sessions use.
    #[must_use]
    pub const fn streaming_protocol(&self) -> u16 {
        (self.protocol_version as u16).swap_bytes()
    }
}

/// Keyframe index: absolute file offsets of every keyframe.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IndexSection {
    pub magic: [u8; 4],
    pub version: i32,
    pub reserved: i64,
    pub index_offset: i32,
    pub offsets: Vec<i32>,
}

impl IndexSection {
    pub fn read(reader: &mut ByteReader<'_>, max_keyframes: usize) -> ReplayResult<Self> {
        let map = ReplayError::cursor(Section::Index);
        let magic = reader.read_array().map_err(&map)?;
        let version = reader.read_i32().map_err(&map)?;
        let reserved = reader.read_i64().map_err(&map)?;
        let count = reader.read_i32().map_err(&map)?;
        let index_offset = reader.read_i32().map_err(&map)?;

        let count = usize::try_from(count).map_err(|_| {
            ReplayError::malformed(Section::Index, MalformedKind::NegativeCount { count })
        })?;
        if count > max_keyframes {
            return Err(ReplayError::LimitsExceeded {
                kind: crate::error::LimitKind::Keyframes,
                limit: max_keyframes,
                actual: count,
            });
        }
        // Bound the allocation by what the buffer can actually hold.
        let mut offsets = Vec::with_capacity(count.min(reader.remaining() / 4));
        for _ in 0..count {
            offsets.push(reader.read_i32().map_err(&map)?);
        }

        Ok(Self {
            magic,
            version,
            reserved,
            index_offset,
            offsets,
        })
    }

    pub fn write(&self, writer: &mut ByteVecWriter) -> ReplayResult<()> {
        let count = i32::try_from(self.offsets.len()).map_err(|_| ReplayError::Encode {
            field: "index count",
            value: self.offsets.len(),
        })?;
        self.write_fields(writer, count)
            .map_err(ReplayError::cursor(Section::Index))
    }

    fn write_fields(&self, writer: &mut ByteVecWriter, count: i32) -> CursorResult<()> {
        writer.write_bytes(&self.magic)?;
        writer.write_i32(self.version)?;
        writer.write_i64(self.reserved)?;
        writer.write_i32(count)?;
        writer.write_i32(self.index_offset)?;
        for &offset in &self.offsets {
            writer.write_i32(offset)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn encoded_len(&self) -> usize {
        24 + 4 * self.offsets.len()
    }
}

/// Recording metadata: where, when and who.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetaSection {
    pub version: i32,
    pub zone_id: i32,
    pub description: String,
    pub local_date: String,
    pub position: [f32; 3],
    pub rotation: [f32; 4],
    pub character_guid: u64,
    pub character_name: String,
    pub reserved: [u8; 18],
    pub build_version: String,
    pub timestamp: u64,
    pub month: i32,
    pub day: i32,
    pub real_year: i32,
    pub fictional_year: i32,
    pub fictional_time: f32,
    pub fictional_date: String,
    pub reserved2: [u8; 31],
}

impl MetaSection {
    pub fn read(reader: &mut ByteReader<'_>) -> ReplayResult<Self> {
        Self::read_fields(reader).map_err(ReplayError::cursor(Section::Meta))
    }

    fn read_fields(reader: &mut ByteReader<'_>) -> CursorResult<Self> {
        let version = reader.read_i32()?;
        let zone_id = reader.read_i32()?;
        let description = reader.read_cstring()?;
        let local_date = reader.read_cstring()?;
        let mut position = [0.0; 3];
        for value in &mut position {
            *value = reader.read_f32()?;
        }
        let mut rotation = [0.0; 4];
        for value in &mut rotation {
            *value = reader.read_f32()?;
        }
        Ok(Self {
            version,
            zone_id,
            description,
            local_date,
            position,
            rotation,
            character_guid: reader.read_u64()?,
            character_name: reader.read_cstring()?,
            reserved: reader.read_array()?,
            build_version: reader.read_cstring()?,
            timestamp: reader.read_u64()?,
            month: reader.read_i32()?,
            day: reader.read_i32()?,
            real_year: reader.read_i32()?,
            fictional_year: reader.read_i32()?,
            fictional_time: reader.read_f32()?,
            fictional_date: reader.read_cstring()?,
            reserved2: reader.read_array()?,
        })
    }

    pub fn write(&self, writer: &mut ByteVecWriter) -> CursorResult<()> {
        writer.write_i32(self.version)?;
        writer.write_i32(self.zone_id)?;
        writer.write_cstring(&self.description)?;
        writer.write_cstring(&self.local_date)?;
        for &value in self.position.iter().chain(&self.rotation) {
            writer.write_f32(value)?;
        }
        writer.write_u64(self.character_guid)?;
        writer.write_cstring(&self.character_name)?;
        writer.write_bytes(&self.reserved)?;
        writer.write_cstring(&self.build_version)?;
        writer.write_u64(self.timestamp)?;
        writer.write_i32(self.month)?;
        writer.write_i32(self.day)?;
        writer.write_i32(self.real_year)?;
        writer.write_i32(self.fictional_year)?;
        writer.write_f32(self.fictional_time)?;
        writer.write_cstring(&self.fictional_date)?;
        writer.write_bytes(&self.reserved2)
    }

    #[must_use]
    pub fn encoded_len(&self) -> usize {
        let strings = [
            &self.description,
            &self.local_date,
            &self.character_name,
            &self.build_version,
            &self.fictional_date,
        ];
        let text: usize = strings.iter().map(|s| s.len() + 1).sum();
        8 + 28 + 8 + 18 + 8 + 16 + 4 + 31 + text
    }
}

/// All three header sections in file order.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReplayHeader {
    pub description: Description,
    pub index: IndexSection,
    pub meta: MetaSection,
}

impl ReplayHeader {
    pub fn read(reader: &mut ByteReader<'_>, max_keyframes: usize) -> ReplayResult<Self> {
        let description = Description::read(reader)?;
        let index = IndexSection::read(reader, max_keyframes)?;
        let meta = MetaSection::read(reader)?;
        Ok(Self {
            description,
            index,
            meta,
        })
    }

    pub fn write(&self, writer: &mut ByteVecWriter) -> ReplayResult<()> {
        self.description
            .write(writer)
            .map_err(ReplayError::cursor(Section::Description))?;
        self.index.write(writer)?;
        self.meta
            .write(writer)
            .map_err(ReplayError::cursor(Section::Meta))
    }

    /// Number of bytes the header occupies; keyframe offsets are relative to
    /// the file start, so payload positions subtract this.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        Description::ENCODED_LEN + self.index.encoded_len() + self.meta.encoded_len()
    }
}
