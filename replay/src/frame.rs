//! Frames inside a keyframe and the fields derived from their payload.

use std::borrow::Cow;

use cursor::{ByteReader, ByteVecWriter, CursorResult};

use crate::error::{LimitKind, MalformedKind, ReplayError, ReplayResult, Section};

/// Bytes preceding every frame payload.
pub const FRAME_HEADER_LEN: usize = 8;

/// Payload prefix kept by [`Frame::normalized_payload`].
const KEEP_PREFIX: usize = 9;
/// Bytes dropped after the kept prefix.
const SKIPPED_LEN: usize = 4;

/// One recorded server message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Frame {
    pub timestamp: u32,
    pub reserved1: u8,
    pub reserved2: u8,
    pub data: Vec<u8>,
}

impl Frame {
    #[must_use]
    pub fn new(timestamp: u32, data: Vec<u8>) -> Self {
        Self {
            timestamp,
            reserved1: 0,
            reserved2: 0,
            data,
        }
    }

    /// First payload byte.
    #[must_use]
    pub fn controller_id(&self) -> Option<u8> {
        self.data.first().copied()
    }

    /// Upper 56 bits of the first eight payload bytes.
    #[must_use]
    pub fn entity_id(&self) -> Option<u64> {
        let bytes: [u8; 8] = self.data.get(..8)?.try_into().ok()?;
        Some(u64::from_le_bytes(bytes) >> 8)
    }

    #[must_use]
    pub fn message_id(&self) -> Option<u8> {
        self.data.get(8).copied()
    }

    /// Little-endian `i32` at bytes `8..12`, present only when the payload
    /// is longer than twelve bytes.
    #[must_use]
    pub fn weird_int(&self) -> Option<i32> {
        if self.data.len() <= 12 {
            return None;
        }
        let bytes: [u8; 4] = self.data.get(8..12)?.try_into().ok()?;
        Some(i32::from_le_bytes(bytes))
    }

    /// Payload as a session message body.
    ///
    /// When a weird int is present and not `-1`, bytes `9..13` are dropped.
    #[must_use]
    pub fn normalized_payload(&self) -> Cow<'_, [u8]> {
        match self.weird_int() {
            Some(value) if value != -1 => {
                let mut out = Vec::with_capacity(self.data.len() - SKIPPED_LEN);
                out.extend_from_slice(&self.data[..KEEP_PREFIX]);
                out.extend_from_slice(&self.data[KEEP_PREFIX + SKIPPED_LEN..]);
                Cow::Owned(out)
            }
            _ => Cow::Borrowed(&self.data),
        }
    }

    #[must_use]
    pub fn encoded_len(&self) -> usize {
        FRAME_HEADER_LEN + self.data.len()
    }

    pub fn write(&self, writer: &mut ByteVecWriter) -> ReplayResult<()> {
        let length = u16::try_from(self.data.len()).map_err(|_| ReplayError::Encode {
            field: "frame length",
            value: self.data.len(),
        })?;
        Ok(self.write_fields(writer, length)?)
    }

    fn write_fields(&self, writer: &mut ByteVecWriter, length: u16) -> CursorResult<()> {
        writer.write_u32(self.timestamp)?;
        writer.write_u16(length)?;
        writer.write_u8(self.reserved1)?;
        writer.write_u8(self.reserved2)?;
        writer.write_bytes(&self.data)
    }
}

/// A run of frames addressed by one index entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Keyframe {
    pub frames: Vec<Frame>,
}

impl Keyframe {
    /// Parses frames back to back until `bytes` is exhausted.
    pub fn parse(bytes: &[u8], index: usize, max_frames: usize) -> ReplayResult<Self> {
        let mut reader = ByteReader::new(bytes);
        let mut frames = Vec::new();

        while !reader.is_empty() {
            let section = Section::Frame {
                keyframe: index,
                frame: frames.len(),
            };
            if frames.len() == max_frames {
                return Err(ReplayError::LimitsExceeded {
                    kind: LimitKind::FramesPerKeyframe,
                    limit: max_frames,
                    actual: frames.len() + 1,
                });
            }
            let truncated = |needed, available| {
                ReplayError::malformed(
                    section,
                    MalformedKind::TruncatedFrame { needed, available },
                )
            };

            if reader.remaining() < FRAME_HEADER_LEN {
                return Err(truncated(FRAME_HEADER_LEN, reader.remaining()));
            }
            let map = ReplayError::cursor(section);
            let timestamp = reader.read_u32().map_err(&map)?;
            let length = usize::from(reader.read_u16().map_err(&map)?);
            let reserved1 = reader.read_u8().map_err(&map)?;
            let reserved2 = reader.read_u8().map_err(&map)?;
            if reader.remaining() < length {
                return Err(truncated(length, reader.remaining()));
            }
            let data = reader.read_bytes(length).map_err(&map)?.to_vec();

            frames.push(Frame {
                timestamp,
                reserved1,
                reserved2,
                data,
            });
        }

        Ok(Self { frames })
    }

    #[must_use]
    pub fn encoded_len(&self) -> usize {
        self.frames.iter().map(Frame::encoded_len).sum()
    }

    pub fn write(&self, writer: &mut ByteVecWriter) -> ReplayResult<()> {
        for frame in &self.frames {
            frame.write(writer)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_bytes(timestamp: u32, data: &[u8]) -> Vec<u8> {
        let mut writer = ByteVecWriter::new();
        Frame::new(timestamp, data.to_vec()).write(&mut writer).unwrap();
        writer.finish()
    }

    #[test]
    fn derived_fields() {
        let data = vec![0x1E, 0x02, 0, 0, 0, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF, 0xAA];
        let frame = Frame::new(0, data);
        assert_eq!(frame.controller_id(), Some(0x1E));
        assert_eq!(frame.entity_id(), Some(0x02));
        assert_eq!(frame.message_id(), Some(0xFF));
        assert_eq!(frame.weird_int(), Some(-1));
        assert!(matches!(frame.normalized_payload(), Cow::Borrowed(_)));
    }

    #[test]
    fn weird_int_requires_more_than_twelve_bytes() {
        let frame = Frame::new(0, vec![0; 12]);
        assert_eq!(frame.weird_int(), None);
        assert_eq!(frame.message_id(), Some(0));

        let short = Frame::new(0, vec![7]);
        assert_eq!(short.controller_id(), Some(7));
        assert_eq!(short.entity_id(), None);
        assert_eq!(short.message_id(), None);
    }

    #[test]
    fn normalization_drops_four_bytes_after_prefix() {
        let data: Vec<u8> = (0u8..16).collect();
        let frame = Frame::new(0, data);
        assert_eq!(frame.weird_int(), Some(i32::from_le_bytes([8, 9, 10, 11])));

        let payload = frame.normalized_payload();
        assert_eq!(&payload[..], &[0, 1, 2, 3, 4, 5, 6, 7, 8, 13, 14, 15]);
    }

    #[test]
    fn parse_back_to_back_frames() {
        let mut bytes = frame_bytes(10, b"abc");
        bytes.extend(frame_bytes(20, b""));
        bytes.extend(frame_bytes(30, b"defg"));

        let keyframe = Keyframe::parse(&bytes, 0, 16).unwrap();
        assert_eq!(keyframe.len(), 3);
        assert_eq!(keyframe.frames[0].data, b"abc");
        assert!(keyframe.frames[1].data.is_empty());
        assert_eq!(keyframe.frames[2].timestamp, 30);
        assert_eq!(keyframe.encoded_len(), bytes.len());
    }

    #[test]
    fn empty_slice_has_no_frames() {
        assert!(Keyframe::parse(&[], 0, 16).unwrap().is_empty());
    }

    #[test]
    fn truncated_payload_detected() {
        let mut bytes = frame_bytes(1, b"abcdefgh");
        bytes.truncate(bytes.len() - 3);

        let err = Keyframe::parse(&bytes, 2, 16).unwrap_err();
        assert_eq!(
            err,
            ReplayError::Malformed {
                section: Section::Frame {
                    keyframe: 2,
                    frame: 0
                },
                kind: MalformedKind::TruncatedFrame {
                    needed: 8,
                    available: 5
                },
            }
        );
    }

    #[test]
    fn truncated_frame_header_detected() {
        let mut bytes = frame_bytes(1, b"ok");
        bytes.extend_from_slice(&[1, 2, 3]);

        let err = Keyframe::parse(&bytes, 0, 16).unwrap_err();
        assert!(matches!(
            err,
            ReplayError::Malformed {
                section: Section::Frame { frame: 1, .. },
                kind: MalformedKind::TruncatedFrame {
                    needed: 8,
                    available: 3
                },
            }
        ));
    }

    #[test]
    fn frame_limit_enforced() {
        let mut bytes = Vec::new();
        for i in 0..3 {
            bytes.extend(frame_bytes(i, b"x"));
        }
        assert!(matches!(
            Keyframe::parse(&bytes, 0, 2),
            Err(ReplayError::LimitsExceeded {
                kind: LimitKind::FramesPerKeyframe,
                ..
            })
        ));
    }

    #[test]
    fn oversized_frame_cannot_be_written() {
        let frame = Frame::new(0, vec![0; usize::from(u16::MAX) + 1]);
        let mut writer = ByteVecWriter::new();
        assert!(matches!(
            frame.write(&mut writer),
            Err(ReplayError::Encode { .. })
        ));
    }
}
