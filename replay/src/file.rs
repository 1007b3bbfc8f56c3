//! Whole-file decoding and encoding.

use std::io::{Read, Write};
use std::ops::Range;
use std::path::Path;

use cursor::{ByteReader, ByteVecWriter};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::{debug, trace};

use crate::error::{LimitKind, MalformedKind, ReplayError, ReplayResult, Section};
use crate::frame::{Frame, Keyframe};
use crate::header::ReplayHeader;
use crate::limits::ReplayLimits;

/// First four bytes of a gzip-wrapped replay, read as a little-endian `u32`.
pub const GZIP_MAGIC: u32 = 0x0008_8B1F;

/// A decoded replay file.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReplayFile {
    pub header: ReplayHeader,
    /// Payload bytes before the first keyframe (all of them if there is none).
    pub leading: Vec<u8>,
    pub keyframes: Vec<Keyframe>,
    /// Whether the source was gzip-wrapped.
    pub compressed: bool,
}

impl ReplayFile {
    /// Iterates every frame in file order with its keyframe index.
    pub fn frames(&self) -> impl Iterator<Item = (usize, &Frame)> + '_ {
        self.keyframes
            .iter()
            .enumerate()
            .flat_map(|(index, keyframe)| keyframe.frames.iter().map(move |f| (index, f)))
    }

    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.keyframes.iter().map(Keyframe::len).sum()
    }

    /// Recomputes the index count and offsets after keyframes were edited.
    ///
    /// Only the index section changes; the description length fields keep
    /// whatever values they were read with.
    pub fn rebuild_index(&mut self) -> ReplayResult<()> {
        self.header.index.offsets.resize(self.keyframes.len(), 0);
        let mut position = self.header.encoded_len() + self.leading.len();
        for (slot, keyframe) in self
            .header
            .index
            .offsets
            .iter_mut()
            .zip(&self.keyframes)
        {
            *slot = i32::try_from(position).map_err(|_| ReplayError::Encode {
                field: "keyframe offset",
                value: position,
            })?;
            position += keyframe.encoded_len();
        }
        debug!(
            target: "peep::replay",
            keyframes = self.keyframes.len(),
            total_len = position,
            "rebuilt keyframe index"
        );
        Ok(())
    }

    /// Encodes honoring [`ReplayFile::compressed`].
    pub fn encode(&self) -> ReplayResult<Vec<u8>> {
        if self.compressed {
            encode_replay_gzip(self)
        } else {
            encode_replay(self)
        }
    }
}

/// Payload ranges of every keyframe.
///
/// `offsets` are absolute file offsets; the returned ranges index into the
/// payload that follows a `header_size`-byte header. The last keyframe runs
/// to `payload_len`.
pub fn keyframe_ranges(
    offsets: &[i32],
    header_size: usize,
    payload_len: usize,
) -> ReplayResult<Vec<Range<usize>>> {
    let start_of = |index: usize| -> ReplayResult<usize> {
        let offset = i64::from(offsets[index]);
        usize::try_from(offset)
            .ok()
            .and_then(|offset| offset.checked_sub(header_size))
            .ok_or(ReplayError::malformed(
                Section::Keyframe { index },
                MalformedKind::OffsetBeforePayload {
                    offset,
                    header_size,
                },
            ))
    };

    let mut ranges = Vec::with_capacity(offsets.len());
    for index in 0..offsets.len() {
        let start = start_of(index)?;
        let end = if index + 1 < offsets.len() {
            start_of(index + 1)?
        } else {
            payload_len
        };
        let section = Section::Keyframe { index };
        if end < start {
            return Err(ReplayError::malformed(
                section,
                MalformedKind::OffsetsDescending { start, end },
            ));
        }
        if end > payload_len {
            return Err(ReplayError::malformed(
                section,
                MalformedKind::OffsetPastEnd { end, payload_len },
            ));
        }
        ranges.push(start..end);
    }
    Ok(ranges)
}

/// Returns `true` when `bytes` starts with the gzip magic.
#[must_use]
pub fn is_gzip(bytes: &[u8]) -> bool {
    ByteReader::new(bytes)
        .read_u32()
        .is_ok_and(|magic| magic == GZIP_MAGIC)
}

fn decompress(bytes: &[u8], limit: usize) -> ReplayResult<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(bytes)
        .take(u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1))
        .read_to_end(&mut out)
        .map_err(|err| ReplayError::Decompress {
            message: err.to_string(),
        })?;
    if out.len() > limit {
        return Err(ReplayError::LimitsExceeded {
            kind: LimitKind::DecompressedBytes,
            limit,
            actual: out.len(),
        });
    }
    Ok(out)
}

/// Decodes a replay file, gzip-wrapped or not.
///
/// Any structural violation aborts the whole file.
pub fn decode_replay(bytes: &[u8], limits: &ReplayLimits) -> ReplayResult<ReplayFile> {
    if bytes.len() > limits.max_file_bytes {
        return Err(ReplayError::LimitsExceeded {
            kind: LimitKind::FileBytes,
            limit: limits.max_file_bytes,
            actual: bytes.len(),
        });
    }

    let compressed = is_gzip(bytes);
    let inflated;
    let data = if compressed {
        inflated = decompress(bytes, limits.max_decompressed_bytes)?;
        trace!(
            target: "peep::replay",
            compressed = bytes.len(),
            inflated = inflated.len(),
            "decompressed replay"
        );
        &inflated[..]
    } else {
        bytes
    };

    let mut reader = ByteReader::new(data);
    let header = ReplayHeader::read(&mut reader, limits.max_keyframes)?;
    let header_size = reader.position();
    let payload = reader.rest();

    let ranges = keyframe_ranges(&header.index.offsets, header_size, payload.len())?;
    let leading_end = ranges.first().map_or(payload.len(), |range| range.start);
    let keyframes = ranges
        .into_iter()
        .enumerate()
        .map(|(index, range)| {
            Keyframe::parse(&payload[range], index, limits.max_frames_per_keyframe)
        })
        .collect::<ReplayResult<Vec<_>>>()?;

    let file = ReplayFile {
        header,
        leading: payload[..leading_end].to_vec(),
        keyframes,
        compressed,
    };
    debug!(
        target: "peep::replay",
        compressed,
        header_size,
        keyframes = file.keyframes.len(),
        frames = file.frame_count(),
        "decoded replay"
    );
    Ok(file)
}

/// Reads and decodes a replay file from disk.
pub fn read_replay(path: impl AsRef<Path>, limits: &ReplayLimits) -> ReplayResult<ReplayFile> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|err| ReplayError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    })?;
    decode_replay(&bytes, limits)
}

/// Encodes the uncompressed file bytes.
///
/// A file produced by [`decode_replay`] re-encodes to the bytes it was
/// decoded from (after decompression).
pub fn encode_replay(file: &ReplayFile) -> ReplayResult<Vec<u8>> {
    let len = file.header.encoded_len()
        + file.leading.len()
        + file.keyframes.iter().map(Keyframe::encoded_len).sum::<usize>();
    let mut writer = ByteVecWriter::with_capacity(len);
    file.header.write(&mut writer)?;
    writer.write_bytes(&file.leading)?;
    for keyframe in &file.keyframes {
        keyframe.write(&mut writer)?;
    }
    Ok(writer.finish())
}

/// Encodes the file and wraps it in a gzip stream.
pub fn encode_replay_gzip(file: &ReplayFile) -> ReplayResult<Vec<u8>> {
    let raw = encode_replay(file)?;
    let compress = |err: std::io::Error| ReplayError::Compress {
        message: err.to_string(),
    };
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&raw).map_err(compress)?;
    encoder.finish().map_err(compress)
}
