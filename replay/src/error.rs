//! Error types for replay file decoding and encoding.

use std::fmt;

use cursor::CursorError;

/// Result type for replay operations.
pub type ReplayResult<T> = Result<T, ReplayError>;

/// Errors raised while reading or writing a replay file.
///
/// Decoding is all-or-nothing: any of these aborts the whole file.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReplayError {
    /// The file could not be read or written.
    Io { path: String, message: String },

    /// The gzip stream was corrupt.
    Decompress { message: String },

    /// Writing the gzip stream failed.
    Compress { message: String },

    /// A structural violation in the file layout.
    Malformed { section: Section, kind: MalformedKind },

    /// A configured limit was exceeded.
    LimitsExceeded {
        kind: LimitKind,
        limit: usize,
        actual: usize,
    },

    /// A value does not fit the field it must be encoded into.
    Encode { field: &'static str, value: usize },

    /// Writing through the byte cursor failed.
    Cursor(CursorError),
}

/// Part of the file a [`ReplayError::Malformed`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Description,
    Index,
    Meta,
    Keyframe { index: usize },
    Frame { keyframe: usize, frame: usize },
}

/// What exactly was malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedKind {
    /// A read ran past the end of the section.
    Cursor(CursorError),
    /// The index count is negative.
    NegativeCount { count: i32 },
    /// A keyframe offset points into the header.
    OffsetBeforePayload { offset: i64, header_size: usize },
    /// A keyframe ends before it starts.
    OffsetsDescending { start: usize, end: usize },
    /// A keyframe extends past the payload.
    OffsetPastEnd { end: usize, payload_len: usize },
    /// The last frame of a keyframe is cut short.
    TruncatedFrame { needed: usize, available: usize },
}

/// Replay limits that can be exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    FileBytes,
    DecompressedBytes,
    Keyframes,
    FramesPerKeyframe,
}

impl ReplayError {
    pub(crate) const fn malformed(section: Section, kind: MalformedKind) -> Self {
        Self::Malformed { section, kind }
    }

    pub(crate) fn cursor(section: Section) -> impl Fn(CursorError) -> Self {
        move |err| Self::malformed(section, MalformedKind::Cursor(err))
    }
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, message } => write!(f, "replay io error on {path}: {message}"),
            Self::Decompress { message } => write!(f, "gzip decompression failed: {message}"),
            Self::Compress { message } => write!(f, "gzip compression failed: {message}"),
            Self::Malformed { section, kind } => {
                write!(f, "malformed replay file in {section}: {kind}")
            }
            Self::LimitsExceeded {
                kind,
                limit,
                actual,
            } => write!(f, "{kind} limit exceeded: {actual} > {limit}"),
            Self::Encode { field, value } => {
                write!(f, "value {value} does not fit field {field}")
            }
            Self::Cursor(err) => write!(f, "replay write failed: {err}"),
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Description => write!(f, "description"),
            Self::Index => write!(f, "index section"),
            Self::Meta => write!(f, "meta section"),
            Self::Keyframe { index } => write!(f, "keyframe {index}"),
            Self::Frame { keyframe, frame } => write!(f, "keyframe {keyframe} frame {frame}"),
        }
    }
}

impl fmt::Display for MalformedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cursor(err) => write!(f, "{err}"),
            Self::NegativeCount { count } => write!(f, "negative index count {count}"),
            Self::OffsetBeforePayload {
                offset,
                header_size,
            } => write!(
                f,
                "offset {offset} points inside the {header_size}-byte header"
            ),
            Self::OffsetsDescending { start, end } => {
                write!(f, "slice ends at {end} before it starts at {start}")
            }
            Self::OffsetPastEnd { end, payload_len } => {
                write!(f, "slice ends at {end}, payload is {payload_len} bytes")
            }
            Self::TruncatedFrame { needed, available } => {
                write!(f, "truncated frame: need {needed} bytes, have {available}")
            }
        }
    }
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FileBytes => "file bytes",
            Self::DecompressedBytes => "decompressed bytes",
            Self::Keyframes => "keyframe count",
            Self::FramesPerKeyframe => "frames per keyframe",
        };
        write!(f, "{name}")
    }
}

impl std::error::Error for ReplayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Cursor(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CursorError> for ReplayError {
    fn from(err: CursorError) -> Self {
        Self::Cursor(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_truncated_frame() {
        let err = ReplayError::malformed(
            Section::Frame {
                keyframe: 1,
                frame: 3,
            },
            MalformedKind::TruncatedFrame {
                needed: 8,
                available: 5,
            },
        );
        let msg = err.to_string();
        assert!(msg.contains("keyframe 1 frame 3"));
        assert!(msg.contains("need 8 bytes, have 5"));
    }

    #[test]
    fn display_limits() {
        let err = ReplayError::LimitsExceeded {
            kind: LimitKind::Keyframes,
            limit: 4,
            actual: 9,
        };
        assert_eq!(err.to_string(), "keyframe count limit exceeded: 9 > 4");
    }

    #[test]
    fn cursor_mapping_keeps_section() {
        let map = ReplayError::cursor(Section::Meta);
        let err = map(CursorError::UnterminatedString { offset: 12 });
        assert!(matches!(
            err,
            ReplayError::Malformed {
                section: Section::Meta,
                kind: MalformedKind::Cursor(_)
            }
        ));
    }
}
