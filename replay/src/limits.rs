//! Configurable limits for bounded replay decoding.

/// Limits enforced while decoding a replay file.
///
/// The decompressed limit bounds memory for gzip-wrapped files whose
/// inflated size is not known up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayLimits {
    /// Maximum size of the file as stored on disk.
    pub max_file_bytes: usize,

    /// Maximum size after gzip decompression.
    pub max_decompressed_bytes: usize,

    /// Maximum number of keyframes in the index.
    pub max_keyframes: usize,

    /// Maximum number of frames inside one keyframe.
    pub max_frames_per_keyframe: usize,
}

impl Default for ReplayLimits {
    fn default() -> Self {
        Self {
            max_file_bytes: 512 * 1024 * 1024,
            max_decompressed_bytes: 1024 * 1024 * 1024,
            max_keyframes: 1 << 20,
            max_frames_per_keyframe: 1 << 20,
        }
    }
}

impl ReplayLimits {
    /// Creates limits suitable for testing with smaller values.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            max_file_bytes: 64 * 1024,
            max_decompressed_bytes: 256 * 1024,
            max_keyframes: 64,
            max_frames_per_keyframe: 256,
        }
    }

    /// Creates limits with no restrictions.
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_file_bytes: usize::MAX,
            max_decompressed_bytes: usize::MAX,
            max_keyframes: usize::MAX,
            max_frames_per_keyframe: usize::MAX,
        }
    }
}
