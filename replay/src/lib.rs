//! Keyframed replay (NSR) file decoder and encoder.
//!
//! A replay file is a three-part header (description, keyframe index, meta)
//! followed by a payload of keyframes, each a run of timestamped frames. Files
//! may be wrapped in a single gzip stream.
//!
//! # Design Principles
//!
//! - **All or nothing** - A structural violation anywhere aborts the whole file.
//! - **Bounded** - [`ReplayLimits`] caps input, inflated size and counts.
//! - **Byte exact** - [`encode_replay`] re-emits a decoded file unchanged.

mod error;
mod file;
mod frame;
mod header;
mod limits;

pub use error::{LimitKind, MalformedKind, ReplayError, ReplayResult, Section};
pub use file::{
    decode_replay, encode_replay, encode_replay_gzip, is_gzip, keyframe_ranges, read_replay,
    ReplayFile, GZIP_MAGIC,
};
pub use frame::{Frame, Keyframe, FRAME_HEADER_LEN};
pub use header::{Description, IndexSection, MetaSection, ReplayHeader};
pub use limits::ReplayLimits;
