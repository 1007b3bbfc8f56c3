//! Explicit configuration for the session layer.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{SessionError, SessionResult};

/// Build selected when no config says otherwise.
pub const DEFAULT_BUILD_VERSION: &str = "production 1962.0";

/// Settings shared by a [`SessionTable`](crate::SessionTable).
///
/// Every field has a default, so a config file only names what it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PeepConfig {
    /// Build (`"<environment> <version>"`) whose protocol catalog is used.
    pub build_version: String,

    /// GSS protocol version sessions are expected to speak. Mismatches are
    /// logged, never rejected.
    pub expected_gss_protocol: Option<u16>,

    /// Parse message bodies as soon as a session is added.
    pub parse_on_load: bool,

    /// Split routed-multiple envelopes into sub-messages while loading.
    pub split_routed: bool,

    /// Worker threads used when filtering one session.
    pub filter_shards: usize,

    /// Root of the protocol definition files.
    pub sift_dir: Option<PathBuf>,

    /// JSON file with codec schema definitions.
    pub codec_definitions: Option<PathBuf>,
}

impl Default for PeepConfig {
    fn default() -> Self {
        Self {
            build_version: DEFAULT_BUILD_VERSION.to_string(),
            expected_gss_protocol: None,
            parse_on_load: false,
            split_routed: true,
            filter_shards: 1,
            sift_dir: None,
            codec_definitions: None,
        }
    }
}

impl PeepConfig {
    /// Reads a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> SessionResult<Self> {
        let path = path.as_ref();
        let config_err = |message: String| SessionError::Config {
            path: path.display().to_string(),
            message,
        };
        let text = std::fs::read_to_string(path).map_err(|err| config_err(err.to_string()))?;
        serde_json::from_str(&text).map_err(|err| config_err(err.to_string()))
    }

    /// Shard count clamped to `1..=available_parallelism`.
    #[must_use]
    pub fn shards(&self) -> usize {
        let cores = std::thread::available_parallelism().map_or(1, NonZeroUsize::get);
        self.filter_shards.clamp(1, cores)
    }
}
