//! Loading of versioned protocol definition files.
//!
//! Directory layout:
//!
//! ```text
//! <dir>/Patches/**/*.json   one patch (build) description per file
//! <dir>/Matrix/<ver>.json   Matrix protocol namespace, keyed by version
//! <dir>/GSS/<ver>.json      game-state protocol namespace, keyed by version
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{CatalogError, CatalogResult};

/// A released game build and the protocol versions it speaks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Patch {
    pub environment: String,
    pub branch: String,
    pub version: String,
    #[serde(default)]
    pub exe_build_time: String,
    #[serde(default, rename = "ExeSHA256")]
    pub exe_sha256: String,
    #[serde(default)]
    pub exe_size: i64,
    pub matrix_protocol_version: u16,
    #[serde(rename = "GSSProtocolVersion")]
    pub gss_protocol_version: u16,
}

impl Patch {
    /// Display name used for build selection: `"<environment> <version>"`.
    #[must_use]
    pub fn build_name(&self) -> String {
        format!("{} {}", self.environment, self.version)
    }
}

/// A named table of views, messages and commands, with nested namespaces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Namespace {
    #[serde(default)]
    pub views: BTreeMap<String, u8>,
    #[serde(default)]
    pub messages: BTreeMap<String, u8>,
    #[serde(default)]
    pub commands: BTreeMap<String, u8>,
    #[serde(default)]
    pub children: BTreeMap<String, Namespace>,
}

/// Root namespace of the game-state protocol.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GssProtocol {
    #[serde(default)]
    pub has_routed_multiple_message: bool,
    #[serde(flatten)]
    pub namespace: Namespace,
}

/// All loaded definition files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiftData {
    pub patches: Vec<Patch>,
    pub matrix_protocols: BTreeMap<u16, Namespace>,
    pub gss_protocols: BTreeMap<u16, GssProtocol>,
}

impl SiftData {
    /// Loads every definition file under `dir`.
    ///
    /// Patch files that fail to parse are logged and skipped; protocol files
    /// whose stem is not a version number are ignored.
    pub fn load(dir: impl AsRef<Path>) -> CatalogResult<Self> {
        let dir = dir.as_ref();
        let mut data = Self::default();

        for path in json_files(&dir.join("Patches"), true)? {
            match read_json::<Patch>(&path) {
                Ok(patch) => data.patches.push(patch),
                Err(err) => warn!(target: "peep::catalog", %err, "skipping patch file"),
            }
        }

        for path in json_files(&dir.join("Matrix"), false)? {
            if let Some(version) = version_stem(&path) {
                data.matrix_protocols.insert(version, read_json(&path)?);
            }
        }

        for path in json_files(&dir.join("GSS"), false)? {
            if let Some(version) = version_stem(&path) {
                data.gss_protocols.insert(version, read_json(&path)?);
            }
        }

        info!(
            target: "peep::catalog",
            dir = %dir.display(),
            patches = data.patches.len(),
            matrix = data.matrix_protocols.len(),
            gss = data.gss_protocols.len(),
            "loaded protocol definitions"
        );
        Ok(data)
    }

    /// Returns the selectable build names, in load order.
    #[must_use]
    pub fn build_names(&self) -> Vec<String> {
        self.patches.iter().map(Patch::build_name).collect()
    }

    /// Finds the patch whose build name equals `name`.
    #[must_use]
    pub fn patch_by_name(&self, name: &str) -> Option<&Patch> {
        self.patches.iter().find(|p| p.build_name() == name)
    }

    /// Returns the Matrix and game-state protocols for a build.
    pub fn protocols_for(&self, build: &str) -> CatalogResult<(&Patch, &Namespace, &GssProtocol)> {
        let patch = self
            .patch_by_name(build)
            .ok_or_else(|| CatalogError::UnknownBuild {
                name: build.to_string(),
            })?;
        let matrix = self
            .matrix_protocols
            .get(&patch.matrix_protocol_version)
            .ok_or(CatalogError::MissingProtocol {
                kind: "Matrix",
                version: patch.matrix_protocol_version,
            })?;
        let gss = self
            .gss_protocols
            .get(&patch.gss_protocol_version)
            .ok_or(CatalogError::MissingProtocol {
                kind: "GSS",
                version: patch.gss_protocol_version,
            })?;
        Ok((patch, matrix, gss))
    }
}

fn json_files(dir: &Path, recursive: bool) -> CatalogResult<Vec<std::path::PathBuf>> {
    let pattern = if recursive {
        dir.join("**").join("*.json")
    } else {
        dir.join("*.json")
    };
    let pattern = pattern.to_string_lossy().into_owned();
    let entries = glob::glob(&pattern).map_err(|err| CatalogError::Glob {
        pattern: pattern.clone(),
        message: err.to_string(),
    })?;

    let mut files = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) => files.push(path),
            Err(err) => {
                debug!(target: "peep::catalog", %err, "unreadable glob entry");
            }
        }
    }
    Ok(files)
}

fn version_stem(path: &Path) -> Option<u16> {
    path.file_stem()?.to_str()?.parse().ok()
}

pub(crate) fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> CatalogResult<T> {
    let text = fs::read_to_string(path).map_err(|err| CatalogError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    })?;
    serde_json::from_str(&text).map_err(|err| CatalogError::Json {
        path: path.display().to_string(),
        message: err.to_string(),
    })
}
