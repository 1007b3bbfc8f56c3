//! Inspection helpers behind the `peep-tools` command line.
//!
//! This crate turns the library layers into readable reports:
//!
//! - Summarize replay files (header, keyframes, frame sizes)
//! - List builds and controller namespaces from protocol definitions
//! - Parse filter entries and print the messages a filter keeps
//!
//! # Design Principles
//!
//! - **First-class tooling** - These tools are part of the product, not afterthoughts.
//! - **Human-readable output** - Every report has a JSON form and a pretty form.

use std::fmt::Write as _;
use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use catalog::{
    CodecDefinitions, CodecRegistry, FieldValue, MessageNames, ProtocolCatalog, SharedRegistry,
    SiftData,
};
use replay::{Keyframe, ReplayFile};
use serde::Serialize;
use session::{IdMatch, MessageDoc, PacketFilter, SessionEntry};
use wire::Channel;

/// Summary of a decoded replay file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayReport {
    pub compressed: bool,
    pub protocol_version: i32,
    pub streaming_protocol: u16,
    pub zone_id: i32,
    pub build_version: String,
    pub character_name: String,
    pub local_date: String,
    pub keyframes: usize,
    pub frames: usize,
    pub leading_bytes: usize,
    pub largest_frame: usize,
    pub frames_per_keyframe: Vec<usize>,
}

/// Collects the header fields and frame statistics of a replay.
#[must_use]
pub fn inspect_replay(file: &ReplayFile) -> ReplayReport {
    let description = &file.header.description;
    let meta = &file.header.meta;
    ReplayReport {
        compressed: file.compressed,
        protocol_version: description.protocol_version,
        streaming_protocol: description.streaming_protocol(),
        zone_id: meta.zone_id,
        build_version: meta.build_version.clone(),
        character_name: meta.character_name.clone(),
        local_date: meta.local_date.clone(),
        keyframes: file.keyframes.len(),
        frames: file.frame_count(),
        leading_bytes: file.leading.len(),
        largest_frame: file
            .frames()
            .map(|(_, frame)| frame.data.len())
            .max()
            .unwrap_or(0),
        frames_per_keyframe: file.keyframes.iter().map(Keyframe::len).collect(),
    }
}

#[must_use]
pub fn format_replay_pretty(report: &ReplayReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "protocol: {} (streaming 0x{:04x}) compressed: {}",
        report.protocol_version, report.streaming_protocol, report.compressed
    );
    let _ = writeln!(
        out,
        "build: {} zone: {} character: {} date: {}",
        report.build_version, report.zone_id, report.character_name, report.local_date
    );
    let _ = writeln!(
        out,
        "keyframes: {} frames: {} largest frame: {} bytes",
        report.keyframes, report.frames, report.largest_frame
    );
    if report.leading_bytes > 0 {
        let _ = writeln!(out, "leading bytes: {}", report.leading_bytes);
    }
    for (index, count) in report.frames_per_keyframe.iter().enumerate() {
        let _ = writeln!(out, "  keyframe {index}: {count} frames");
    }
    out.trim_end().to_string()
}

/// A controller namespace as listed by `catalog`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControllerSummary {
    pub id: i32,
    pub name: String,
    pub messages: usize,
    pub commands: usize,
}

/// Builds known to a definition directory, plus the selected build's controllers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogReport {
    pub builds: Vec<String>,
    pub selected: Option<String>,
    pub matrix_protocol: Option<u16>,
    pub gss_protocol: Option<u16>,
    pub controllers: Vec<ControllerSummary>,
}

/// Lists the builds in `data` and, when `build` is given, its controllers.
pub fn inspect_catalog(data: &SiftData, build: Option<&str>) -> Result<CatalogReport> {
    let mut report = CatalogReport {
        builds: data.build_names(),
        selected: None,
        matrix_protocol: None,
        gss_protocol: None,
        controllers: Vec::new(),
    };
    if let Some(build) = build {
        let catalog = ProtocolCatalog::from_sift(data, build)
            .with_context(|| format!("select build {build}"))?;
        report.selected = Some(catalog.build().to_string());
        report.matrix_protocol = Some(catalog.matrix_protocol_version());
        report.gss_protocol = Some(catalog.gss_protocol_version());
        report.controllers = catalog
            .controllers()
            .map(|c| ControllerSummary {
                id: c.id,
                name: c.name.clone(),
                messages: c.messages.len(),
                commands: c.commands.len(),
            })
            .collect();
    }
    Ok(report)
}

#[must_use]
pub fn format_catalog_pretty(report: &CatalogReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "builds:");
    for build in &report.builds {
        let _ = writeln!(out, "  {build}");
    }
    if let Some(selected) = &report.selected {
        let _ = writeln!(
            out,
            "selected: {selected} (matrix {}, gss {})",
            report.matrix_protocol.unwrap_or_default(),
            report.gss_protocol.unwrap_or_default()
        );
        for controller in &report.controllers {
            let _ = writeln!(
                out,
                "  {:>5} {} ({} messages, {} commands)",
                controller.id, controller.name, controller.messages, controller.commands
            );
        }
    }
    out.trim_end().to_string()
}

/// Loads the protocol catalog for `build`, or an empty one without a definition directory.
pub fn load_catalog(sift_dir: Option<&Path>, build: &str) -> Result<ProtocolCatalog> {
    let Some(dir) = sift_dir else {
        return Ok(ProtocolCatalog::default());
    };
    let data = SiftData::load(dir).with_context(|| format!("load definitions {}", dir.display()))?;
    ProtocolCatalog::from_sift(&data, build).with_context(|| format!("select build {build}"))
}

/// Loads a codec registry from a schema definition file.
pub fn load_registry(path: &Path) -> Result<SharedRegistry> {
    let defs = CodecDefinitions::load(path)
        .with_context(|| format!("load codec definitions {}", path.display()))?;
    let registry = CodecRegistry::from_definitions(&defs).context("build codec registry")?;
    Ok(SharedRegistry::new(registry))
}

/// One filter entry as given on the command line:
/// `<channel>:<server|client>:<view>:<id|*>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterEntry {
    pub channel: Channel,
    pub from_server: bool,
    pub view_id: i32,
    pub id: IdMatch,
}

impl FilterEntry {
    pub fn apply(self, filter: &mut PacketFilter) {
        filter.add_filter(self.channel, self.from_server, self.view_id, self.id);
    }
}

impl FromStr for FilterEntry {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        let [channel, direction, view, id] = parts.as_slice() else {
            bail!("expected <channel>:<server|client>:<view>:<id|*>, got {s:?}");
        };
        let from_server = match direction.to_ascii_lowercase().as_str() {
            "server" | "s" => true,
            "client" | "c" => false,
            other => bail!("unknown direction {other:?}"),
        };
        Ok(Self {
            channel: parse_channel(channel)?,
            from_server,
            view_id: view
                .parse()
                .with_context(|| format!("invalid view id {view:?}"))?,
            id: parse_id_match(id)?,
        })
    }
}

/// Parses a channel by name: `control`, `matrix`, `rgss` or `ugss`.
pub fn parse_channel(s: &str) -> Result<Channel> {
    match s.to_ascii_lowercase().as_str() {
        "control" => Ok(Channel::Control),
        "matrix" => Ok(Channel::Matrix),
        "rgss" | "reliable" => Ok(Channel::ReliableGss),
        "ugss" | "unreliable" => Ok(Channel::UnreliableGss),
        other => Err(anyhow!("unknown channel {other:?}")),
    }
}

/// Parses `*`, `any` or a numeric id (where `-1` also means any).
pub fn parse_id_match(s: &str) -> Result<IdMatch> {
    if s == "*" || s.eq_ignore_ascii_case("any") {
        return Ok(IdMatch::Any);
    }
    let raw: i32 = s.parse().with_context(|| format!("invalid id {s:?}"))?;
    IdMatch::from_raw(raw).ok_or_else(|| anyhow!("id {raw} out of range"))
}

/// Export rows for the messages `ids` of a loaded session.
///
/// Ids outside the session are skipped.
pub fn message_docs(
    entry: &SessionEntry,
    ids: &[usize],
    names: &impl MessageNames,
) -> Vec<MessageDoc> {
    ids.iter()
        .filter_map(|&id| {
            let msg = entry.session.get(id)?;
            Some(MessageDoc::new(msg, entry.parsed.get(id), names))
        })
        .collect()
}

#[must_use]
pub fn format_docs_pretty(docs: &[MessageDoc]) -> String {
    let mut out = String::new();
    for doc in docs {
        let direction = if doc.from_server { "S>C" } else { "C>S" };
        let channel = doc.channel.as_deref().unwrap_or("Jack");
        let _ = writeln!(
            out,
            "#{:<6} {:>8}ms {direction} {channel:<7} {} ({} bytes)",
            doc.index, doc.time_ms, doc.name, doc.size
        );
        if let Some(codec) = &doc.codec {
            let _ = writeln!(out, "        codec: {codec}");
        }
        for field in &doc.fields {
            let _ = writeln!(out, "        {} = {}", field.name, format_value(&field.value));
        }
    }
    out.trim_end().to_string()
}

fn format_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Bool(v) => v.to_string(),
        FieldValue::UInt(v) => v.to_string(),
        FieldValue::Int(v) => v.to_string(),
        FieldValue::Float(v) => v.to_string(),
        FieldValue::Text(v) => format!("{v:?}"),
        FieldValue::Bytes(bytes) => bytes.iter().fold(String::new(), |mut acc, b| {
            let _ = write!(acc, "{b:02x}");
            acc
        }),
    }
}
