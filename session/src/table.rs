//! The set of loaded sessions.

use std::collections::BTreeMap;
use std::path::Path;

use catalog::{CodecCache, SharedRegistry};
use replay::{read_replay, ReplayLimits};
use tracing::{debug, info, warn};

use crate::config::PeepConfig;
use crate::error::{SessionError, SessionResult};
use crate::filter::{apply_filter, apply_filter_sharded, PacketFilter};
use crate::import::session_from_replay;
use crate::parse::{parse_session, ParseSlot};
use crate::session::{LoadReport, Session, SessionBuilder};

/// A loaded session and everything derived from it.
#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub name: String,
    pub session: Session,
    pub report: LoadReport,
    /// Parse slots, empty until the session is parsed.
    pub parsed: Vec<ParseSlot>,
}

impl SessionEntry {
    #[must_use]
    pub fn is_parsed(&self) -> bool {
        !self.session.is_empty() && self.parsed.len() == self.session.len()
    }
}

/// Sessions keyed by unique display name.
#[derive(Debug)]
pub struct SessionTable {
    config: PeepConfig,
    registry: Option<SharedRegistry>,
    sessions: BTreeMap<String, SessionEntry>,
}

impl SessionTable {
    #[must_use]
    pub fn new(config: PeepConfig) -> Self {
        Self {
            config,
            registry: None,
            sessions: BTreeMap::new(),
        }
    }

    /// Attaches the codec registry used for parsing.
    #[must_use]
    pub fn with_registry(mut self, registry: SharedRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    #[must_use]
    pub const fn config(&self) -> &PeepConfig {
        &self.config
    }

    /// Adds sessions named `"<name> <index>"`.
    ///
    /// Names already present are skipped. A GSS protocol version that differs
    /// from the configured one is logged but accepted. Returns the names that
    /// were added.
    pub fn add_sessions(
        &mut self,
        builders: impl IntoIterator<Item = SessionBuilder>,
        name: &str,
    ) -> Vec<String> {
        let mut added = Vec::new();
        for (idx, builder) in builders.into_iter().enumerate() {
            let session_name = format!("{name} {idx}");
            if self.sessions.contains_key(&session_name) {
                warn!(target: "peep::session", session = %session_name, "session already loaded, skipping");
                continue;
            }

            let (session, report) = builder.split_routed(self.config.split_routed).build();
            let version = session.gss_protocol_version();
            if let Some(expected) = self.config.expected_gss_protocol {
                if version != expected {
                    warn!(
                        target: "peep::session",
                        session = %session_name,
                        version,
                        expected,
                        "GSS protocol version mismatch"
                    );
                }
            }

            let mut entry = SessionEntry {
                name: session_name.clone(),
                session,
                report,
                parsed: Vec::new(),
            };
            if self.config.parse_on_load {
                if let Some(registry) = &self.registry {
                    entry.parsed = parse_session(&entry.session, &mut CodecCache::new(registry));
                }
            }
            info!(
                target: "peep::session",
                session = %session_name,
                messages = entry.report.messages,
                sub_messages = entry.report.sub_messages,
                "added session"
            );
            self.sessions.insert(session_name.clone(), entry);
            added.push(session_name);
        }
        added
    }

    /// Imports a replay file from disk as session `"NSR <file stem> 0"`.
    pub fn load_replay(
        &mut self,
        path: impl AsRef<Path>,
        limits: &ReplayLimits,
    ) -> SessionResult<Vec<String>> {
        let path = path.as_ref();
        info!(target: "peep::session", path = %path.display(), "loading replay");
        let file = read_replay(path, limits)?;
        debug!(
            target: "peep::session",
            zone = file.header.meta.zone_id,
            build = %file.header.meta.build_version,
            character = %file.header.meta.character_name,
            "replay meta"
        );
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(self.add_sessions([session_from_replay(&file)], &format!("NSR {stem}")))
    }

    /// Removes a session; returns it if it was loaded.
    pub fn remove(&mut self, name: &str) -> Option<SessionEntry> {
        let entry = self.sessions.remove(name);
        if entry.is_some() {
            info!(target: "peep::session", session = name, "removed session");
        }
        entry
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SessionEntry> {
        self.sessions.get(name)
    }

    /// Session names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sessions.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Filters the session named by `filter.session_name`.
    pub fn apply_filter(&self, filter: &PacketFilter) -> SessionResult<Vec<usize>> {
        let Some(entry) = self.sessions.get(&filter.session_name) else {
            warn!(target: "peep::session", session = %filter.session_name, "no session to filter");
            return Err(SessionError::UnknownSession {
                name: filter.session_name.clone(),
            });
        };
        let shards = self.config.shards();
        Ok(if shards > 1 {
            apply_filter_sharded(&entry.session, filter, shards)
        } else {
            apply_filter(&entry.session, filter)
        })
    }

    /// Parses every session that is not parsed yet, one thread per session.
    ///
    /// Returns the number of sessions parsed; zero without a registry.
    pub fn parse_all(&mut self) -> usize {
        let Some(registry) = &self.registry else {
            debug!(target: "peep::parse", "no codec registry, nothing parsed");
            return 0;
        };
        let pending: Vec<&mut SessionEntry> = self
            .sessions
            .values_mut()
            .filter(|entry| !entry.is_parsed())
            .collect();
        let count = pending.len();
        std::thread::scope(|scope| {
            for entry in pending {
                scope.spawn(move || {
                    let mut cache = CodecCache::new(registry);
                    entry.parsed = parse_session(&entry.session, &mut cache);
                });
            }
        });
        info!(target: "peep::parse", sessions = count, "parsed sessions");
        count
    }

    /// Drops all parse results and parses again, e.g. after a codec reload.
    pub fn reparse(&mut self) -> usize {
        for entry in self.sessions.values_mut() {
            entry.parsed.clear();
        }
        self.parse_all()
    }
}
