//! Declarative message filters.
//!
//! A [`PacketFilter`] is evaluated against every message of a session with a
//! full linear scan. The result lists message ids in ascending order and is
//! identical for identical inputs, sharded or not.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::trace;
use wire::{
    resolve_header, view_matches, Channel, Message, Server, CONTROL_REF_ID, MATRIX_REF_ID,
};

use crate::session::Session;

/// Message or command id selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdMatch {
    Exact(u8),
    /// Any id in the entry's namespace.
    Any,
}

impl IdMatch {
    /// Interprets the numeric form used by filter dialogs: `-1` is the
    /// wildcard, `0..=255` an exact id, anything else is absent.
    #[must_use]
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            -1 => Some(Self::Any),
            _ => u8::try_from(raw).ok().map(Self::Exact),
        }
    }

    #[must_use]
    pub const fn matches(self, id: u8) -> bool {
        match self {
            Self::Exact(expected) => expected == id,
            Self::Any => true,
        }
    }
}

/// One `(view, message, command)` filter entry.
///
/// `view_id` is a controller id, or the Control (`-2`) / Matrix (`-1`)
/// namespace sentinel. Server messages are checked against `msg_id`, client
/// GSS commands against `cmd_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgFilter {
    pub view_id: i32,
    #[serde(default)]
    pub msg_id: Option<IdMatch>,
    #[serde(default)]
    pub cmd_id: Option<IdMatch>,
}

impl MsgFilter {
    /// Returns `true` if this entry selects `msg`.
    ///
    /// Messages whose header could not be fully resolved never match.
    #[must_use]
    pub fn matches(&self, msg: &Message) -> bool {
        let header = resolve_header(msg);
        let (Some(controller_id), Some(channel)) = (header.controller_id, header.channel) else {
            return false;
        };
        if header.truncated || !view_matches(self.view_id, controller_id) {
            return false;
        }
        let selector = if !channel.is_gss() || msg.from_server {
            self.msg_id
        } else {
            self.cmd_id
        };
        selector.is_some_and(|s| s.matches(header.message_id))
    }
}

/// Channels a filter lets through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelFlags {
    /// Handshake messages.
    pub jack: bool,
    pub control: bool,
    pub matrix: bool,
    pub reliable_gss: bool,
    pub unreliable_gss: bool,
}

impl Default for ChannelFlags {
    fn default() -> Self {
        Self::all()
    }
}

impl ChannelFlags {
    #[must_use]
    pub const fn all() -> Self {
        Self {
            jack: true,
            control: true,
            matrix: true,
            reliable_gss: true,
            unreliable_gss: true,
        }
    }

    #[must_use]
    pub const fn none() -> Self {
        Self {
            jack: false,
            control: false,
            matrix: false,
            reliable_gss: false,
            unreliable_gss: false,
        }
    }

    #[must_use]
    pub const fn allows(&self, msg: &Message) -> bool {
        match msg.channel() {
            None => self.jack,
            Some(Channel::Control) => self.control,
            Some(Channel::Matrix) => self.matrix,
            Some(Channel::ReliableGss) => self.reliable_gss,
            Some(Channel::UnreliableGss) => self.unreliable_gss,
        }
    }
}

/// Direction, channel and id filter for one session.
///
/// The default lets every message through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacketFilter {
    pub from_server: bool,
    pub from_client: bool,
    pub channels: ChannelFlags,
    pub msg_filters: Vec<MsgFilter>,
    /// Name of the session the filter applies to.
    pub session_name: String,
}

impl Default for PacketFilter {
    fn default() -> Self {
        Self {
            from_server: true,
            from_client: true,
            channels: ChannelFlags::all(),
            msg_filters: Vec::new(),
            session_name: String::new(),
        }
    }
}

impl PacketFilter {
    #[must_use]
    pub fn for_session(name: impl Into<String>) -> Self {
        Self {
            session_name: name.into(),
            ..Self::default()
        }
    }

    /// Resets to "match everything" and clears the target session.
    pub fn set_defaults(&mut self) {
        *self = Self::default();
    }

    /// Adds an entry for a message picked from a session view.
    ///
    /// GSS entries filter `view_id` by message id when `from_server` is set
    /// and by command id otherwise; Control and Matrix entries use their
    /// namespace sentinel as the view.
    pub fn add_filter(&mut self, channel: Channel, from_server: bool, view_id: i32, id: IdMatch) {
        let entry = if channel.is_gss() {
            MsgFilter {
                view_id,
                msg_id: from_server.then_some(id),
                cmd_id: (!from_server).then_some(id),
            }
        } else {
            MsgFilter {
                view_id: if channel == Channel::Control {
                    CONTROL_REF_ID
                } else {
                    MATRIX_REF_ID
                },
                msg_id: Some(id),
                cmd_id: None,
            }
        };
        self.msg_filters.push(entry);
    }

    /// Returns `true` if `msg` passes the direction, channel and id checks.
    #[must_use]
    pub fn matches(&self, msg: &Message) -> bool {
        let from_check =
            (msg.from_server && self.from_server) || (!msg.from_server && self.from_client);
        if !from_check || !self.channels.allows(msg) {
            return false;
        }
        if self.msg_filters.is_empty() {
            return true;
        }
        msg.server() == Server::Game && self.msg_filters.iter().any(|entry| entry.matches(msg))
    }
}

/// Returns the ids of every message in `session` that `filter` selects.
#[must_use]
pub fn apply_filter(session: &Session, filter: &PacketFilter) -> Vec<usize> {
    let started = Instant::now();
    let ids = filter_slice(session.messages(), filter);
    trace!(
        target: "peep::session",
        messages = session.len(),
        matched = ids.len(),
        elapsed_us = started.elapsed().as_micros() as u64,
        "applied filter"
    );
    ids
}

/// Same as [`apply_filter`], scanning `shards` contiguous chunks in parallel.
///
/// Shards are re-joined in index order, so the output equals the
/// single-threaded result. The shard count is capped at half the number of
/// messages.
#[must_use]
pub fn apply_filter_sharded(session: &Session, filter: &PacketFilter, shards: usize) -> Vec<usize> {
    let messages = session.messages();
    let shards = shards.min(messages.len() / 2);
    if shards <= 1 {
        return apply_filter(session, filter);
    }

    let started = Instant::now();
    let chunk = messages.len().div_ceil(shards);
    let ids: Vec<usize> = std::thread::scope(|scope| {
        let workers: Vec<_> = messages
            .chunks(chunk)
            .map(|part| scope.spawn(move || filter_slice(part, filter)))
            .collect();
        workers
            .into_iter()
            .flat_map(|worker| match worker.join() {
                Ok(ids) => ids,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    });
    trace!(
        target: "peep::session",
        messages = messages.len(),
        shards,
        matched = ids.len(),
        elapsed_us = started.elapsed().as_micros() as u64,
        "applied sharded filter"
    );
    ids
}

fn filter_slice(messages: &[Message], filter: &PacketFilter) -> Vec<usize> {
    messages
        .iter()
        .filter(|msg| filter.matches(msg))
        .map(|msg| msg.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gss(controller: u8, message_id: u8, from_server: bool) -> Message {
        let mut data = vec![controller, 0, 0, 0, 0, 0, 0, 0, message_id];
        data.push(0xEE);
        Message::game(0, Channel::ReliableGss, from_server, 0, data)
    }

    #[test]
    fn id_match_from_raw() {
        assert_eq!(IdMatch::from_raw(-1), Some(IdMatch::Any));
        assert_eq!(IdMatch::from_raw(12), Some(IdMatch::Exact(12)));
        assert_eq!(IdMatch::from_raw(i32::MIN), None);
        assert_eq!(IdMatch::from_raw(256), None);
    }

    #[test]
    fn default_matches_everything() {
        let filter = PacketFilter::default();
        assert!(filter.matches(&Message::jack(0, true, 0, b"HEHE".to_vec())));
        assert!(filter.matches(&gss(3, 1, false)));
        assert!(filter.matches(&Message::game(0, Channel::Control, true, 0, vec![])));
    }

    #[test]
    fn direction_flags() {
        let filter = PacketFilter {
            from_client: false,
            ..PacketFilter::default()
        };
        assert!(filter.matches(&gss(3, 1, true)));
        assert!(!filter.matches(&gss(3, 1, false)));
    }

    #[test]
    fn channel_flags() {
        let filter = PacketFilter {
            channels: ChannelFlags {
                matrix: true,
                ..ChannelFlags::none()
            },
            ..PacketFilter::default()
        };
        assert!(filter.matches(&Message::game(0, Channel::Matrix, true, 0, vec![1])));
        assert!(!filter.matches(&gss(3, 1, true)));
        assert!(!filter.matches(&Message::jack(0, true, 0, b"POKE".to_vec())));
    }

    #[test]
    fn gss_entry_uses_msg_id_for_server_and_cmd_id_for_client() {
        let mut filter = PacketFilter::default();
        filter.add_filter(Channel::ReliableGss, true, 30, IdMatch::Exact(50));
        filter.add_filter(Channel::ReliableGss, false, 30, IdMatch::Exact(51));

        assert!(filter.matches(&gss(30, 50, true)));
        assert!(!filter.matches(&gss(30, 50, false)));
        assert!(filter.matches(&gss(30, 51, false)));
        assert!(!filter.matches(&gss(30, 51, true)));
        assert!(!filter.matches(&gss(31, 50, true)));
    }

    #[test]
    fn control_and_matrix_entries() {
        let mut filter = PacketFilter::default();
        filter.add_filter(Channel::Control, false, 99, IdMatch::Exact(4));
        filter.add_filter(Channel::Matrix, true, 99, IdMatch::Any);
        assert_eq!(filter.msg_filters[0].view_id, CONTROL_REF_ID);
        assert_eq!(filter.msg_filters[1].view_id, MATRIX_REF_ID);

        assert!(filter.matches(&Message::game(0, Channel::Control, false, 0, vec![4])));
        assert!(!filter.matches(&Message::game(0, Channel::Control, false, 0, vec![5])));
        assert!(filter.matches(&Message::game(0, Channel::Matrix, false, 0, vec![77])));
        assert!(!filter.matches(&gss(0, 4, true)));
    }

    #[test]
    fn jack_messages_never_match_entries() {
        let mut filter = PacketFilter::default();
        filter.add_filter(Channel::Matrix, true, 0, IdMatch::Any);
        assert!(!filter.matches(&Message::jack(0, true, 0, b"KISS".to_vec())));
    }

    #[test]
    fn truncated_header_never_matches_entry() {
        let mut filter = PacketFilter::default();
        filter.add_filter(Channel::ReliableGss, true, 7, IdMatch::Any);
        let short = Message::game(0, Channel::ReliableGss, true, 0, vec![7, 0, 0]);
        assert!(!filter.matches(&short));

        let empty_control = Message::game(0, Channel::Control, true, 0, vec![]);
        filter.add_filter(Channel::Control, true, 0, IdMatch::Any);
        assert!(!filter.matches(&empty_control));
    }

    #[test]
    fn set_defaults_resets_everything() {
        let mut filter = PacketFilter::for_session("cap 0");
        filter.from_server = false;
        filter.add_filter(Channel::Matrix, true, 0, IdMatch::Any);
        filter.set_defaults();
        assert_eq!(filter, PacketFilter::default());
    }

    #[test]
    fn oversized_shard_counts_fall_back_to_a_plain_scan() {
        let mut builder = crate::session::SessionBuilder::new();
        for i in 0..9u8 {
            builder.push_game(Channel::Matrix, i % 2 == 0, u64::from(i), vec![i]);
        }
        let (session, _) = builder.build();
        let filter = PacketFilter {
            from_client: false,
            ..PacketFilter::default()
        };

        let expected = apply_filter(&session, &filter);
        assert_eq!(expected, vec![0, 2, 4, 6, 8]);
        for shards in [4, 5, 9, 1000, usize::MAX / 2 + 1, usize::MAX] {
            assert_eq!(apply_filter_sharded(&session, &filter, shards), expected);
        }

        let (empty, _) = crate::session::SessionBuilder::new().build();
        assert!(apply_filter_sharded(&empty, &filter, usize::MAX).is_empty());
    }
}
