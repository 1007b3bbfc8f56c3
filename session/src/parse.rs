//! Per-session message body parsing.

use catalog::{CatalogError, CodecCache, CodecKey, DecodedField, MessageNames, MsgSrc, MsgType};
use serde::Serialize;
use tracing::{debug, trace, warn};
use wire::{resolve_header, Channel, Message, Server, WireError};

use crate::naming::message_name;
use crate::session::Session;

/// Parse outcome for one message; one slot per message, in id order.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseSlot {
    /// Handshake message, or a sub-message whose entity is unknown.
    Skipped,
    /// The header could not be resolved.
    Malformed(WireError),
    /// No codec is registered for the message type.
    Unknown(CodecKey),
    Decoded {
        codec: String,
        consumed: usize,
        fields: Vec<DecodedField>,
    },
    /// A codec was found but rejected the body.
    Failed { codec: String, error: CatalogError },
}

impl ParseSlot {
    #[must_use]
    pub const fn is_decoded(&self) -> bool {
        matches!(self, Self::Decoded { .. })
    }
}

/// Codec lookup key for a game message.
#[must_use]
pub fn codec_key(msg: &Message) -> Option<CodecKey> {
    let header = resolve_header(msg);
    let msg_type = match header.channel? {
        Channel::Control => MsgType::Control,
        Channel::Matrix => MsgType::Matrix,
        Channel::ReliableGss | Channel::UnreliableGss => MsgType::Gss,
    };
    Some(CodecKey::new(
        msg_type,
        MsgSrc::from_server(!header.is_command),
        header.message_id,
        header.controller_id?,
    ))
}

/// Parses one message with codecs from `cache`.
pub fn parse_message(msg: &Message, cache: &mut CodecCache) -> ParseSlot {
    if msg.server() == Server::Jack || msg.sub_entity_id() == Some(0) {
        return ParseSlot::Skipped;
    }
    let header = match resolve_header(msg).complete() {
        Ok(header) => header,
        Err(err) => {
            debug!(target: "peep::parse", message = msg.id, error = %err, "unresolvable header");
            return ParseSlot::Malformed(err);
        }
    };
    let Some(key) = codec_key(msg) else {
        return ParseSlot::Skipped;
    };
    let Some(codec) = cache.get(key) else {
        return ParseSlot::Unknown(key);
    };

    let body = header.body(msg.data());
    match codec.unpack(body) {
        Ok(consumed) => {
            trace!(
                target: "peep::parse",
                message = msg.id,
                codec = codec.name(),
                %key,
                consumed,
                len = body.len(),
                "parsed message"
            );
            ParseSlot::Decoded {
                codec: codec.name().to_string(),
                consumed,
                fields: codec.fields(),
            }
        }
        Err(error) => {
            warn!(
                target: "peep::parse",
                message = msg.id,
                codec = codec.name(),
                %key,
                error = %error,
                "failed to unpack message"
            );
            ParseSlot::Failed {
                codec: codec.name().to_string(),
                error,
            }
        }
    }
}

/// Parses every message of `session`.
///
/// The result has exactly one slot per message so that slot `i` belongs to
/// message id `i`.
pub fn parse_session(session: &Session, cache: &mut CodecCache) -> Vec<ParseSlot> {
    let slots: Vec<ParseSlot> = session
        .messages()
        .iter()
        .map(|msg| parse_message(msg, cache))
        .collect();
    debug!(
        target: "peep::parse",
        messages = slots.len(),
        decoded = slots.iter().filter(|s| s.is_decoded()).count(),
        generation = cache.generation(),
        "parsed session"
    );
    slots
}

/// Flat summary of a message and its parse result, for export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageDoc {
    pub index: usize,
    pub from_server: bool,
    pub time_ms: u64,
    pub channel: Option<String>,
    pub controller_id: Option<i32>,
    pub message_id: u8,
    pub entity_id: u64,
    pub size: usize,
    pub name: String,
    pub parsed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codec: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<DecodedField>,
}

impl MessageDoc {
    #[must_use]
    pub fn new(msg: &Message, slot: Option<&ParseSlot>, names: &impl MessageNames) -> Self {
        let header = resolve_header(msg);
        let (codec, fields) = match slot {
            Some(ParseSlot::Decoded { codec, fields, .. }) => (Some(codec.clone()), fields.clone()),
            Some(ParseSlot::Failed { codec, .. }) => (Some(codec.clone()), Vec::new()),
            _ => (None, Vec::new()),
        };
        Self {
            index: msg.id,
            from_server: msg.from_server,
            time_ms: msg.time_ms,
            channel: msg.channel().map(|c| c.to_string()),
            controller_id: header.controller_id,
            message_id: header.message_id,
            entity_id: header.entity_id,
            size: msg.data().len(),
            name: message_name(msg, names),
            parsed: slot.is_some_and(ParseSlot::is_decoded),
            codec,
            fields,
        }
    }
}
