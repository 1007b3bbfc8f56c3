//! Display names for captured messages.

use std::fmt;

use catalog::MessageNames;
use wire::{resolve_header, Channel, Message, Server, CONTROL_REF_ID, MATRIX_REF_ID};

/// Handshake message kinds, tagged by their first four bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JackTag {
    Poke,
    Hehe,
    Hugg,
    Kiss,
    Abrt,
}

impl JackTag {
    pub const ALL: [Self; 5] = [Self::Poke, Self::Hehe, Self::Hugg, Self::Kiss, Self::Abrt];

    #[must_use]
    pub const fn bytes(self) -> &'static [u8; 4] {
        match self {
            Self::Poke => b"POKE",
            Self::Hehe => b"HEHE",
            Self::Hugg => b"HUGG",
            Self::Kiss => b"KISS",
            Self::Abrt => b"ABRT",
        }
    }

    #[must_use]
    pub fn from_payload(data: &[u8]) -> Option<Self> {
        let tag = data.get(..4)?;
        Self::ALL.into_iter().find(|kind| kind.bytes() == tag)
    }
}

impl fmt::Display for JackTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.bytes().iter().try_for_each(|&b| write!(f, "{}", char::from(b)))
    }
}

/// Human-readable name of `msg`.
///
/// Control and Matrix messages use their namespace names; GSS messages are
/// `"<controller>::<message>"`, with command names for client messages
/// outside the generic namespace. Handshake messages are named by their
/// four-byte tag. Empty when nothing can be read.
pub fn message_name(msg: &Message, names: &impl MessageNames) -> String {
    let data = msg.data();
    if msg.server() == Server::Jack {
        return match JackTag::from_payload(data) {
            Some(tag) => tag.to_string(),
            None => data
                .get(..4)
                .map(|raw| raw.iter().map(|&b| char::from(b)).collect())
                .unwrap_or_default(),
        };
    }

    let header = resolve_header(msg);
    if header.truncated {
        return String::new();
    }
    match (header.channel, header.controller_id) {
        (Some(Channel::Control), _) => names.message_name(CONTROL_REF_ID, header.message_id),
        (Some(Channel::Matrix), _) => names.message_name(MATRIX_REF_ID, header.message_id),
        (Some(_), Some(controller_id)) => {
            let view = names.controller_name(controller_id);
            let name = if msg.from_server || header.is_generic_namespace() {
                names.message_name(controller_id, header.message_id)
            } else {
                names.command_name(controller_id, header.message_id)
            };
            format!("{view}::{name}")
        }
        _ => String::new(),
    }
}
