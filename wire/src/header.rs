//! Protocol header resolution for captured messages.

use cursor::ByteReader;

use crate::error::{WireError, WireResult};
use crate::message::{Channel, Message, Transport};

/// Synthetic controller id for the Control channel namespace.
pub const CONTROL_REF_ID: i32 = -2;

/// Synthetic controller id for the Matrix channel namespace.
pub const MATRIX_REF_ID: i32 = -1;

/// Controller id of the generic game-state namespace.
pub const GENERIC_VIEW_ID: i32 = 0;

/// Second controller id that aliases the generic namespace.
pub const GENERIC_VIEW_ALIAS: i32 = 251;

/// Header size of a game-state message: 8-byte controller/entity field + message id.
pub const GSS_HEADER_LEN: usize = 9;

/// Resolved interpretation of a message's leading bytes.
///
/// Computed on demand and never stored. When `truncated` is set the payload
/// was too short for the selected layout and `controller_id` / `message_id`
/// are best-effort values that must not be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    /// Namespace id; the negative sentinels mark Control and Matrix, `None` marks jack.
    pub controller_id: Option<i32>,
    /// Message id for server messages, command id for client GSS commands.
    /// Zero for jack messages.
    pub message_id: u8,
    /// 56-bit entity id (0 when not applicable).
    pub entity_id: u64,
    /// `true` for client-to-server commands.
    pub is_command: bool,
    /// Game channel, `None` for jack messages.
    pub channel: Option<Channel>,
    /// Number of leading payload bytes that belong to the header.
    pub header_len: usize,
    /// The payload was shorter than the header layout. `controller_id`,
    /// `message_id` and `entity_id` are then unreliable; filters never match
    /// such a header and [`complete`](Self::complete) rejects it.
    pub truncated: bool,
    needed: usize,
    available: usize,
}

impl MessageHeader {
    /// Returns the header, or [`WireError::TruncatedMessage`] if resolution was partial.
    pub const fn complete(self) -> WireResult<Self> {
        if self.truncated {
            return Err(WireError::TruncatedMessage {
                needed: self.needed,
                available: self.available,
            });
        }
        Ok(self)
    }

    /// Returns the payload bytes that follow the header.
    #[must_use]
    pub fn body<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        data.get(self.header_len..).unwrap_or(&[])
    }

    /// Returns `true` if the controller id belongs to the generic namespace.
    #[must_use]
    pub fn is_generic_namespace(&self) -> bool {
        matches!(
            self.controller_id,
            Some(GENERIC_VIEW_ID | GENERIC_VIEW_ALIAS)
        )
    }

    fn new(
        channel: Option<Channel>,
        is_command: bool,
        needed: usize,
        available: usize,
    ) -> Self {
        Self {
            controller_id: None,
            message_id: 0,
            entity_id: 0,
            is_command,
            channel,
            header_len: needed.min(available),
            truncated: available < needed,
            needed,
            available,
        }
    }
}

/// Returns `true` if a filter view id selects `controller_id`.
///
/// View `0` also matches controller `251`; both name the generic namespace.
#[must_use]
pub const fn view_matches(view_id: i32, controller_id: i32) -> bool {
    view_id == controller_id
        || (view_id == GENERIC_VIEW_ID
            && (controller_id == GENERIC_VIEW_ID || controller_id == GENERIC_VIEW_ALIAS))
}

/// Resolves the protocol header of a captured message.
///
/// Rules are applied in priority order: sub-messages, game-state channels,
/// Control/Matrix channels, then handshake messages. The payload is never
/// read out of bounds; short payloads produce a header with `truncated` set.
#[must_use]
pub fn resolve_header(msg: &Message) -> MessageHeader {
    let data = msg.data();
    let is_command = !msg.from_server;

    match msg.transport {
        Transport::Sub {
            channel, entity_id, ..
        } => {
            let mut header = MessageHeader::new(Some(channel), is_command, 1, data.len());
            header.controller_id = Some(i32::from((entity_id & 0xFF) as u8));
            header.entity_id = entity_id >> 8;
            header.message_id = data.first().copied().unwrap_or(0);
            header
        }
        Transport::Game { channel, .. } if channel.is_gss() => {
            let mut header =
                MessageHeader::new(Some(channel), is_command, GSS_HEADER_LEN, data.len());
            header.controller_id = data.first().map(|&id| i32::from(id));
            let mut reader = ByteReader::new(data);
            if let Ok(raw) = reader.read_u64() {
                header.entity_id = raw >> 8;
            }
            header.message_id = data.get(8).copied().unwrap_or(0);
            header
        }
        Transport::Game { channel, .. } => {
            let mut header = MessageHeader::new(Some(channel), is_command, 1, data.len());
            header.controller_id = Some(if channel == Channel::Control {
                CONTROL_REF_ID
            } else {
                MATRIX_REF_ID
            });
            header.message_id = data.first().copied().unwrap_or(0);
            header
        }
        Transport::Jack => MessageHeader::new(None, is_command, 0, data.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gss(data: Vec<u8>, from_server: bool) -> Message {
        Message::game(0, Channel::ReliableGss, from_server, 0, data)
    }

    #[test]
    fn gss_header_fields() {
        let msg = gss(vec![0x05, 0, 0, 0, 0, 0, 0, 0, 0x2A, 0xEE], true);
        let header = resolve_header(&msg);
        assert_eq!(header.controller_id, Some(5));
        assert_eq!(header.message_id, 0x2A);
        assert_eq!(header.entity_id, 0);
        assert_eq!(header.header_len, GSS_HEADER_LEN);
        assert!(!header.truncated);
        assert!(!header.is_command);
        assert_eq!(header.body(msg.data()), &[0xEE]);
    }

    #[test]
    fn gss_entity_id_drops_controller_byte() {
        let raw: u64 = (1001 << 8) | 0x11;
        let mut data = raw.to_le_bytes().to_vec();
        data.push(3);
        let header = resolve_header(&gss(data, false));
        assert_eq!(header.entity_id, 1001);
        assert_eq!(header.controller_id, Some(0x11));
        assert!(header.is_command);
    }

    #[test]
    fn gss_truncated_is_best_effort() {
        let msg = gss(vec![0x07, 1, 2], true);
        let header = resolve_header(&msg);
        assert!(header.truncated);
        assert_eq!(header.controller_id, Some(7));
        assert_eq!(header.entity_id, 0);
        assert_eq!(header.header_len, 3);
        assert_eq!(
            header.complete(),
            Err(WireError::TruncatedMessage {
                needed: 9,
                available: 3
            })
        );
        assert!(header.body(msg.data()).is_empty());
    }

    #[test]
    fn control_and_matrix_use_sentinels() {
        let control = Message::game(0, Channel::Control, true, 0, vec![0x04, 1]);
        let header = resolve_header(&control);
        assert_eq!(header.controller_id, Some(CONTROL_REF_ID));
        assert_eq!(header.message_id, 4);
        assert_eq!(header.header_len, 1);

        let matrix = Message::game(1, Channel::Matrix, false, 0, vec![0x10]);
        let header = resolve_header(&matrix);
        assert_eq!(header.controller_id, Some(MATRIX_REF_ID));
        assert_eq!(header.message_id, 0x10);
        assert!(header.is_command);
    }

    #[test]
    fn empty_control_is_truncated() {
        let msg = Message::game(0, Channel::Control, true, 0, Vec::new());
        let header = resolve_header(&msg);
        assert!(header.truncated);
        assert_eq!(header.header_len, 0);
    }

    #[test]
    fn jack_has_empty_header() {
        let msg = Message::jack(0, true, 0, b"HUGG".to_vec());
        let header = resolve_header(&msg);
        assert_eq!(header.header_len, 0);
        assert_eq!(header.controller_id, None);
        assert_eq!(header.channel, None);
        assert!(!header.truncated);
    }

    #[test]
    fn sub_message_uses_out_of_band_entity() {
        let entity = (77u64 << 8) | 0x2C;
        let msg = Message::new(
            4,
            true,
            0,
            Transport::Sub {
                channel: Channel::ReliableGss,
                entity_id: entity,
                parent: 1,
            },
            vec![0x03, 0xAA],
        );
        let header = resolve_header(&msg);
        assert_eq!(header.controller_id, Some(0x2C));
        assert_eq!(header.message_id, 3);
        assert_eq!(header.entity_id, 77);
        assert_eq!(header.header_len, 1);
    }

    #[test]
    fn generic_namespace_aliasing() {
        assert!(view_matches(0, 0));
        assert!(view_matches(0, 251));
        assert!(view_matches(251, 251));
        assert!(!view_matches(251, 0));
        assert!(!view_matches(0, 5));
        assert!(view_matches(CONTROL_REF_ID, CONTROL_REF_ID));
    }
}
