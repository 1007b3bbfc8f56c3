//! Routed-multiple envelope splitting.
//!
//! A routed-multiple message bundles several entity-addressed messages into
//! one game-state envelope. Each entry is addressed either by a literal
//! entity id or by a short reference id assigned earlier in the session.
//!
//! Entry layout (after the 9-byte game-state header):
//!
//! ```text
//! len      1 byte, or 2 bytes when the top bit is set: ((b0 & 0x7F) << 8) | b1
//! ref_id   u16 LE
//! entity   u64 LE, only when ref_id == 0xFFFF
//! body     len - 2 (reference) or len - 10 (literal) bytes
//! ```

use std::collections::HashMap;

use cursor::{ByteReader, ByteVecWriter};
use tracing::{debug, trace, warn};

use crate::error::{WireError, WireResult};
use crate::header::GSS_HEADER_LEN;
use crate::message::{Channel, Message, Transport};

/// Message id of a routed-multiple envelope.
pub const ROUTED_MULTIPLE_MESSAGE_ID: u8 = 8;

/// First body byte of a reference-id assignment record.
pub const REF_ID_ASSIGN_MESSAGE_ID: u8 = 9;

/// Reference id marking an entry with a literal entity id.
pub const LITERAL_REF_ID: u16 = 0xFFFF;

const MAX_ENTRY_LEN: usize = 0x7FFF;
const LONG_LEN_FLAG: u8 = 0x80;

/// Session-scoped map from reference id to entity id.
///
/// Must be threaded through a session's messages in capture order: an entry
/// can only be resolved if its assignment was seen earlier in the same pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefIdTable {
    entries: HashMap<u16, u64>,
}

impl RefIdTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entity id assigned to `ref_id`, if any.
    #[must_use]
    pub fn get(&self, ref_id: u16) -> Option<u64> {
        self.entries.get(&ref_id).copied()
    }

    /// Assigns `ref_id` to `entity_id`. Last writer wins; the previous value is returned.
    pub fn assign(&mut self, ref_id: u16, entity_id: u64) -> Option<u64> {
        self.entries.insert(ref_id, entity_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// One entry split out of a routed-multiple envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedEntry {
    pub ref_id: u16,
    /// Full 64-bit entity id, 0 when the reference could not be resolved.
    pub entity_id: u64,
    /// Copied sub-message payload, starting at the message id byte.
    pub body: Vec<u8>,
    /// Offset of the entry's length field inside the envelope payload.
    pub offset: usize,
    /// Bytes consumed by the entry, length field included.
    pub encoded_len: usize,
    pub resolved: bool,
}

impl RoutedEntry {
    /// Returns `true` if the entry carried a literal entity id.
    #[must_use]
    pub const fn is_literal(&self) -> bool {
        self.ref_id == LITERAL_REF_ID
    }

    /// Materializes the entry as a sub-message of `parent`.
    #[must_use]
    pub fn into_message(self, id: usize, parent: &Message) -> Message {
        let channel = parent.channel().unwrap_or(Channel::ReliableGss);
        Message::new(
            id,
            parent.from_server,
            parent.time_ms,
            Transport::Sub {
                channel,
                entity_id: self.entity_id,
                parent: parent.id,
            },
            self.body,
        )
    }
}

/// Result of splitting one envelope.
///
/// Unresolved references are recoverable: the entry is still produced with
/// entity id 0 and the condition is recorded in `anomalies`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutedSplit {
    pub entries: Vec<RoutedEntry>,
    pub anomalies: Vec<WireError>,
}

impl RoutedSplit {
    /// Sum of the encoded entry lengths.
    #[must_use]
    pub fn consumed(&self) -> usize {
        self.entries.iter().map(|e| e.encoded_len).sum()
    }
}

/// Returns `true` if `msg` is a server-sent game-state routed-multiple envelope.
#[must_use]
pub fn is_routed_multiple(msg: &Message) -> bool {
    matches!(msg.transport, Transport::Game { channel, .. } if channel.is_gss())
        && msg.from_server
        && msg.data().get(GSS_HEADER_LEN - 1) == Some(&ROUTED_MULTIPLE_MESSAGE_ID)
}

/// Splits a routed-multiple envelope into its entries.
///
/// Assignment records (literal entries whose body starts with
/// [`REF_ID_ASSIGN_MESSAGE_ID`]) update `table` as they are encountered, so
/// later entries in the same envelope already see them.
///
/// # Errors
///
/// Returns [`WireError::NotRoutedMessage`] for any other message, and a
/// structural error if an entry overruns the envelope. The table keeps any
/// assignments made before the failing entry.
pub fn split_routed_message(msg: &Message, table: &mut RefIdTable) -> WireResult<RoutedSplit> {
    if !is_routed_multiple(msg) {
        return Err(WireError::NotRoutedMessage {
            message_id: msg
                .channel()
                .filter(|c| c.is_gss())
                .and_then(|_| msg.data().get(GSS_HEADER_LEN - 1).copied()),
        });
    }

    let data = msg.data();
    let mut reader = ByteReader::new(data);
    reader.seek(GSS_HEADER_LEN)?;
    let mut split = RoutedSplit::default();

    while !reader.is_empty() {
        let offset = reader.position();
        let entry = read_entry(&mut reader, offset, table, &mut split.anomalies)?;
        trace!(
            target: "peep::wire",
            message = msg.id,
            offset,
            ref_id = entry.ref_id,
            entity_id = entry.entity_id,
            len = entry.body.len(),
            "routed entry"
        );
        split.entries.push(entry);
    }

    Ok(split)
}

fn read_entry(
    reader: &mut ByteReader<'_>,
    offset: usize,
    table: &mut RefIdTable,
    anomalies: &mut Vec<WireError>,
) -> WireResult<RoutedEntry> {
    let first = reader.read_u8()?;
    let length = if first & LONG_LEN_FLAG != 0 {
        let low = reader.read_u8()?;
        (usize::from(first & !LONG_LEN_FLAG) << 8) | usize::from(low)
    } else {
        usize::from(first)
    };

    let ref_id = reader.read_u16()?;
    let (entity_id, body_len, resolved) = if ref_id == LITERAL_REF_ID {
        let body_len = length
            .checked_sub(10)
            .ok_or(WireError::MalformedRoutedEntry { offset, length })?;
        (reader.read_u64()?, body_len, true)
    } else {
        let body_len = length
            .checked_sub(2)
            .ok_or(WireError::MalformedRoutedEntry { offset, length })?;
        match table.get(ref_id) {
            Some(entity_id) => (entity_id, body_len, true),
            None => {
                debug!(target: "peep::wire", ref_id, offset, "unresolved reference id");
                anomalies.push(WireError::UnresolvedReference { ref_id });
                (0, body_len, false)
            }
        }
    };

    let body = reader.read_bytes(body_len)?.to_vec();

    if ref_id == LITERAL_REF_ID && body.first() == Some(&REF_ID_ASSIGN_MESSAGE_ID) {
        let mut assign = ByteReader::new(&body);
        assign.skip(1)?;
        let assigned = assign.read_u16()?;
        if let Some(previous) = table.assign(assigned, entity_id) {
            if previous != entity_id {
                warn!(
                    target: "peep::wire",
                    ref_id = assigned,
                    previous,
                    entity_id,
                    "reference id reassigned"
                );
            }
        }
    }

    Ok(RoutedEntry {
        ref_id,
        entity_id,
        body,
        offset,
        encoded_len: reader.position() - offset,
        resolved,
    })
}

/// Addressing used when writing a routed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteRef {
    /// Literal 64-bit entity id.
    Literal(u64),
    /// Previously assigned reference id.
    Ref(u16),
}

/// Appends one routed entry to `writer`.
///
/// # Errors
///
/// Returns [`WireError::RoutedEntryTooLong`] if the entry does not fit the
/// 15-bit length field.
pub fn write_routed_entry(
    writer: &mut ByteVecWriter,
    route: RouteRef,
    body: &[u8],
) -> WireResult<()> {
    let addressing = match route {
        RouteRef::Literal(_) => 10,
        RouteRef::Ref(_) => 2,
    };
    let length = body.len() + addressing;
    if length > MAX_ENTRY_LEN {
        return Err(WireError::RoutedEntryTooLong { length });
    }

    if length >= usize::from(LONG_LEN_FLAG) {
        writer.write_u8(((length >> 8) as u8) | LONG_LEN_FLAG)?;
        writer.write_u8((length & 0xFF) as u8)?;
    } else {
        writer.write_u8(length as u8)?;
    }

    match route {
        RouteRef::Literal(entity_id) => {
            writer.write_u16(LITERAL_REF_ID)?;
            writer.write_u64(entity_id)?;
        }
        RouteRef::Ref(ref_id) => writer.write_u16(ref_id)?,
    }
    writer.write_bytes(body)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(entries: &[(RouteRef, Vec<u8>)]) -> Message {
        let mut writer = ByteVecWriter::new();
        writer.write_bytes(&[0, 0, 0, 0, 0, 0, 0, 0]).unwrap();
        writer.write_u8(ROUTED_MULTIPLE_MESSAGE_ID).unwrap();
        for (route, body) in entries {
            write_routed_entry(&mut writer, *route, body).unwrap();
        }
        Message::game(0, Channel::ReliableGss, true, 0, writer.finish())
    }

    #[test]
    fn splits_literal_entry() {
        let msg = envelope(&[(RouteRef::Literal(0xAB01), vec![3, 1, 2])]);
        let mut table = RefIdTable::new();
        let split = split_routed_message(&msg, &mut table).unwrap();
        assert_eq!(split.entries.len(), 1);
        let entry = &split.entries[0];
        assert!(entry.is_literal());
        assert_eq!(entry.entity_id, 0xAB01);
        assert_eq!(entry.body, vec![3, 1, 2]);
        assert_eq!(entry.offset, GSS_HEADER_LEN);
        assert_eq!(entry.encoded_len, 1 + 2 + 8 + 3);
        assert!(split.anomalies.is_empty());
        assert!(table.is_empty());
    }

    #[test]
    fn assignment_then_reference_resolves() {
        let msg = envelope(&[
            (RouteRef::Literal(1001), vec![REF_ID_ASSIGN_MESSAGE_ID, 7, 0]),
            (RouteRef::Ref(7), vec![4, 0xEE]),
        ]);
        let mut table = RefIdTable::new();
        let split = split_routed_message(&msg, &mut table).unwrap();
        assert_eq!(split.entries[1].entity_id, 1001);
        assert!(split.entries[1].resolved);
        assert_eq!(table.get(7), Some(1001));
    }

    #[test]
    fn unresolved_reference_is_anomaly() {
        let msg = envelope(&[(RouteRef::Ref(42), vec![1])]);
        let mut table = RefIdTable::new();
        let split = split_routed_message(&msg, &mut table).unwrap();
        assert_eq!(split.entries[0].entity_id, 0);
        assert!(!split.entries[0].resolved);
        assert_eq!(
            split.anomalies,
            vec![WireError::UnresolvedReference { ref_id: 42 }]
        );
    }

    #[test]
    fn reassignment_last_writer_wins() {
        let mut table = RefIdTable::new();
        assert_eq!(table.assign(3, 10), None);
        assert_eq!(table.assign(3, 20), Some(10));
        assert_eq!(table.get(3), Some(20));
    }

    #[test]
    fn two_byte_length() {
        let body = vec![5u8; 200];
        let msg = envelope(&[(RouteRef::Literal(9), body.clone())]);
        assert_eq!(msg.data()[GSS_HEADER_LEN] & 0x80, 0x80);
        let split = split_routed_message(&msg, &mut RefIdTable::new()).unwrap();
        assert_eq!(split.entries[0].body, body);
        assert_eq!(split.entries[0].encoded_len, 2 + 10 + 200);
    }

    #[test]
    fn overrun_is_error() {
        let mut data = vec![0u8; 8];
        data.push(ROUTED_MULTIPLE_MESSAGE_ID);
        data.extend_from_slice(&[20, 0x01, 0x00, 0xAA]);
        let msg = Message::game(0, Channel::ReliableGss, true, 0, data);
        let err = split_routed_message(&msg, &mut RefIdTable::new()).unwrap_err();
        assert!(matches!(err, WireError::Cursor(_)));
    }

    #[test]
    fn short_length_is_malformed() {
        let mut data = vec![0u8; 8];
        data.push(ROUTED_MULTIPLE_MESSAGE_ID);
        data.extend_from_slice(&[1, 0xFF, 0xFF]);
        let msg = Message::game(0, Channel::ReliableGss, true, 0, data);
        let err = split_routed_message(&msg, &mut RefIdTable::new()).unwrap_err();
        assert_eq!(
            err,
            WireError::MalformedRoutedEntry {
                offset: 9,
                length: 1
            }
        );
    }

    #[test]
    fn rejects_non_routed() {
        let msg = Message::game(0, Channel::ReliableGss, true, 0, vec![0; 9]);
        assert_eq!(
            split_routed_message(&msg, &mut RefIdTable::new()),
            Err(WireError::NotRoutedMessage {
                message_id: Some(0)
            })
        );
        let control = Message::game(0, Channel::Control, true, 0, vec![8; 9]);
        assert_eq!(
            split_routed_message(&control, &mut RefIdTable::new()),
            Err(WireError::NotRoutedMessage { message_id: None })
        );
    }

    #[test]
    fn client_envelope_is_not_routed() {
        let mut msg = envelope(&[(RouteRef::Literal(1), vec![1])]);
        msg.from_server = false;
        assert!(!is_routed_multiple(&msg));
    }

    #[test]
    fn entry_into_message() {
        let parent = envelope(&[(RouteRef::Literal(0x0102), vec![6, 1])]);
        let split = split_routed_message(&parent, &mut RefIdTable::new()).unwrap();
        let entry = split.entries.into_iter().next().unwrap();
        let sub = entry.into_message(5, &parent);
        assert_eq!(sub.id, 5);
        assert!(sub.is_sub_message());
        assert_eq!(sub.sub_entity_id(), Some(0x0102));
        assert_eq!(sub.data(), &[6, 1]);
    }

    #[test]
    fn too_long_entry_rejected() {
        let mut writer = ByteVecWriter::new();
        let body = vec![0u8; MAX_ENTRY_LEN];
        assert_eq!(
            write_routed_entry(&mut writer, RouteRef::Ref(1), &body),
            Err(WireError::RoutedEntryTooLong {
                length: MAX_ENTRY_LEN + 2
            })
        );
    }
}
