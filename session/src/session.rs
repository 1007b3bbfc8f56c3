//! Loaded sessions and the load-time split pass.

use tracing::{debug, trace, warn};
use wire::{
    is_routed_multiple, split_routed_message, Channel, Message, RefIdTable, Transport, WireError,
};

/// An ordered list of messages from one connection.
///
/// `messages[i].id == i` for every message; ids never change after load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Streaming protocol id as captured (network byte order).
    pub streaming_protocol: u16,
    pub sequence_start: u16,
    pub socket_id: u32,
    messages: Vec<Message>,
}

impl Session {
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn get(&self, id: usize) -> Option<&Message> {
        self.messages.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// GSS protocol version in host order.
    #[must_use]
    pub const fn gss_protocol_version(&self) -> u16 {
        self.streaming_protocol.swap_bytes()
    }
}

/// Counters from building a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub messages: usize,
    pub envelopes: usize,
    pub sub_messages: usize,
    /// Sub-messages whose reference id was not assigned yet.
    pub unresolved: usize,
    /// Envelopes that could not be split structurally.
    pub failed_envelopes: usize,
}

/// Collects captured messages in order and produces a [`Session`].
///
/// Ids passed in are ignored; the builder assigns dense ids. When splitting
/// is enabled each routed-multiple envelope is followed directly by its
/// sub-messages.
#[derive(Debug, Clone)]
pub struct SessionBuilder {
    streaming_protocol: u16,
    sequence_start: u16,
    socket_id: u32,
    split_routed: bool,
    raw: Vec<Message>,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            streaming_protocol: 0,
            sequence_start: 0,
            socket_id: 0,
            split_routed: true,
            raw: Vec::new(),
        }
    }

    #[must_use]
    pub const fn streaming_protocol(mut self, protocol: u16) -> Self {
        self.streaming_protocol = protocol;
        self
    }

    #[must_use]
    pub const fn sequence_start(mut self, start: u16) -> Self {
        self.sequence_start = start;
        self
    }

    #[must_use]
    pub const fn socket_id(mut self, id: u32) -> Self {
        self.socket_id = id;
        self
    }

    #[must_use]
    pub const fn split_routed(mut self, split: bool) -> Self {
        self.split_routed = split;
        self
    }

    /// Appends an already-classified message.
    pub fn push(&mut self, msg: Message) -> &mut Self {
        self.raw.push(msg);
        self
    }

    /// Appends a handshake message.
    pub fn push_jack(&mut self, from_server: bool, time_ms: u64, data: impl Into<Box<[u8]>>) -> &mut Self {
        self.push(Message::jack(0, from_server, time_ms, data))
    }

    /// Appends a game message on `channel`.
    pub fn push_game(
        &mut self,
        channel: Channel,
        from_server: bool,
        time_ms: u64,
        data: impl Into<Box<[u8]>>,
    ) -> &mut Self {
        self.push(Message::game(0, channel, from_server, time_ms, data))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Assigns ids and runs the split pass in capture order.
    #[must_use]
    pub fn build(self) -> (Session, LoadReport) {
        let mut report = LoadReport::default();
        let mut table = RefIdTable::new();
        let mut messages = Vec::with_capacity(self.raw.len());

        for mut msg in self.raw {
            if matches!(msg.transport, Transport::Sub { .. }) {
                debug!(target: "peep::session", "dropping pre-split sub-message");
                continue;
            }
            msg.id = messages.len();
            let split = self.split_routed && is_routed_multiple(&msg);
            messages.push(msg);
            if !split {
                continue;
            }

            report.envelopes += 1;
            let envelope = &messages[messages.len() - 1];
            match split_routed_message(envelope, &mut table) {
                Ok(result) => {
                    for anomaly in &result.anomalies {
                        if let WireError::UnresolvedReference { ref_id } = anomaly {
                            trace!(target: "peep::session", envelope = envelope.id, ref_id, "unresolved reference");
                        }
                    }
                    report.unresolved += result.anomalies.len();
                    let parent = envelope.clone();
                    for entry in result.entries {
                        let id = messages.len();
                        messages.push(entry.into_message(id, &parent));
                        report.sub_messages += 1;
                    }
                }
                Err(err) => {
                    report.failed_envelopes += 1;
                    warn!(target: "peep::session", envelope = envelope.id, error = %err, "could not split routed envelope");
                }
            }
        }

        report.messages = messages.len();
        debug!(
            target: "peep::session",
            messages = report.messages,
            envelopes = report.envelopes,
            sub_messages = report.sub_messages,
            unresolved = report.unresolved,
            failed = report.failed_envelopes,
            "built session"
        );
        let session = Session {
            streaming_protocol: self.streaming_protocol,
            sequence_start: self.sequence_start,
            socket_id: self.socket_id,
            messages,
        };
        (session, report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use cursor::ByteVecWriter;
    use wire::{write_routed_entry, RouteRef, GSS_HEADER_LEN, ROUTED_MULTIPLE_MESSAGE_ID};

    fn envelope(entries: &[(RouteRef, Vec<u8>)]) -> Vec<u8> {
        let mut writer = ByteVecWriter::new();
        writer.write_bytes(&[0; GSS_HEADER_LEN - 1]).unwrap();
        writer.write_u8(ROUTED_MULTIPLE_MESSAGE_ID).unwrap();
        for (route, body) in entries {
            write_routed_entry(&mut writer, *route, body).unwrap();
        }
        writer.finish()
    }

    #[test]
    fn ids_are_dense_and_subs_follow_envelope() {
        let mut builder = SessionBuilder::new();
        builder.push_jack(false, 0, b"POKE".to_vec());
        builder.push_game(
            Channel::ReliableGss,
            true,
            5,
            envelope(&[
                (RouteRef::Literal(0x1234), vec![1, 2, 3]),
                (RouteRef::Literal(0x5678), vec![4]),
            ]),
        );
        builder.push_game(Channel::Matrix, false, 9, vec![3]);

        let (session, report) = builder.build();
        assert_eq!(session.len(), 5);
        for (i, msg) in session.messages().iter().enumerate() {
            assert_eq!(msg.id, i);
        }
        assert!(session.messages()[2].is_sub_message());
        assert!(session.messages()[3].is_sub_message());
        assert_eq!(session.messages()[2].sub_entity_id(), Some(0x1234));
        assert_eq!(session.messages()[4].channel(), Some(Channel::Matrix));
        assert_eq!(
            report,
            LoadReport {
                messages: 5,
                envelopes: 1,
                sub_messages: 2,
                unresolved: 0,
                failed_envelopes: 0,
            }
        );
    }

    #[test]
    fn splitting_can_be_disabled() {
        let mut builder = SessionBuilder::new().split_routed(false);
        builder.push_game(
            Channel::ReliableGss,
            true,
            0,
            envelope(&[(RouteRef::Literal(1), vec![1])]),
        );
        let (session, report) = builder.build();
        assert_eq!(session.len(), 1);
        assert_eq!(report.envelopes, 0);
    }

    #[test]
    fn table_persists_across_envelopes() {
        let assign = vec![9, 0x05, 0x00];
        let mut builder = SessionBuilder::new();
        builder.push_game(
            Channel::ReliableGss,
            true,
            0,
            envelope(&[(RouteRef::Ref(5), vec![1])]),
        );
        builder.push_game(
            Channel::ReliableGss,
            true,
            1,
            envelope(&[(RouteRef::Literal(0xABCD), assign)]),
        );
        builder.push_game(
            Channel::ReliableGss,
            true,
            2,
            envelope(&[(RouteRef::Ref(5), vec![2])]),
        );

        let (session, report) = builder.build();
        assert_eq!(report.unresolved, 1);
        let subs: Vec<_> = session
            .messages()
            .iter()
            .filter_map(Message::sub_entity_id)
            .collect();
        assert_eq!(subs, vec![0, 0xABCD, 0xABCD]);
    }

    #[test]
    fn broken_envelope_is_kept_and_counted() {
        let mut data = envelope(&[(RouteRef::Literal(1), vec![1, 2, 3, 4])]);
        data.truncate(data.len() - 2);
        let mut builder = SessionBuilder::new();
        builder.push_game(Channel::ReliableGss, true, 0, data);

        let (session, report) = builder.build();
        assert_eq!(session.len(), 1);
        assert_eq!(report.failed_envelopes, 1);
    }

    #[test]
    fn protocol_version_is_byte_swapped() {
        let (session, _) = SessionBuilder::new().streaming_protocol(0x5F4C).build();
        assert_eq!(session.gss_protocol_version(), 0x4C5F);
    }
}
