//! Captured transport messages.

use std::fmt;

/// Which server layer a message was captured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Server {
    /// The handshake ("jack") layer that precedes the game transport.
    Jack,
    /// The main game transport.
    Game,
}

/// Coarse transport channel of a game message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Channel {
    Control = 0,
    Matrix = 1,
    ReliableGss = 2,
    UnreliableGss = 3,
}

impl Channel {
    /// All channels in wire order.
    pub const ALL: [Self; 4] = [
        Self::Control,
        Self::Matrix,
        Self::ReliableGss,
        Self::UnreliableGss,
    ];

    /// Parses a channel from its raw transport value.
    #[must_use]
    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Control),
            1 => Some(Self::Matrix),
            2 => Some(Self::ReliableGss),
            3 => Some(Self::UnreliableGss),
            _ => None,
        }
    }

    /// Returns `true` for the reliable and unreliable game-state channels.
    #[must_use]
    pub const fn is_gss(self) -> bool {
        matches!(self, Self::ReliableGss | Self::UnreliableGss)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Control => "Control",
            Self::Matrix => "Matrix",
            Self::ReliableGss => "RGSS",
            Self::UnreliableGss => "UGSS",
        };
        write!(f, "{name}")
    }
}

/// Transport-level classification of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// Handshake-layer message.
    Jack,
    /// Game transport message.
    Game {
        channel: Channel,
        reliable: bool,
        sequenced: bool,
    },
    /// Sub-message split out of a routed-multiple envelope.
    Sub {
        channel: Channel,
        /// Full 64-bit entity id (controller id in the low byte).
        entity_id: u64,
        /// Id of the envelope this sub-message was split from.
        parent: usize,
    },
}

/// One transport-level unit captured from the wire.
///
/// The payload is immutable once the message is created. `id` is the dense
/// index of the message inside its session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: usize,
    pub from_server: bool,
    /// Arrival time in milliseconds.
    pub time_ms: u64,
    pub transport: Transport,
    data: Box<[u8]>,
}

impl Message {
    /// Creates a message with an explicit transport classification.
    pub fn new(
        id: usize,
        from_server: bool,
        time_ms: u64,
        transport: Transport,
        data: impl Into<Box<[u8]>>,
    ) -> Self {
        Self {
            id,
            from_server,
            time_ms,
            transport,
            data: data.into(),
        }
    }

    /// Creates a handshake-layer message.
    pub fn jack(id: usize, from_server: bool, time_ms: u64, data: impl Into<Box<[u8]>>) -> Self {
        Self::new(id, from_server, time_ms, Transport::Jack, data)
    }

    /// Creates a reliable, sequenced game message on `channel`.
    pub fn game(
        id: usize,
        channel: Channel,
        from_server: bool,
        time_ms: u64,
        data: impl Into<Box<[u8]>>,
    ) -> Self {
        Self::new(
            id,
            from_server,
            time_ms,
            Transport::Game {
                channel,
                reliable: channel != Channel::UnreliableGss,
                sequenced: channel != Channel::UnreliableGss,
            },
            data,
        )
    }

    /// Returns the message payload.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns which server layer the message belongs to.
    #[must_use]
    pub const fn server(&self) -> Server {
        match self.transport {
            Transport::Jack => Server::Jack,
            Transport::Game { .. } | Transport::Sub { .. } => Server::Game,
        }
    }

    /// Returns the game channel, or `None` for handshake messages.
    #[must_use]
    pub const fn channel(&self) -> Option<Channel> {
        match self.transport {
            Transport::Jack => None,
            Transport::Game { channel, .. } | Transport::Sub { channel, .. } => Some(channel),
        }
    }

    /// Returns `true` if this message was split out of a routed envelope.
    #[must_use]
    pub const fn is_sub_message(&self) -> bool {
        matches!(self.transport, Transport::Sub { .. })
    }

    /// Returns the out-of-band entity id carried by a sub-message.
    #[must_use]
    pub const fn sub_entity_id(&self) -> Option<u64> {
        match self.transport {
            Transport::Sub { entity_id, .. } => Some(entity_id),
            _ => None,
        }
    }

    /// Returns `true` if the message travelled on a reliable channel.
    #[must_use]
    pub const fn is_reliable(&self) -> bool {
        match self.transport {
            Transport::Game { reliable, .. } => reliable,
            Transport::Sub { channel, .. } => !matches!(channel, Channel::UnreliableGss),
            Transport::Jack => false,
        }
    }

    /// Returns `true` if the message carries a sequence number.
    #[must_use]
    pub const fn is_sequenced(&self) -> bool {
        match self.transport {
            Transport::Game { sequenced, .. } => sequenced,
            Transport::Sub { .. } | Transport::Jack => false,
        }
    }
}

/// A 64-bit entity id whose low byte is the controller id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct EntityId(u64);

impl EntityId {
    /// Wraps a raw 64-bit entity id.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Builds an entity id from a controller byte and a 56-bit id.
    #[must_use]
    pub const fn from_parts(controller_id: u8, id: u64) -> Self {
        Self((id << 8) | controller_id as u64)
    }

    /// Returns the raw 64-bit value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Returns the controller id stored in the low byte.
    #[must_use]
    pub const fn controller_id(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    /// Returns the 56-bit id without the controller byte.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0 >> 8
    }

    /// Returns a copy with the 56-bit id replaced.
    #[must_use]
    pub const fn with_id(self, id: u64) -> Self {
        Self((self.0 & 0xFF) | (id << 8))
    }

    /// Returns `true` for the "no entity" value.
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "None")
        } else {
            write!(f, "{}:{}", self.controller_id(), self.id())
        }
    }
}
