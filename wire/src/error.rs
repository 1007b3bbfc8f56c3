//! Error types for transport message operations.

use std::fmt;

use cursor::CursorError;

/// Result type for transport message operations.
pub type WireResult<T> = Result<T, WireError>;

/// Errors raised while interpreting captured transport messages.
///
/// All of these are per-message conditions: callers log them and move on to
/// the next message rather than abandoning the session.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum WireError {
    /// A bounded read ran past the end of the message payload.
    Cursor(CursorError),

    /// The payload is shorter than the header layout selected for it.
    TruncatedMessage { needed: usize, available: usize },

    /// A routed sub-message used a reference id that has not been assigned yet.
    UnresolvedReference { ref_id: u16 },

    /// A message was handed to the splitter but is not a routed-multiple envelope.
    NotRoutedMessage { message_id: Option<u8> },

    /// A routed entry declared a length too small for its own addressing.
    MalformedRoutedEntry { offset: usize, length: usize },

    /// A routed entry is too long for the 15-bit length encoding.
    RoutedEntryTooLong { length: usize },
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cursor(err) => write!(f, "cursor error: {err}"),
            Self::TruncatedMessage { needed, available } => {
                write!(
                    f,
                    "truncated message: header needs {needed} bytes, have {available}"
                )
            }
            Self::UnresolvedReference { ref_id } => {
                write!(f, "unresolved reference id {ref_id}")
            }
            Self::NotRoutedMessage { message_id } => match message_id {
                Some(id) => write!(f, "message id {id} is not a routed-multiple envelope"),
                None => write!(f, "message is not a game-state message"),
            },
            Self::MalformedRoutedEntry { offset, length } => {
                write!(f, "malformed routed entry at offset {offset}: length {length}")
            }
            Self::RoutedEntryTooLong { length } => {
                write!(f, "routed entry length {length} exceeds 0x7FFF")
            }
        }
    }
}

impl std::error::Error for WireError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Cursor(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CursorError> for WireError {
    fn from(err: CursorError) -> Self {
        Self::Cursor(err)
    }
}
