//! Game transport message model for packet inspection.
//!
//! This crate interprets already-captured messages: it classifies them by
//! server layer and channel, resolves their protocol header, and splits
//! routed-multiple envelopes into entity-addressed sub-messages. It knows the
//! framing of the transport but nothing about individual message bodies.
//!
//! # Design Principles
//!
//! - **Bounded reads** - Every header and entry read goes through [`cursor::ByteReader`].
//! - **Best-effort headers** - Short payloads yield a flagged header, never a panic.
//! - **Ordered splitting** - The [`RefIdTable`] is threaded through a session in capture order.

mod error;
mod header;
mod message;
mod routed;

pub use error::{WireError, WireResult};
pub use header::{
    resolve_header, view_matches, MessageHeader, CONTROL_REF_ID, GENERIC_VIEW_ALIAS,
    GENERIC_VIEW_ID, GSS_HEADER_LEN, MATRIX_REF_ID,
};
pub use message::{Channel, EntityId, Message, Server, Transport};
pub use routed::{
    is_routed_multiple, split_routed_message, write_routed_entry, RefIdTable, RouteRef,
    RoutedEntry, RoutedSplit, LITERAL_REF_ID, REF_ID_ASSIGN_MESSAGE_ID,
    ROUTED_MULTIPLE_MESSAGE_ID,
};
