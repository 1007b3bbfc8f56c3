//! Protocol catalog and message codec registry.
//!
//! This crate is the boundary between the transport decoders and the
//! versioned protocol definitions:
//! - Loading of the versioned definition files (patches, Matrix, GSS)
//! - Controller namespaces and name lookups for a selected build
//! - The codec registry that hands out per-message-type decoders
//! - Reload broadcasting so long-lived codec holders never use stale codecs
//!
//! # Design Principles
//!
//! - **Lookups never throw** - Unknown names fall back to numbers, unknown codecs to `None`.
//! - **Explicit schemas** - Field layouts are data, not reflection.
//! - **Reload by message passing** - Holders observe [`ReloadEvent`]s; there is no global.

mod codec;
mod error;
mod hash;
mod protocol;
mod reload;
mod schema;
mod sift;

pub use codec::{
    CodecDefinition, CodecDefinitions, CodecKey, CodecRegistry, MessageCodec, MsgSrc, MsgType,
    ANY_CONTROLLER,
};
pub use error::{CatalogError, CatalogResult};
pub use hash::definitions_hash;
pub use protocol::{
    ControllerData, MessageNames, ProtocolCatalog, CONTROL_REF_ID, FIREFALL_REF_ID,
    GENERIC_ALIAS_ID, MATRIX_REF_ID,
};
pub use reload::{CodecCache, ReloadEvent, SharedRegistry};
pub use schema::{DecodedField, FieldKind, FieldSpec, FieldValue, MessageSchema, SchemaCodec};
pub use sift::{GssProtocol, Namespace, Patch, SiftData};
