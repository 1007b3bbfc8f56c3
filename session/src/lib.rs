//! Loaded game sessions for packet inspection.
//!
//! This crate owns captured sessions and everything derived from them:
//! - Building sessions with dense message ids and routed-envelope splitting
//! - Declarative filtering by direction, channel and message/command id
//! - Parsing message bodies through the codec registry
//! - Importing replay files as sessions
//!
//! # Design Principles
//!
//! - **Explicit context** - Config and registry are passed in; there is no global state.
//! - **Stable ids** - A message id is its index in the session, before and after filtering.
//! - **Per-message failures** - Bad messages are recorded in their slot, the rest still parse.

mod config;
mod error;
mod filter;
mod import;
mod naming;
mod parse;
mod session;
mod table;

pub use config::{PeepConfig, DEFAULT_BUILD_VERSION};
pub use error::{SessionError, SessionResult};
pub use filter::{
    apply_filter, apply_filter_sharded, ChannelFlags, IdMatch, MsgFilter, PacketFilter,
};
pub use import::session_from_replay;
pub use naming::{message_name, JackTag};
pub use parse::{codec_key, parse_message, parse_session, MessageDoc, ParseSlot};
pub use session::{LoadReport, Session, SessionBuilder};
pub use table::{SessionEntry, SessionTable};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_api_exports() {
        let _ = PeepConfig::default();
        let _ = PacketFilter::default();
        let _ = SessionBuilder::new();
        let _ = SessionTable::new(PeepConfig::default());
        let _ = JackTag::ALL;
    }

    #[test]
    fn empty_session_filters_to_nothing() {
        let (session, _) = SessionBuilder::new().build();
        assert!(apply_filter(&session, &PacketFilter::default()).is_empty());
    }
}
