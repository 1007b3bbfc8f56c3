//! Turning decoded replay files into sessions.

use replay::ReplayFile;
use tracing::debug;
use wire::Channel;

use crate::session::SessionBuilder;

/// Builds a session from the frames of a replay, in file order.
///
/// Every frame becomes a server-sent reliable GSS message stamped with the
/// frame timestamp. Payloads carrying a weird int are normalized first.
#[must_use]
pub fn session_from_replay(file: &ReplayFile) -> SessionBuilder {
    let description = &file.header.description;
    let mut builder = SessionBuilder::new().streaming_protocol(description.streaming_protocol());
    let mut normalized = 0usize;

    for (_, frame) in file.frames() {
        let payload = frame.normalized_payload();
        if payload.len() != frame.data.len() {
            normalized += 1;
        }
        builder.push_game(
            Channel::ReliableGss,
            true,
            u64::from(frame.timestamp),
            payload.into_owned(),
        );
    }

    debug!(
        target: "peep::session",
        frames = builder.len(),
        normalized,
        protocol = description.protocol_version,
        "imported replay frames"
    );
    builder
}

#[cfg(test)]
mod tests {
    use super::*;
    use replay::{Frame, Keyframe};

    #[test]
    fn frames_become_server_gss_messages() {
        let mut file = ReplayFile::default();
        file.header.description.protocol_version = 0x5F4C;
        file.keyframes = vec![
            Keyframe {
                frames: vec![Frame::new(10, (0u8..16).collect())],
            },
            Keyframe {
                frames: vec![Frame::new(20, vec![1, 2, 3])],
            },
        ];

        let (session, _) = session_from_replay(&file).split_routed(false).build();
        assert_eq!(session.len(), 2);
        assert_eq!(session.streaming_protocol, 0x4C5F);

        let first = &session.messages()[0];
        assert!(first.from_server);
        assert_eq!(first.channel(), Some(Channel::ReliableGss));
        assert_eq!(first.time_ms, 10);
        assert_eq!(first.data(), &[0, 1, 2, 3, 4, 5, 6, 7, 8, 13, 14, 15]);
        assert_eq!(session.messages()[1].data(), &[1, 2, 3]);
    }
}
