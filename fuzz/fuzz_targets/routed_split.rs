#![no_main]

use libfuzzer_sys::fuzz_target;
use session::{apply_filter, PacketFilter, SessionBuilder};
use wire::Channel;

fuzz_target!(|data: &[u8]| {
    let mut builder = SessionBuilder::new();
    let mut idx = 0usize;
    while idx < data.len() && idx < 4096 {
        let len = usize::from(data[idx] % 120).saturating_add(1);
        let from_server = data[idx] & 0x80 != 0;
        idx += 1;
        let end = (idx + len).min(data.len());
        builder.push_game(Channel::ReliableGss, from_server, idx as u64, data[idx..end].to_vec());
        idx = end;
    }

    let (session, _) = builder.build();
    let mut filter = PacketFilter::default();
    filter.add_filter(Channel::ReliableGss, true, 0, session::IdMatch::Any);
    let ids = apply_filter(&session, &filter);
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
});
