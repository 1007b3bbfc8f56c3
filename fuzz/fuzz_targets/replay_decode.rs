#![no_main]

use libfuzzer_sys::fuzz_target;
use replay::{decode_replay, ReplayLimits};

fuzz_target!(|data: &[u8]| {
    let limits = ReplayLimits::for_testing();
    if let Ok(file) = decode_replay(data, &limits) {
        // Anything that decodes must import and re-encode without panicking.
        let _ = session::session_from_replay(&file).build();
        let _ = file.encode();
    }
});
