#![no_main]

use cursor::ByteReader;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut reader = ByteReader::new(data);
    let mut idx = 0usize;

    // Use input bytes to drive a bounded sequence of operations.
    while idx < data.len() && idx < 1024 {
        let op = data[idx] % 8;
        idx += 1;

        match op {
            0 => {
                let _ = reader.read_u8();
            }
            1 => {
                let _ = reader.read_u32();
            }
            2 => {
                let _ = reader.read_i64();
            }
            3 => {
                let _ = reader.read_f32();
            }
            4 => {
                let _ = reader.read_prefixed_string();
            }
            5 => {
                let _ = reader.read_cstring();
            }
            6 => {
                let len = usize::from(data[idx - 1] >> 3);
                let _ = reader.read_fixed_string(len);
            }
            _ => {
                let pos = usize::from(data[idx - 1]);
                let _ = reader.seek(pos);
            }
        }
        assert!(reader.position() <= data.len());
    }
});
