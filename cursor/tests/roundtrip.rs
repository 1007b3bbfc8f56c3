use cursor::{ByteReader, ByteVecWriter, ByteWriter, CursorError};

#[test]
fn bounded_writer_roundtrip() {
    let mut buf = [0u8; 16];
    let mut writer = ByteWriter::new(&mut buf);
    writer.write_u8(9).unwrap();
    writer.write_u16(0x0007).unwrap();
    writer.write_u64(1001 << 8).unwrap();
    let used = writer.finish();

    let mut reader = ByteReader::new(&buf[..used]);
    assert_eq!(reader.read_u8().unwrap(), 9);
    assert_eq!(reader.read_u16().unwrap(), 7);
    assert_eq!(reader.read_u64().unwrap() >> 8, 1001);
}

#[test]
fn vec_writer_roundtrip_strings() {
    let mut writer = ByteVecWriter::new();
    writer.write_fixed_string("NSRD", 4).unwrap();
    writer.write_prefixed_string("Copacabana").unwrap();
    writer.write_cstring("(undefined character)").unwrap();
    writer.write_i64(-1).unwrap();
    writer.write_f64(1.25).unwrap();
    let bytes = writer.finish();

    let mut reader = ByteReader::new(&bytes);
    assert_eq!(reader.read_fixed_string(4).unwrap(), "NSRD");
    assert_eq!(reader.read_prefixed_string().unwrap(), "Copacabana");
    assert_eq!(reader.read_cstring().unwrap(), "(undefined character)");
    assert_eq!(reader.read_i64().unwrap(), -1);
    assert_eq!(reader.read_f64().unwrap(), 1.25);
    assert!(reader.is_empty());
}

#[test]
fn truncated_buffer_reports_offset() {
    let bytes = [0x01, 0x02, 0x03, 0x04, 0x05];
    let mut reader = ByteReader::new(&bytes);
    reader.read_u32().unwrap();
    let err = reader.read_u16().unwrap_err();
    assert_eq!(
        err,
        CursorError::OutOfBounds {
            offset: 4,
            requested: 2,
            available: 1,
        }
    );
    assert_eq!(reader.position(), 4);
}
