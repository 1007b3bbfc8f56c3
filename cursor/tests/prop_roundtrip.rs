use cursor::{ByteReader, ByteVecWriter};
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Op {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I32(i32),
    I64(i64),
    Bytes(Vec<u8>),
    CString(String),
    Prefixed(String),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<u8>().prop_map(Op::U8),
        any::<u16>().prop_map(Op::U16),
        any::<u32>().prop_map(Op::U32),
        any::<u64>().prop_map(Op::U64),
        any::<i32>().prop_map(Op::I32),
        any::<i64>().prop_map(Op::I64),
        prop::collection::vec(any::<u8>(), 0..32).prop_map(Op::Bytes),
        "[a-zA-Z0-9 ]{0,24}".prop_map(Op::CString),
        "[a-zA-Z0-9 ]{0,24}".prop_map(Op::Prefixed),
    ]
}

proptest! {
    #[test]
    fn prop_roundtrip_ops(ops in prop::collection::vec(op_strategy(), 1..64)) {
        let mut writer = ByteVecWriter::new();
        for op in &ops {
            match op {
                Op::U8(v) => writer.write_u8(*v).unwrap(),
                Op::U16(v) => writer.write_u16(*v).unwrap(),
                Op::U32(v) => writer.write_u32(*v).unwrap(),
                Op::U64(v) => writer.write_u64(*v).unwrap(),
                Op::I32(v) => writer.write_i32(*v).unwrap(),
                Op::I64(v) => writer.write_i64(*v).unwrap(),
                Op::Bytes(v) => writer.write_bytes(v).unwrap(),
                Op::CString(v) => writer.write_cstring(v).unwrap(),
                Op::Prefixed(v) => writer.write_prefixed_string(v).unwrap(),
            }
        }
        let bytes = writer.finish();

        let mut reader = ByteReader::new(&bytes);
        for op in &ops {
            match op {
                Op::U8(v) => prop_assert_eq!(reader.read_u8().unwrap(), *v),
                Op::U16(v) => prop_assert_eq!(reader.read_u16().unwrap(), *v),
                Op::U32(v) => prop_assert_eq!(reader.read_u32().unwrap(), *v),
                Op::U64(v) => prop_assert_eq!(reader.read_u64().unwrap(), *v),
                Op::I32(v) => prop_assert_eq!(reader.read_i32().unwrap(), *v),
                Op::I64(v) => prop_assert_eq!(reader.read_i64().unwrap(), *v),
                Op::Bytes(v) => prop_assert_eq!(reader.read_bytes(v.len()).unwrap(), v.as_slice()),
                Op::CString(v) => prop_assert_eq!(&reader.read_cstring().unwrap(), v),
                Op::Prefixed(v) => prop_assert_eq!(&reader.read_prefixed_string().unwrap(), v),
            }
        }
        prop_assert!(reader.is_empty());
    }

    #[test]
    fn prop_reads_never_pass_end(data in prop::collection::vec(any::<u8>(), 0..64), widths in prop::collection::vec(0usize..12, 0..32)) {
        let mut reader = ByteReader::new(&data);
        for width in widths {
            let before = reader.position();
            match reader.read_bytes(width) {
                Ok(bytes) => prop_assert_eq!(bytes.len(), width),
                Err(_) => prop_assert_eq!(reader.position(), before),
            }
            prop_assert!(reader.position() <= data.len());
        }
    }
}
