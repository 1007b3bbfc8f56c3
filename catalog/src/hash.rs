//! Deterministic hashing of codec definitions.

use blake3::Hasher;

use crate::codec::{CodecDefinitions, MsgSrc, MsgType};
use crate::schema::FieldKind;

/// Computes a stable hash of a definition set.
///
/// Reloading definitions with an unchanged hash is a no-op.
#[must_use]
pub fn definitions_hash(defs: &CodecDefinitions) -> u64 {
    let mut hasher = Hasher::new();
    write_u32(&mut hasher, defs.codecs.len() as u32);

    for def in &defs.codecs {
        write_u8(&mut hasher, msg_type_tag(def.msg_type));
        write_u8(&mut hasher, msg_src_tag(def.msg_src));
        write_u8(&mut hasher, def.message_id);
        hasher.update(&def.controller_id.to_le_bytes());
        write_str(&mut hasher, &def.schema.name);
        write_u32(&mut hasher, def.schema.fields.len() as u32);

        for field in &def.schema.fields {
            write_str(&mut hasher, &field.name);
            write_kind(&mut hasher, field.kind);
        }
    }

    let hash = hasher.finalize();
    let mut out = [0u8; 8];
    out.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(out)
}

const fn msg_type_tag(msg_type: MsgType) -> u8 {
    match msg_type {
        MsgType::Control => 0,
        MsgType::Matrix => 1,
        MsgType::Gss => 2,
    }
}

const fn msg_src_tag(msg_src: MsgSrc) -> u8 {
    match msg_src {
        MsgSrc::Message => 0,
        MsgSrc::Command => 1,
    }
}

fn write_kind(hasher: &mut Hasher, kind: FieldKind) {
    let (tag, len) = match kind {
        FieldKind::Bool => (0, 0),
        FieldKind::U8 => (1, 0),
        FieldKind::U16 => (2, 0),
        FieldKind::U32 => (3, 0),
        FieldKind::U64 => (4, 0),
        FieldKind::I8 => (5, 0),
        FieldKind::I16 => (6, 0),
        FieldKind::I32 => (7, 0),
        FieldKind::I64 => (8, 0),
        FieldKind::F32 => (9, 0),
        FieldKind::F64 => (10, 0),
        FieldKind::Bytes { len } => (11, len),
        FieldKind::FixedString { len } => (12, len),
        FieldKind::PrefixedString => (13, 0),
        FieldKind::CString => (14, 0),
        FieldKind::Rest => (15, 0),
    };
    write_u8(hasher, tag);
    hasher.update(&(len as u64).to_le_bytes());
}

fn write_str(hasher: &mut Hasher, value: &str) {
    write_u32(hasher, value.len() as u32);
    hasher.update(value.as_bytes());
}

fn write_u8(hasher: &mut Hasher, value: u8) {
    hasher.update(&[value]);
}

fn write_u32(hasher: &mut Hasher, value: u32) {
    hasher.update(&value.to_le_bytes());
}
