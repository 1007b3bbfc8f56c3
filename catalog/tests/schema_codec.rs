use std::sync::Arc;

use catalog::{
    CodecKey, CodecRegistry, FieldKind, FieldSpec, MessageCodec, MessageSchema, MsgSrc, MsgType,
    SchemaCodec, ANY_CONTROLLER,
};
use proptest::prelude::*;

/// Integer and byte fields only, so a re-pack reproduces the body exactly.
fn exact_schema() -> Arc<MessageSchema> {
    Arc::new(
        MessageSchema::new(
            "Moved",
            vec![
                FieldSpec::new("flags", FieldKind::U8),
                FieldSpec::new("zone", FieldKind::U16),
                FieldSpec::new("delta", FieldKind::I32),
                FieldSpec::new("time", FieldKind::I64),
                FieldSpec::new("pad", FieldKind::Bytes { len: 3 }),
                FieldSpec::new("tail", FieldKind::Rest),
            ],
        )
        .unwrap(),
    )
}

const FIXED_PREFIX: usize = 1 + 2 + 4 + 8 + 3;

proptest! {
    #[test]
    fn unpack_then_pack_reproduces_body(body in proptest::collection::vec(any::<u8>(), 0..64)) {
        let mut codec = SchemaCodec::new(exact_schema());
        match codec.unpack(&body) {
            Ok(consumed) => {
                prop_assert!(body.len() >= FIXED_PREFIX);
                prop_assert_eq!(consumed, body.len());
                prop_assert_eq!(codec.packed_size(), body.len());

                let mut buf = vec![0u8; body.len()];
                prop_assert_eq!(codec.pack(&mut buf).unwrap(), body.len());
                prop_assert_eq!(&buf, &body);

                let mut expected_offset = 0;
                for field in codec.fields() {
                    prop_assert_eq!(field.offset, expected_offset);
                    expected_offset += field.size;
                }
                prop_assert_eq!(expected_offset, body.len());
            }
            Err(_) => prop_assert!(body.len() < FIXED_PREFIX),
        }
    }

    #[test]
    fn any_controller_registration_covers_every_controller(
        message_id in any::<u8>(),
        controller_id in 0i32..400,
    ) {
        let mut registry = CodecRegistry::new();
        registry
            .register_schema(
                CodecKey::new(MsgType::Gss, MsgSrc::Message, message_id, ANY_CONTROLLER),
                (*exact_schema()).clone(),
            )
            .unwrap();

        prop_assert!(registry.contains(CodecKey::new(
            MsgType::Gss,
            MsgSrc::Message,
            message_id,
            controller_id,
        )));
        prop_assert!(registry
            .resolve(MsgType::Gss, MsgSrc::Command, message_id, controller_id)
            .is_none());
    }
}

#[test]
fn exact_controller_wins_over_any() {
    let mut registry = CodecRegistry::new();
    registry
        .register_schema(
            CodecKey::new(MsgType::Gss, MsgSrc::Message, 7, ANY_CONTROLLER),
            MessageSchema::new("Generic", Vec::new()).unwrap(),
        )
        .unwrap();
    registry
        .register_schema(
            CodecKey::new(MsgType::Gss, MsgSrc::Message, 7, 30),
            MessageSchema::new("Specific", Vec::new()).unwrap(),
        )
        .unwrap();

    let specific = registry.resolve(MsgType::Gss, MsgSrc::Message, 7, 30).unwrap();
    assert_eq!(specific.name(), "Specific");
    let generic = registry.resolve(MsgType::Gss, MsgSrc::Message, 7, 31).unwrap();
    assert_eq!(generic.name(), "Generic");
}

#[test]
fn generic_alias_resolves_to_generic_controller() {
    let mut registry = CodecRegistry::new();
    registry
        .register_schema(
            CodecKey::new(MsgType::Gss, MsgSrc::Message, 4, 0),
            MessageSchema::new("Keyframe", Vec::new()).unwrap(),
        )
        .unwrap();
    assert!(registry.resolve(MsgType::Gss, MsgSrc::Message, 4, 251).is_some());
}
