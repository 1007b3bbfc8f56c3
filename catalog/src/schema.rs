//! Explicit per-message field layouts.
//!
//! A [`MessageSchema`] is an ordered list of named, typed fields. A
//! [`SchemaCodec`] unpacks a message body against it and records where each
//! field sits in the body, which is what an inspector needs to highlight bytes.

use std::collections::HashSet;
use std::sync::Arc;

use cursor::{ByteReader, ByteWriter};
use serde::{Deserialize, Serialize};

use crate::codec::MessageCodec;
use crate::error::{CatalogError, CatalogResult};

/// Encoding of a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    Bool,
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    /// Fixed number of raw bytes.
    Bytes { len: usize },
    /// Fixed-width string, NUL padded.
    FixedString { len: usize },
    /// String with a `u16` length prefix.
    PrefixedString,
    /// NUL-terminated string.
    CString,
    /// Everything left in the body. Only valid as the last field.
    Rest,
}

impl FieldKind {
    /// Encoded size for fixed-width kinds.
    #[must_use]
    pub const fn fixed_size(self) -> Option<usize> {
        match self {
            Self::Bool | Self::U8 | Self::I8 => Some(1),
            Self::U16 | Self::I16 => Some(2),
            Self::U32 | Self::I32 | Self::F32 => Some(4),
            Self::U64 | Self::I64 | Self::F64 => Some(8),
            Self::Bytes { len } | Self::FixedString { len } => Some(len),
            Self::PrefixedString | Self::CString | Self::Rest => None,
        }
    }
}

/// A named field within a message schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(flatten)]
    pub kind: FieldKind,
}

impl FieldSpec {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Ordered field layout of one message type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSchema {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

impl MessageSchema {
    /// Creates a schema after validation.
    pub fn new(name: impl Into<String>, fields: Vec<FieldSpec>) -> CatalogResult<Self> {
        let schema = Self {
            name: name.into(),
            fields,
        };
        schema.validate()?;
        Ok(schema)
    }

    /// Field names must be unique and `rest` may only appear last.
    pub fn validate(&self) -> CatalogResult<()> {
        let mut names = HashSet::new();
        for (idx, field) in self.fields.iter().enumerate() {
            if !names.insert(field.name.as_str()) {
                return Err(self.invalid(format!("duplicate field '{}'", field.name)));
            }
            if field.kind == FieldKind::Rest && idx + 1 != self.fields.len() {
                return Err(self.invalid(format!("field '{}' must be last", field.name)));
            }
        }
        Ok(())
    }

    /// Total size if every field is fixed-width.
    #[must_use]
    pub fn fixed_size(&self) -> Option<usize> {
        self.fields.iter().map(|f| f.kind.fixed_size()).sum()
    }

    fn invalid(&self, reason: String) -> CatalogError {
        CatalogError::InvalidSchema {
            message: self.name.clone(),
            reason,
        }
    }
}

/// A decoded field value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    UInt(u64),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

/// A field value and the byte span it was read from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedField {
    pub name: String,
    pub offset: usize,
    pub size: usize,
    pub value: FieldValue,
}

/// A codec driven entirely by a [`MessageSchema`].
#[derive(Debug, Clone)]
pub struct SchemaCodec {
    schema: Arc<MessageSchema>,
    values: Vec<DecodedField>,
}

impl SchemaCodec {
    #[must_use]
    pub fn new(schema: Arc<MessageSchema>) -> Self {
        Self {
            schema,
            values: Vec::new(),
        }
    }

    #[must_use]
    pub fn schema(&self) -> &MessageSchema {
        &self.schema
    }

    /// Values from the last successful unpack.
    #[must_use]
    pub fn values(&self) -> &[DecodedField] {
        &self.values
    }

    /// Replaces one value by field name, for editing before a re-pack.
    pub fn set_value(&mut self, name: &str, value: FieldValue) -> CatalogResult<()> {
        let field = self
            .values
            .iter_mut()
            .find(|f| f.name == name)
            .ok_or(CatalogError::NotUnpacked)?;
        field.value = value;
        Ok(())
    }
}

impl MessageCodec for SchemaCodec {
    fn name(&self) -> &str {
        &self.schema.name
    }

    fn unpack(&mut self, bytes: &[u8]) -> CatalogResult<usize> {
        self.values.clear();
        let mut reader = ByteReader::new(bytes);
        let mut values = Vec::with_capacity(self.schema.fields.len());
        for spec in &self.schema.fields {
            let offset = reader.position();
            let value = read_value(&mut reader, spec.kind)?;
            values.push(DecodedField {
                name: spec.name.clone(),
                offset,
                size: reader.position() - offset,
                value,
            });
        }
        self.values = values;
        Ok(reader.position())
    }

    fn pack(&self, buf: &mut [u8]) -> CatalogResult<usize> {
        if self.values.len() != self.schema.fields.len() {
            return Err(CatalogError::NotUnpacked);
        }
        let mut writer = ByteWriter::new(buf);
        for (spec, field) in self.schema.fields.iter().zip(&self.values) {
            write_value(&mut writer, spec, &field.value)?;
        }
        Ok(writer.finish())
    }

    fn packed_size(&self) -> usize {
        if self.values.len() == self.schema.fields.len() {
            self.schema
                .fields
                .iter()
                .zip(&self.values)
                .map(|(spec, field)| value_size(spec.kind, &field.value))
                .sum()
        } else {
            self.schema
                .fields
                .iter()
                .filter_map(|f| f.kind.fixed_size())
                .sum()
        }
    }

    fn fields(&self) -> Vec<DecodedField> {
        self.values.clone()
    }
}

fn read_value(reader: &mut ByteReader<'_>, kind: FieldKind) -> CatalogResult<FieldValue> {
    let value = match kind {
        FieldKind::Bool => FieldValue::Bool(reader.read_u8()? != 0),
        FieldKind::U8 => FieldValue::UInt(u64::from(reader.read_u8()?)),
        FieldKind::U16 => FieldValue::UInt(u64::from(reader.read_u16()?)),
        FieldKind::U32 => FieldValue::UInt(u64::from(reader.read_u32()?)),
        FieldKind::U64 => FieldValue::UInt(reader.read_u64()?),
        FieldKind::I8 => FieldValue::Int(i64::from(i8::from_le_bytes(reader.read_array()?))),
        FieldKind::I16 => FieldValue::Int(i64::from(reader.read_i16()?)),
        FieldKind::I32 => FieldValue::Int(i64::from(reader.read_i32()?)),
        FieldKind::I64 => FieldValue::Int(reader.read_i64()?),
        FieldKind::F32 => FieldValue::Float(f64::from(reader.read_f32()?)),
        FieldKind::F64 => FieldValue::Float(reader.read_f64()?),
        FieldKind::Bytes { len } => FieldValue::Bytes(reader.read_bytes(len)?.to_vec()),
        FieldKind::FixedString { len } => FieldValue::Text(reader.read_fixed_string(len)?),
        FieldKind::PrefixedString => FieldValue::Text(reader.read_prefixed_string()?),
        FieldKind::CString => FieldValue::Text(reader.read_cstring()?),
        FieldKind::Rest => FieldValue::Bytes(reader.rest().to_vec()),
    };
    if kind == FieldKind::Rest {
        reader.skip(reader.remaining())?;
    }
    Ok(value)
}

fn write_value(writer: &mut ByteWriter<'_>, spec: &FieldSpec, value: &FieldValue) -> CatalogResult<()> {
    let mismatch = || CatalogError::FieldMismatch {
        field: spec.name.clone(),
    };
    match (spec.kind, value) {
        (FieldKind::Bool, FieldValue::Bool(v)) => writer.write_u8(u8::from(*v))?,
        (FieldKind::U8, FieldValue::UInt(v)) => {
            writer.write_u8(u8::try_from(*v).map_err(|_| mismatch())?)?;
        }
        (FieldKind::U16, FieldValue::UInt(v)) => {
            writer.write_u16(u16::try_from(*v).map_err(|_| mismatch())?)?;
        }
        (FieldKind::U32, FieldValue::UInt(v)) => {
            writer.write_u32(u32::try_from(*v).map_err(|_| mismatch())?)?;
        }
        (FieldKind::U64, FieldValue::UInt(v)) => writer.write_u64(*v)?,
        (FieldKind::I8, FieldValue::Int(v)) => {
            let v = i8::try_from(*v).map_err(|_| mismatch())?;
            writer.write_bytes(&v.to_le_bytes())?;
        }
        (FieldKind::I16, FieldValue::Int(v)) => {
            writer.write_i16(i16::try_from(*v).map_err(|_| mismatch())?)?;
        }
        (FieldKind::I32, FieldValue::Int(v)) => {
            writer.write_i32(i32::try_from(*v).map_err(|_| mismatch())?)?;
        }
        (FieldKind::I64, FieldValue::Int(v)) => writer.write_i64(*v)?,
        (FieldKind::F32, FieldValue::Float(v)) => writer.write_f32(*v as f32)?,
        (FieldKind::F64, FieldValue::Float(v)) => writer.write_f64(*v)?,
        (FieldKind::Bytes { len }, FieldValue::Bytes(v)) if v.len() == len => {
            writer.write_bytes(v)?;
        }
        (FieldKind::FixedString { len }, FieldValue::Text(v)) => writer.write_fixed_string(v, len)?,
        (FieldKind::PrefixedString, FieldValue::Text(v)) => writer.write_prefixed_string(v)?,
        (FieldKind::CString, FieldValue::Text(v)) => writer.write_cstring(v)?,
        (FieldKind::Rest, FieldValue::Bytes(v)) => writer.write_bytes(v)?,
        _ => return Err(mismatch()),
    }
    Ok(())
}

fn value_size(kind: FieldKind, value: &FieldValue) -> usize {
    match (kind, value) {
        (FieldKind::PrefixedString, FieldValue::Text(v)) => 2 + v.len(),
        (FieldKind::CString, FieldValue::Text(v)) => v.len() + 1,
        (FieldKind::Rest, FieldValue::Bytes(v)) => v.len(),
        _ => kind.fixed_size().unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Arc<MessageSchema> {
        Arc::new(
            MessageSchema::new(
                "Fired",
                vec![
                    FieldSpec::new("weapon", FieldKind::U16),
                    FieldSpec::new("charged", FieldKind::Bool),
                    FieldSpec::new("delta", FieldKind::I8),
                    FieldSpec::new("target", FieldKind::CString),
                    FieldSpec::new("trailer", FieldKind::Rest),
                ],
            )
            .unwrap(),
        )
    }

    #[test]
    fn unpack_records_spans() {
        let body = [0x34, 0x12, 1, 0xFF, b'a', b'b', 0, 9, 9];
        let mut codec = SchemaCodec::new(sample());
        assert_eq!(codec.unpack(&body).unwrap(), body.len());

        let values = codec.values();
        assert_eq!(values[0].value, FieldValue::UInt(0x1234));
        assert_eq!((values[0].offset, values[0].size), (0, 2));
        assert_eq!(values[1].value, FieldValue::Bool(true));
        assert_eq!(values[2].value, FieldValue::Int(-1));
        assert_eq!(values[3].value, FieldValue::Text("ab".into()));
        assert_eq!((values[3].offset, values[3].size), (4, 3));
        assert_eq!(values[4].value, FieldValue::Bytes(vec![9, 9]));
    }

    #[test]
    fn pack_reproduces_body() {
        let body = [0x34, 0x12, 0, 5, b'x', 0];
        let mut codec = SchemaCodec::new(sample());
        codec.unpack(&body).unwrap();
        assert_eq!(codec.packed_size(), body.len());

        let mut out = vec![0u8; codec.packed_size()];
        assert_eq!(codec.pack(&mut out).unwrap(), body.len());
        assert_eq!(out, body);
    }

    #[test]
    fn edited_value_is_packed() {
        let mut codec = SchemaCodec::new(sample());
        codec.unpack(&[1, 0, 0, 0, 0]).unwrap();
        codec.set_value("weapon", FieldValue::UInt(0x0203)).unwrap();
        let mut out = vec![0u8; codec.packed_size()];
        codec.pack(&mut out).unwrap();
        assert_eq!(&out[..2], &[0x03, 0x02]);
    }

    #[test]
    fn truncated_body_fails_and_clears() {
        let mut codec = SchemaCodec::new(sample());
        assert!(matches!(
            codec.unpack(&[1]),
            Err(CatalogError::Cursor(_))
        ));
        assert!(codec.values().is_empty());
        assert_eq!(codec.pack(&mut [0u8; 8]), Err(CatalogError::NotUnpacked));
    }

    #[test]
    fn out_of_range_value_is_mismatch() {
        let mut codec = SchemaCodec::new(sample());
        codec.unpack(&[1, 0, 0, 0, 0]).unwrap();
        codec.set_value("weapon", FieldValue::UInt(70_000)).unwrap();
        let mut out = vec![0u8; 16];
        assert_eq!(
            codec.pack(&mut out),
            Err(CatalogError::FieldMismatch {
                field: "weapon".into()
            })
        );
    }

    #[test]
    fn schema_validation() {
        let dup = MessageSchema::new(
            "Dup",
            vec![
                FieldSpec::new("a", FieldKind::U8),
                FieldSpec::new("a", FieldKind::U8),
            ],
        );
        assert!(matches!(dup, Err(CatalogError::InvalidSchema { .. })));

        let rest_first = MessageSchema::new(
            "Rest",
            vec![
                FieldSpec::new("tail", FieldKind::Rest),
                FieldSpec::new("a", FieldKind::U8),
            ],
        );
        assert!(matches!(rest_first, Err(CatalogError::InvalidSchema { .. })));
    }

    #[test]
    fn fixed_size_only_for_fixed_layouts() {
        let fixed = MessageSchema::new(
            "Pos",
            vec![
                FieldSpec::new("x", FieldKind::F32),
                FieldSpec::new("tag", FieldKind::FixedString { len: 6 }),
            ],
        )
        .unwrap();
        assert_eq!(fixed.fixed_size(), Some(10));
        assert_eq!(sample().fixed_size(), None);
    }

    #[test]
    fn field_spec_json_shape() {
        let spec: FieldSpec =
            serde_json::from_str(r#"{ "name": "tag", "kind": "fixed_string", "len": 4 }"#).unwrap();
        assert_eq!(spec.kind, FieldKind::FixedString { len: 4 });
        let spec: FieldSpec = serde_json::from_str(r#"{ "name": "hp", "kind": "u16" }"#).unwrap();
        assert_eq!(spec.kind, FieldKind::U16);
    }
}
