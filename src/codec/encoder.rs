//! Schema-driven encoder: walks a compiled [`Schema`] against a [`Value`],
//! emitting protobuf wire bytes.

use std::collections::HashMap;

use crate::error::CodecError;
use crate::leb128::{twos_complement_encode, write_varint, zigzag_encode};
use crate::schema::{FieldDescriptor, Prefix, ScalarType, Schema};
use crate::value::Value;
use crate::wire::{write_header, WireType};

/// Encodes `value` against `schema`, returning the wire bytes.
///
/// `value` must be [`Value::Message`] for a positional (format-string)
/// schema or [`Value::Map`] for a key-value schema.
pub fn encode(schema: &Schema, value: &Value) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    let width = schema.twos_complement_width();
    match value {
        Value::Message(items) => encode_positional(schema.fields(), items, width, &mut out)?,
        Value::Map(map) => {
            encode_keyed(schema.fields(), map, schema.allow_sparse_dict(), width, &mut out)?
        }
        _ => return Err(CodecError::WrongShape { field_number: 0 }),
    }
    Ok(out)
}

fn encode_positional(
    fields: &[FieldDescriptor],
    items: &[Value],
    width: u8,
    out: &mut Vec<u8>,
) -> Result<(), CodecError> {
    let mut idx = 0usize;
    for field in fields {
        if field.scalar == ScalarType::Skip {
            continue;
        }
        // A field copy (`repeat > 1`, only reachable from the format-string
        // dialect) lays out `repeat` independent slots, each at its own
        // field number and each consuming its own positional value.
        for copy in 0..field.repeat {
            let item = items.get(idx).ok_or(CodecError::InsufficientParameters)?;
            idx += 1;
            encode_field(field, field.field_number + copy, item, width, out)?;
        }
    }
    Ok(())
}

fn encode_keyed(
    fields: &[FieldDescriptor],
    map: &HashMap<String, Value>,
    allow_sparse: bool,
    width: u8,
    out: &mut Vec<u8>,
) -> Result<(), CodecError> {
    for field in fields {
        if field.scalar == ScalarType::Skip {
            continue;
        }
        let name = field
            .name
            .as_deref()
            .expect("key-value schema fields always carry a name");
        match map.get(name) {
            Some(value) => encode_field(field, value, width, out)?,
            None if allow_sparse => encode_field(field, &Value::Null, width, out)?,
            None => {
                return Err(CodecError::MissingKey {
                    name: name.to_owned(),
                })
            }
        }
    }
    Ok(())
}

fn encode_field(
    field: &FieldDescriptor,
    value: &Value,
    width: u8,
    out: &mut Vec<u8>,
) -> Result<(), CodecError> {
    if value.is_null() {
        return if field.prefix == Prefix::Required {
            Err(CodecError::RequiredFieldMissing)
        } else {
            Ok(())
        };
    }

    match field.prefix {
        Prefix::None | Prefix::Required => {
            let wire_type = field
                .scalar
                .wire_type()
                .expect("non-skip field always has a wire type");
            write_header(field.field_number, wire_type, out);
            encode_payload(field, value, width, out)
        }
        Prefix::Repeated => {
            let items = value
                .as_list()
                .ok_or(CodecError::WrongShape { field_number: field.field_number })?;
            let wire_type = field
                .scalar
                .wire_type()
                .expect("non-skip field always has a wire type");
            for item in items {
                write_header(field.field_number, wire_type, out);
                encode_payload(field, item, width, out)?;
            }
            Ok(())
        }
        Prefix::PackedRepeated => {
            let items = value
                .as_list()
                .ok_or(CodecError::WrongShape { field_number: field.field_number })?;
            let mut payload = Vec::new();
            for item in items {
                encode_payload(field, item, width, &mut payload)?;
            }
            write_header(field.field_number, WireType::Len, out);
            out.extend(write_varint(payload.len() as u64));
            out.extend(payload);
            Ok(())
        }
    }
}

/// Encodes just the payload bytes for a single occurrence of `field` (no
/// header) -- shared between singular, repeated-element, and packed-element
/// encoding.
fn encode_payload(
    field: &FieldDescriptor,
    value: &Value,
    width: u8,
    out: &mut Vec<u8>,
) -> Result<(), CodecError> {
    use ScalarType::*;
    let field_number = field.field_number;
    match field.scalar {
        Skip => Ok(()),
        SignedTwosComplement => {
            let n = as_i64(value, field_number)?;
            out.extend(write_varint(twos_complement_encode(n, width)));
            Ok(())
        }
        UnsignedVarint => {
            out.extend(write_varint(as_u64(value, field_number)?));
            Ok(())
        }
        ZigZag => {
            out.extend(write_varint(zigzag_encode(as_i64(value, field_number)?)));
            Ok(())
        }
        Bool => {
            out.extend(write_varint(as_bool(value, field_number)? as u64));
            Ok(())
        }
        Fixed32Signed => {
            out.extend_from_slice(&(as_i64(value, field_number)? as i32).to_le_bytes());
            Ok(())
        }
        Fixed32Unsigned => {
            out.extend_from_slice(&(as_u64(value, field_number)? as u32).to_le_bytes());
            Ok(())
        }
        Fixed64Signed => {
            out.extend_from_slice(&as_i64(value, field_number)?.to_le_bytes());
            Ok(())
        }
        Fixed64Unsigned => {
            out.extend_from_slice(&as_u64(value, field_number)?.to_le_bytes());
            Ok(())
        }
        Float32 => {
            out.extend_from_slice(&as_f32(value, field_number)?.to_le_bytes());
            Ok(())
        }
        Float64 => {
            out.extend_from_slice(&as_f64(value, field_number)?.to_le_bytes());
            Ok(())
        }
        Utf8String => {
            let s = as_str(value, field_number)?;
            out.extend(write_varint(s.len() as u64));
            out.extend_from_slice(s.as_bytes());
            Ok(())
        }
        Bytes => {
            if let Some(sub) = &field.subschema {
                let nested = encode(sub, value)?;
                out.extend(write_varint(nested.len() as u64));
                out.extend(nested);
            } else {
                let b = as_bytes(value, field_number)?;
                out.extend(write_varint(b.len() as u64));
                out.extend_from_slice(b);
            }
            Ok(())
        }
    }
}

fn as_i64(value: &Value, field_number: u32) -> Result<i64, CodecError> {
    match value {
        Value::Signed(n) => Ok(*n),
        Value::Unsigned(n) => Ok(*n as i64),
        _ => Err(CodecError::WrongShape { field_number }),
    }
}

fn as_u64(value: &Value, field_number: u32) -> Result<u64, CodecError> {
    match value {
        Value::Unsigned(n) => Ok(*n),
        Value::Signed(n) => Ok(*n as u64),
        _ => Err(CodecError::WrongShape { field_number }),
    }
}

fn as_bool(value: &Value, field_number: u32) -> Result<bool, CodecError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Unsigned(n) => Ok(*n != 0),
        Value::Signed(n) => Ok(*n != 0),
        _ => Err(CodecError::WrongShape { field_number }),
    }
}

fn as_f32(value: &Value, field_number: u32) -> Result<f32, CodecError> {
    match value {
        Value::Float(f) => Ok(*f),
        Value::Double(d) => Ok(*d as f32),
        _ => Err(CodecError::WrongShape { field_number }),
    }
}

fn as_f64(value: &Value, field_number: u32) -> Result<f64, CodecError> {
    match value {
        Value::Double(d) => Ok(*d),
        Value::Float(f) => Ok(*f as f64),
        _ => Err(CodecError::WrongShape { field_number }),
    }
}

fn as_str(value: &Value, field_number: u32) -> Result<&str, CodecError> {
    match value {
        Value::String(s) => Ok(s.as_str()),
        _ => Err(CodecError::WrongShape { field_number }),
    }
}

fn as_bytes(value: &Value, field_number: u32) -> Result<&[u8], CodecError> {
    match value {
        Value::Bytes(b) => Ok(b.as_slice()),
        _ => Err(CodecError::WrongShape { field_number }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;

    #[test]
    fn small_unsigned_varint() {
        let schema = Schema::compile_format_string("V").unwrap();
        let bytes = encode(&schema, &Value::Message(vec![Value::Unsigned(150)])).unwrap();
        assert_eq!(bytes, vec![0x08, 0x96, 0x01]);
    }

    #[test]
    fn string_after_skip() {
        let schema = Schema::compile_format_string("xU").unwrap();
        let bytes = encode(
            &schema,
            &Value::Message(vec![Value::String("testing".into())]),
        )
        .unwrap();
        assert_eq!(
            bytes,
            vec![0x12, 0x07, 0x74, 0x65, 0x73, 0x74, 0x69, 0x6E, 0x67]
        );
    }

    #[test]
    fn packed_repeated_varint() {
        let schema = Schema::compile_format_string("x3#V").unwrap();
        let value = Value::Message(vec![Value::List(vec![
            Value::Unsigned(3),
            Value::Unsigned(270),
            Value::Unsigned(86942),
        ])]);
        let bytes = encode(&schema, &value).unwrap();
        assert_eq!(
            bytes,
            vec![0x22, 0x06, 0x03, 0x8E, 0x02, 0x9E, 0xA7, 0x05]
        );
    }

    #[test]
    fn nested_message() {
        let schema = Schema::compile_format_string("x2[V]").unwrap();
        let inner = Value::Message(vec![Value::Unsigned(150)]);
        let bytes = encode(&schema, &Value::Message(vec![inner])).unwrap();
        assert_eq!(bytes, vec![0x1A, 0x03, 0x08, 0x96, 0x01]);
    }

    #[test]
    fn fixed_width_type_mix() {
        let schema = Schema::compile_format_string("iIfqQd").unwrap();
        let value = Value::Message(vec![
            Value::Signed(-1),
            Value::Unsigned(1),
            Value::Float(1.0),
            Value::Signed(-12345678900),
            Value::Unsigned(1234567890),
            Value::Double(std::f64::consts::PI),
        ]);
        let bytes = encode(&schema, &value).unwrap();
        let expected = vec![
            0x0D, 0xFF, 0xFF, 0xFF, 0xFF, 0x15, 0x01, 0x00, 0x00, 0x00, 0x1D, 0x00, 0x00, 0x80,
            0x3F, 0x21, 0xCC, 0xE3, 0x23, 0x20, 0xFD, 0xFF, 0xFF, 0xFF, 0x29, 0xD2, 0x02, 0x96,
            0x49, 0x00, 0x00, 0x00, 0x00, 0x31, 0x18, 0x2D, 0x44, 0x54, 0xFB, 0x21, 0x09, 0x40,
        ];
        assert_eq!(bytes, expected);
    }

    #[test]
    fn negative_twos_complement_width_32() {
        let mut schema = Schema::compile_format_string("t").unwrap();
        schema.set_twos_complement_width(32);
        let bytes = encode(&schema, &Value::Message(vec![Value::Signed(-1)])).unwrap();
        assert_eq!(bytes, vec![0x08, 0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
    }

    #[test]
    fn negative_twos_complement_default_width_64() {
        let schema = Schema::compile_format_string("t").unwrap();
        let bytes = encode(&schema, &Value::Message(vec![Value::Signed(-1)])).unwrap();
        assert_eq!(
            bytes,
            vec![0x08, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]
        );
    }

    #[test]
    fn field_seek() {
        let schema = Schema::compile_format_string("V2@2U@10U@20").unwrap();
        let value = Value::Message(vec![
            Value::Unsigned(1),
            Value::Unsigned(2),
            Value::String("test1".into()),
            Value::String("test2".into()),
        ]);
        let bytes = encode(&schema, &value).unwrap();
        let expected = vec![
            0x10, 0x01, 0x18, 0x02, 0x52, 0x05, 0x74, 0x65, 0x73, 0x74, 0x31, 0xA2, 0x01, 0x05,
            0x74, 0x65, 0x73, 0x74, 0x32,
        ];
        assert_eq!(bytes, expected);
    }

    #[test]
    fn missing_required_field_is_an_error() {
        let schema = Schema::compile_format_string("*V").unwrap();
        let err = encode(&schema, &Value::Message(vec![Value::Null])).unwrap_err();
        assert!(matches!(err, CodecError::RequiredFieldMissing));
    }

    #[test]
    fn insufficient_positional_parameters_is_an_error() {
        let schema = Schema::compile_format_string("VU").unwrap();
        let err = encode(&schema, &Value::Message(vec![Value::Unsigned(1)])).unwrap_err();
        assert!(matches!(err, CodecError::InsufficientParameters));
    }

    #[test]
    fn sparse_key_value_allows_missing_keys() {
        let mut schema =
            Schema::compile_key_value(&[crate::schema::KvField::field("id", "V")]).unwrap();
        schema.set_allow_sparse_dict(true);
        let bytes = encode(&schema, &Value::Map(HashMap::new())).unwrap();
        assert!(bytes.is_empty());
    }

    #[test]
    fn missing_key_without_sparse_flag_is_an_error() {
        let schema =
            Schema::compile_key_value(&[crate::schema::KvField::field("id", "V")]).unwrap();
        let err = encode(&schema, &Value::Map(HashMap::new())).unwrap_err();
        assert!(matches!(err, CodecError::MissingKey { .. }));
    }
}
