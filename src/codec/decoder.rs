//! Schema-driven decoder: runs the raw breakdown over wire bytes, groups
//! records by field number, and projects them through a compiled [`Schema`]
//! into a [`Value`].

use std::collections::HashMap;

use crate::error::CodecError;
use crate::leb128::{twos_complement_decode, zigzag_decode};
use crate::raw::{breakdown, headerless_breakdown, RawPayload, RawRecord};
use crate::schema::{FieldDescriptor, Prefix, ScalarType, Schema};
use crate::value::Value;
use crate::wire::WireType;

/// Records collected from a wire message, keyed by field number and kept in
/// wire order per key.
type RecordMap = HashMap<u32, Vec<RawRecord>>;

/// Decodes `bytes` against `schema`, producing [`Value::Message`] for a
/// positional (format-string) schema or [`Value::Map`] for a key-value one.
pub fn decode(schema: &Schema, bytes: &[u8]) -> Result<Value, CodecError> {
    let records = collect_records(bytes)?;
    let width = schema.twos_complement_width();
    let is_keyed = schema.fields().iter().any(|f| f.name.is_some());
    if is_keyed {
        decode_keyed(schema.fields(), &records, width).map(Value::Map)
    } else {
        decode_positional(schema.fields(), &records, width).map(Value::Message)
    }
}

fn collect_records(bytes: &[u8]) -> Result<RecordMap, CodecError> {
    let mut map: RecordMap = HashMap::new();
    for record in breakdown(bytes) {
        let record = record?;
        map.entry(record.id).or_default().push(record);
    }
    Ok(map)
}

fn decode_positional(
    fields: &[FieldDescriptor],
    records: &RecordMap,
    width: u8,
) -> Result<Vec<Value>, CodecError> {
    let mut out = Vec::new();
    for field in fields {
        for copy in 0..field.repeat {
            if field.scalar == ScalarType::Skip {
                continue;
            }
            let field_number = field.field_number + copy;
            out.push(decode_field(field, field_number, records.get(&field_number), width)?);
        }
    }
    Ok(out)
}

fn decode_keyed(
    fields: &[FieldDescriptor],
    records: &RecordMap,
    width: u8,
) -> Result<HashMap<String, Value>, CodecError> {
    let mut out = HashMap::new();
    for field in fields {
        if field.scalar == ScalarType::Skip {
            continue;
        }
        let name = field
            .name
            .clone()
            .expect("key-value schema fields always carry a name");
        let value = decode_field(field, field.field_number, records.get(&field.field_number), width)?;
        out.insert(name, value);
    }
    Ok(out)
}

/// Projects the records collected for one descriptor into a single [`Value`],
/// dispatching on how many records showed up and the descriptor's prefix:
/// none -> `Null` (or an error if required), one -> decode directly, several
/// -> repeated collects them all, packed-repeated unpacks the concatenated
/// payload, and a singular field with several records falls through to
/// [`decode_singular`]'s merge/last-wins rule.
fn decode_field(
    field: &FieldDescriptor,
    field_number: u32,
    records: Option<&Vec<RawRecord>>,
    width: u8,
) -> Result<Value, CodecError> {
    let records: &[RawRecord] = records.map(Vec::as_slice).unwrap_or(&[]);
    log::debug!(
        "decode_field(): field {field_number} ({:?}, {:?}) has {} record(s)",
        field.scalar,
        field.prefix,
        records.len()
    );

    if records.is_empty() {
        return if field.prefix == Prefix::Required {
            Err(CodecError::RequiredFieldMissing)
        } else {
            Ok(Value::Null)
        };
    }

    match field.prefix {
        Prefix::Repeated => {
            let items = records
                .iter()
                .map(|r| decode_scalar(field, field_number, r, width))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::List(items))
        }
        Prefix::PackedRepeated => decode_packed(field, field_number, records, width),
        Prefix::None | Prefix::Required => decode_singular(field, field_number, records, width),
    }
}

/// A `none`/`required` field with one or more records: single record decodes
/// directly; multiple records either "last one wins" (scalars) or merge by
/// payload concatenation (nested messages, the same merge behavior protobuf
/// itself uses for repeated embedded-message records on a singular field).
fn decode_singular(
    field: &FieldDescriptor,
    field_number: u32,
    records: &[RawRecord],
    width: u8,
) -> Result<Value, CodecError> {
    if records.len() == 1 {
        return decode_scalar(field, field_number, &records[0], width);
    }

    if field.subschema.is_some() {
        log::warn!(
            "decode(): field {field_number} has {} embedded-message records, merging by payload concatenation",
            records.len()
        );
        let merged = concat_length_delimited_payloads(field_number, records)?;
        let sub = field.subschema.as_ref().expect("checked above");
        return decode(sub, &merged);
    }

    log::warn!(
        "decode(): field {field_number} has {} records for a singular field, using the last",
        records.len()
    );
    decode_scalar(field, field_number, records.last().expect("non-empty"), width)
}

fn decode_packed(
    field: &FieldDescriptor,
    field_number: u32,
    records: &[RawRecord],
    width: u8,
) -> Result<Value, CodecError> {
    if records.len() > 1 {
        log::warn!(
            "decode(): field {field_number} has {} packed-repeated records, concatenating",
            records.len()
        );
    }
    let payload = concat_length_delimited_payloads(field_number, records)?;
    let expected_wire_type = field
        .scalar
        .wire_type()
        .expect("non-skip field always has a wire type")
        .into_val();
    let inner_records = headerless_breakdown(&payload, expected_wire_type, field_number)?;
    let items = inner_records
        .iter()
        .map(|r| decode_scalar(field, field_number, r, width))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::List(items))
}

fn concat_length_delimited_payloads(
    field_number: u32,
    records: &[RawRecord],
) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    for record in records {
        match &record.payload {
            RawPayload::Bytes(bytes) => out.extend_from_slice(bytes),
            _ => return Err(CodecError::PackedNotLengthDelimited { field_number }),
        }
    }
    Ok(out)
}

fn decode_scalar(
    field: &FieldDescriptor,
    field_number: u32,
    record: &RawRecord,
    width: u8,
) -> Result<Value, CodecError> {
    use ScalarType::*;

    let expected = field
        .scalar
        .wire_type()
        .expect("non-skip field always has a wire type");
    if record.wire_type != expected.into_val() {
        return Err(CodecError::WireTypeMismatch {
            field_number,
            expected: expected.into_val(),
            actual: record.wire_type,
        });
    }

    match field.scalar {
        Skip => unreachable!("skip fields never reach decode_scalar"),
        SignedTwosComplement => {
            let raw = varint_payload(field_number, record)?;
            Ok(Value::Signed(twos_complement_decode(raw, width)))
        }
        UnsignedVarint => Ok(Value::Unsigned(varint_payload(field_number, record)?)),
        ZigZag => Ok(Value::Signed(zigzag_decode(varint_payload(field_number, record)?))),
        Bool => Ok(Value::Bool(varint_payload(field_number, record)? != 0)),
        Fixed32Signed => {
            let bytes = fixed32_payload(record);
            Ok(Value::Signed(i32::from_le_bytes(bytes) as i64))
        }
        Fixed32Unsigned => {
            let bytes = fixed32_payload(record);
            Ok(Value::Unsigned(u32::from_le_bytes(bytes) as u64))
        }
        Fixed64Signed => {
            let bytes = fixed64_payload(record);
            Ok(Value::Signed(i64::from_le_bytes(bytes)))
        }
        Fixed64Unsigned => {
            let bytes = fixed64_payload(record);
            Ok(Value::Unsigned(u64::from_le_bytes(bytes)))
        }
        Float32 => {
            let bytes = fixed32_payload(record);
            Ok(Value::Float(f32::from_le_bytes(bytes)))
        }
        Float64 => {
            let bytes = fixed64_payload(record);
            Ok(Value::Double(f64::from_le_bytes(bytes)))
        }
        Utf8String => {
            let bytes = bytes_payload(field_number, record)?;
            String::from_utf8(bytes.to_vec())
                .map(Value::String)
                .map_err(|_| CodecError::InvalidUtf8 { field_number })
        }
        Bytes => {
            let bytes = bytes_payload(field_number, record)?;
            match &field.subschema {
                Some(sub) => decode(sub, bytes),
                None => Ok(Value::Bytes(bytes.to_vec())),
            }
        }
    }
}

fn varint_payload(field_number: u32, record: &RawRecord) -> Result<u64, CodecError> {
    match record.payload {
        RawPayload::Varint(v) => Ok(v),
        _ => Err(CodecError::WireTypeMismatch {
            field_number,
            expected: WireType::Varint.into_val(),
            actual: record.wire_type,
        }),
    }
}

fn fixed32_payload(record: &RawRecord) -> [u8; 4] {
    match record.payload {
        RawPayload::Fixed32(bytes) => bytes,
        _ => unreachable!("wire type already checked to be I32"),
    }
}

fn fixed64_payload(record: &RawRecord) -> [u8; 8] {
    match record.payload {
        RawPayload::Fixed64(bytes) => bytes,
        _ => unreachable!("wire type already checked to be I64"),
    }
}

fn bytes_payload(field_number: u32, record: &RawRecord) -> Result<&[u8], CodecError> {
    match &record.payload {
        RawPayload::Bytes(bytes) => Ok(bytes),
        _ => Err(CodecError::WireTypeMismatch {
            field_number,
            expected: WireType::Len.into_val(),
            actual: record.wire_type,
        }),
    }
}
