//! Integration tests for wire data that doesn't match the schema: unknown
//! field numbers are silently ignored, and unknown wire types (3, 4) are
//! logged and skipped by the raw codec.

use minipb::value::Value;
use minipb::{decode, encode, Schema};

#[test]
fn unknown_field_numbers_in_the_wire_are_ignored() {
    // Schema only knows about field 1; field 99 is present in the wire but
    // has no descriptor to claim it.
    let schema = Schema::compile_format_string("V").unwrap();

    let mut wire = Vec::new();
    wire.extend(minipb::leb128::write_varint((99 << 3) | 0)); // tag: field 99, varint
    wire.extend(minipb::leb128::write_varint(12345));
    wire.extend(minipb::leb128::write_varint((1 << 3) | 0)); // tag: field 1, varint
    wire.extend(minipb::leb128::write_varint(7));

    let value = decode(&schema, &wire).unwrap();
    assert_eq!(value, Value::Message(vec![Value::Unsigned(7)]));
}

#[test]
fn unknown_wire_type_record_is_skipped_by_raw_breakdown() {
    // Field 1 as wire type 3 (SGroup, unsupported) followed by a clean
    // field 2 varint record.
    let wire = [0x0B, 0x10, 0x2A];
    let records: Vec<_> = minipb::raw::breakdown(&wire).collect::<Result<_, _>>().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, 2);
}

#[test]
fn extending_a_schema_with_new_fields_preserves_old_data() {
    let old_schema = Schema::compile_format_string("V").unwrap();
    let new_schema = Schema::compile_format_string("VU").unwrap();

    let old_value = Value::Message(vec![Value::Unsigned(42)]);
    let wire = encode(&old_schema, &old_value).unwrap();

    // Decoding old wire bytes against a schema with an extra optional field
    // yields Null for the field that was never written.
    let decoded = decode(&new_schema, &wire).unwrap();
    assert_eq!(
        decoded,
        Value::Message(vec![Value::Unsigned(42), Value::Null])
    );
}
