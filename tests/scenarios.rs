//! End-to-end encode/decode tests covering the wire format against known byte
//! layouts.

use minipb::value::Value;
use minipb::{decode, encode, Schema};

#[test]
fn small_unsigned_varint() {
    let schema = Schema::compile_format_string("V").unwrap();
    let value = Value::Message(vec![Value::Unsigned(150)]);
    let wire = encode(&schema, &value).unwrap();
    assert_eq!(wire, vec![0x08, 0x96, 0x01]);
    assert_eq!(decode(&schema, &wire).unwrap(), value);
}

#[test]
fn packed_repeated_varint() {
    let schema = Schema::compile_format_string("x3#V").unwrap();
    let value = Value::Message(vec![Value::List(vec![
        Value::Unsigned(3),
        Value::Unsigned(270),
        Value::Unsigned(86942),
    ])]);
    let wire = encode(&schema, &value).unwrap();
    assert_eq!(wire, vec![0x22, 0x06, 0x03, 0x8E, 0x02, 0x9E, 0xA7, 0x05]);
    assert_eq!(decode(&schema, &wire).unwrap(), value);
}

#[test]
fn nested_message_round_trips() {
    let schema = Schema::compile_format_string("x2[V]").unwrap();
    let value = Value::Message(vec![Value::Message(vec![Value::Unsigned(150)])]);
    let wire = encode(&schema, &value).unwrap();
    assert_eq!(wire, vec![0x1A, 0x03, 0x08, 0x96, 0x01]);
    assert_eq!(decode(&schema, &wire).unwrap(), value);
}

#[test]
fn twos_complement_width_is_schema_level() {
    let mut schema = Schema::compile_format_string("t").unwrap();
    schema.set_twos_complement_width(32);
    let value = Value::Message(vec![Value::Signed(-1)]);
    let wire = encode(&schema, &value).unwrap();
    assert_eq!(wire, vec![0x08, 0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
    assert_eq!(decode(&schema, &wire).unwrap(), value);

    let default_schema = Schema::compile_format_string("t").unwrap();
    let default_wire = encode(&default_schema, &value).unwrap();
    assert_eq!(
        default_wire,
        vec![0x08, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]
    );
}

#[test]
fn truncation_raises_codec_error() {
    let schema = Schema::compile_format_string("xU").unwrap();
    let wire = [0x12, 0x07, 0x74, 0x65, 0x73, 0x74, 0x69];
    let err = decode(&schema, &wire).unwrap_err();
    assert!(err.to_string().contains("Unexpected end of message"));
}

#[test]
fn overlap_raises_bad_format_string() {
    let err = Schema::compile_format_string("VU@1").unwrap_err();
    assert!(err.to_string().contains("Multiple definitions found"));
}

#[test]
fn raw_round_trip() {
    let schema = Schema::compile_format_string("iIfqQd").unwrap();
    let value = Value::Message(vec![
        Value::Signed(-1),
        Value::Unsigned(1),
        Value::Float(1.0),
        Value::Signed(-12345678900),
        Value::Unsigned(1234567890),
        Value::Double(std::f64::consts::PI),
    ]);
    let wire = encode(&schema, &value).unwrap();

    let records: Vec<_> = minipb::raw::breakdown(&wire).collect::<Result<_, _>>().unwrap();
    let re_encoded = minipb::raw::encode_raw(&records).unwrap();
    assert_eq!(re_encoded, wire);
}

#[test]
fn the_three_dialects_agree_on_wire_output_for_an_equivalent_schema() {
    // Format string "VU": field 1 unsigned varint, field 2 string.
    let format_string_schema = Schema::compile_format_string("VU").unwrap();
    let key_value_schema = Schema::compile_key_value(&[
        minipb::schema::KvField::field("id", "V"),
        minipb::schema::KvField::field("name", "U"),
    ])
    .unwrap();

    let positional = Value::Message(vec![Value::Unsigned(7), Value::String("hi".into())]);
    let keyed = Value::Map(
        [
            ("id".to_owned(), Value::Unsigned(7)),
            ("name".to_owned(), Value::String("hi".into())),
        ]
        .into_iter()
        .collect(),
    );

    let wire_from_format_string = encode(&format_string_schema, &positional).unwrap();
    let wire_from_key_value = encode(&key_value_schema, &keyed).unwrap();
    assert_eq!(wire_from_format_string, wire_from_key_value);
}
