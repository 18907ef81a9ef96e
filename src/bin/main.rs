//! `minipb` -- a thin CLI front-end over the schema-driven codec.
//!
//! `minipb -e <schema>` reads JSON on stdin and writes encoded protobuf
//! bytes to stdout. `minipb -d <schema>` does the inverse. `<schema>` is a
//! format-string, see [`minipb::schema`].

use std::io::{Read, Write};
use std::process::ExitCode;

use clap::Parser;
use minipb::schema::{FieldDescriptor, Prefix, ScalarType};
use minipb::{CodecError, Schema, SchemaError, Value};

#[derive(Parser)]
#[command(
    name = "minipb",
    about = "Schema-driven protobuf encode/decode with no .proto files"
)]
struct Cli {
    /// Read JSON on stdin, write encoded bytes to stdout.
    #[arg(short = 'e', long = "encode", value_name = "SCHEMA")]
    encode: Option<String>,

    /// Read encoded bytes on stdin, write JSON to stdout.
    #[arg(short = 'd', long = "decode", value_name = "SCHEMA")]
    decode: Option<String>,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("exactly one of -e/--encode or -d/--decode is required")]
    UsageConflict,
    #[error("expected a JSON array for a positional message value")]
    ExpectedArray,
    #[error("missing JSON value for positional field {index}")]
    MissingPositionalValue { index: usize },
    #[error("JSON value has the wrong type for its schema field")]
    WrongJsonType,
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(_) => return ExitCode::from(1),
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("minipb: {err}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match (cli.encode, cli.decode) {
        (Some(schema_str), None) => run_encode(&schema_str),
        (None, Some(schema_str)) => run_decode(&schema_str),
        _ => Err(CliError::UsageConflict),
    }
}

fn run_encode(schema_str: &str) -> Result<(), CliError> {
    let schema = Schema::compile_format_string(schema_str)?;

    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;
    let json: serde_json::Value = serde_json::from_str(&input)?;

    let value = message_from_json(schema.fields(), &json)?;
    let bytes = minipb::encode(&schema, &value)?;

    std::io::stdout().write_all(&bytes)?;
    Ok(())
}

fn run_decode(schema_str: &str) -> Result<(), CliError> {
    let schema = Schema::compile_format_string(schema_str)?;

    let mut bytes = Vec::new();
    std::io::stdin().read_to_end(&mut bytes)?;

    let value = minipb::decode(&schema, &bytes)?;
    let json = value_to_json(&value);
    println!("{}", serde_json::to_string(&json)?);
    Ok(())
}

/// Converts a JSON array into the positional [`Value::Message`] a
/// format-string schema's encoder expects, one array element per non-skip
/// descriptor slot (expanding `repeat` copies, matching `encode_positional`).
fn message_from_json(
    fields: &[FieldDescriptor],
    json: &serde_json::Value,
) -> Result<Value, CliError> {
    let items = json.as_array().ok_or(CliError::ExpectedArray)?;
    let mut index = 0usize;
    let mut out = Vec::new();
    for field in fields {
        if field.scalar == ScalarType::Skip {
            continue;
        }
        for _ in 0..field.repeat {
            let item = items
                .get(index)
                .ok_or(CliError::MissingPositionalValue { index })?;
            index += 1;
            out.push(field_value_from_json(field, item)?);
        }
    }
    Ok(Value::Message(out))
}

fn field_value_from_json(
    field: &FieldDescriptor,
    json: &serde_json::Value,
) -> Result<Value, CliError> {
    match field.prefix {
        Prefix::Repeated | Prefix::PackedRepeated => {
            let items = json.as_array().ok_or(CliError::ExpectedArray)?;
            let values = items
                .iter()
                .map(|item| scalar_from_json(field, item))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::List(values))
        }
        Prefix::None | Prefix::Required if json.is_null() => Ok(Value::Null),
        Prefix::None | Prefix::Required => scalar_from_json(field, json),
    }
}

fn scalar_from_json(field: &FieldDescriptor, json: &serde_json::Value) -> Result<Value, CliError> {
    use ScalarType::*;
    match field.scalar {
        Skip => Ok(Value::Null),
        Bool => json.as_bool().map(Value::Bool).ok_or(CliError::WrongJsonType),
        SignedTwosComplement | ZigZag | Fixed32Signed | Fixed64Signed => {
            json.as_i64().map(Value::Signed).ok_or(CliError::WrongJsonType)
        }
        UnsignedVarint | Fixed32Unsigned | Fixed64Unsigned => {
            json.as_u64().map(Value::Unsigned).ok_or(CliError::WrongJsonType)
        }
        Float32 => json
            .as_f64()
            .map(|f| Value::Float(f as f32))
            .ok_or(CliError::WrongJsonType),
        Float64 => json.as_f64().map(Value::Double).ok_or(CliError::WrongJsonType),
        Utf8String => json
            .as_str()
            .map(|s| Value::String(s.to_owned()))
            .ok_or(CliError::WrongJsonType),
        Bytes => match &field.subschema {
            Some(sub) => message_from_json(sub.fields(), json),
            None => {
                let items = json.as_array().ok_or(CliError::ExpectedArray)?;
                let bytes = items
                    .iter()
                    .map(|n| n.as_u64().map(|v| v as u8).ok_or(CliError::WrongJsonType))
                    .collect::<Result<Vec<u8>, _>>()?;
                Ok(Value::Bytes(bytes))
            }
        },
    }
}

/// Converts a decoded [`Value`] into JSON. Unlike the encode direction this
/// needs no schema: every `Value` variant has one unambiguous JSON shape.
/// Bytes are rendered as an array of byte values (`[u8]`), since JSON has no
/// native binary type.
fn value_to_json(value: &Value) -> serde_json::Value {
    use serde_json::Value as Json;
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Signed(n) => Json::Number((*n).into()),
        Value::Unsigned(n) => Json::Number((*n).into()),
        Value::Float(f) => serde_json::Number::from_f64(*f as f64)
            .map(Json::Number)
            .unwrap_or(Json::Null),
        Value::Double(d) => serde_json::Number::from_f64(*d)
            .map(Json::Number)
            .unwrap_or(Json::Null),
        Value::Bytes(bytes) => Json::Array(bytes.iter().map(|b| Json::Number((*b).into())).collect()),
        Value::String(s) => Json::String(s.clone()),
        Value::List(items) | Value::Message(items) => {
            Json::Array(items.iter().map(value_to_json).collect())
        }
        Value::Map(map) => Json::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), value_to_json(v)))
                .collect(),
        ),
    }
}
