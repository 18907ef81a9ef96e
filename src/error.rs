//! Error taxonomy for schema compilation, encoding and decoding.
//!
//! Three kinds of failure exist in this crate: a schema that never compiles
//! ([`SchemaError`]), a wire operation that fails against an otherwise valid
//! schema ([`CodecError`]), and an internal end-of-message signal used only
//! by the primitive and raw codecs (`Eof`, not exported).

use thiserror::Error;

/// Raised while compiling a format-string or key-value schema into the IR.
///
/// Once a [`crate::schema::Schema`] exists it cannot have this error; schema
/// compilation either fully succeeds or the `Schema` is never constructed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("unmatched brace at position {position}")]
    UnmatchedBrace { position: usize },

    #[error("invalid token at position {position}")]
    InvalidToken { position: usize },

    #[error("trailing input after field at position {position}")]
    TrailingInput { position: usize },

    #[error("field {field_number} is reserved for protobuf internal use (19000-19999)")]
    ReservedFieldNumber { field_number: u32 },

    #[error("field {field_number} is outside the valid range 1..=536870911 (2^29 - 1)")]
    FieldNumberOutOfRange { field_number: u32 },

    #[error(
        "Multiple definitions found for field {field_number}{}",
        name.as_ref().map(|n| format!(" ({n})")).unwrap_or_default()
    )]
    OverlappingFieldNumber {
        field_number: u32,
        name: Option<String>,
    },

    #[error("field copy (repeat > 1) is only allowed for skip ('x') fields in key-value schemas")]
    CopyNotAllowed,

    #[error("packed-repeated fields must have a fixed or varint inner wire type, not length-delimited")]
    PackedRequiresScalarWireType,

    #[error("a nested subschema requires field type 'a'")]
    SubschemaRequiresBytesType,
}

/// Raised while encoding a [`crate::value::Value`] or decoding wire bytes
/// against a compiled [`crate::schema::Schema`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CodecError {
    #[error("required field cannot be None")]
    RequiredFieldMissing,

    #[error("insufficient parameters (empty fields not padded with None)")]
    InsufficientParameters,

    #[error("Unexpected end of message while decoding field {field_number}")]
    UnexpectedEndOfMessage { field_number: u32 },

    #[error("wire type mismatch for field {field_number} (expected {expected}, got {actual})")]
    WireTypeMismatch {
        field_number: u32,
        expected: u8,
        actual: u8,
    },

    #[error("packed-repeated field {field_number} does not have a length-delimited payload")]
    PackedNotLengthDelimited { field_number: u32 },

    #[error("invalid UTF-8 in string field {field_number}")]
    InvalidUtf8 { field_number: u32 },

    #[error("expected a bytes value of length {expected}, got {actual}")]
    WrongLengthValue { expected: usize, actual: usize },

    #[error("unknown wire type {value}")]
    UnknownWireType { value: u8 },

    #[error("value for field {field_number} has the wrong shape for its descriptor")]
    WrongShape { field_number: u32 },

    #[error("missing key {name:?} in key-value input")]
    MissingKey { name: String },
}

/// Internal end-of-message signal, distinguishing a clean stop at a record
/// boundary from a truncation partway through one.
///
/// Never escapes the crate boundary: callers only ever see [`CodecError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Eof {
    pub partial: bool,
}
