//! The intermediate representation (IR) shared by both schema dialects, and
//! the compiled [`Schema`] handed to the encoder and decoder.

mod format_string;
mod key_value;
mod overlap;

pub use format_string::parse_format_string;
pub use key_value::{parse_key_value, KvField};

use crate::error::SchemaError;
use crate::leb128::MAX_TWOS_COMPLEMENT_WIDTH;
use crate::wire::{WireType, MAX_FIELD_NUMBER, MIN_FIELD_NUMBER, RESERVED_FIELD_NUMBER_RANGE};
use overlap::IntervalSet;

/// A scalar type mnemonic, after resolving aliases (`v`, `V`, `l`, `L`, `u`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    /// `x`: reserves field numbers without emitting or consuming bytes.
    Skip,
    /// `t`: signed, two's-complement varint.
    SignedTwosComplement,
    /// `T`: unsigned varint.
    UnsignedVarint,
    /// `z`: signed, zig-zag varint.
    ZigZag,
    /// `b`: boolean, encoded as a varint 0/1.
    Bool,
    /// `i`: signed 32-bit fixed.
    Fixed32Signed,
    /// `I`: unsigned 32-bit fixed.
    Fixed32Unsigned,
    /// `q`: signed 64-bit fixed.
    Fixed64Signed,
    /// `Q`: unsigned 64-bit fixed.
    Fixed64Unsigned,
    /// `f`: IEEE-754 float32.
    Float32,
    /// `d`: IEEE-754 float64.
    Float64,
    /// `a`: raw bytes, or a nested message when a subschema is attached.
    Bytes,
    /// `U`: UTF-8 string.
    Utf8String,
}

impl ScalarType {
    /// Resolves a format-string character (including aliases) to a
    /// [`ScalarType`]. Returns `None` for anything that isn't a type character.
    pub(crate) fn from_char(c: char) -> Option<Self> {
        use ScalarType::*;
        Some(match c {
            'x' => Skip,
            't' => SignedTwosComplement,
            'T' => UnsignedVarint,
            'z' => ZigZag,
            'b' => Bool,
            'i' => Fixed32Signed,
            'I' => Fixed32Unsigned,
            'q' => Fixed64Signed,
            'Q' => Fixed64Unsigned,
            'f' => Float32,
            'd' => Float64,
            'a' => Bytes,
            'U' => Utf8String,
            // Aliases.
            'v' => ZigZag,
            'V' => UnsignedVarint,
            'l' => Fixed32Signed,
            'L' => Fixed32Unsigned,
            'u' => Utf8String,
            _ => return None,
        })
    }

    /// The wire type this scalar is encoded with. `None` for `Skip`, which
    /// performs no wire I/O at all.
    pub fn wire_type(self) -> Option<WireType> {
        use ScalarType::*;
        match self {
            Skip => None,
            SignedTwosComplement | UnsignedVarint | ZigZag | Bool => Some(WireType::Varint),
            Fixed32Signed | Fixed32Unsigned | Float32 => Some(WireType::I32),
            Fixed64Signed | Fixed64Unsigned | Float64 => Some(WireType::I64),
            Bytes | Utf8String => Some(WireType::Len),
        }
    }
}

/// How a field's occurrences are laid out on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prefix {
    /// A single optional occurrence.
    None,
    /// A single mandatory occurrence; absence is an error on both ends.
    Required,
    /// Zero or more occurrences, each with its own header.
    Repeated,
    /// Zero or more occurrences, concatenated under a single length-delimited header.
    PackedRepeated,
}

/// One slot in the compiled schema IR.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub field_number: u32,
    pub scalar: ScalarType,
    pub prefix: Prefix,
    /// Number of consecutive field numbers this descriptor occupies.
    /// Always 1 except for parse-time field copies (`x3`, etc).
    pub repeat: u32,
    /// Present only when `scalar == ScalarType::Bytes` and the field nests a
    /// full message rather than holding opaque bytes.
    pub subschema: Option<Box<Schema>>,
    /// Present only in key-value-dialect schemas.
    pub name: Option<String>,
}

/// A compiled schema: an ordered list of field descriptors plus the
/// per-schema settings that affect encoding (two's-complement width,
/// sparse key-value tolerance).
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub(crate) fields: Vec<FieldDescriptor>,
    pub(crate) twos_complement_width: u8,
    pub(crate) allow_sparse_dict: bool,
}

impl Schema {
    /// Compiles a format-string schema (`"x3#V"`, `"V2@2U@10U@20"`, ...).
    pub fn compile_format_string(fmt: &str) -> Result<Self, SchemaError> {
        let fields = parse_format_string(fmt)?;
        Self::from_fields(fields)
    }

    /// Compiles a key-value schema: an ordered list of `(name, spec[, nested])`.
    pub fn compile_key_value(spec: &[KvField]) -> Result<Self, SchemaError> {
        let fields = parse_key_value(spec)?;
        Self::from_fields(fields)
    }

    fn from_fields(fields: Vec<FieldDescriptor>) -> Result<Self, SchemaError> {
        check_overlaps(&fields)?;
        validate_fields(&fields)?;
        Ok(Schema {
            fields,
            twos_complement_width: MAX_TWOS_COMPLEMENT_WIDTH,
            allow_sparse_dict: false,
        })
    }

    /// Sets the two's-complement width (1..=64) used to encode `t` fields.
    /// Affects this schema and any subschema compiled together with it, but
    /// not independently-compiled nested schemas.
    pub fn set_twos_complement_width(&mut self, width: u8) {
        assert!(
            (1..=MAX_TWOS_COMPLEMENT_WIDTH).contains(&width),
            "two's-complement width must be in 1..=64"
        );
        self.twos_complement_width = width;
    }

    pub fn twos_complement_width(&self) -> u8 {
        self.twos_complement_width
    }

    /// When set, the key-value encoder treats a missing map key as an absent
    /// (not required) value instead of raising an error.
    pub fn set_allow_sparse_dict(&mut self, allow: bool) {
        self.allow_sparse_dict = allow;
    }

    pub fn allow_sparse_dict(&self) -> bool {
        self.allow_sparse_dict
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }
}

fn validate_fields(fields: &[FieldDescriptor]) -> Result<(), SchemaError> {
    for field in fields {
        validate_field(field)?;
        if let Some(sub) = &field.subschema {
            validate_fields(&sub.fields)?;
        }
    }
    Ok(())
}

fn validate_field(field: &FieldDescriptor) -> Result<(), SchemaError> {
    // The whole [field_number, end) range this descriptor occupies must fit
    // the protobuf field number space, not just its start.
    let end = field
        .field_number
        .checked_add(field.repeat)
        .filter(|&end| field.field_number >= MIN_FIELD_NUMBER && end - 1 <= MAX_FIELD_NUMBER)
        .ok_or(SchemaError::FieldNumberOutOfRange {
            field_number: field.field_number,
        })?;

    // Skip fields reserve field numbers without ever emitting a header, so
    // letting their range pass through the band is harmless; a field that
    // actually puts bytes on the wire there is not.
    if field.scalar != ScalarType::Skip
        && field.field_number < RESERVED_FIELD_NUMBER_RANGE.end
        && end > RESERVED_FIELD_NUMBER_RANGE.start
    {
        return Err(SchemaError::ReservedFieldNumber {
            field_number: field.field_number.max(RESERVED_FIELD_NUMBER_RANGE.start),
        });
    }
    if field.subschema.is_some() && field.scalar != ScalarType::Bytes {
        return Err(SchemaError::SubschemaRequiresBytesType);
    }
    if field.prefix == Prefix::PackedRepeated {
        let is_scalar_wire_type = matches!(
            field.scalar.wire_type(),
            Some(WireType::Varint) | Some(WireType::I32) | Some(WireType::I64)
        );
        if field.subschema.is_some() || !is_scalar_wire_type {
            return Err(SchemaError::PackedRequiresScalarWireType);
        }
    }
    Ok(())
}

fn check_overlaps(fields: &[FieldDescriptor]) -> Result<(), SchemaError> {
    let mut intervals = IntervalSet::new();
    for field in fields {
        intervals.insert(field.field_number, field.repeat, field.name.as_deref())?;
        if let Some(sub) = &field.subschema {
            check_overlaps(&sub.fields)?;
        }
    }
    Ok(())
}
