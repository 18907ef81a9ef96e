//! The key-value schema dialect: an ordered list of named fields, each
//! compiling to the same IR the format-string dialect produces.

use super::format_string::parse_single_field_spec;
use super::{FieldDescriptor, Prefix, Schema, ScalarType};
use crate::error::SchemaError;
use crate::leb128::MAX_TWOS_COMPLEMENT_WIDTH;

/// One entry in a key-value schema: either a scalar field or a nested
/// message field carrying its own sub-list of fields.
#[derive(Debug, Clone, PartialEq)]
pub enum KvField {
    /// `(name, spec)` -- a single scalar slot, `spec` being the same
    /// bracket-free fragment grammar the format-string dialect uses for one
    /// field (e.g. `"*V"`, `"x3"`, `"#i"`).
    Field { name: String, spec: String },
    /// `(name, prefix, nested)` -- a nested message, equivalent to format
    /// string `a[...]` under the given prefix.
    Nested {
        name: String,
        prefix: Prefix,
        nested: Vec<KvField>,
    },
}

impl KvField {
    pub fn field(name: impl Into<String>, spec: impl Into<String>) -> Self {
        KvField::Field {
            name: name.into(),
            spec: spec.into(),
        }
    }

    pub fn nested(name: impl Into<String>, prefix: Prefix, nested: Vec<KvField>) -> Self {
        KvField::Nested {
            name: name.into(),
            prefix,
            nested,
        }
    }

    fn name(&self) -> &str {
        match self {
            KvField::Field { name, .. } => name,
            KvField::Nested { name, .. } => name,
        }
    }
}

/// Compiles an ordered key-value field list into field descriptors, with
/// field numbers assigned purely by position (no `@N` seek in this dialect).
pub fn parse_key_value(spec: &[KvField]) -> Result<Vec<FieldDescriptor>, SchemaError> {
    let mut counter: u32 = 1;
    let mut out = Vec::with_capacity(spec.len());

    for entry in spec {
        match entry {
            KvField::Field { name, spec } => {
                let (prefix, scalar, repeat) = parse_single_field_spec(spec)?;
                if repeat > 1 && scalar != ScalarType::Skip {
                    return Err(SchemaError::CopyNotAllowed);
                }
                out.push(FieldDescriptor {
                    field_number: counter,
                    scalar,
                    prefix,
                    repeat,
                    subschema: None,
                    name: Some(name.clone()),
                });
                counter += repeat;
            }
            KvField::Nested {
                name,
                prefix,
                nested,
            } => {
                let sub_fields = parse_key_value(nested)?;
                out.push(FieldDescriptor {
                    field_number: counter,
                    scalar: ScalarType::Bytes,
                    prefix: *prefix,
                    repeat: 1,
                    subschema: Some(Box::new(Schema {
                        fields: sub_fields,
                        twos_complement_width: MAX_TWOS_COMPLEMENT_WIDTH,
                        allow_sparse_dict: false,
                    })),
                    name: Some(name.clone()),
                });
                counter += 1;
            }
        }
    }

    Ok(out)
}
