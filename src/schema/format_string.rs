//! The format-string schema dialect: a struct-like syntax of single
//! characters, optional prefixes, bracketed nesting, and `@N` field seeks.

use super::{FieldDescriptor, Prefix, Schema, ScalarType};
use crate::error::SchemaError;

/// Compiles a format string into field descriptors with field numbers
/// resolved (starting at 1, honoring repeats and `@N` seeks).
pub fn parse_format_string(input: &str) -> Result<Vec<FieldDescriptor>, SchemaError> {
    parse_fields(input).map(|(fields, _next)| fields)
}

fn parse_fields(input: &str) -> Result<(Vec<FieldDescriptor>, u32), SchemaError> {
    let bytes = input.as_bytes();
    let mut ptr = 0usize;
    let mut counter: u32 = 1;
    let mut out = Vec::new();

    while ptr < bytes.len() {
        let prefix = parse_prefix(bytes, &mut ptr);

        if ptr >= bytes.len() {
            return Err(SchemaError::InvalidToken { position: ptr });
        }

        if bytes[ptr] == b'[' {
            let close = match_brace(bytes, ptr)?;
            let inner = &input[ptr + 1..close];
            let (sub_fields, _) = parse_fields(inner)?;
            let field_number = counter;
            ptr = close + 1;

            let seek = parse_optional_seek(input, bytes, &mut ptr)?;

            out.push(FieldDescriptor {
                field_number,
                scalar: ScalarType::Bytes,
                prefix,
                repeat: 1,
                subschema: Some(Box::new(Schema {
                    fields: sub_fields,
                    twos_complement_width: crate::leb128::MAX_TWOS_COMPLEMENT_WIDTH,
                    allow_sparse_dict: false,
                })),
                name: None,
            });

            counter = seek.unwrap_or(field_number + 1);
            continue;
        }

        let scalar = ScalarType::from_char(bytes[ptr] as char)
            .ok_or(SchemaError::InvalidToken { position: ptr })?;
        ptr += 1;

        let repeat = parse_optional_repeat(input, bytes, &mut ptr)?;
        let seek = parse_optional_seek(input, bytes, &mut ptr)?;

        let field_number = seek.unwrap_or(counter);
        out.push(FieldDescriptor {
            field_number,
            scalar,
            prefix,
            repeat,
            subschema: None,
            name: None,
        });
        counter = field_number + repeat;
    }

    Ok((out, counter))
}

fn parse_prefix(bytes: &[u8], ptr: &mut usize) -> Prefix {
    match bytes.get(*ptr) {
        Some(b'*') => {
            *ptr += 1;
            Prefix::Required
        }
        Some(b'+') => {
            *ptr += 1;
            Prefix::Repeated
        }
        Some(b'#') => {
            *ptr += 1;
            Prefix::PackedRepeated
        }
        _ => Prefix::None,
    }
}

fn parse_optional_repeat(input: &str, bytes: &[u8], ptr: &mut usize) -> Result<u32, SchemaError> {
    let start = *ptr;
    while *ptr < bytes.len() && bytes[*ptr].is_ascii_digit() {
        *ptr += 1;
    }
    if start == *ptr {
        return Ok(1);
    }
    let repeat: u32 = input[start..*ptr]
        .parse()
        .map_err(|_| SchemaError::InvalidToken { position: start })?;
    if repeat == 0 {
        return Err(SchemaError::InvalidToken { position: start });
    }
    Ok(repeat)
}

fn parse_optional_seek(
    input: &str,
    bytes: &[u8],
    ptr: &mut usize,
) -> Result<Option<u32>, SchemaError> {
    if bytes.get(*ptr) != Some(&b'@') {
        return Ok(None);
    }
    *ptr += 1;
    let start = *ptr;
    while *ptr < bytes.len() && bytes[*ptr].is_ascii_digit() {
        *ptr += 1;
    }
    if start == *ptr {
        return Err(SchemaError::InvalidToken { position: start });
    }
    let target: u32 = input[start..*ptr]
        .parse()
        .map_err(|_| SchemaError::InvalidToken { position: start })?;
    Ok(Some(target))
}

fn match_brace(bytes: &[u8], start: usize) -> Result<usize, SchemaError> {
    debug_assert_eq!(bytes[start], b'[');
    let mut depth = 1i32;
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    Err(SchemaError::UnmatchedBrace { position: start })
}

/// Parses a bracket-free single-field fragment (used by the key-value
/// dialect): an optional prefix, a type character, and an optional repeat
/// digit run. No `@N` seek and no nested group is allowed here -- the
/// key-value dialect carries nesting out-of-band via its own tuple shape.
pub(crate) fn parse_single_field_spec(
    spec: &str,
) -> Result<(Prefix, ScalarType, u32), SchemaError> {
    let bytes = spec.as_bytes();
    let mut ptr = 0usize;
    let prefix = parse_prefix(bytes, &mut ptr);

    let scalar = ScalarType::from_char(*spec.get(ptr..).and_then(|s| s.chars().next()).as_ref().unwrap_or(&'\0'))
        .ok_or(SchemaError::InvalidToken { position: ptr })?;
    ptr += 1;

    let repeat = parse_optional_repeat(spec, bytes, &mut ptr)?;

    if ptr != bytes.len() {
        return Err(SchemaError::TrailingInput { position: ptr });
    }

    Ok((prefix, scalar, repeat))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Prefix;

    fn descriptors(fmt: &str) -> Vec<FieldDescriptor> {
        parse_format_string(fmt).unwrap()
    }

    #[test]
    fn simple_unsigned_field() {
        let fields = descriptors("V");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].field_number, 1);
        assert_eq!(fields[0].scalar, ScalarType::UnsignedVarint);
        assert_eq!(fields[0].prefix, Prefix::None);
    }

    #[test]
    fn skip_then_string() {
        let fields = descriptors("xU");
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].scalar, ScalarType::Skip);
        assert_eq!(fields[0].field_number, 1);
        assert_eq!(fields[1].scalar, ScalarType::Utf8String);
        assert_eq!(fields[1].field_number, 2);
    }

    #[test]
    fn skip_copy_then_packed_repeated() {
        let fields = descriptors("x3#V");
        assert_eq!(fields[0].repeat, 3);
        assert_eq!(fields[0].field_number, 1);
        assert_eq!(fields[1].field_number, 4);
        assert_eq!(fields[1].prefix, Prefix::PackedRepeated);
    }

    #[test]
    fn nested_group_after_skip_copy() {
        let fields = descriptors("x2[V]");
        assert_eq!(fields[0].repeat, 2);
        assert_eq!(fields[1].field_number, 3);
        let sub = fields[1].subschema.as_ref().unwrap();
        assert_eq!(sub.fields[0].field_number, 1);
    }

    #[test]
    fn field_seek_resets_counter() {
        let fields = descriptors("V2@2U@10U@20");
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].field_number, 2);
        assert_eq!(fields[0].repeat, 2);
        assert_eq!(fields[1].field_number, 10);
        assert_eq!(fields[2].field_number, 20);
    }

    #[test]
    fn unmatched_brace_is_rejected() {
        assert!(matches!(
            parse_format_string("[V"),
            Err(SchemaError::UnmatchedBrace { .. })
        ));
    }

    #[test]
    fn unknown_type_char_is_rejected() {
        assert!(matches!(
            parse_format_string("Y"),
            Err(SchemaError::InvalidToken { .. })
        ));
    }

    #[test]
    fn aliases_resolve() {
        let fields = descriptors("vVlLu");
        assert_eq!(fields[0].scalar, ScalarType::ZigZag);
        assert_eq!(fields[1].scalar, ScalarType::UnsignedVarint);
        assert_eq!(fields[2].scalar, ScalarType::Fixed32Signed);
        assert_eq!(fields[3].scalar, ScalarType::Fixed32Unsigned);
        assert_eq!(fields[4].scalar, ScalarType::Utf8String);
    }

    #[test]
    fn single_field_spec_rejects_trailing_garbage() {
        assert!(matches!(
            parse_single_field_spec("V@1"),
            Err(SchemaError::TrailingInput { .. })
        ));
    }

    #[test]
    fn single_field_spec_parses_prefix_type_repeat() {
        let (prefix, scalar, repeat) = parse_single_field_spec("*x3").unwrap();
        assert_eq!(prefix, Prefix::Required);
        assert_eq!(scalar, ScalarType::Skip);
        assert_eq!(repeat, 3);
    }
}
