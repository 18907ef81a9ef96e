//! Schemaless breakdown of protobuf wire bytes into `{id, wire_type, payload}`
//! records, and the reverse. Useful for inspecting messages with no known
//! schema.

use crate::error::{CodecError, Eof};
use crate::leb128::read_varint;
use crate::wire::{read_header, write_header, WireType};

/// The payload of a single wire record, shaped by its wire type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawPayload {
    /// Wire type 0: decoded as an unsigned 64-bit integer regardless of
    /// whether zig-zag or two's-complement encoding produced it.
    Varint(u64),
    /// Wire type 1: exactly 8 raw bytes.
    Fixed64([u8; 8]),
    /// Wire type 2: a length-prefixed byte string.
    Bytes(Vec<u8>),
    /// Wire type 5: exactly 4 raw bytes.
    Fixed32([u8; 4]),
}

/// A single `{id, wire_type, payload}` triple produced by [`breakdown`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub id: u32,
    pub wire_type: u8,
    pub payload: RawPayload,
}

/// A lazy, forward-only iterator over the wire records in a byte buffer.
///
/// Produced by [`breakdown`]. Stops cleanly at a record boundary; a
/// truncated record yields one `Err` and then the iterator is exhausted.
pub struct Breakdown<'a> {
    buf: &'a [u8],
    done: bool,
}

impl<'a> Iterator for Breakdown<'a> {
    type Item = Result<RawRecord, CodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let (field_number, wire_type) = match read_header(&mut self.buf) {
                Ok(pair) => pair,
                Err(Eof { partial: false }) => {
                    self.done = true;
                    return None;
                }
                Err(Eof { partial: true }) => {
                    self.done = true;
                    return Some(Err(CodecError::UnexpectedEndOfMessage { field_number: 0 }));
                }
            };

            match read_payload(self.buf, field_number, wire_type) {
                Ok((payload, rest)) => {
                    self.buf = rest;
                    return Some(Ok(RawRecord {
                        id: field_number,
                        wire_type,
                        payload,
                    }));
                }
                Err(ReadPayloadError::UnknownWireType) => {
                    log::warn!(
                        "breakdown(): ignoring unknown wire type on field #{field_number}"
                    );
                    continue;
                }
                Err(ReadPayloadError::Truncated) => {
                    self.done = true;
                    return Some(Err(CodecError::UnexpectedEndOfMessage { field_number }));
                }
            }
        }
    }
}

enum ReadPayloadError {
    UnknownWireType,
    Truncated,
}

fn read_payload(
    buf: &[u8],
    field_number: u32,
    wire_type: u8,
) -> Result<(RawPayload, &[u8]), ReadPayloadError> {
    match wire_type {
        0 => {
            let mut slice = buf;
            let value = read_varint(&mut slice).map_err(|_| ReadPayloadError::Truncated)?;
            Ok((RawPayload::Varint(value), slice))
        }
        1 => {
            if buf.len() < 8 {
                return Err(ReadPayloadError::Truncated);
            }
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&buf[..8]);
            Ok((RawPayload::Fixed64(bytes), &buf[8..]))
        }
        2 => {
            let mut slice = buf;
            let len = read_varint(&mut slice).map_err(|_| ReadPayloadError::Truncated)? as usize;
            if slice.len() < len {
                return Err(ReadPayloadError::Truncated);
            }
            let (data, rest) = slice.split_at(len);
            Ok((RawPayload::Bytes(data.to_vec()), rest))
        }
        5 => {
            if buf.len() < 4 {
                return Err(ReadPayloadError::Truncated);
            }
            let mut bytes = [0u8; 4];
            bytes.copy_from_slice(&buf[..4]);
            Ok((RawPayload::Fixed32(bytes), &buf[4..]))
        }
        3 | 4 => {
            let _ = field_number;
            Err(ReadPayloadError::UnknownWireType)
        }
        _ => Err(ReadPayloadError::UnknownWireType),
    }
}

/// Iterates the wire records in `data` with no schema, producing
/// `{id, wire_type, payload}` triples in wire order.
pub fn breakdown(data: &[u8]) -> Breakdown<'_> {
    Breakdown {
        buf: data,
        done: false,
    }
}

/// Headerless variant of [`breakdown`] used to unpack a packed-repeated
/// field's concatenated payload: the caller supplies the fixed
/// `(wire_type, field_number)` shape since there is no per-record header.
///
/// Stops cleanly when the buffer is drained on a record boundary; a
/// truncated trailing record raises [`CodecError::UnexpectedEndOfMessage`].
pub fn headerless_breakdown(
    data: &[u8],
    wire_type: u8,
    field_number: u32,
) -> Result<Vec<RawRecord>, CodecError> {
    let mut records = Vec::new();
    let mut buf = data;
    while !buf.is_empty() {
        match read_payload(buf, field_number, wire_type) {
            Ok((payload, rest)) => {
                buf = rest;
                records.push(RawRecord {
                    id: field_number,
                    wire_type,
                    payload,
                });
            }
            Err(_) => {
                return Err(CodecError::UnexpectedEndOfMessage { field_number });
            }
        }
    }
    Ok(records)
}

/// Encodes a sequence of raw records back to wire bytes. The inverse of
/// [`breakdown`].
pub fn encode_raw(records: &[RawRecord]) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    for record in records {
        let wire_type = WireType::try_from_val(record.wire_type)?;
        write_header(record.id, wire_type, &mut out);
        match (&record.payload, wire_type) {
            (RawPayload::Varint(v), WireType::Varint) => {
                out.extend(crate::leb128::write_varint(*v));
            }
            (RawPayload::Fixed64(bytes), WireType::I64) => out.extend_from_slice(bytes),
            (RawPayload::Bytes(bytes), WireType::Len) => {
                out.extend(crate::leb128::write_varint(bytes.len() as u64));
                out.extend_from_slice(bytes);
            }
            (RawPayload::Fixed32(bytes), WireType::I32) => out.extend_from_slice(bytes),
            _ => {
                return Err(CodecError::WrongShape {
                    field_number: record.id,
                });
            }
        }
    }
    Ok(out)
}
