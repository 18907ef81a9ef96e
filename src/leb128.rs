//! Primitive integer codecs: varint (LEB128), zig-zag, two's complement, and
//! little-endian fixed-width values.
//!
//! Varint encode/decode is delegated to the `leb128` crate; everything built
//! on top (zig-zag, two's complement, fixed widths) is specific to the
//! protobuf wire format and lives here.

use crate::error::Eof;

/// Encodes `value` as an unsigned LEB128 varint.
pub fn write_varint(value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(10);
    leb128::write::unsigned(&mut out, value).expect("Vec<u8> writes are infallible");
    out
}

/// Reads an unsigned LEB128 varint from the front of `buf`, advancing past it.
///
/// Distinguishes a clean end-of-stream (`buf` empty on entry, `partial:
/// false`) from a truncated varint (at least one continuation byte was
/// consumed before running out of input, `partial: true`), so callers can
/// tell "no more fields" apart from "the message was cut off mid-field".
pub(crate) fn read_varint(buf: &mut &[u8]) -> Result<u64, Eof> {
    if buf.is_empty() {
        return Err(Eof { partial: false });
    }
    let mut cursor = std::io::Cursor::new(&buf[..]);
    match leb128::read::unsigned(&mut cursor) {
        Ok(value) => {
            let consumed = cursor.position() as usize;
            *buf = &buf[consumed..];
            Ok(value)
        }
        Err(_) => Err(Eof { partial: true }),
    }
}

/// Zig-zag encodes a signed integer so small magnitudes stay small
/// regardless of sign.
pub fn zigzag_encode(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

/// Inverts [`zigzag_encode`].
pub fn zigzag_decode(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

/// Maximum two's-complement width this crate supports (a `u64`'s worth of bits).
pub const MAX_TWOS_COMPLEMENT_WIDTH: u8 = 64;

/// Encodes a signed integer as the unsigned interpretation of its low `width`
/// two's-complement bits. Values outside `[-2^(width-1), 2^(width-1))` are
/// silently truncated to `width` bits rather than rejected with a range
/// error.
pub fn twos_complement_encode(n: i64, width: u8) -> u64 {
    debug_assert!(width >= 1 && width <= MAX_TWOS_COMPLEMENT_WIDTH);
    let raw = n as u64;
    if width >= 64 {
        raw
    } else {
        raw & ((1u64 << width) - 1)
    }
}

/// Inverts [`twos_complement_encode`]: reads `raw` as an unsigned varint
/// result and re-signs it if bit `width - 1` is set.
pub fn twos_complement_decode(raw: u64, width: u8) -> i64 {
    debug_assert!(width >= 1 && width <= MAX_TWOS_COMPLEMENT_WIDTH);
    if width >= 64 {
        return raw as i64;
    }
    let sign_bit = 1u64 << (width - 1);
    if raw & sign_bit != 0 {
        let extend_mask = !((1u64 << width) - 1);
        (raw | extend_mask) as i64
    } else {
        raw as i64
    }
}
