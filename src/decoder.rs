//! ValueDecoder: decodes one self-describing, tagged value at a cursor
//! position, recursively, following pointers transparently.
//!
//! Maps a small integer type tag to one of a handful of native
//! representations, but unlike a flat record format, this one is
//! self-delimiting, recursive, and shares substructure via pointers into
//! the same data section (see DESIGN.md for how the control-byte and
//! pointer-bias arithmetic below was cross-checked).

use crate::cursor::Cursor;
use crate::value::Value;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("Read past the end of the database file.")]
    OutOfBounds,
    #[error("Unsupported on-wire tag: {0}")]
    UnsupportedTag(u8),
    #[error("Map key did not decode to a string.")]
    MalformedMapKey,
    #[error("Payload size {0} is invalid for this tag.")]
    InvalidPayloadSize(usize),
    #[error("String payload is not valid UTF-8.")]
    InvalidUtf8,
    #[error("Exceeded maximum decode recursion depth ({0}).")]
    DepthExceeded(usize),
}

impl From<crate::cursor::Error> for Error {
    fn from(_: crate::cursor::Error) -> Error {
        Error::OutOfBounds
    }
}

/// Default recursion/pointer-following depth limit.
pub const DEFAULT_MAX_DEPTH: usize = 512;

const TAG_EXTENDED: u8 = 0;
const TAG_POINTER: u8 = 1;
const TAG_STRING: u8 = 2;
const TAG_DOUBLE: u8 = 3;
const TAG_BYTES: u8 = 4;
const TAG_UINT16: u8 = 5;
const TAG_UINT32: u8 = 6;
const TAG_MAP: u8 = 7;
const TAG_INT32: u8 = 8;
const TAG_UINT64: u8 = 9;
const TAG_UINT128: u8 = 10;
const TAG_ARRAY: u8 = 11;
const TAG_CACHE_CONTAINER: u8 = 12;
const TAG_END_MARKER: u8 = 13;
const TAG_BOOLEAN: u8 = 14;
const TAG_FLOAT: u8 = 15;

/// Decodes one value at `cursor`'s current position within `data`, which is
/// the whole data section (pointer targets are offsets relative to its
/// start). `cursor` must itself be a view into `data`.
pub fn decode_value<'a>(data: &'a [u8], cursor: &mut Cursor<'a>) -> Result<Value, Error> {
    decode_value_depth(data, cursor, 0, DEFAULT_MAX_DEPTH)
}

/// As `decode_value`, but with an explicit depth limit
/// (`Options::max_decode_depth`).
pub fn decode_value_with_limit<'a>(
    data: &'a [u8],
    cursor: &mut Cursor<'a>,
    max_depth: usize,
) -> Result<Value, Error> {
    decode_value_depth(data, cursor, 0, max_depth)
}

fn decode_value_depth<'a>(
    data: &'a [u8],
    cursor: &mut Cursor<'a>,
    depth: usize,
    max_depth: usize,
) -> Result<Value, Error> {
    if depth > max_depth {
        return Err(Error::DepthExceeded(max_depth));
    }

    let control = cursor.read_byte()?;
    // Widened to u16 before adding: a crafted extension byte near 255 would
    // otherwise overflow a u8 here.
    let wide_tag: u16 = if (control >> 5) == TAG_EXTENDED {
        let next = cursor.read_byte()?;
        next as u16 + 7
    } else {
        (control >> 5) as u16
    };
    let tag = u8::try_from(wide_tag).map_err(|_| Error::UnsupportedTag(u8::MAX))?;

    if tag == TAG_POINTER {
        let target = read_pointer_target(control, cursor)?;
        let mut pointee = Cursor::at(data, target);
        return decode_value_depth(data, &mut pointee, depth + 1, max_depth);
    }

    let size = read_payload_size(control, cursor)?;

    match tag {
        TAG_STRING => {
            let bytes = cursor.read_bytes(size)?;
            // Bytes are stored as-is on the wire; surface a decode error
            // rather than silently mangling invalid UTF-8 with replacement
            // characters.
            let s = String::from_utf8(bytes.to_vec()).map_err(|_| Error::InvalidUtf8)?;
            Ok(Value::String(s))
        }
        TAG_BYTES | TAG_UINT128 => {
            let bytes = cursor.read_bytes(size)?;
            Ok(Value::Binary(bytes.to_vec()))
        }
        TAG_DOUBLE => {
            if size != 8 {
                return Err(Error::InvalidPayloadSize(size));
            }
            let bits = cursor.read_uint(size)?;
            Ok(Value::Double(f64::from_bits(bits)))
        }
        TAG_FLOAT => {
            if size != 4 {
                return Err(Error::InvalidPayloadSize(size));
            }
            let bits = cursor.read_uint(size)? as u32;
            Ok(Value::Float(f32::from_bits(bits)))
        }
        TAG_UINT16 => {
            if size > 2 {
                return Err(Error::InvalidPayloadSize(size));
            }
            Ok(Value::Uint16(cursor.read_uint(size)? as u16))
        }
        TAG_UINT32 => {
            if size > 4 {
                return Err(Error::InvalidPayloadSize(size));
            }
            Ok(Value::Uint32(cursor.read_uint(size)? as u32))
        }
        TAG_UINT64 => {
            if size > 8 {
                return Err(Error::InvalidPayloadSize(size));
            }
            Ok(Value::Uint64(cursor.read_uint(size)?))
        }
        TAG_INT32 => {
            if size > 4 {
                return Err(Error::InvalidPayloadSize(size));
            }
            Ok(Value::Int32(cursor.read_uint(size)? as u32 as i32))
        }
        TAG_BOOLEAN => Ok(Value::Boolean(size != 0)),
        TAG_MAP => {
            let mut pairs = Vec::with_capacity(size);
            for _ in 0..size {
                let key_value = decode_value_depth(data, cursor, depth + 1, max_depth)?;
                let key = key_value.as_string().ok_or(Error::MalformedMapKey)?.to_string();
                let value = decode_value_depth(data, cursor, depth + 1, max_depth)?;
                pairs.push((key, value));
            }
            Ok(Value::Map(pairs))
        }
        TAG_ARRAY => {
            let mut elements = Vec::with_capacity(size);
            for _ in 0..size {
                elements.push(decode_value_depth(data, cursor, depth + 1, max_depth)?);
            }
            Ok(Value::Array(elements))
        }
        TAG_CACHE_CONTAINER | TAG_END_MARKER => Err(Error::UnsupportedTag(tag)),
        other => Err(Error::UnsupportedTag(other)),
    }
}

/// Reads the size field out of the bottom 5 bits of the control byte,
/// consuming any extra size-extension bytes.
fn read_payload_size(control: u8, cursor: &mut Cursor) -> Result<usize, Error> {
    let size = control & 0b0001_1111;
    match size {
        0..=28 => Ok(size as usize),
        29 => {
            let b = cursor.read_byte()?;
            Ok(29 + b as usize)
        }
        30 => {
            let b = cursor.read_uint(2)?;
            Ok(285 + b as usize)
        }
        31 => {
            let b = cursor.read_uint(3)?;
            Ok(65821 + b as usize)
        }
        _ => unreachable!("5-bit field"),
    }
}

/// Decodes a pointer control byte into a data-section-relative target
/// offset, per the size_sel/extra/bias table in the MaxMind DB spec.
fn read_pointer_target(control: u8, cursor: &mut Cursor) -> Result<usize, Error> {
    let low5 = control & 0b0001_1111;
    let size_sel = (low5 >> 3) & 0b11;
    let extra = (low5 & 0b111) as u64;

    let target = match size_sel {
        0 => {
            let b0 = cursor.read_byte()? as u64;
            (extra << 8) | b0
        }
        1 => {
            let rest = cursor.read_uint(2)?;
            ((extra << 16) | rest) + 2048
        }
        2 => {
            let rest = cursor.read_uint(3)?;
            ((extra << 24) | rest) + 526336
        }
        3 => cursor.read_uint(4)?,
        _ => unreachable!("2-bit field"),
    };
    Ok(target as usize)
}
