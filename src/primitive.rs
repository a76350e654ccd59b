//! Byte-level CBOR primitives.
//!
//! Writers append to a `Vec<u8>` (the growable sink every encoder frame owns),
//! and [`Reader`] is the cursor the decoder pulls headers and payloads from.
//! Nothing in here knows about structures, fields or configuration.

use std::borrow::Cow;

use crate::error::{CborError, Result};

// CBOR major types
pub const MAJOR_UNSIGNED: u8 = 0;
pub const MAJOR_NEGATIVE: u8 = 1;
pub const MAJOR_BYTES: u8 = 2;
pub const MAJOR_TEXT: u8 = 3;
pub const MAJOR_ARRAY: u8 = 4;
pub const MAJOR_MAP: u8 = 5;
pub const MAJOR_TAG: u8 = 6;
pub const MAJOR_SIMPLE: u8 = 7;

// Additional info values
const FALSE: u8 = 20;
const TRUE: u8 = 21;
const NULL: u8 = 22;
const UNDEFINED: u8 = 23;
const NEXT_HALF: u8 = 25;
const NEXT_FLOAT: u8 = 26;
const NEXT_DOUBLE: u8 = 27;
const INDEFINITE: u8 = 31;

pub const BREAK: u8 = 0xff;
pub const BEGIN_ARRAY: u8 = (MAJOR_ARRAY << 5) | INDEFINITE;
pub const BEGIN_MAP: u8 = (MAJOR_MAP << 5) | INDEFINITE;
pub const EMPTY_MAP: u8 = MAJOR_MAP << 5;
pub const NULL_BYTE: u8 = (MAJOR_SIMPLE << 5) | NULL;
pub const UNDEFINED_BYTE: u8 = (MAJOR_SIMPLE << 5) | UNDEFINED;

/// Human readable name of a major type, used in error messages.
pub fn major_name(major: u8) -> &'static str {
    match major {
        MAJOR_UNSIGNED => "unsigned integer",
        MAJOR_NEGATIVE => "negative integer",
        MAJOR_BYTES => "byte string",
        MAJOR_TEXT => "text string",
        MAJOR_ARRAY => "array",
        MAJOR_MAP => "map",
        MAJOR_TAG => "tag",
        _ => "simple value",
    }
}

pub fn write_type_value(out: &mut Vec<u8>, major: u8, value: u64) {
    if value < 24 {
        out.push((major << 5) | value as u8);
    } else if value <= u8::MAX as u64 {
        out.extend_from_slice(&[(major << 5) | 24, value as u8]);
    } else if value <= u16::MAX as u64 {
        out.push((major << 5) | 25);
        out.extend_from_slice(&(value as u16).to_be_bytes());
    } else if value <= u32::MAX as u64 {
        out.push((major << 5) | 26);
        out.extend_from_slice(&(value as u32).to_be_bytes());
    } else {
        out.push((major << 5) | 27);
        out.extend_from_slice(&value.to_be_bytes());
    }
}

pub fn write_unsigned(out: &mut Vec<u8>, value: u64) {
    write_type_value(out, MAJOR_UNSIGNED, value)
}

/// Writes a signed integer. Negative values store `-1 - n`, which for
/// `i64::MIN` is `i64::MAX` and never overflows.
pub fn write_signed(out: &mut Vec<u8>, value: i64) {
    if value >= 0 {
        write_type_value(out, MAJOR_UNSIGNED, value as u64)
    } else {
        write_type_value(out, MAJOR_NEGATIVE, !value as u64)
    }
}

/// Writes a 128-bit integer if it fits the CBOR integer range
/// `-2^64 ..= 2^64 - 1`; bignum tags are not produced.
pub fn write_wide(out: &mut Vec<u8>, value: i128) -> Result<()> {
    if value >= 0 {
        let value = u64::try_from(value)
            .map_err(|_| CborError::UnsupportedShape(format!("integer {value} needs a bignum")))?;
        write_type_value(out, MAJOR_UNSIGNED, value);
    } else {
        let magnitude = u64::try_from(-1 - value)
            .map_err(|_| CborError::UnsupportedShape(format!("integer {value} needs a bignum")))?;
        write_type_value(out, MAJOR_NEGATIVE, magnitude);
    }
    Ok(())
}

pub fn write_text(out: &mut Vec<u8>, value: &str) {
    write_type_value(out, MAJOR_TEXT, value.len() as u64);
    out.extend_from_slice(value.as_bytes());
}

pub fn write_bytes(out: &mut Vec<u8>, value: &[u8]) {
    write_type_value(out, MAJOR_BYTES, value.len() as u64);
    out.extend_from_slice(value);
}

pub fn write_tag(out: &mut Vec<u8>, tag: u64) {
    write_type_value(out, MAJOR_TAG, tag)
}

pub fn write_tags(out: &mut Vec<u8>, tags: &[u64]) {
    for &tag in tags {
        write_tag(out, tag);
    }
}

pub fn write_bool(out: &mut Vec<u8>, value: bool) {
    out.push((MAJOR_SIMPLE << 5) | if value { TRUE } else { FALSE });
}

pub fn write_null(out: &mut Vec<u8>) {
    out.push(NULL_BYTE);
}

pub fn write_empty_map(out: &mut Vec<u8>) {
    out.push(EMPTY_MAP);
}

pub fn write_break(out: &mut Vec<u8>) {
    out.push(BREAK);
}

/// Array header: definite with `Some(count)`, otherwise the open marker that a
/// later break byte closes.
pub fn write_array_header(out: &mut Vec<u8>, count: Option<u64>) {
    match count {
        Some(count) => write_type_value(out, MAJOR_ARRAY, count),
        None => out.push(BEGIN_ARRAY),
    }
}

pub fn write_map_header(out: &mut Vec<u8>, count: Option<u64>) {
    match count {
        Some(count) => write_type_value(out, MAJOR_MAP, count),
        None => out.push(BEGIN_MAP),
    }
}

#[cfg(not(feature = "compact_floats"))]
pub fn write_f32(out: &mut Vec<u8>, value: f32) {
    out.push((MAJOR_SIMPLE << 5) | NEXT_FLOAT);
    out.extend_from_slice(&value.to_bits().to_be_bytes());
}

#[cfg(not(feature = "compact_floats"))]
pub fn write_f64(out: &mut Vec<u8>, value: f64) {
    out.push((MAJOR_SIMPLE << 5) | NEXT_DOUBLE);
    out.extend_from_slice(&value.to_bits().to_be_bytes());
}

#[cfg(feature = "compact_floats")]
pub fn write_f32(out: &mut Vec<u8>, value: f32) {
    write_f64(out, value as f64)
}

/// Shortest of f16/f32/f64 that reproduces `value` exactly.
#[cfg(feature = "compact_floats")]
pub fn write_f64(out: &mut Vec<u8>, value: f64) {
    use half::f16;

    if value.is_nan() {
        out.push((MAJOR_SIMPLE << 5) | NEXT_HALF);
        out.extend_from_slice(&f16::NAN.to_bits().to_be_bytes());
        return;
    }
    let half = f16::from_f64(value);
    if half.to_f64() == value {
        out.push((MAJOR_SIMPLE << 5) | NEXT_HALF);
        out.extend_from_slice(&half.to_bits().to_be_bytes());
    } else if (value as f32) as f64 == value {
        out.push((MAJOR_SIMPLE << 5) | NEXT_FLOAT);
        out.extend_from_slice(&(value as f32).to_bits().to_be_bytes());
    } else {
        out.push((MAJOR_SIMPLE << 5) | NEXT_DOUBLE);
        out.extend_from_slice(&value.to_bits().to_be_bytes());
    }
}

/// The argument carried by a header byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Argument {
    Value(u64),
    /// Additional info 31: an indefinite-length open marker, or the break
    /// byte when the major type is 7.
    Indefinite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub initial: u8,
    pub major: u8,
    pub info: u8,
    pub argument: Argument,
}

impl Header {
    pub fn is_break(&self) -> bool {
        self.initial == BREAK
    }

    /// Definite length or count; `None` for the indefinite marker.
    pub fn length(&self) -> Option<u64> {
        match self.argument {
            Argument::Value(value) => Some(value),
            Argument::Indefinite => None,
        }
    }

    pub fn unexpected(&self, expected: &'static str) -> CborError {
        CborError::UnexpectedMajorType {
            expected,
            found: major_name(self.major),
        }
    }
}

/// A cursor over an input slice.
pub struct Reader<'de> {
    data: &'de [u8],
    pos: usize,
}

impl<'de> Reader<'de> {
    pub fn new(data: &'de [u8]) -> Self {
        Reader { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn peek(&self) -> Result<u8> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or(CborError::TruncatedInput)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn take(&mut self, len: usize) -> Result<&'de [u8]> {
        if self.remaining() < len {
            return Err(CborError::TruncatedInput);
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N)?);
        Ok(buf)
    }

    pub fn peek_major(&self) -> Result<u8> {
        Ok(self.peek()? >> 5)
    }

    pub fn read_header(&mut self) -> Result<Header> {
        let initial = self.read_u8()?;
        let major = initial >> 5;
        let info = initial & 0x1f;
        let argument = match info {
            0..=23 => Argument::Value(info as u64),
            24 => Argument::Value(self.read_u8()? as u64),
            25 => Argument::Value(u16::from_be_bytes(self.take_array()?) as u64),
            26 => Argument::Value(u32::from_be_bytes(self.take_array()?) as u64),
            27 => Argument::Value(u64::from_be_bytes(self.take_array()?)),
            INDEFINITE => match major {
                MAJOR_BYTES | MAJOR_TEXT | MAJOR_ARRAY | MAJOR_MAP | MAJOR_SIMPLE => {
                    Argument::Indefinite
                }
                _ => return Err(CborError::MalformedHeader(initial)),
            },
            _ => return Err(CborError::MalformedHeader(initial)),
        };
        Ok(Header {
            initial,
            major,
            info,
            argument,
        })
    }

    /// Reads every tag at the cursor, stopping before the tagged item.
    pub fn read_tags(&mut self, tags: &mut Vec<u64>) -> Result<()> {
        while self.peek_major()? == MAJOR_TAG {
            let header = self.read_header()?;
            if let Argument::Value(tag) = header.argument {
                tags.push(tag);
            }
        }
        Ok(())
    }

    pub fn skip_tags(&mut self) -> Result<()> {
        while self.peek_major()? == MAJOR_TAG {
            self.read_header()?;
        }
        Ok(())
    }

    /// Consumes a break byte if one is next.
    pub fn try_break(&mut self) -> Result<bool> {
        if self.peek()? == BREAK {
            self.pos += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Integer value of a major type 0 or 1 header.
    pub fn integer(&self, header: &Header) -> Result<i128> {
        match (header.major, header.argument) {
            (MAJOR_UNSIGNED, Argument::Value(value)) => Ok(value as i128),
            (MAJOR_NEGATIVE, Argument::Value(value)) => Ok(-1 - value as i128),
            _ => Err(header.unexpected("integer")),
        }
    }

    /// Float value of a major type 7 header carrying a half, single or double.
    pub fn float(&self, header: &Header) -> Result<f64> {
        match (header.major, header.info, header.argument) {
            (MAJOR_SIMPLE, NEXT_HALF, Argument::Value(bits)) => {
                Ok(half::f16::from_bits(bits as u16).to_f64())
            }
            (MAJOR_SIMPLE, NEXT_FLOAT, Argument::Value(bits)) => {
                Ok(f32::from_bits(bits as u32) as f64)
            }
            (MAJOR_SIMPLE, NEXT_DOUBLE, Argument::Value(bits)) => Ok(f64::from_bits(bits)),
            _ => Err(header.unexpected("float")),
        }
    }

    pub fn boolean(&self, header: &Header) -> Result<bool> {
        match (header.major, header.info) {
            (MAJOR_SIMPLE, FALSE) => Ok(false),
            (MAJOR_SIMPLE, TRUE) => Ok(true),
            _ => Err(header.unexpected("boolean")),
        }
    }

    /// Payload of a byte or text string whose header was just read. Definite
    /// strings are borrowed from the input; chunked ones are concatenated.
    pub fn string_payload(&mut self, header: &Header) -> Result<Cow<'de, [u8]>> {
        match header.argument {
            Argument::Value(len) => {
                let len = usize::try_from(len).map_err(|_| CborError::TruncatedInput)?;
                Ok(Cow::Borrowed(self.take(len)?))
            }
            Argument::Indefinite => {
                let mut buf = Vec::new();
                loop {
                    let chunk = self.read_header()?;
                    if chunk.is_break() {
                        break;
                    }
                    match (chunk.major, chunk.argument) {
                        (major, Argument::Value(len)) if major == header.major => {
                            let len =
                                usize::try_from(len).map_err(|_| CborError::TruncatedInput)?;
                            buf.extend_from_slice(self.take(len)?);
                        }
                        _ => return Err(CborError::MalformedHeader(chunk.initial)),
                    }
                }
                Ok(Cow::Owned(buf))
            }
        }
    }

    /// Skips one complete data item, tags and nested structures included.
    /// Nesting is tracked on an explicit stack of remaining counts.
    pub fn skip_item(&mut self) -> Result<()> {
        let mut open: Vec<Option<u64>> = Vec::new();
        loop {
            if let Some(remaining) = open.last_mut() {
                match remaining {
                    Some(0) => {
                        open.pop();
                        if open.is_empty() {
                            return Ok(());
                        }
                        continue;
                    }
                    Some(n) => *n -= 1,
                    None => {
                        if self.try_break()? {
                            open.pop();
                            if open.is_empty() {
                                return Ok(());
                            }
                            continue;
                        }
                    }
                }
            }

            self.skip_tags()?;
            let header = self.read_header()?;
            match (header.major, header.argument) {
                (MAJOR_BYTES | MAJOR_TEXT, Argument::Value(len)) => {
                    let len = usize::try_from(len).map_err(|_| CborError::TruncatedInput)?;
                    self.take(len)?;
                }
                (MAJOR_BYTES | MAJOR_TEXT | MAJOR_ARRAY | MAJOR_MAP, Argument::Indefinite) => {
                    open.push(None)
                }
                (MAJOR_ARRAY, Argument::Value(count)) => open.push(Some(count)),
                (MAJOR_MAP, Argument::Value(count)) => open.push(Some(
                    count
                        .checked_mul(2)
                        .ok_or(CborError::MalformedHeader(header.initial))?,
                )),
                (MAJOR_SIMPLE, Argument::Indefinite) => {
                    return Err(CborError::MalformedHeader(header.initial));
                }
                _ => {}
            }
            if open.is_empty() {
                return Ok(());
            }
        }
    }
}
