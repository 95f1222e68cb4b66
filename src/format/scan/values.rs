//! Typed value decoding for the self-describing scan format.
//!
//! This module defines the shared decode vocabulary used by both the header
//! parameter reader and the dataset row reader:
//!
//! - [`ParamType`] maps the MIME-style type-tag *strings* attached to header
//!   and dataset parameters onto decode functions. Unrecognized tags are not
//!   an error; the raw bytes are preserved opaquely so files carrying newer
//!   vendor extensions still decode.
//! - [`ColumnType`] is the fixed ordered table of nine primitive decoders
//!   indexed by the 1-byte column type tag of a dataset column descriptor.
//!   An out-of-table column tag *is* an error: without a known width the row
//!   stream cannot be advanced.
//!
//! The table is read-only, process-wide configuration with no lifecycle.

use std::io::Read;

use bytes::Bytes;
use serde::Serialize;

use crate::error::ScanError;
use crate::io::{read_f32_be, read_i16_be, read_i32_be, read_u16_be, read_u32_be, ByteCursor};

// =============================================================================
// Length-Prefixed Primitives
// =============================================================================

/// Read a length-prefixed byte string: a big-endian i32 byte count followed
/// by that many raw bytes.
pub(crate) fn read_blob<R: Read>(
    cursor: &mut ByteCursor<R>,
    what: &'static str,
) -> Result<Bytes, ScanError> {
    let offset = cursor.position();
    let len = cursor.read_i32_be()?;
    if len < 0 {
        return Err(ScanError::MalformedValue {
            what,
            offset,
            detail: format!("negative byte count {len}"),
        });
    }
    Ok(Bytes::from(cursor.read_bytes(len as usize)?))
}

/// Read a length-prefixed UTF-16BE string: a big-endian i32 code-unit count
/// followed by twice that many bytes.
pub(crate) fn read_text<R: Read>(
    cursor: &mut ByteCursor<R>,
    what: &'static str,
) -> Result<String, ScanError> {
    let offset = cursor.position();
    let len = cursor.read_i32_be()?;
    if len < 0 {
        return Err(ScanError::MalformedValue {
            what,
            offset,
            detail: format!("negative code-unit count {len}"),
        });
    }
    let raw = cursor.read_bytes(2 * len as usize)?;
    decode_utf16_be(&raw).map_err(|detail| ScanError::MalformedValue {
        what,
        offset,
        detail,
    })
}

/// Decode a UTF-16BE byte slice into a String.
fn decode_utf16_be(raw: &[u8]) -> Result<String, String> {
    if raw.len() % 2 != 0 {
        return Err(format!("odd byte length {} for UTF-16 text", raw.len()));
    }
    let units: Vec<u16> = raw
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|e| e.to_string())
}

// =============================================================================
// Parameter Type Tags
// =============================================================================

/// Recognized parameter type-tag strings.
///
/// Header and dataset parameters are (name, value, type) triplets where the
/// type is a string tag selecting how the raw value bytes are interpreted.
/// Numeric values occupy the leading bytes of a padded raw buffer; text
/// values are NUL-padded to the buffer size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParamType {
    /// UTF-16BE text, NUL-padded (`text/plain`)
    PlainText,

    /// ASCII text, NUL-padded (`text/ascii`)
    AsciiText,

    /// Big-endian f32 (`text/x-calvin-float`)
    Float32,

    /// Big-endian i32 (`text/x-calvin-integer-32`)
    Int32,

    /// Big-endian u32 (`text/x-calvin-unsigned-integer-32`)
    UInt32,

    /// Big-endian i16 (`text/x-calvin-integer-16`)
    Int16,

    /// Big-endian u16 (`text/x-calvin-unsigned-integer-16`)
    UInt16,

    /// Signed byte (`text/x-calvin-integer-8`)
    Int8,

    /// Unsigned byte (`text/x-calvin-unsigned-integer-8`)
    UInt8,
}

impl ParamType {
    /// Look up a type-tag string.
    ///
    /// Returns `None` for unrecognized tags. Unknown tags are not an error;
    /// the parameter value is preserved as opaque bytes.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "text/plain" => Some(ParamType::PlainText),
            "text/ascii" => Some(ParamType::AsciiText),
            "text/x-calvin-float" => Some(ParamType::Float32),
            "text/x-calvin-integer-32" => Some(ParamType::Int32),
            "text/x-calvin-unsigned-integer-32" => Some(ParamType::UInt32),
            "text/x-calvin-integer-16" => Some(ParamType::Int16),
            "text/x-calvin-unsigned-integer-16" => Some(ParamType::UInt16),
            "text/x-calvin-integer-8" => Some(ParamType::Int8),
            "text/x-calvin-unsigned-integer-8" => Some(ParamType::UInt8),
            _ => None,
        }
    }

    /// The tag string this type was selected by.
    pub const fn tag(self) -> &'static str {
        match self {
            ParamType::PlainText => "text/plain",
            ParamType::AsciiText => "text/ascii",
            ParamType::Float32 => "text/x-calvin-float",
            ParamType::Int32 => "text/x-calvin-integer-32",
            ParamType::UInt32 => "text/x-calvin-unsigned-integer-32",
            ParamType::Int16 => "text/x-calvin-integer-16",
            ParamType::UInt16 => "text/x-calvin-unsigned-integer-16",
            ParamType::Int8 => "text/x-calvin-integer-8",
            ParamType::UInt8 => "text/x-calvin-unsigned-integer-8",
        }
    }

    /// Bytes a fixed-width value of this type occupies at the start of its
    /// raw buffer. `None` for the variable-length text types.
    const fn fixed_width(self) -> Option<usize> {
        match self {
            ParamType::PlainText | ParamType::AsciiText => None,
            ParamType::Float32 | ParamType::Int32 | ParamType::UInt32 => Some(4),
            ParamType::Int16 | ParamType::UInt16 => Some(2),
            ParamType::Int8 | ParamType::UInt8 => Some(1),
        }
    }

    /// Decode a raw value buffer according to this type.
    pub fn decode(self, raw: &[u8], offset: u64) -> Result<ParamValue, ScanError> {
        if let Some(width) = self.fixed_width() {
            if raw.len() < width {
                return Err(ScanError::MalformedValue {
                    what: "parameter value",
                    offset,
                    detail: format!(
                        "{} needs {width} bytes, value holds {}",
                        self.tag(),
                        raw.len()
                    ),
                });
            }
        }
        let value = match self {
            ParamType::PlainText => {
                let text = decode_utf16_be(raw).map_err(|detail| ScanError::MalformedValue {
                    what: "parameter value",
                    offset,
                    detail,
                })?;
                ParamValue::Text(text.trim_end_matches('\0').to_string())
            }
            ParamType::AsciiText => {
                if !raw.is_ascii() {
                    return Err(ScanError::MalformedValue {
                        what: "parameter value",
                        offset,
                        detail: "non-ASCII byte in text/ascii value".to_string(),
                    });
                }
                let text: String = raw.iter().map(|&b| b as char).collect();
                ParamValue::Ascii(text.trim_end_matches('\0').to_string())
            }
            ParamType::Float32 => ParamValue::Float32(read_f32_be(raw)),
            ParamType::Int32 => ParamValue::Int32(read_i32_be(raw)),
            ParamType::UInt32 => ParamValue::UInt32(read_u32_be(raw)),
            ParamType::Int16 => ParamValue::Int16(read_i16_be(raw)),
            ParamType::UInt16 => ParamValue::UInt16(read_u16_be(raw)),
            ParamType::Int8 => ParamValue::Int8(raw[0] as i8),
            ParamType::UInt8 => ParamValue::UInt8(raw[0]),
        };
        Ok(value)
    }
}

/// Decode a parameter value given its raw bytes and type-tag string.
///
/// Unrecognized tags preserve the bytes undecoded.
pub fn decode_param_value(tag: &str, raw: Bytes, offset: u64) -> Result<ParamValue, ScanError> {
    match ParamType::from_tag(tag) {
        Some(param_type) => param_type.decode(&raw, offset),
        None => Ok(ParamValue::Raw(raw)),
    }
}

// =============================================================================
// Parameter Values
// =============================================================================

/// A decoded header or dataset parameter value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ParamValue {
    /// UTF-16BE text value
    Text(String),

    /// ASCII text value
    Ascii(String),

    /// Signed byte value
    Int8(i8),

    /// Unsigned byte value
    UInt8(u8),

    /// Signed 16-bit value
    Int16(i16),

    /// Unsigned 16-bit value
    UInt16(u16),

    /// Signed 32-bit value
    Int32(i32),

    /// Unsigned 32-bit value
    UInt32(u32),

    /// Single-precision float value
    Float32(f32),

    /// Raw bytes of a value whose type tag was not recognized
    Raw(Bytes),
}

impl ParamValue {
    /// The value as text, if it holds either text variant.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) | ParamValue::Ascii(s) => Some(s),
            _ => None,
        }
    }
}

// =============================================================================
// Column Types
// =============================================================================

/// Dataset column value types, indexed by the 1-byte type tag of a column
/// descriptor.
///
/// The tag is an index into a fixed ordered table of nine primitive decoders;
/// the order is part of the wire format and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(i8)]
pub enum ColumnType {
    /// Signed byte (tag 0)
    Int8 = 0,

    /// Unsigned byte (tag 1)
    UInt8 = 1,

    /// Big-endian i16 (tag 2)
    Int16 = 2,

    /// Big-endian u16 (tag 3)
    UInt16 = 3,

    /// Big-endian i32 (tag 4)
    Int32 = 4,

    /// Big-endian u32 (tag 5)
    UInt32 = 5,

    /// Big-endian f32 (tag 6)
    Float32 = 6,

    /// Length-prefixed byte string (tag 7)
    Bytes = 7,

    /// Length-prefixed UTF-16BE string (tag 8)
    Text = 8,
}

impl ColumnType {
    /// Look up a column type tag.
    ///
    /// Returns `None` for tags outside the table.
    pub fn from_tag(tag: i8) -> Option<Self> {
        match tag {
            0 => Some(ColumnType::Int8),
            1 => Some(ColumnType::UInt8),
            2 => Some(ColumnType::Int16),
            3 => Some(ColumnType::UInt16),
            4 => Some(ColumnType::Int32),
            5 => Some(ColumnType::UInt32),
            6 => Some(ColumnType::Float32),
            7 => Some(ColumnType::Bytes),
            8 => Some(ColumnType::Text),
            _ => None,
        }
    }

    /// Read one value of this type from the row stream.
    pub fn read<R: Read>(self, cursor: &mut ByteCursor<R>) -> Result<CellValue, ScanError> {
        let value = match self {
            ColumnType::Int8 => CellValue::Int8(cursor.read_i8()?),
            ColumnType::UInt8 => CellValue::UInt8(cursor.read_u8()?),
            ColumnType::Int16 => CellValue::Int16(cursor.read_i16_be()?),
            ColumnType::UInt16 => CellValue::UInt16(cursor.read_u16_be()?),
            ColumnType::Int32 => CellValue::Int32(cursor.read_i32_be()?),
            ColumnType::UInt32 => CellValue::UInt32(cursor.read_u32_be()?),
            ColumnType::Float32 => CellValue::Float32(cursor.read_f32_be()?),
            ColumnType::Bytes => CellValue::Bytes(read_blob(cursor, "cell value")?),
            ColumnType::Text => CellValue::Text(read_text(cursor, "cell value")?),
        };
        Ok(value)
    }
}

// =============================================================================
// Cell Values
// =============================================================================

/// A single decoded dataset cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CellValue {
    /// Signed byte cell
    Int8(i8),

    /// Unsigned byte cell
    UInt8(u8),

    /// Signed 16-bit cell
    Int16(i16),

    /// Unsigned 16-bit cell
    UInt16(u16),

    /// Signed 32-bit cell
    Int32(i32),

    /// Unsigned 32-bit cell
    UInt32(u32),

    /// Single-precision float cell
    Float32(f32),

    /// Byte-string cell
    Bytes(Bytes),

    /// Text cell
    Text(String),
}

impl CellValue {
    /// The cell as an f32, if it holds any numeric variant.
    pub fn as_f32(&self) -> Option<f32> {
        match *self {
            CellValue::Int8(v) => Some(v as f32),
            CellValue::UInt8(v) => Some(v as f32),
            CellValue::Int16(v) => Some(v as f32),
            CellValue::UInt16(v) => Some(v as f32),
            CellValue::Int32(v) => Some(v as f32),
            CellValue::UInt32(v) => Some(v as f32),
            CellValue::Float32(v) => Some(v),
            CellValue::Bytes(_) | CellValue::Text(_) => None,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
