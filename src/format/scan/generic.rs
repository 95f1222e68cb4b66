//! Reader for the self-describing scan sub-format.
//!
//! This is the newer of the two scan sub-formats: a recursive, big-endian
//! binary layout in which every structure declares the counts and offsets of
//! the structures it contains.
//!
//! # File Structure
//!
//! ```text
//! Byte 0:     Magic (59)
//! Byte 1:     Version (1)
//! Bytes 2-5:  Data group count (i32)
//! Bytes 6-9:  Offset of the first data group (u32)
//! Then:       One ScanHeader (recursive; see below)
//! Then:       Data groups, starting exactly at the declared offset
//! ```
//!
//! A header holds two length-prefixed byte strings (data type id, file id),
//! a UTF-16BE timestamp string, a locale string, a parameter list of
//! (name, value, type) triplets, and zero or more recursively nested parent
//! headers. Parents only reference ancestors, never descendants or siblings,
//! so the recursion is cycle-free and terminates at a parent count of zero.
//!
//! # Offset Discipline
//!
//! Declared offsets are cross-checked against the byte cursor at every
//! structure boundary: the first data group, the first dataset of each
//! group, the end of each dataset, and the start of each subsequent group.
//! A drift of exactly one byte between consecutive datasets is a known
//! writer quirk, tolerated and skipped; any other drift means a truncated,
//! corrupted, or unsupported file and fails the decode.

use std::io::Read;

use chrono::{DateTime, NaiveDateTime};
use tracing::{debug, warn};

use crate::error::ScanError;
use crate::io::ByteCursor;

use super::document::{ColumnDesc, DataGroup, DataSet, Locale, Parameter, ScanDocument, ScanHeader};
use super::values::{decode_param_value, read_blob, read_text, ColumnType};

/// Magic byte identifying the self-describing sub-format.
pub const GENERIC_MAGIC: u8 = 59;

/// The only supported version of the self-describing sub-format.
pub const GENERIC_VERSION: u8 = 1;

/// Timestamp layouts accepted for the creation-time header field, tried in
/// order after RFC 3339.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%m/%d/%y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

impl ScanDocument {
    /// Decode a self-describing scan file from a byte stream.
    ///
    /// The stream must be positioned at the start of the file. The whole
    /// file is consumed sequentially; nothing is seeked or re-read.
    ///
    /// # Errors
    /// - [`ScanError::BadMagic`] / [`ScanError::UnsupportedVersion`] for a
    ///   stream that is not this sub-format
    /// - [`ScanError::OffsetMismatch`] when a declared offset disagrees with
    ///   the byte cursor
    /// - [`ScanError::MalformedValue`] for undecodable fields
    /// - [`ScanError::Io`] when the stream ends early
    pub fn decode<R: Read>(reader: R) -> Result<Self, ScanError> {
        let mut cursor = ByteCursor::new(reader);

        let (num_groups, first_group_pos) = read_file_header(&mut cursor)?;
        let header = read_header(&mut cursor)?;

        // Groups must start exactly where the file header said they would.
        if cursor.position() != u64::from(first_group_pos) {
            return Err(ScanError::OffsetMismatch {
                what: "first data group",
                declared: u64::from(first_group_pos),
                actual: cursor.position(),
            });
        }

        let mut data_groups = Vec::with_capacity(num_groups);
        for _ in 0..num_groups {
            data_groups.push(read_data_group(&mut cursor)?);
        }

        Ok(ScanDocument {
            header,
            data_groups,
        })
    }
}

// =============================================================================
// File Header
// =============================================================================

fn read_file_header<R: Read>(cursor: &mut ByteCursor<R>) -> Result<(usize, u32), ScanError> {
    let magic = cursor.read_u8()?;
    if magic != GENERIC_MAGIC {
        return Err(ScanError::BadMagic {
            expected: i64::from(GENERIC_MAGIC),
            found: i64::from(magic),
            offset: 0,
        });
    }

    let version = cursor.read_u8()?;
    if version != GENERIC_VERSION {
        return Err(ScanError::UnsupportedVersion {
            expected: u32::from(GENERIC_VERSION),
            found: i64::from(version),
            offset: 1,
        });
    }

    let num_groups = read_count(cursor, "data group count")?;
    let first_group_pos = cursor.read_u32_be()?;
    debug!(num_groups, first_group_pos, "read file header");

    Ok((num_groups, first_group_pos))
}

/// Read a big-endian i32 count field, rejecting negative values.
fn read_count<R: Read>(
    cursor: &mut ByteCursor<R>,
    what: &'static str,
) -> Result<usize, ScanError> {
    let offset = cursor.position();
    let count = cursor.read_i32_be()?;
    if count < 0 {
        return Err(ScanError::MalformedValue {
            what,
            offset,
            detail: format!("negative count {count}"),
        });
    }
    Ok(count as usize)
}

// =============================================================================
// Scan Header
// =============================================================================

fn read_header<R: Read>(cursor: &mut ByteCursor<R>) -> Result<ScanHeader, ScanError> {
    let data_type_id = read_blob(cursor, "data type identifier")?;
    let file_id = read_blob(cursor, "file identifier")?;
    let creation_time = read_timestamp(cursor)?;
    let locale = read_locale(cursor)?;

    let num_params = read_count(cursor, "header parameter count")?;
    let mut params = Vec::with_capacity(num_params);
    for _ in 0..num_params {
        params.push(read_parameter(cursor)?);
    }

    let num_parents = read_count(cursor, "parent header count")?;
    debug!(num_params, num_parents, "read scan header");

    let mut parent_headers = Vec::with_capacity(num_parents);
    for _ in 0..num_parents {
        parent_headers.push(read_header(cursor)?);
    }

    Ok(ScanHeader {
        data_type_id,
        file_id,
        creation_time,
        locale,
        params,
        parent_headers,
    })
}

/// Read one (name, value, type) parameter triplet.
///
/// The value is a raw length-prefixed buffer whose interpretation is chosen
/// by the trailing type-tag string via the shared decode table.
fn read_parameter<R: Read>(cursor: &mut ByteCursor<R>) -> Result<Parameter, ScanError> {
    let name = read_text(cursor, "parameter name")?;
    let value_offset = cursor.position();
    let raw = read_blob(cursor, "parameter value")?;
    let tag = read_text(cursor, "parameter type")?;
    let value = decode_param_value(&tag, raw, value_offset)?;
    Ok(Parameter { name, value })
}

/// Read the creation timestamp. An empty string means no timestamp and is
/// not an error; a non-empty string that matches no known layout is.
fn read_timestamp<R: Read>(
    cursor: &mut ByteCursor<R>,
) -> Result<Option<NaiveDateTime>, ScanError> {
    let offset = cursor.position();
    let text = read_text(cursor, "creation timestamp")?;
    if text.is_empty() {
        return Ok(None);
    }
    parse_timestamp(&text)
        .map(Some)
        .ok_or_else(|| ScanError::MalformedValue {
            what: "creation timestamp",
            offset,
            detail: format!("unparseable date/time string {text:?}"),
        })
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}

/// Read the locale string and split it into a 2-char language code and the
/// remainder after the separator (e.g. "en-US" → "en" / "US").
fn read_locale<R: Read>(cursor: &mut ByteCursor<R>) -> Result<Locale, ScanError> {
    let text = read_text(cursor, "locale")?;
    let language = text.chars().take(2).collect();
    let region = text.chars().skip(3).collect();
    Ok(Locale { language, region })
}

// =============================================================================
// Data Groups
// =============================================================================

fn read_data_group<R: Read>(cursor: &mut ByteCursor<R>) -> Result<DataGroup, ScanError> {
    let next_group_pos = cursor.read_u32_be()?;
    let first_dataset_pos = cursor.read_u32_be()?;
    let num_datasets = read_count(cursor, "data set count")?;
    let name = read_text(cursor, "data group name")?;
    debug!(
        name = %name,
        num_datasets,
        first_dataset_pos,
        next_group_pos,
        "read data group header"
    );

    // Datasets must start exactly at the declared offset; this is checked
    // before any dataset content is parsed.
    if cursor.position() != u64::from(first_dataset_pos) {
        return Err(ScanError::OffsetMismatch {
            what: "first data set",
            declared: u64::from(first_dataset_pos),
            actual: cursor.position(),
        });
    }

    let mut datasets = Vec::with_capacity(num_datasets);
    for _ in 0..num_datasets {
        let (dataset, next_pos) = read_data_set(cursor)?;

        // Some writers leave a single pad byte between datasets. Tolerate
        // exactly that; any other drift is fatal.
        let actual = cursor.position();
        match u64::from(next_pos).checked_sub(actual) {
            Some(0) => {}
            Some(1) => {
                let pad = cursor.read_u8()?;
                warn!(pad, "skipping one pad byte between data sets");
            }
            _ => {
                return Err(ScanError::OffsetMismatch {
                    what: "next data set",
                    declared: u64::from(next_pos),
                    actual,
                });
            }
        }

        datasets.push(dataset);
    }

    // A zero next-group offset marks the last group; otherwise the next
    // group must start where this one ended.
    if next_group_pos != 0 && cursor.position() != u64::from(next_group_pos) {
        return Err(ScanError::OffsetMismatch {
            what: "next data group",
            declared: u64::from(next_group_pos),
            actual: cursor.position(),
        });
    }

    Ok(DataGroup { name, datasets })
}

// =============================================================================
// Data Sets
// =============================================================================

fn read_data_set<R: Read>(cursor: &mut ByteCursor<R>) -> Result<(DataSet, u32), ScanError> {
    let data_pos = cursor.read_u32_be()?;
    let next_pos = cursor.read_u32_be()?;
    let name = read_text(cursor, "data set name")?;

    let num_params = read_count(cursor, "data set parameter count")?;
    let mut params = Vec::with_capacity(num_params);
    for _ in 0..num_params {
        params.push(read_parameter(cursor)?);
    }

    let num_cols = cursor.read_u32_be()? as usize;
    let mut columns = Vec::with_capacity(num_cols);
    for _ in 0..num_cols {
        columns.push(read_column(cursor)?);
    }

    let num_rows = cursor.read_u32_be()? as usize;
    debug!(
        name = %name,
        data_pos,
        next_pos,
        num_cols,
        num_rows,
        "read data set header"
    );

    let mut rows = Vec::with_capacity(num_rows);
    for _ in 0..num_rows {
        let mut row = Vec::with_capacity(columns.len());
        for column in &columns {
            row.push(column.column_type.read(cursor)?);
        }
        rows.push(row);
    }

    Ok((
        DataSet {
            name,
            params,
            columns,
            rows,
        },
        next_pos,
    ))
}

fn read_column<R: Read>(cursor: &mut ByteCursor<R>) -> Result<ColumnDesc, ScanError> {
    let name = read_text(cursor, "column name")?;

    let tag_offset = cursor.position();
    let tag = cursor.read_i8()?;
    let column_type = ColumnType::from_tag(tag).ok_or_else(|| ScanError::MalformedValue {
        what: "column type tag",
        offset: tag_offset,
        detail: format!("unknown column type tag {tag}"),
    })?;

    let size_offset = cursor.position();
    let size = cursor.read_i32_be()?;
    if size < 0 {
        return Err(ScanError::MalformedValue {
            what: "column byte size",
            offset: size_offset,
            detail: format!("negative byte size {size}"),
        });
    }

    Ok(ColumnDesc {
        name,
        column_type,
        size: size as u32,
    })
}

// =============================================================================
// Tests
// =============================================================================
