//! Reader for the legacy scan sub-format.
//!
//! The older of the two scan sub-formats: a fixed, little-endian binary
//! layout with no self-description. Every field is at a position implied by
//! the fields before it, so the file is consumed in one strictly sequential
//! pass.
//!
//! # File Structure
//!
//! ```text
//! Magic (i32, = 64)
//! Version (i32, = 4)
//! Column count, row count, cell count (i32 each)
//! Header tag/value block (length-prefixed text)
//! Algorithm name (length-prefixed text)
//! Algorithm parameter tag/value block (length-prefixed text)
//! Cell margin (i32), outlier count (u32), masked count (u32), subgrid count (i32)
//! rows x cols cell records: mean (f32), stddev (f32), pixel count (i16)
//! Masked cell coordinates (i16 pairs)
//! Outlier cell coordinates (i16 pairs)
//! Subgrid geometry records (2 x i32, 8 x f32, 4 x i32)
//! ```
//!
//! Cell records are stored in column-major iteration order (outer loop over
//! columns, inner over rows); that read order is the chip's canonical linear
//! addressing order and is preserved in [`LegacyScan::intensities`].
//!
//! Tag/value blocks come in two delimiter conventions. A block is first
//! parsed as one `key=value` pair per line; if any line does not fit, the
//! whole block is re-parsed as `;`-separated `key:value` pairs.

use std::io::Read;

use serde::Serialize;
use tracing::debug;

use crate::error::ScanError;
use crate::io::ByteCursor;

/// Magic number identifying the legacy sub-format (also its first byte).
pub const LEGACY_MAGIC: i32 = 64;

/// The only supported version of the legacy sub-format.
pub const LEGACY_VERSION: i32 = 4;

// =============================================================================
// Tag/Value Blocks
// =============================================================================

/// An ordered tag/value metadata block.
///
/// Entries keep file order and duplicates; [`get`](TagBlock::get) resolves
/// duplicate keys to the last occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TagBlock {
    entries: Vec<(String, String)>,
}

impl TagBlock {
    /// Look up a value by key (last occurrence wins).
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All entries in file order.
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the block holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse a block in either delimiter convention.
    ///
    /// `offset` is the file position of the block, for error context.
    fn parse(text: &str, offset: u64) -> Result<Self, ScanError> {
        if let Some(entries) = parse_delimited(text.lines(), '=') {
            return Ok(TagBlock { entries });
        }
        parse_delimited(text.split(';'), ':')
            .map(|entries| TagBlock { entries })
            .ok_or_else(|| ScanError::MalformedValue {
                what: "tag/value block",
                offset,
                detail: "entry fits neither key=value lines nor ;-separated key:value".to_string(),
            })
    }
}

/// Split each non-blank piece on the first `delimiter`, trimming both sides.
///
/// Returns `None` as soon as a piece has no delimiter, which triggers the
/// caller's fallback convention.
fn parse_delimited<'a>(
    pieces: impl Iterator<Item = &'a str>,
    delimiter: char,
) -> Option<Vec<(String, String)>> {
    let mut entries = Vec::new();
    for piece in pieces {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        let (key, value) = piece.split_once(delimiter)?;
        entries.push((key.trim().to_string(), value.trim().to_string()));
    }
    Some(entries)
}

// =============================================================================
// Records
// =============================================================================

/// One measured cell: mean intensity, standard deviation, pixel count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CellRecord {
    /// Mean intensity over the cell's pixels
    pub intensity: f32,

    /// Standard deviation of the cell's pixel intensities
    pub stddev: f32,

    /// Number of pixels averaged into the mean
    pub pixels: i16,
}

/// A cell grid coordinate, as stored in the masked/outlier lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CellCoord {
    /// Column coordinate
    pub x: i16,

    /// Row coordinate
    pub y: i16,
}

/// Geometry of one physical subgrid of the chip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SubGrid {
    /// Rows in the subgrid
    pub num_rows: i32,

    /// Columns in the subgrid
    pub num_cols: i32,

    /// Corner pixel positions, clockwise from upper left
    pub upper_left_x: f32,
    pub upper_left_y: f32,
    pub upper_right_x: f32,
    pub upper_right_y: f32,
    pub lower_left_x: f32,
    pub lower_left_y: f32,
    pub lower_right_x: f32,
    pub lower_right_y: f32,

    /// Cell-coordinate bounds of the subgrid
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

// =============================================================================
// LegacyScan
// =============================================================================

/// A fully decoded legacy scan file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegacyScan {
    /// Grid columns
    pub num_cols: u32,

    /// Grid rows
    pub num_rows: u32,

    /// Header tag/value metadata
    pub header: TagBlock,

    /// Name of the cell-summarization algorithm
    pub algorithm_name: String,

    /// Algorithm parameter tag/value metadata
    pub algorithm_params: TagBlock,

    /// Number of border pixels excluded from each cell
    pub cell_margin: i32,

    /// Cell records in read order (column-major over the grid)
    pub cells: Vec<CellRecord>,

    /// Coordinates of masked cells
    pub masked: Vec<CellCoord>,

    /// Coordinates of outlier cells
    pub outliers: Vec<CellCoord>,

    /// Subgrid geometry records
    pub subgrids: Vec<SubGrid>,
}

impl LegacyScan {
    /// Decode a legacy scan file from a byte stream.
    ///
    /// The stream must be positioned at the start of the file.
    ///
    /// # Errors
    /// - [`ScanError::BadMagic`] / [`ScanError::UnsupportedVersion`] for a
    ///   stream that is not this sub-format
    /// - [`ScanError::CountMismatch`] when the declared cell count does not
    ///   equal rows x cols
    /// - [`ScanError::MalformedValue`] for undecodable fields
    /// - [`ScanError::Io`] when the stream ends early
    pub fn decode<R: Read>(reader: R) -> Result<Self, ScanError> {
        let mut cursor = ByteCursor::new(reader);

        let magic = cursor.read_i32_le()?;
        if magic != LEGACY_MAGIC {
            return Err(ScanError::BadMagic {
                expected: i64::from(LEGACY_MAGIC),
                found: i64::from(magic),
                offset: 0,
            });
        }

        let version = cursor.read_i32_le()?;
        if version != LEGACY_VERSION {
            return Err(ScanError::UnsupportedVersion {
                expected: LEGACY_VERSION as u32,
                found: i64::from(version),
                offset: 4,
            });
        }

        let num_cols = read_dimension(&mut cursor, "column count")?;
        let num_rows = read_dimension(&mut cursor, "row count")?;
        debug!(num_rows, num_cols, "read grid dimensions");

        let declared_cells_offset = cursor.position();
        let declared_cells = cursor.read_i32_le()?;
        if declared_cells < 0 {
            return Err(ScanError::MalformedValue {
                what: "cell count",
                offset: declared_cells_offset,
                detail: format!("negative count {declared_cells}"),
            });
        }
        let expected_cells = u64::from(num_rows) * u64::from(num_cols);
        if declared_cells as u64 != expected_cells {
            return Err(ScanError::CountMismatch {
                what: "cell records",
                declared: declared_cells as u64,
                actual: expected_cells,
            });
        }

        let header = read_tag_block(&mut cursor)?;
        let algorithm_name = read_latin1(&mut cursor)?;
        let algorithm_params = read_tag_block(&mut cursor)?;
        debug!(algorithm = %algorithm_name, "read algorithm metadata");

        let cell_margin = cursor.read_i32_le()?;
        let num_outliers = cursor.read_u32_le()?;
        let num_masked = cursor.read_u32_le()?;
        let num_subgrids_offset = cursor.position();
        let num_subgrids = cursor.read_i32_le()?;
        if num_subgrids < 0 {
            return Err(ScanError::MalformedValue {
                what: "subgrid count",
                offset: num_subgrids_offset,
                detail: format!("negative count {num_subgrids}"),
            });
        }
        debug!(cell_margin, num_outliers, num_masked, num_subgrids, "read counts");

        // Outer loop over columns, inner over rows. This read order is the
        // canonical linear addressing order of the intensity vector.
        let mut cells = Vec::with_capacity(expected_cells as usize);
        for _col in 0..num_cols {
            for _row in 0..num_rows {
                cells.push(CellRecord {
                    intensity: cursor.read_f32_le()?,
                    stddev: cursor.read_f32_le()?,
                    pixels: cursor.read_i16_le()?,
                });
            }
        }

        let mut masked = Vec::with_capacity(num_masked as usize);
        for _ in 0..num_masked {
            masked.push(read_coord(&mut cursor)?);
        }

        let mut outliers = Vec::with_capacity(num_outliers as usize);
        for _ in 0..num_outliers {
            outliers.push(read_coord(&mut cursor)?);
        }

        let mut subgrids = Vec::with_capacity(num_subgrids as usize);
        for _ in 0..num_subgrids {
            subgrids.push(read_subgrid(&mut cursor)?);
        }

        Ok(LegacyScan {
            num_cols,
            num_rows,
            header,
            algorithm_name,
            algorithm_params,
            cell_margin,
            cells,
            masked,
            outliers,
            subgrids,
        })
    }

    /// The per-cell intensity vector, in read order.
    pub fn intensities(&self) -> Vec<f32> {
        self.cells.iter().map(|c| c.intensity).collect()
    }

    /// Total number of cells on the grid.
    pub fn num_cells(&self) -> usize {
        self.num_rows as usize * self.num_cols as usize
    }
}

// =============================================================================
// Field Readers
// =============================================================================

fn read_dimension<R: Read>(
    cursor: &mut ByteCursor<R>,
    what: &'static str,
) -> Result<u32, ScanError> {
    let offset = cursor.position();
    let value = cursor.read_i32_le()?;
    if value <= 0 {
        return Err(ScanError::MalformedValue {
            what,
            offset,
            detail: format!("non-positive dimension {value}"),
        });
    }
    Ok(value as u32)
}

/// Read a length-prefixed byte blob decoded as Latin-1 text.
fn read_latin1<R: Read>(cursor: &mut ByteCursor<R>) -> Result<String, ScanError> {
    let offset = cursor.position();
    let len = cursor.read_i32_le()?;
    if len < 0 {
        return Err(ScanError::MalformedValue {
            what: "text blob",
            offset,
            detail: format!("negative byte count {len}"),
        });
    }
    let raw = cursor.read_bytes(len as usize)?;
    Ok(raw.iter().map(|&b| b as char).collect())
}

fn read_tag_block<R: Read>(cursor: &mut ByteCursor<R>) -> Result<TagBlock, ScanError> {
    let offset = cursor.position();
    let text = read_latin1(cursor)?;
    TagBlock::parse(&text, offset)
}

fn read_coord<R: Read>(cursor: &mut ByteCursor<R>) -> Result<CellCoord, ScanError> {
    Ok(CellCoord {
        x: cursor.read_i16_le()?,
        y: cursor.read_i16_le()?,
    })
}

fn read_subgrid<R: Read>(cursor: &mut ByteCursor<R>) -> Result<SubGrid, ScanError> {
    Ok(SubGrid {
        num_rows: cursor.read_i32_le()?,
        num_cols: cursor.read_i32_le()?,
        upper_left_x: cursor.read_f32_le()?,
        upper_left_y: cursor.read_f32_le()?,
        upper_right_x: cursor.read_f32_le()?,
        upper_right_y: cursor.read_f32_le()?,
        lower_left_x: cursor.read_f32_le()?,
        lower_left_y: cursor.read_f32_le()?,
        lower_right_x: cursor.read_f32_le()?,
        lower_right_y: cursor.read_f32_le()?,
        left: cursor.read_i32_le()?,
        top: cursor.read_i32_le()?,
        right: cursor.read_i32_le()?,
        bottom: cursor.read_i32_le()?,
    })
}

// =============================================================================
// Tests
// =============================================================================
