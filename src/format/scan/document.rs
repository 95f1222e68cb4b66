//! In-memory model of a self-describing scan file.
//!
//! A decoded file is a [`ScanDocument`]: one recursive [`ScanHeader`]
//! (acquisition metadata plus the provenance chain of parent headers) and an
//! ordered list of [`DataGroup`]s, each holding ordered [`DataSet`]s of typed
//! rows. The intensity vector consumed by downstream processing is a
//! projection of one well-known dataset; everything else is retained so
//! callers can query acquisition parameters without re-reading the file.

use bytes::Bytes;
use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::ScanError;
use crate::format::scan::values::{CellValue, ColumnType, ParamValue};

/// Name prefix of the dataset holding per-cell intensities.
pub const INTENSITY_DATA_SET_PREFIX: &str = "Intensity";

// =============================================================================
// Header
// =============================================================================

/// A named, typed header or dataset parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    /// Parameter name
    pub name: String,

    /// Decoded value (or preserved raw bytes for unrecognized type tags)
    pub value: ParamValue,
}

/// A two-part language/region locale code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Locale {
    /// Two-letter language code (e.g. "en")
    pub language: String,

    /// Region code (e.g. "US"); may be empty
    pub region: String,
}

/// Acquisition metadata for a scan file.
///
/// Headers nest: each file records the headers of the files it was derived
/// from as `parent_headers`, to arbitrary (finite) depth. A parent count of
/// zero terminates the chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanHeader {
    /// Data type identifier, kept as raw bytes
    pub data_type_id: Bytes,

    /// Unique file identifier, kept as raw bytes
    pub file_id: Bytes,

    /// Creation timestamp; absent is valid
    pub creation_time: Option<NaiveDateTime>,

    /// Locale the file was written under
    pub locale: Locale,

    /// Ordered (name, value) parameters
    pub params: Vec<Parameter>,

    /// Headers of the files this one was derived from
    pub parent_headers: Vec<ScanHeader>,
}

impl ScanHeader {
    /// Look up a parameter value by name.
    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }
}

// =============================================================================
// Data Sets and Groups
// =============================================================================

/// A dataset column descriptor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDesc {
    /// Column name
    pub name: String,

    /// Value type of every cell in this column
    pub column_type: ColumnType,

    /// Declared per-value byte size (informational; strings are
    /// length-prefixed regardless)
    pub size: u32,
}

/// A named table of typed rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataSet {
    /// Dataset name
    pub name: String,

    /// Ordered dataset parameters
    pub params: Vec<Parameter>,

    /// Ordered column descriptors
    pub columns: Vec<ColumnDesc>,

    /// Rows; each row holds exactly one value per column, in column order
    pub rows: Vec<Vec<CellValue>>,
}

impl DataSet {
    /// Number of columns.
    pub fn num_cols(&self) -> usize {
        self.columns.len()
    }

    /// Number of rows.
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }
}

/// A named, ordered collection of datasets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataGroup {
    /// Group name
    pub name: String,

    /// Datasets in file order
    pub datasets: Vec<DataSet>,
}

impl DataGroup {
    /// Find the first dataset whose name starts with `prefix`.
    ///
    /// Dataset names carry vendor-specific suffixes, so lookups match on a
    /// prefix rather than the full name.
    pub fn dataset_by_prefix(&self, prefix: &str) -> Option<&DataSet> {
        self.datasets.iter().find(|ds| ds.name.starts_with(prefix))
    }
}

// =============================================================================
// Document
// =============================================================================

/// A fully decoded self-describing scan file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanDocument {
    /// File header with provenance chain
    pub header: ScanHeader,

    /// Data groups in file order
    pub data_groups: Vec<DataGroup>,
}

impl ScanDocument {
    /// Find a data group by exact name.
    pub fn group_by_name(&self, name: &str) -> Option<&DataGroup> {
        self.data_groups.iter().find(|g| g.name == name)
    }

    /// Extract the per-cell intensity vector.
    ///
    /// Searches all data groups for the first dataset whose name starts with
    /// [`INTENSITY_DATA_SET_PREFIX`] and takes the first column of every row,
    /// in row order. Row order is the chip's canonical linear addressing
    /// order, so the result is directly indexable by a probe's linear index.
    pub fn intensities(&self) -> Result<Vec<f32>, ScanError> {
        let dataset = self
            .data_groups
            .iter()
            .find_map(|g| g.dataset_by_prefix(INTENSITY_DATA_SET_PREFIX))
            .ok_or_else(|| ScanError::MissingDataSet {
                prefix: INTENSITY_DATA_SET_PREFIX.to_string(),
            })?;

        let column = dataset
            .columns
            .first()
            .ok_or_else(|| ScanError::NonNumericColumn {
                dataset: dataset.name.clone(),
                column: "<none>".to_string(),
            })?;

        dataset
            .rows
            .iter()
            .map(|row| {
                row.first()
                    .and_then(CellValue::as_f32)
                    .ok_or_else(|| ScanError::NonNumericColumn {
                        dataset: dataset.name.clone(),
                        column: column.name.clone(),
                    })
            })
            .collect()
    }
}

// =============================================================================
// Tests
// =============================================================================
