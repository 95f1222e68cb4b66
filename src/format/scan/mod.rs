//! Scan-intensity file decoding.
//!
//! A scan file holds one measured intensity per chip grid cell, in one of
//! two incompatible binary sub-formats that are auto-detected from the first
//! byte (see [`crate::format::detect`]):
//!
//! - [`LegacyScan`] - the fixed-layout little-endian sub-format
//! - [`ScanDocument`] - the self-describing big-endian sub-format
//!
//! [`decode_intensities`] detects, dispatches, and projects either model to
//! the flat per-cell intensity vector consumed by downstream processing.

mod document;
mod generic;
mod legacy;
mod values;

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::error::{ReadError, ScanError};
use crate::format::detect::{detect_scan_format, ScanFormat};

pub use document::{
    ColumnDesc, DataGroup, DataSet, Locale, Parameter, ScanDocument, ScanHeader,
    INTENSITY_DATA_SET_PREFIX,
};
pub use generic::{GENERIC_MAGIC, GENERIC_VERSION};
pub use legacy::{CellCoord, CellRecord, LegacyScan, SubGrid, TagBlock, LEGACY_MAGIC, LEGACY_VERSION};
pub use values::{decode_param_value, CellValue, ColumnType, ParamType, ParamValue};

// =============================================================================
// ScanIntensities
// =============================================================================

/// The per-cell intensity vector extracted from a scan file, plus whatever
/// structured metadata the sub-format carries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanIntensities {
    /// Which sub-format the file used
    pub format: ScanFormat,

    /// One intensity per grid cell, in canonical linear addressing order
    pub values: Vec<f32>,

    /// Acquisition header; only the self-describing sub-format has one
    pub header: Option<ScanHeader>,
}

/// Decode a scan file of either sub-format into its intensity vector.
///
/// The first byte selects the sub-format, the stream is rewound to offset 0,
/// and the whole file is decoded by the matching reader. The result's
/// `values` are directly indexable by a probe's linear index.
///
/// # Errors
/// * `Err(ScanError::UnrecognizedFormat)` - first byte matches neither format
/// * any error of the dispatched reader
pub fn decode_intensities<R: Read + Seek>(mut reader: R) -> Result<ScanIntensities, ScanError> {
    let format = detect_scan_format(&mut reader)?;
    debug!(format = format.name(), "detected scan file format");

    match format {
        ScanFormat::Legacy => {
            let scan = LegacyScan::decode(reader)?;
            Ok(ScanIntensities {
                format,
                values: scan.intensities(),
                header: None,
            })
        }
        ScanFormat::Generic => {
            let document = ScanDocument::decode(reader)?;
            let values = document.intensities()?;
            Ok(ScanIntensities {
                format,
                values,
                header: Some(document.header),
            })
        }
    }
}

/// Decode a scan file from a filesystem path.
///
/// The file handle is owned by this call and released on every exit path.
pub fn decode_intensities_path(path: impl AsRef<Path>) -> Result<ScanIntensities, ScanError> {
    let file = File::open(path).map_err(|source| ReadError { offset: 0, source })?;
    decode_intensities(BufReader::new(file))
}

// =============================================================================
// Tests
// =============================================================================
