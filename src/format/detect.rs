//! Format detection for scan-intensity files.
//!
//! Scan files come in two incompatible binary sub-formats that share no
//! common layout, but their first byte disambiguates them:
//!
//! - **59**: the self-describing sub-format (magic byte 59, version byte 1)
//! - **64**: the legacy sub-format, whose first field is the little-endian
//!   32-bit magic number 64
//!
//! Detection consumes one byte and seeks back to the start of the stream so
//! the selected reader sees the file from offset 0.

use std::io::{Read, Seek, SeekFrom};

use serde::Serialize;

use crate::error::{ReadError, ScanError};
use crate::format::scan::{GENERIC_MAGIC, GENERIC_VERSION, LEGACY_MAGIC};

// =============================================================================
// ScanFormat
// =============================================================================

/// Detected scan-intensity sub-format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScanFormat {
    /// Fixed-layout little-endian sub-format (magic 64, version 4)
    Legacy,

    /// Self-describing big-endian sub-format (magic 59, version 1)
    Generic,
}

impl ScanFormat {
    /// Get a human-readable name for the format.
    pub const fn name(&self) -> &'static str {
        match self {
            ScanFormat::Legacy => "legacy scan",
            ScanFormat::Generic => "self-describing scan",
        }
    }
}

// =============================================================================
// Format Detection
// =============================================================================

/// Detect the sub-format of a scan file.
///
/// Reads the first byte and seeks back to offset 0, leaving the stream
/// positioned for the selected reader.
///
/// # Errors
/// * `Err(ScanError::UnrecognizedFormat)` - first byte matches neither format
/// * `Err(ScanError::Io)` - the stream could not be read or rewound
pub fn detect_scan_format<R: Read + Seek>(reader: &mut R) -> Result<ScanFormat, ScanError> {
    let mut marker = [0u8; 1];
    reader
        .read_exact(&mut marker)
        .map_err(|source| ReadError { offset: 0, source })?;
    reader
        .seek(SeekFrom::Start(0))
        .map_err(|source| ReadError { offset: 1, source })?;

    match marker[0] {
        GENERIC_MAGIC => Ok(ScanFormat::Generic),
        m if m == LEGACY_MAGIC as u8 => Ok(ScanFormat::Legacy),
        m => Err(ScanError::UnrecognizedFormat { marker: m }),
    }
}

/// Check leading bytes for a recognizable scan sub-format.
///
/// This is a quick probe that can be used before attempting a full decode.
pub fn sniff(bytes: &[u8]) -> Option<ScanFormat> {
    if bytes.len() >= 2 && bytes[0] == GENERIC_MAGIC && bytes[1] == GENERIC_VERSION {
        return Some(ScanFormat::Generic);
    }
    if bytes.len() >= 4
        && i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) == LEGACY_MAGIC
    {
        return Some(ScanFormat::Legacy);
    }
    None
}

// =============================================================================
// Tests
// =============================================================================
