//! Format decoders for microarray files.
//!
//! Two file families are decoded:
//!
//! - [`design`] - the textual chip-definition format (probe layout)
//! - [`scan`] - the binary scan-intensity format, in two auto-detected
//!   sub-formats
//!
//! # Format Detection
//!
//! Use [`detect::detect_scan_format`] (or the slice probe [`detect::sniff`])
//! to identify which scan sub-format a file uses; [`scan::decode_intensities`]
//! does detection and dispatch in one call. Chip definitions have a single
//! format and need no detection.

pub mod design;
pub mod detect;
pub mod scan;

pub use design::ArrayDesign;
pub use detect::{detect_scan_format, sniff, ScanFormat};
pub use scan::{decode_intensities, decode_intensities_path, LegacyScan, ScanDocument, ScanIntensities};
