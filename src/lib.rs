//! # Chipscan
//!
//! Decoders for the two closed file formats produced by microarray scanning
//! instruments: the textual chip-definition format describing probe layout,
//! and the binary scan-intensity format holding per-cell measurements.
//!
//! Both decoders turn files into structured, queryable in-memory models for
//! a downstream processing pipeline. They are strict byte-level parsers:
//! declared counts and offsets are cross-checked against what is actually
//! read, and any disagreement fails the decode rather than yielding a
//! silently truncated model.
//!
//! ## Features
//!
//! - **Chip definitions**: section-based text grammar decoded into an
//!   [`ArrayDesign`] of quality-control and expression probe sets, with
//!   perfect-match/mismatch pairing and linear-index cross-checks
//! - **Scan intensities**: two incompatible binary sub-formats (fixed-layout
//!   legacy and recursive self-describing), auto-detected from the first
//!   byte and decoded into a flat intensity vector plus structured metadata
//! - **Forward compatibility**: unknown parameter type tags and unknown
//!   sections are preserved opaquely instead of rejected
//! - **Diagnosable failures**: every error carries the offending section,
//!   field, or byte offset
//!
//! ## Architecture
//!
//! The library is organized into a few modules:
//!
//! - [`io`] - sequential byte-cursor reading
//! - [`mod@format`] - the chip-definition and scan decoders
//! - [`error`] - error taxonomy shared by both decoders
//!
//! ## Example
//!
//! ```rust,no_run
//! use chipscan::{decode_intensities_path, ArrayDesign, ProbeSelection};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let design = ArrayDesign::decode_path("HG-U133A.cdf")?;
//!     let scan = decode_intensities_path("sample.cel")?;
//!     assert_eq!(scan.values.len(), design.num_cells());
//!
//!     for probe_set in &design.expression_probe_sets {
//!         let intensities: Vec<f32> = probe_set
//!             .probe_indices(ProbeSelection::PerfectMatch)
//!             .iter()
//!             .map(|&i| scan.values[i as usize])
//!             .collect();
//!         println!("{}: {} probes", probe_set.gene_id, intensities.len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod format;
pub mod io;

// Re-export commonly used types
pub use error::{DesignError, ReadError, ScanError};
pub use format::design::{
    ArrayDesign, ExpressionProbeSet, Probe, ProbePair, ProbeSelection, QcProbeSet, Section,
    SectionReader,
};
pub use format::scan::{
    decode_intensities, decode_intensities_path, decode_param_value, CellCoord, CellRecord,
    CellValue, ColumnDesc, ColumnType, DataGroup, DataSet, LegacyScan, Locale, Parameter,
    ParamType, ParamValue, ScanDocument, ScanHeader, ScanIntensities, SubGrid, TagBlock,
    GENERIC_MAGIC, GENERIC_VERSION, INTENSITY_DATA_SET_PREFIX, LEGACY_MAGIC, LEGACY_VERSION,
};
pub use format::{detect_scan_format, sniff, ScanFormat};
pub use io::ByteCursor;
