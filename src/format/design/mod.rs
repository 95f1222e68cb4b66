//! Chip-definition file decoding.
//!
//! A chip definition is a UTF-8/ASCII text file in a flat section grammar
//! describing the probe layout of one chip type. Decoding produces an
//! [`ArrayDesign`]: quality-control probe sets, expression probe sets, and
//! the grid dimensions that tie probe coordinates to linear intensity-vector
//! indices.
//!
//! The entry point is [`ArrayDesign::decode`] (or
//! [`ArrayDesign::decode_path`] for files on disk).

mod decoder;
mod model;
mod sections;

pub use model::{ArrayDesign, ExpressionProbeSet, Probe, ProbePair, ProbeSelection, QcProbeSet};
pub use sections::{Section, SectionReader};
