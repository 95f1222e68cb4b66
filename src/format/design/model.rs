//! In-memory model of a chip definition (array design).
//!
//! An [`ArrayDesign`] describes the probe layout of one chip type: which
//! grid cells belong to which probe set, and what each probe set targets.
//! Downstream processing uses it to select the entries of a scan's intensity
//! vector that belong to each gene.
//!
//! Probes address the intensity vector through their linear index,
//! `index = y * rows + x`.

use serde::Serialize;

// =============================================================================
// Probes
// =============================================================================

/// A single probe at a fixed chip grid coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Probe {
    /// Column coordinate
    pub x: u32,

    /// Row coordinate
    pub y: u32,

    /// Position of this probe's intensity in the flat intensity vector
    pub index: u32,
}

/// A perfect-match probe and its mismatch partner.
///
/// The mismatch probe carries the same base as the target where the perfect
/// match carries the complementary base; decoding guarantees a pair never
/// holds two probes of the same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProbePair {
    /// Perfect-match probe
    pub pm: Probe,

    /// Mismatch probe
    pub mm: Probe,
}

/// Which probes of an expression probe set to select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProbeSelection {
    /// Perfect-match probes only
    PerfectMatch,

    /// Mismatch probes only
    Mismatch,

    /// Both probes of every pair, perfect match first
    All,
}

// =============================================================================
// Probe Sets
// =============================================================================

/// A quality-control probe set: a non-gene-targeting control region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QcProbeSet {
    /// Numeric probe-set identifier
    pub id: u32,

    /// Quality-control type code
    pub qc_type: u32,

    /// Probes in file order
    pub probes: Vec<Probe>,
}

/// An expression probe set: one gene/transcript's probe footprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpressionProbeSet {
    /// Numeric probe-set identifier
    pub id: u32,

    /// Gene or transcript identifier this set targets
    pub gene_id: String,

    /// Probe pairs in file order
    pub pairs: Vec<ProbePair>,
}

impl ExpressionProbeSet {
    /// Linear indices of the perfect-match probes, in pair order.
    pub fn pm_indices(&self) -> Vec<u32> {
        self.pairs.iter().map(|p| p.pm.index).collect()
    }

    /// Linear indices of the mismatch probes, in pair order.
    pub fn mm_indices(&self) -> Vec<u32> {
        self.pairs.iter().map(|p| p.mm.index).collect()
    }

    /// Linear indices of the selected probes, in pair order.
    ///
    /// These are the positions downstream processing reads from an intensity
    /// vector for this gene.
    pub fn probe_indices(&self, selection: ProbeSelection) -> Vec<u32> {
        match selection {
            ProbeSelection::PerfectMatch => self.pm_indices(),
            ProbeSelection::Mismatch => self.mm_indices(),
            ProbeSelection::All => self
                .pairs
                .iter()
                .flat_map(|p| [p.pm.index, p.mm.index])
                .collect(),
        }
    }
}

// =============================================================================
// ArrayDesign
// =============================================================================

/// A fully decoded chip definition.
///
/// Constructed once per decode call and immutable thereafter. Probe-set
/// lists preserve the order their sections appeared in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArrayDesign {
    /// Chip type name
    pub name: String,

    /// Grid rows
    pub num_rows: u32,

    /// Grid columns
    pub num_cols: u32,

    /// Quality-control probe sets in file order
    pub qc_probe_sets: Vec<QcProbeSet>,

    /// Expression probe sets in file order
    pub expression_probe_sets: Vec<ExpressionProbeSet>,
}

impl ArrayDesign {
    /// Total number of cells on the grid (the expected intensity vector
    /// length).
    pub fn num_cells(&self) -> usize {
        self.num_rows as usize * self.num_cols as usize
    }

    /// Look up an expression probe set by gene identifier.
    pub fn expression_probe_set(&self, gene_id: &str) -> Option<&ExpressionProbeSet> {
        self.expression_probe_sets
            .iter()
            .find(|ps| ps.gene_id == gene_id)
    }
}

// =============================================================================
// Tests
// =============================================================================
