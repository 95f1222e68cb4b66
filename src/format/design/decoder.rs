//! Chip-definition decoding.
//!
//! A chip-definition file describes one chip type as a flat sequence of
//! sections (see [`super::sections`]). The section name is the discriminator:
//!
//! - `[Chip]` - grid dimensions and the declared probe-set counts
//! - `[QC<id>]` - a quality-control probe set with its cell rows
//! - `[Unit<id>]` - a header-only record with fixed unit-type and block-count
//!   values; carries no probe data
//! - `[Unit<id>_<block>]` - the probe-pair content of an expression probe set
//!
//! Anything else (the leading `[CDF]` version section, vendor extensions,
//! unit-like names with non-numeric ids) is skipped, never rejected.
//!
//! Decoding is strict: declared counts must match observed counts, explicit
//! probe indices must match the `y * rows + x` addressing formula, and every
//! pair must classify into exactly one perfect-match and one mismatch probe.
//! Violations fail the decode; nothing is truncated or padded.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::debug;

use crate::error::DesignError;

use super::model::{ArrayDesign, ExpressionProbeSet, Probe, ProbePair, QcProbeSet};
use super::sections::{Section, SectionReader};

/// Section holding the chip header fields.
const CHIP_SECTION: &str = "Chip";

/// Name prefix of quality-control probe-set sections.
const QC_PREFIX: &str = "QC";

/// Name prefix of expression unit sections.
const UNIT_PREFIX: &str = "Unit";

/// Key prefix of probe data rows.
const CELL_PREFIX: &str = "Cell";

/// Key of the column-caption row preceding probe data rows.
const CELL_HEADER_KEY: &str = "CellHeader";

/// The only unit-type code carried by header-only unit sections.
const EXPECTED_UNIT_TYPE: i64 = 3;

/// The only block count carried by header-only unit sections.
const EXPECTED_BLOCK_COUNT: i64 = 1;

// Tab-separated field positions within probe data rows.
const FIELD_X: usize = 0;
const FIELD_Y: usize = 1;
const QC_FIELD_INDEX: usize = 5;
const PAIR_FIELD_PROBE_BASE: usize = 8;
const PAIR_FIELD_TARGET_BASE: usize = 9;
const PAIR_FIELD_INDEX: usize = 11;

impl ArrayDesign {
    /// Decode a chip-definition file from a buffered text stream.
    ///
    /// Sections are processed in file order in a single pass; the `[Chip]`
    /// section must precede all probe-set sections. Probe-set lists preserve
    /// the order their sections were encountered in.
    ///
    /// # Errors
    /// - [`DesignError::MissingSection`] / [`DesignError::MissingKey`] when
    ///   required structure is absent
    /// - [`DesignError::InvalidValue`] when a field cannot be parsed as its
    ///   expected type
    /// - [`DesignError::CountMismatch`] / [`DesignError::IndexMismatch`] /
    ///   [`DesignError::AmbiguousPair`] when a structural invariant fails
    pub fn decode<B: BufRead>(reader: B) -> Result<Self, DesignError> {
        let mut sections = SectionReader::new(reader);

        let mut chip: Option<ChipHeader> = None;
        let mut qc_probe_sets = Vec::new();
        let mut expression_probe_sets = Vec::new();

        while let Some(section) = sections.next_section()? {
            if section.name == CHIP_SECTION {
                chip = Some(ChipHeader::parse(&section)?);
                continue;
            }

            let Some(kind) = SectionKind::classify(&section.name) else {
                continue;
            };
            let chip = chip.as_ref().ok_or_else(|| DesignError::MissingSection {
                name: CHIP_SECTION.to_string(),
            })?;

            match kind {
                SectionKind::Qc(id) => {
                    qc_probe_sets.push(parse_qc_section(&section, id, chip.num_rows)?);
                }
                SectionKind::UnitHeader => validate_unit_header(&section)?,
                SectionKind::UnitBlock(id) => {
                    expression_probe_sets.push(parse_unit_block(&section, id, chip.num_rows)?);
                }
            }
        }

        let chip = chip.ok_or_else(|| DesignError::MissingSection {
            name: CHIP_SECTION.to_string(),
        })?;

        if qc_probe_sets.len() != chip.num_qc_units {
            return Err(DesignError::CountMismatch {
                context: "NumQCUnits".to_string(),
                declared: chip.num_qc_units,
                actual: qc_probe_sets.len(),
            });
        }
        if expression_probe_sets.len() != chip.num_units {
            return Err(DesignError::CountMismatch {
                context: "NumberOfUnits".to_string(),
                declared: chip.num_units,
                actual: expression_probe_sets.len(),
            });
        }

        debug!(
            name = %chip.name,
            num_rows = chip.num_rows,
            num_cols = chip.num_cols,
            qc_probe_sets = qc_probe_sets.len(),
            expression_probe_sets = expression_probe_sets.len(),
            "decoded chip definition"
        );

        Ok(ArrayDesign {
            name: chip.name,
            num_rows: chip.num_rows,
            num_cols: chip.num_cols,
            qc_probe_sets,
            expression_probe_sets,
        })
    }

    /// Decode a chip-definition file from a filesystem path.
    ///
    /// The file handle is owned by this call and released on every exit path.
    pub fn decode_path(path: impl AsRef<Path>) -> Result<Self, DesignError> {
        let file = File::open(path)?;
        Self::decode(BufReader::new(file))
    }
}

// =============================================================================
// Section Classification
// =============================================================================

enum SectionKind {
    /// `QC<id>`
    Qc(u32),

    /// `Unit<id>` with no block suffix
    UnitHeader,

    /// `Unit<id>_<block>`
    UnitBlock(u32),
}

impl SectionKind {
    fn classify(name: &str) -> Option<SectionKind> {
        if let Some(rest) = name.strip_prefix(QC_PREFIX) {
            if let Ok(id) = rest.parse() {
                return Some(SectionKind::Qc(id));
            }
        }
        if let Some(rest) = name.strip_prefix(UNIT_PREFIX) {
            match rest.split_once('_') {
                None => {
                    if rest.parse::<u32>().is_ok() {
                        return Some(SectionKind::UnitHeader);
                    }
                }
                Some((id, _block)) => {
                    if let Ok(id) = id.parse() {
                        return Some(SectionKind::UnitBlock(id));
                    }
                }
            }
        }
        None
    }
}

// =============================================================================
// Chip Header
// =============================================================================

struct ChipHeader {
    name: String,
    num_rows: u32,
    num_cols: u32,
    num_units: usize,
    num_qc_units: usize,
}

impl ChipHeader {
    fn parse(section: &Section) -> Result<Self, DesignError> {
        let name = require(section, "Name")?.to_string();
        let num_rows = parse_dimension(section, "Rows")?;
        let num_cols = parse_dimension(section, "Cols")?;
        let num_units = parse_key::<usize>(section, "NumberOfUnits")?;
        let num_qc_units = parse_key::<usize>(section, "NumQCUnits")?;
        debug!(name = %name, num_rows, num_cols, num_units, num_qc_units, "parsed chip header");
        Ok(ChipHeader {
            name,
            num_rows,
            num_cols,
            num_units,
            num_qc_units,
        })
    }
}

// =============================================================================
// QC Sections
// =============================================================================

fn parse_qc_section(section: &Section, id: u32, num_rows: u32) -> Result<QcProbeSet, DesignError> {
    let qc_type = parse_key::<u32>(section, "Type")?;
    let declared = parse_key::<usize>(section, "NumberCells")?;

    let mut probes = Vec::with_capacity(declared);
    for (key, value) in &section.entries {
        if !key.starts_with(CELL_PREFIX) || key == CELL_HEADER_KEY {
            continue;
        }
        let fields = split_row(section, key, value, QC_FIELD_INDEX + 1)?;
        let x = parse_field::<u32>(section, key, &fields, FIELD_X)?;
        let y = parse_field::<u32>(section, key, &fields, FIELD_Y)?;
        let declared_index = parse_field::<u32>(section, key, &fields, QC_FIELD_INDEX)?;
        probes.push(make_probe(section, x, y, num_rows, Some(declared_index))?);
    }

    if probes.len() != declared {
        return Err(DesignError::CountMismatch {
            context: format!("NumberCells in [{}]", section.name),
            declared,
            actual: probes.len(),
        });
    }

    Ok(QcProbeSet {
        id,
        qc_type,
        probes,
    })
}

// =============================================================================
// Unit Sections
// =============================================================================

/// Header-only unit sections carry no probe data, but their fixed fields are
/// still validated; any other value marks an unsupported chip variant.
fn validate_unit_header(section: &Section) -> Result<(), DesignError> {
    parse_key::<u32>(section, "UnitNumber")?;

    let unit_type = parse_key::<i64>(section, "UnitType")?;
    if unit_type != EXPECTED_UNIT_TYPE {
        return Err(DesignError::UnexpectedValue {
            section: section.name.clone(),
            key: "UnitType".to_string(),
            expected: EXPECTED_UNIT_TYPE,
            found: unit_type,
        });
    }

    let blocks = parse_key::<i64>(section, "NumberBlocks")?;
    if blocks != EXPECTED_BLOCK_COUNT {
        return Err(DesignError::UnexpectedValue {
            section: section.name.clone(),
            key: "NumberBlocks".to_string(),
            expected: EXPECTED_BLOCK_COUNT,
            found: blocks,
        });
    }

    Ok(())
}

fn parse_unit_block(
    section: &Section,
    id: u32,
    num_rows: u32,
) -> Result<ExpressionProbeSet, DesignError> {
    let gene_id = require(section, "Name")?.to_string();
    let declared = parse_key::<usize>(section, "NumAtoms")?;

    // Probe rows are everything after the column-caption entry.
    let header_pos = section
        .entries
        .iter()
        .position(|(key, _)| key == CELL_HEADER_KEY)
        .ok_or_else(|| DesignError::MissingKey {
            section: section.name.clone(),
            key: CELL_HEADER_KEY.to_string(),
        })?;
    let data_rows = &section.entries[header_pos + 1..];

    if data_rows.len() % 2 != 0 {
        return Err(DesignError::UnpairedProbeRow {
            section: section.name.clone(),
        });
    }

    // Rows pair up in fixed windows of two; each window holds one perfect
    // match and one mismatch, in either order.
    let mut pairs = Vec::with_capacity(data_rows.len() / 2);
    for (window, rows) in data_rows.chunks_exact(2).enumerate() {
        let first = parse_pair_row(section, &rows[0])?;
        let second = parse_pair_row(section, &rows[1])?;

        let (pm_row, mm_row) = match (first.is_mismatch, second.is_mismatch) {
            (false, true) => (first, second),
            (true, false) => (second, first),
            (true, true) => {
                return Err(DesignError::AmbiguousPair {
                    section: section.name.clone(),
                    window,
                    kind: "mismatch",
                });
            }
            (false, false) => {
                return Err(DesignError::AmbiguousPair {
                    section: section.name.clone(),
                    window,
                    kind: "perfect match",
                });
            }
        };

        pairs.push(ProbePair {
            pm: make_probe(section, pm_row.x, pm_row.y, num_rows, pm_row.declared_index)?,
            mm: make_probe(section, mm_row.x, mm_row.y, num_rows, mm_row.declared_index)?,
        });
    }

    if pairs.len() != declared {
        return Err(DesignError::CountMismatch {
            context: format!("NumAtoms in [{}]", section.name),
            declared,
            actual: pairs.len(),
        });
    }

    Ok(ExpressionProbeSet { id, gene_id, pairs })
}

struct PairRow {
    x: u32,
    y: u32,
    is_mismatch: bool,
    declared_index: Option<u32>,
}

fn parse_pair_row(section: &Section, row: &(String, String)) -> Result<PairRow, DesignError> {
    let (key, value) = row;
    let fields = split_row(section, key, value, PAIR_FIELD_TARGET_BASE + 1)?;

    let x = parse_field::<u32>(section, key, &fields, FIELD_X)?;
    let y = parse_field::<u32>(section, key, &fields, FIELD_Y)?;

    // A mismatch probe carries the same base as the target instead of the
    // complementary one.
    let is_mismatch = fields[PAIR_FIELD_PROBE_BASE] == fields[PAIR_FIELD_TARGET_BASE];

    let declared_index = if fields.len() > PAIR_FIELD_INDEX {
        Some(parse_field::<u32>(section, key, &fields, PAIR_FIELD_INDEX)?)
    } else {
        None
    };

    Ok(PairRow {
        x,
        y,
        is_mismatch,
        declared_index,
    })
}

// =============================================================================
// Field Helpers
// =============================================================================

/// Build a probe at (x, y), computing its linear index and cross-checking
/// any explicit index the file declares.
fn make_probe(
    section: &Section,
    x: u32,
    y: u32,
    num_rows: u32,
    declared_index: Option<u32>,
) -> Result<Probe, DesignError> {
    let expected = u64::from(y) * u64::from(num_rows) + u64::from(x);
    if let Some(found) = declared_index {
        if u64::from(found) != expected {
            return Err(DesignError::IndexMismatch {
                section: section.name.clone(),
                x,
                y,
                expected,
                found: u64::from(found),
            });
        }
    }
    let index = u32::try_from(expected).map_err(|_| DesignError::InvalidValue {
        section: section.name.clone(),
        key: "index".to_string(),
        detail: format!("linear index {expected} overflows the addressable grid"),
    })?;
    Ok(Probe { x, y, index })
}

fn require<'a>(section: &'a Section, key: &str) -> Result<&'a str, DesignError> {
    section.get(key).ok_or_else(|| DesignError::MissingKey {
        section: section.name.clone(),
        key: key.to_string(),
    })
}

fn parse_key<T: std::str::FromStr>(section: &Section, key: &str) -> Result<T, DesignError>
where
    T::Err: std::fmt::Display,
{
    let value = require(section, key)?;
    value.parse().map_err(|e| DesignError::InvalidValue {
        section: section.name.clone(),
        key: key.to_string(),
        detail: format!("{value:?}: {e}"),
    })
}

fn parse_dimension(section: &Section, key: &str) -> Result<u32, DesignError> {
    let value = parse_key::<u32>(section, key)?;
    if value == 0 {
        return Err(DesignError::InvalidValue {
            section: section.name.clone(),
            key: key.to_string(),
            detail: "grid dimension must be positive".to_string(),
        });
    }
    Ok(value)
}

/// Split a data row on tabs, requiring at least `min_fields` fields.
fn split_row<'a>(
    section: &Section,
    key: &str,
    value: &'a str,
    min_fields: usize,
) -> Result<Vec<&'a str>, DesignError> {
    let fields: Vec<&str> = value.split('\t').collect();
    if fields.len() < min_fields {
        return Err(DesignError::InvalidValue {
            section: section.name.clone(),
            key: key.to_string(),
            detail: format!(
                "expected at least {min_fields} tab-separated fields, got {}",
                fields.len()
            ),
        });
    }
    Ok(fields)
}

fn parse_field<T: std::str::FromStr>(
    section: &Section,
    key: &str,
    fields: &[&str],
    idx: usize,
) -> Result<T, DesignError>
where
    T::Err: std::fmt::Display,
{
    fields[idx].parse().map_err(|e| DesignError::InvalidValue {
        section: section.name.clone(),
        key: key.to_string(),
        detail: format!("field {idx} {:?}: {e}", fields[idx]),
    })
}

// =============================================================================
// Tests
// =============================================================================
