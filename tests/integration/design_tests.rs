//! Chip-definition integration tests.
//!
//! Tests verify:
//! - Declared-count invariants over a complete multi-unit definition
//! - File-order preservation of probe sets and probes
//! - The index addressing formula across every decoded probe
//! - Path-based decoding and model serialization

use std::io::Write;

use chipscan::{ArrayDesign, DesignError, ProbeSelection};

use super::test_utils::sample_cdf;

// =============================================================================
// Structure Tests
// =============================================================================

#[test]
fn test_declared_counts_hold() {
    let design = ArrayDesign::decode(sample_cdf().as_bytes()).unwrap();

    assert_eq!(design.qc_probe_sets.len(), 1);
    assert_eq!(design.expression_probe_sets.len(), 2);
    assert_eq!(design.qc_probe_sets[0].probes.len(), 3);
    for set in &design.expression_probe_sets {
        assert_eq!(set.pairs.len(), 2);
    }
}

#[test]
fn test_probe_sets_keep_file_order() {
    let design = ArrayDesign::decode(sample_cdf().as_bytes()).unwrap();

    let genes: Vec<&str> = design
        .expression_probe_sets
        .iter()
        .map(|ps| ps.gene_id.as_str())
        .collect();
    assert_eq!(genes, vec!["GENE_A", "GENE_B"]);
    assert_eq!(design.expression_probe_sets[0].id, 1);
    assert_eq!(design.expression_probe_sets[1].id, 2);
}

#[test]
fn test_every_probe_satisfies_addressing_formula() {
    let design = ArrayDesign::decode(sample_cdf().as_bytes()).unwrap();
    let rows = design.num_rows;

    let qc_probes = design.qc_probe_sets.iter().flat_map(|ps| ps.probes.iter());
    let pair_probes = design
        .expression_probe_sets
        .iter()
        .flat_map(|ps| ps.pairs.iter())
        .flat_map(|p| [&p.pm, &p.mm]);

    for probe in qc_probes.chain(pair_probes) {
        assert_eq!(probe.index, probe.y * rows + probe.x);
        assert!(probe.x < design.num_cols);
        assert!(probe.y < design.num_rows);
    }
}

#[test]
fn test_pairs_are_one_pm_one_mm() {
    let design = ArrayDesign::decode(sample_cdf().as_bytes()).unwrap();

    for set in &design.expression_probe_sets {
        for pair in &set.pairs {
            assert_ne!(pair.pm.index, pair.mm.index);
        }
        let pm = set.probe_indices(ProbeSelection::PerfectMatch);
        let mm = set.probe_indices(ProbeSelection::Mismatch);
        let all = set.probe_indices(ProbeSelection::All);
        assert_eq!(all.len(), pm.len() + mm.len());
    }
}

// =============================================================================
// Error Tests
// =============================================================================

#[test]
fn test_truncated_qc_section_fails() {
    let text = sample_cdf().replace("Cell3=3\t3\tN\t25\t0\t15\n", "");
    let err = ArrayDesign::decode(text.as_bytes()).unwrap_err();
    assert!(matches!(
        err,
        DesignError::CountMismatch { declared: 3, actual: 2, .. }
    ));
}

#[test]
fn test_wrong_declared_unit_count_fails() {
    let text = sample_cdf().replace("NumberOfUnits=2", "NumberOfUnits=3");
    let err = ArrayDesign::decode(text.as_bytes()).unwrap_err();
    assert!(matches!(
        err,
        DesignError::CountMismatch { declared: 3, actual: 2, .. }
    ));
}

// =============================================================================
// Path and Serialization Tests
// =============================================================================

#[test]
fn test_decode_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(sample_cdf().as_bytes()).unwrap();

    let design = ArrayDesign::decode_path(file.path()).unwrap();
    assert_eq!(design.name, "TestChip");
}

#[test]
fn test_design_serializes_to_json() {
    let design = ArrayDesign::decode(sample_cdf().as_bytes()).unwrap();
    let json = serde_json::to_value(&design).unwrap();

    assert_eq!(json["name"], "TestChip");
    assert_eq!(json["num_rows"], 4);
    assert_eq!(json["expression_probe_sets"][0]["gene_id"], "GENE_A");
    assert_eq!(json["expression_probe_sets"][0]["pairs"][0]["pm"]["index"], 4);
}
