//! Scan-intensity integration tests.
//!
//! Tests verify:
//! - Auto-detection dispatches both sub-formats from the same entry point
//! - Cross-format intensity equivalence on a golden fixture pair
//! - Round-trip addressing from probe indices into intensity vectors
//! - Corruption and truncation failures
//! - Path-based decoding and metadata serialization

use std::io::{Cursor, Write};

use chipscan::{
    decode_intensities, decode_intensities_path, ArrayDesign, ParamValue, ProbeSelection,
    ScanDocument, ScanError, ScanFormat,
};

use super::test_utils::{
    generic_intensity_file, generic_scan_file, header_bytes, init_tracing, legacy_scan_file,
    padded_text_value, param, sample_cdf,
};

// =============================================================================
// Detection and Dispatch
// =============================================================================

#[test]
fn test_dispatch_legacy() {
    init_tracing();
    let data = legacy_scan_file(2, 2, &[10.0, 20.0, 30.0, 40.0]);
    let scan = decode_intensities(Cursor::new(data)).unwrap();

    assert_eq!(scan.format, ScanFormat::Legacy);
    assert_eq!(scan.values, vec![10.0, 20.0, 30.0, 40.0]);
    assert!(scan.header.is_none());
}

#[test]
fn test_dispatch_generic() {
    init_tracing();
    let data = generic_intensity_file(&[10.0, 20.0, 30.0, 40.0]);
    let scan = decode_intensities(Cursor::new(data)).unwrap();

    assert_eq!(scan.format, ScanFormat::Generic);
    assert_eq!(scan.values, vec![10.0, 20.0, 30.0, 40.0]);

    let header = scan.header.unwrap();
    assert_eq!(header.locale.language, "en");
    assert!(header.creation_time.is_some());
}

#[test]
fn test_dispatch_unrecognized_marker() {
    let err = decode_intensities(Cursor::new(vec![0x1Fu8, 0x8B, 0, 0])).unwrap_err();
    assert!(matches!(err, ScanError::UnrecognizedFormat { marker: 0x1F }));
}

// =============================================================================
// Cross-Format Equivalence
// =============================================================================

/// The same underlying chip scan written in both sub-formats must produce
/// the same intensity vector under the same linear addressing.
#[test]
fn test_cross_format_equivalence() {
    let intensities = [128.5, 97.25, 1024.0, 55.75, 210.0, 33.5];

    let legacy = decode_intensities(Cursor::new(legacy_scan_file(3, 2, &intensities))).unwrap();
    let generic = decode_intensities(Cursor::new(generic_intensity_file(&intensities))).unwrap();

    assert_eq!(legacy.values, generic.values);
}

#[test]
fn test_decode_is_idempotent_across_entry_point() {
    let data = generic_intensity_file(&[1.0, 2.0]);
    let first = decode_intensities(Cursor::new(data.clone())).unwrap();
    let second = decode_intensities(Cursor::new(data)).unwrap();
    assert_eq!(first, second);
}

// =============================================================================
// Round-Trip Addressing
// =============================================================================

/// Probe indices from a decoded design select the right entries of a scan's
/// intensity vector.
#[test]
fn test_probe_indices_address_intensity_vector() {
    let design = ArrayDesign::decode(sample_cdf().as_bytes()).unwrap();

    // 16 cells, each holding 100 * its linear index.
    let intensities: Vec<f32> = (0..16).map(|i| (i * 100) as f32).collect();
    let scan = decode_intensities(Cursor::new(legacy_scan_file(4, 4, &intensities))).unwrap();
    assert_eq!(scan.values.len(), design.num_cells());

    let gene_a = design.expression_probe_set("GENE_A").unwrap();
    let selected: Vec<f32> = gene_a
        .probe_indices(ProbeSelection::PerfectMatch)
        .iter()
        .map(|&i| scan.values[i as usize])
        .collect();
    assert_eq!(selected, vec![400.0, 900.0]);
}

// =============================================================================
// Corruption Handling
// =============================================================================

#[test]
fn test_legacy_version_corruption() {
    let mut data = legacy_scan_file(2, 2, &[1.0, 2.0, 3.0, 4.0]);
    data[4] = 5;

    let err = decode_intensities(Cursor::new(data)).unwrap_err();
    assert!(matches!(
        err,
        ScanError::UnsupportedVersion { expected: 4, found: 5, .. }
    ));
}

#[test]
fn test_generic_first_dataset_offset_corruption() {
    let mut data = generic_intensity_file(&[1.0]);
    // The group record sits right after the header; its second u32 is the
    // declared first-dataset offset.
    let header_len = header_bytes("2015-02-20T13:52:11Z", Vec::new(), Vec::new()).len();
    let at = 10 + header_len + 4;
    let declared = u32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]]);
    data[at..at + 4].copy_from_slice(&(declared + 1).to_be_bytes());

    let err = decode_intensities(Cursor::new(data)).unwrap_err();
    assert!(matches!(
        err,
        ScanError::OffsetMismatch { what: "first data set", .. }
    ));
}

#[test]
fn test_generic_truncated_file() {
    let data = generic_intensity_file(&[1.0, 2.0, 3.0]);
    let cut = data[..data.len() - 5].to_vec();

    let err = decode_intensities(Cursor::new(cut)).unwrap_err();
    assert!(matches!(err, ScanError::Io(_)));
}

#[test]
fn test_generic_missing_intensity_dataset() {
    let data = generic_scan_file(
        header_bytes("", Vec::new(), Vec::new()),
        &[("StdDev", vec![0.5])],
    );

    let err = decode_intensities(Cursor::new(data)).unwrap_err();
    assert!(matches!(err, ScanError::MissingDataSet { .. }));
}

// =============================================================================
// Metadata
// =============================================================================

#[test]
fn test_generic_header_params_via_dispatch() {
    let params = vec![
        param(
            "affymetrix-array-type",
            &padded_text_value("HG-U133A"),
            "text/plain",
        ),
        param("affymetrix-cel-rows", &4i32.to_be_bytes(), "text/x-calvin-integer-32"),
    ];
    let data = generic_scan_file(
        header_bytes("2015-02-20T13:52:11Z", params, Vec::new()),
        &[("Intensity", vec![1.0])],
    );

    let scan = decode_intensities(Cursor::new(data)).unwrap();
    let header = scan.header.unwrap();
    assert_eq!(
        header.param("affymetrix-array-type"),
        Some(&ParamValue::Text("HG-U133A".to_string()))
    );
    assert_eq!(
        header.param("affymetrix-cel-rows"),
        Some(&ParamValue::Int32(4))
    );
}

#[test]
fn test_full_document_access() {
    let data = generic_scan_file(
        header_bytes("", Vec::new(), Vec::new()),
        &[("Intensity", vec![9.0]), ("StdDev", vec![0.25])],
    );

    let document = ScanDocument::decode(&data[..]).unwrap();
    let group = document.group_by_name("Default Group").unwrap();
    assert_eq!(group.datasets.len(), 2);
    assert_eq!(group.dataset_by_prefix("Std").unwrap().num_rows(), 1);
    assert_eq!(document.intensities().unwrap(), vec![9.0]);
}

// =============================================================================
// Paths and Serialization
// =============================================================================

#[test]
fn test_decode_path_both_formats() {
    let mut legacy_file = tempfile::NamedTempFile::new().unwrap();
    legacy_file
        .write_all(&legacy_scan_file(2, 2, &[1.0, 2.0, 3.0, 4.0]))
        .unwrap();
    let legacy = decode_intensities_path(legacy_file.path()).unwrap();
    assert_eq!(legacy.format, ScanFormat::Legacy);

    let mut generic_file = tempfile::NamedTempFile::new().unwrap();
    generic_file
        .write_all(&generic_intensity_file(&[1.0, 2.0, 3.0, 4.0]))
        .unwrap();
    let generic = decode_intensities_path(generic_file.path()).unwrap();
    assert_eq!(generic.format, ScanFormat::Generic);

    assert_eq!(legacy.values, generic.values);
}

#[test]
fn test_scan_header_serializes_to_json() {
    let scan = decode_intensities(Cursor::new(generic_intensity_file(&[1.5]))).unwrap();
    let json = serde_json::to_value(&scan).unwrap();

    assert_eq!(json["format"], "Generic");
    assert_eq!(json["values"][0], 1.5);
    assert_eq!(json["header"]["locale"]["language"], "en");
}
