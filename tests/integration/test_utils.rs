//! Test utilities for integration tests.
//!
//! This module provides builders for synthetic chip-definition and scan
//! files with various configurations. The binary builders compute the
//! declared offsets the readers cross-check, so fixtures stay valid as
//! their contents change.

// =============================================================================
// Chip-Definition Fixtures
// =============================================================================

/// A 4x4 chip definition with one QC probe set and two expression probe
/// sets (two pairs each).
pub fn sample_cdf() -> String {
    [
        "[CDF]",
        "Version=GC3.0",
        "",
        "[Chip]",
        "Name=TestChip",
        "Rows=4",
        "Cols=4",
        "NumberOfUnits=2",
        "NumQCUnits=1",
        "",
        "[QC1]",
        "Type=13",
        "NumberCells=3",
        "CellHeader=X\tY\tPROBE\tPLEN\tATOM\tINDEX",
        "Cell1=0\t0\tN\t25\t0\t0",
        "Cell2=1\t0\tN\t25\t0\t1",
        "Cell3=3\t3\tN\t25\t0\t15",
        "",
        "[Unit1]",
        "Name=NONE",
        "Direction=1",
        "NumAtoms=2",
        "NumCells=4",
        "UnitNumber=1",
        "UnitType=3",
        "NumberBlocks=1",
        "",
        "[Unit1_Block1]",
        "Name=GENE_A",
        "BlockNumber=1",
        "NumAtoms=2",
        "NumCells=4",
        "StartPosition=0",
        "StopPosition=1",
        "CellHeader=X\tY\tPROBE\tFEAT\tQUAL\tEXPOS\tPOS\tCBASE\tPBASE\tTBASE\tATOM\tINDEX",
        "Cell1=0\t1\tN\tcontrol\tGENE_A\t0\t13\tC\tG\tC\t0\t4",
        "Cell2=0\t2\tN\tcontrol\tGENE_A\t0\t13\tC\tG\tG\t0\t8",
        "Cell3=1\t1\tN\tcontrol\tGENE_A\t1\t13\tA\tT\tT\t1\t5",
        "Cell4=1\t2\tN\tcontrol\tGENE_A\t1\t13\tA\tT\tA\t1\t9",
        "",
        "[Unit2]",
        "Name=NONE",
        "Direction=1",
        "NumAtoms=2",
        "NumCells=4",
        "UnitNumber=2",
        "UnitType=3",
        "NumberBlocks=1",
        "",
        "[Unit2_Block1]",
        "Name=GENE_B",
        "BlockNumber=1",
        "NumAtoms=2",
        "NumCells=4",
        "StartPosition=0",
        "StopPosition=1",
        "CellHeader=X\tY\tPROBE\tFEAT\tQUAL\tEXPOS\tPOS\tCBASE\tPBASE\tTBASE\tATOM\tINDEX",
        "Cell1=2\t1\tN\tcontrol\tGENE_B\t0\t13\tG\tC\tG\t0\t6",
        "Cell2=2\t2\tN\tcontrol\tGENE_B\t0\t13\tG\tC\tC\t0\t10",
        "Cell3=3\t1\tN\tcontrol\tGENE_B\t1\t13\tT\tA\tA\t1\t7",
        "Cell4=3\t2\tN\tcontrol\tGENE_B\t1\t13\tT\tA\tT\t1\t11",
        "",
    ]
    .join("\n")
}

// =============================================================================
// Legacy Scan Fixtures
// =============================================================================

/// Build a legacy scan file with the given grid and intensities.
///
/// Intensities are laid out in read order (column-major over the grid);
/// stddev and pixel counts are synthesized.
pub fn legacy_scan_file(num_rows: i32, num_cols: i32, intensities: &[f32]) -> Vec<u8> {
    assert_eq!(intensities.len(), (num_rows * num_cols) as usize);

    let mut buf = Vec::new();
    for v in [64i32, 4, num_cols, num_rows, num_rows * num_cols] {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    push_text(&mut buf, &format!("Cols={num_cols}\nRows={num_rows}"));
    push_text(&mut buf, "Percentile");
    push_text(&mut buf, "Percentile:75;CellMargin:2;OutlierHigh:1.500");
    for v in [2i32, 0, 0, 0] {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    for (i, v) in intensities.iter().enumerate() {
        buf.extend_from_slice(&v.to_le_bytes());
        buf.extend_from_slice(&0.5f32.to_le_bytes());
        buf.extend_from_slice(&(16 + i as i16).to_le_bytes());
    }
    buf
}

fn push_text(buf: &mut Vec<u8>, text: &str) {
    buf.extend_from_slice(&(text.len() as i32).to_le_bytes());
    buf.extend_from_slice(text.as_bytes());
}

// =============================================================================
// Self-Describing Scan Fixtures
// =============================================================================

/// UTF-16BE string with a code-unit count prefix.
pub fn wstr(s: &str) -> Vec<u8> {
    let units: Vec<u16> = s.encode_utf16().collect();
    let mut out = (units.len() as i32).to_be_bytes().to_vec();
    for unit in units {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out
}

/// Byte string with a byte-count prefix.
pub fn blob(bytes: &[u8]) -> Vec<u8> {
    let mut out = (bytes.len() as i32).to_be_bytes().to_vec();
    out.extend_from_slice(bytes);
    out
}

/// A (name, value, type) parameter triplet.
pub fn param(name: &str, raw: &[u8], tag: &str) -> Vec<u8> {
    let mut out = wstr(name);
    out.extend(blob(raw));
    out.extend(wstr(tag));
    out
}

/// A UTF-16BE raw value with two NUL code units of padding, as writers emit
/// for text parameters.
pub fn padded_text_value(s: &str) -> Vec<u8> {
    let mut raw: Vec<u8> = s.encode_utf16().flat_map(|u| u.to_be_bytes()).collect();
    raw.extend_from_slice(&[0, 0, 0, 0]);
    raw
}

/// A scan header block with the given timestamp, parameters, and parents.
pub fn header_bytes(timestamp: &str, params: Vec<Vec<u8>>, parents: Vec<Vec<u8>>) -> Vec<u8> {
    let mut out = blob(b"scan.datatype.intensity");
    out.extend(blob(b"0000-0000-1111"));
    out.extend(wstr(timestamp));
    out.extend(wstr("en-US"));
    out.extend((params.len() as i32).to_be_bytes());
    for p in params {
        out.extend(p);
    }
    out.extend((parents.len() as i32).to_be_bytes());
    for p in parents {
        out.extend(p);
    }
    out
}

/// A dataset with a single f32 column named "Intensity"; declared offsets
/// are computed from `start`.
fn float_dataset(start: u32, name: &str, values: &[f32]) -> Vec<u8> {
    let header_len = 4 + 4
        + wstr(name).len()
        + 4
        + 4
        + wstr("Intensity").len() + 1 + 4
        + 4;
    let data_pos = start + header_len as u32;
    let next_pos = data_pos + 4 * values.len() as u32;

    let mut out = data_pos.to_be_bytes().to_vec();
    out.extend(next_pos.to_be_bytes());
    out.extend(wstr(name));
    out.extend(0i32.to_be_bytes());
    out.extend(1u32.to_be_bytes());
    out.extend(wstr("Intensity"));
    out.push(6); // f32 column tag
    out.extend(4i32.to_be_bytes());
    out.extend((values.len() as u32).to_be_bytes());
    for v in values {
        out.extend(v.to_be_bytes());
    }
    out
}

/// A complete single-group self-describing scan file.
pub fn generic_scan_file(header: Vec<u8>, datasets: &[(&str, Vec<f32>)]) -> Vec<u8> {
    let first_group_pos = 10 + header.len() as u32;
    let group_header_len = 4 + 4 + 4 + wstr("Default Group").len() as u32;
    let first_dataset_pos = first_group_pos + group_header_len;

    let mut dataset_bytes = Vec::new();
    let mut pos = first_dataset_pos;
    for (name, values) in datasets {
        let ds = float_dataset(pos, name, values);
        pos += ds.len() as u32;
        dataset_bytes.extend(ds);
    }
    let next_group_pos = pos;

    let mut out = vec![59u8, 1];
    out.extend(1i32.to_be_bytes());
    out.extend(first_group_pos.to_be_bytes());
    out.extend(header);
    out.extend(next_group_pos.to_be_bytes());
    out.extend(first_dataset_pos.to_be_bytes());
    out.extend((datasets.len() as i32).to_be_bytes());
    out.extend(wstr("Default Group"));
    out.extend(dataset_bytes);
    out
}

/// A self-describing scan file holding only an intensity dataset.
pub fn generic_intensity_file(values: &[f32]) -> Vec<u8> {
    generic_scan_file(
        header_bytes("2015-02-20T13:52:11Z", Vec::new(), Vec::new()),
        &[("Intensity", values.to_vec())],
    )
}

// =============================================================================
// Tracing
// =============================================================================

/// Install a test subscriber so `RUST_LOG=chipscan=debug` surfaces decode
/// traces when a fixture misbehaves. Safe to call from every test.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
