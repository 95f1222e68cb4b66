use thiserror::Error;

/// A read that failed partway through a decode.
///
/// Carries the byte offset the cursor had reached when the underlying source
/// failed, so truncated files can be diagnosed without re-parsing.
#[derive(Debug, Error)]
#[error("read failed at byte offset {offset}: {source}")]
pub struct ReadError {
    /// Byte offset of the cursor when the read failed
    pub offset: u64,

    /// The underlying I/O failure
    #[source]
    pub source: std::io::Error,
}

/// Errors from decoding a binary scan-intensity file (either sub-format).
#[derive(Debug, Error)]
pub enum ScanError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] ReadError),

    /// First byte of the file is not a recognized format marker
    #[error("unrecognized scan format: marker byte {marker} (expected 59 or 64)")]
    UnrecognizedFormat { marker: u8 },

    /// Recognized marker position holds the wrong magic value
    #[error("invalid magic at byte offset {offset}: expected {expected}, got {found}")]
    BadMagic {
        expected: i64,
        found: i64,
        offset: u64,
    },

    /// Recognized magic but an unsupported format version
    #[error("unsupported version at byte offset {offset}: expected {expected}, got {found}")]
    UnsupportedVersion {
        expected: u32,
        found: i64,
        offset: u64,
    },

    /// A declared offset disagrees with the byte cursor
    #[error("offset mismatch for {what}: declared {declared}, cursor at {actual}")]
    OffsetMismatch {
        what: &'static str,
        declared: u64,
        actual: u64,
    },

    /// A declared count disagrees with an observed count
    #[error("count mismatch for {what}: declared {declared}, observed {actual}")]
    CountMismatch {
        what: &'static str,
        declared: u64,
        actual: u64,
    },

    /// A field could not be decoded as its expected type
    #[error("malformed {what} at byte offset {offset}: {detail}")]
    MalformedValue {
        what: &'static str,
        offset: u64,
        detail: String,
    },

    /// No dataset with the requested name prefix exists in any data group
    #[error("no data set with name prefix \"{prefix}\"")]
    MissingDataSet { prefix: String },

    /// An intensity projection was requested from a non-numeric column
    #[error("column \"{column}\" of data set \"{dataset}\" is not numeric")]
    NonNumericColumn { dataset: String, column: String },
}

/// Errors from decoding a textual chip-definition file.
#[derive(Debug, Error)]
pub enum DesignError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A line that is neither a section header, a key=value pair, nor blank
    #[error("syntax error on line {line}: {detail}")]
    Syntax { line: usize, detail: String },

    /// A required section is absent (or appears after content that needs it)
    #[error("missing required section [{name}]")]
    MissingSection { name: String },

    /// A required key is absent from a section
    #[error("missing key \"{key}\" in section [{section}]")]
    MissingKey { section: String, key: String },

    /// A value could not be parsed as its expected type
    #[error("invalid value for \"{key}\" in section [{section}]: {detail}")]
    InvalidValue {
        section: String,
        key: String,
        detail: String,
    },

    /// A declared count disagrees with an observed count
    #[error("count mismatch for {context}: declared {declared}, observed {actual}")]
    CountMismatch {
        context: String,
        declared: usize,
        actual: usize,
    },

    /// An explicit probe index disagrees with the addressing formula
    #[error(
        "index mismatch in section [{section}]: probe at ({x}, {y}) computes to {expected}, \
         file declares {found}"
    )]
    IndexMismatch {
        section: String,
        x: u32,
        y: u32,
        expected: u64,
        found: u64,
    },

    /// Both rows of a probe-pair window classify as the same probe kind
    #[error("pair {window} in section [{section}] yields two {kind} probes")]
    AmbiguousPair {
        section: String,
        window: usize,
        kind: &'static str,
    },

    /// An odd trailing probe row that cannot form a pair
    #[error("unpaired probe row in section [{section}]")]
    UnpairedProbeRow { section: String },

    /// A field that must hold a fixed value holds something else
    #[error("unexpected value for \"{key}\" in section [{section}]: expected {expected}, got {found}")]
    UnexpectedValue {
        section: String,
        key: String,
        expected: i64,
        found: i64,
    },
}
