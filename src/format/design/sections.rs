//! Section tokenizer for the chip-definition text grammar.
//!
//! The chip-definition format is a flat sequence of named sections:
//!
//! ```text
//! [SectionName]
//! key=value
//! key=value
//! ```
//!
//! There are no nested sections, no comments, no value interpolation, and no
//! line continuations. This tokenizer implements exactly that grammar as an
//! explicit state machine over lines, rather than borrowing a
//! configuration-file library whose edge-case behavior (special characters,
//! comment syntax, interpolation) the format does not share.
//!
//! Values are kept verbatim apart from surrounding whitespace; data rows use
//! embedded tabs as field separators and those are preserved.

use std::io::BufRead;

use crate::error::DesignError;

// =============================================================================
// Section
// =============================================================================

/// One `[Name]` section with its key/value entries in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Section name without brackets
    pub name: String,

    /// 1-based line number of the section header
    pub line: usize,

    /// Entries in file order; duplicate keys are preserved
    pub entries: Vec<(String, String)>,
}

impl Section {
    /// Look up the first entry with the given key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

// =============================================================================
// SectionReader
// =============================================================================

/// Streaming reader yielding sections in file order.
///
/// Sections are independent, so the file never needs to be held in memory
/// as a whole; chip definitions for dense arrays run to tens of megabytes.
pub struct SectionReader<B> {
    lines: std::io::Lines<B>,
    line_no: usize,

    /// Header of the next section, already consumed from the stream
    pending: Option<(String, usize)>,
}

impl<B: BufRead> SectionReader<B> {
    /// Create a reader over a buffered source.
    pub fn new(reader: B) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            pending: None,
        }
    }

    /// Read the next section, or `None` at end of input.
    pub fn next_section(&mut self) -> Result<Option<Section>, DesignError> {
        let (name, line) = match self.pending.take() {
            Some(header) => header,
            None => match self.read_header()? {
                Some(header) => header,
                None => return Ok(None),
            },
        };

        let mut entries = Vec::new();
        while let Some(raw) = self.next_line()? {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }
            if let Some(next_name) = parse_header(trimmed, self.line_no)? {
                self.pending = Some((next_name, self.line_no));
                break;
            }
            let (key, value) = parse_entry(trimmed, self.line_no)?;
            entries.push((key, value));
        }

        Ok(Some(Section {
            name,
            line,
            entries,
        }))
    }

    /// Skip blank lines until the first section header.
    ///
    /// Only ever called before the first section; entry lines inside a
    /// section are consumed by `next_section`, so any non-blank line here
    /// that is not a header is content before the first section.
    fn read_header(&mut self) -> Result<Option<(String, usize)>, DesignError> {
        while let Some(raw) = self.next_line()? {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }
            if let Some(name) = parse_header(trimmed, self.line_no)? {
                return Ok(Some((name, self.line_no)));
            }
            return Err(DesignError::Syntax {
                line: self.line_no,
                detail: "content before the first section header".to_string(),
            });
        }
        Ok(None)
    }

    fn next_line(&mut self) -> Result<Option<String>, DesignError> {
        match self.lines.next() {
            Some(line) => {
                self.line_no += 1;
                Ok(Some(line?))
            }
            None => Ok(None),
        }
    }
}

/// Parse a `[Name]` header line; `Ok(None)` if the line is not a header.
fn parse_header(line: &str, line_no: usize) -> Result<Option<String>, DesignError> {
    let Some(rest) = line.strip_prefix('[') else {
        return Ok(None);
    };
    let Some(name) = rest.strip_suffix(']') else {
        return Err(DesignError::Syntax {
            line: line_no,
            detail: "section header is missing the closing bracket".to_string(),
        });
    };
    let name = name.trim();
    if name.is_empty() {
        return Err(DesignError::Syntax {
            line: line_no,
            detail: "empty section name".to_string(),
        });
    }
    Ok(Some(name.to_string()))
}

/// Parse a `key=value` entry line.
fn parse_entry(line: &str, line_no: usize) -> Result<(String, String), DesignError> {
    let Some((key, value)) = line.split_once('=') else {
        return Err(DesignError::Syntax {
            line: line_no,
            detail: format!("expected key=value, got {line:?}"),
        });
    };
    let key = key.trim();
    if key.is_empty() {
        return Err(DesignError::Syntax {
            line: line_no,
            detail: "empty key".to_string(),
        });
    }
    Ok((key.to_string(), value.trim().to_string()))
}

// =============================================================================
// Tests
// =============================================================================
