//! Error types for conversion runs.

use crate::config::InputFormat;
use std::io;
use std::process::ExitStatus;
use thiserror::Error;

/// Problems with a single input line, reported by a format converter.
///
/// The line assembler wraps these into [`ConvertError::Malformed`] with the
/// line number and input format attached.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("invalid field count ({found}), expected {min}..={max} -- input file may not match input format")]
    FieldCount { found: usize, min: usize, max: usize },

    #[error("invalid field count ({found}), expected at least {min} -- input file may not match input format")]
    TooFewFields { found: usize, min: usize },

    #[error("invalid {field} value '{value}'")]
    InvalidNumber { field: &'static str, value: String },

    #[error("start ({start}) is greater than end ({end})")]
    InvertedInterval { start: u64, end: u64 },

    #[error("{field} must be 1-based, got 0")]
    ZeroCoordinate { field: &'static str },

    #[error("{field} ({value}) plus the alignment span overflows a 64-bit coordinate")]
    CoordinateOverflow { field: &'static str, value: u64 },

    #[error("invalid CIGAR string '{0}'")]
    InvalidCigar(String),

    #[error("CIGAR string has more than {0} operations")]
    CigarTooLong(usize),

    #[error("possible corrupt input with {found} fields -- if input is headered, use the --headered option")]
    UnexpectedBanner { found: usize },
}

impl RecordError {
    pub(crate) fn invalid_number(field: &'static str, value: &[u8]) -> Self {
        RecordError::InvalidNumber {
            field,
            value: String::from_utf8_lossy(value).into_owned(),
        }
    }
}

/// Errors that abort a conversion run.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid {format} record at line {line}: {source}")]
    Malformed {
        format: InputFormat,
        line: u64,
        #[source]
        source: RecordError,
    },

    #[error("Could not find newline in intermediate buffer of {capacity} bytes; check input or raise --max-line-length")]
    LineTooLong { capacity: usize },

    #[error("Could not create pipe: {0}")]
    Pipe(#[source] io::Error),

    #[error("Pipe end {0} is already owned by another stage")]
    PipeEndTaken(String),

    #[error("Pipe {pipe} does not exist in a set of {slots} slots")]
    NoSuchPipe { pipe: String, slots: usize },

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with {status}")]
    ChildFailed { program: String, status: ExitStatus },

    #[error("Cannot find {tool} binary required for {purpose}")]
    MissingTool { tool: String, purpose: &'static str },

    #[error("No input is specified; please redirect or pipe in formatted data")]
    NoInput,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Stage '{0}' panicked")]
    StagePanicked(String),
}

impl ConvertError {
    /// True for a write into a pipe whose reader already went away.
    ///
    /// These are usually a consequence of a failure further down the
    /// pipeline rather than its cause.
    pub fn is_broken_pipe(&self) -> bool {
        matches!(self, ConvertError::Io(e) if e.kind() == io::ErrorKind::BrokenPipe)
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_message_names_line_and_format() {
        let err = ConvertError::Malformed {
            format: InputFormat::Gff,
            line: 7,
            source: RecordError::FieldCount {
                found: 4,
                min: 9,
                max: 9,
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("GFF"), "{}", msg);
        assert!(msg.contains("line 7"), "{}", msg);
        assert!(msg.contains("invalid field count (4)"), "{}", msg);
    }

    #[test]
    fn test_broken_pipe_detection() {
        let err = ConvertError::Io(io::Error::from(io::ErrorKind::BrokenPipe));
        assert!(err.is_broken_pipe());
        assert!(!ConvertError::NoInput.is_broken_pipe());
    }

    #[test]
    fn test_invalid_number_is_lossy() {
        let err = RecordError::invalid_number("start", b"12x");
        assert_eq!(
            err,
            RecordError::InvalidNumber {
                field: "start",
                value: "12x".to_string()
            }
        );
    }
}
