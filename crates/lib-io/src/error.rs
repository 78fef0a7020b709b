//! Error types for reading and writing text files.

use thiserror::Error;

/// Errors that can occur while reading or writing wavelet and gather files.
#[derive(Debug, Error)]
pub enum ParseError {
    /// I/O error reading or writing the file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Syntax error in the file.
    #[error("Syntax error at line {line}: {message}")]
    Syntax { line: usize, message: String },

    /// Missing required value.
    #[error("Missing required {kind}: {name}")]
    Missing { kind: &'static str, name: String },

    /// Invalid value for a field.
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    /// Content that parses but cannot form a valid wavelet or gather.
    #[error("Invalid {format} format: {message}")]
    InvalidFormat { format: String, message: String },

    /// Nom parsing error (internal).
    #[error("Parse error: {0}")]
    Nom(String),
}

impl ParseError {
    /// Create a syntax error at a specific line (1-based).
    pub fn syntax(line: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            message: message.into(),
        }
    }

    /// Create a missing header field error.
    pub fn missing_field(name: impl Into<String>) -> Self {
        Self::Missing {
            kind: "field",
            name: name.into(),
        }
    }

    /// Create an invalid value error.
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an invalid format error.
    pub fn invalid_format(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            format: format.into(),
            message: message.into(),
        }
    }
}

/// Convert nom errors to our error type.
impl<'a> From<nom::Err<nom::error::Error<&'a str>>> for ParseError {
    fn from(err: nom::Err<nom::error::Error<&'a str>>) -> Self {
        match err {
            nom::Err::Incomplete(_) => ParseError::Nom("Incomplete input".to_string()),
            nom::Err::Error(e) | nom::Err::Failure(e) => {
                let preview: String = e.input.chars().take(20).collect();
                ParseError::Nom(format!("{:?} at '{}...'", e.code, preview))
            }
        }
    }
}
