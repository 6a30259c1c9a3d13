//! Error types for ODSQL.

use thiserror::Error;

/// The main error type for ODSQL operations.
#[derive(Debug, Error)]
pub enum OdsqlError {
    /// The input does not match the query or meta-command grammar.
    #[error("Syntax error at position {position}: expected {expected}")]
    Syntax { position: usize, expected: String },

    /// `set`/`show` named an option that is not in the registry.
    #[error("Unknown option: '{0}'")]
    UnknownOption(String),

    /// The value given to `set` cannot be coerced to the option's type.
    #[error("Option '{name}' expects {expected}, got '{value}'")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        value: String,
    },

    /// Transport failure (connection, timeout, undecodable body).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The API answered with a non-success status.
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The API answered, but not with the expected shape.
    #[error("Unexpected response: {0}")]
    Response(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OdsqlError {
    /// Create a syntax error at the given byte offset.
    pub fn syntax(position: usize, expected: impl Into<String>) -> Self {
        Self::Syntax {
            position,
            expected: expected.into(),
        }
    }
}

impl From<reqwest::Error> for OdsqlError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}

/// Result type alias for ODSQL operations.
pub type OdsqlResult<T> = Result<T, OdsqlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OdsqlError::syntax(5, "FROM");
        assert_eq!(err.to_string(), "Syntax error at position 5: expected FROM");
    }

    #[test]
    fn test_type_mismatch_display() {
        let err = OdsqlError::TypeMismatch {
            name: "debug".to_string(),
            expected: "an integer",
            value: "notanint".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Option 'debug' expects an integer, got 'notanint'"
        );
    }
}
