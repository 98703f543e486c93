//! Error types for the gesture engine.
//!
//! The per-frame path never fails: missing landmarks are `Option` branches
//! and collaborator failures are folded into dispatch outcomes. Errors only
//! surface while building an engine from configuration.

use thiserror::Error;

/// Main error type for engine construction and configuration.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A configuration value is out of its allowed range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A configuration document could not be parsed.
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// A configuration file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        EngineError::InvalidConfig(message.into())
    }
}

/// Result type alias for engine construction.
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = EngineError::invalid("head window must hold at least one sample");
        assert_eq!(
            err.to_string(),
            "Invalid configuration: head window must hold at least one sample"
        );
    }

    #[test]
    fn test_parse_error_conversion() {
        let parse: std::result::Result<u32, _> = serde_json::from_str("not json");
        let err: EngineError = parse.unwrap_err().into();
        assert!(matches!(err, EngineError::ConfigParse(_)));
    }
}
