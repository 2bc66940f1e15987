//! Error types for unitts

use std::io;
use thiserror::Error;

/// Main error type for unitts
///
/// Playback and temp-file cleanup problems are not represented here:
/// they are logged as warnings and never abort a call.
#[derive(Error, Debug)]
pub enum TtsError {
    #[error("Engine not supported: {0}")]
    EngineNotFound(String),

    #[error("Speech synthesis error: {0}")]
    Synthesis(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("INI parse error: {0}")]
    IniParse(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for unitts operations
pub type Result<T> = std::result::Result<T, TtsError>;

impl TtsError {
    /// Wrap any backend failure into the uniform synthesis kind
    pub fn synthesis(context: &str, err: impl std::fmt::Display) -> Self {
        TtsError::Synthesis(format!("{}: {}", context, err))
    }
}

impl From<String> for TtsError {
    fn from(s: String) -> Self {
        TtsError::Other(s)
    }
}

impl From<&str> for TtsError {
    fn from(s: &str) -> Self {
        TtsError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for TtsError {
    fn from(e: serde_json::Error) -> Self {
        TtsError::Config(format!("JSON error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesis_keeps_original_message() {
        let err = TtsError::synthesis("Error setting speech rate", "property rejected");
        assert_eq!(
            err.to_string(),
            "Speech synthesis error: Error setting speech rate: property rejected"
        );
    }

    #[test]
    fn test_json_error_is_config() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(TtsError::from(parse), TtsError::Config(_)));
    }
}
