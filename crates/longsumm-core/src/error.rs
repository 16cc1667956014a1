//! Error types for LongSumm.
//!
//! A document that is too small to train on is not an error: the
//! preprocessor returns `None` for it. Length-mismatch invariants inside a
//! record are asserted and abort the run.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A single input document could not be read; the caller skips it.
    #[error("Parse error in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// An external tool produced output the pipeline cannot continue from.
    #[error("External tool error: {0}")]
    ExternalTool(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether the error is confined to one document.
    pub fn is_per_document(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::Json(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_is_per_document() {
        let err = Error::parse("/tmp/a.json", "missing sentences");
        assert!(err.is_per_document());
        assert_eq!(
            err.to_string(),
            "Parse error in /tmp/a.json: missing sentences"
        );
    }

    #[test]
    fn test_external_tool_aborts() {
        let err = Error::ExternalTool("file count mismatch".into());
        assert!(!err.is_per_document());
    }
}
