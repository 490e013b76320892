//! Error types for the argus library.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using argus's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during structural analysis.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error reading files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unsupported language for the given file.
    #[error("Unsupported language for file: {path}")]
    UnsupportedLanguage { path: PathBuf },

    /// Parse error from tree-sitter.
    #[error("Parse error in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Analysis-specific error.
    #[error("Analysis error: {message}")]
    Analysis { message: String },

    /// Oracle call failed or returned an unusable response.
    #[error("Oracle error: {0}")]
    Oracle(String),
}

impl Error {
    /// Create a new analysis error.
    pub fn analysis(message: impl Into<String>) -> Self {
        Self::Analysis {
            message: message.into(),
        }
    }

    /// Create a new config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a new oracle error.
    pub fn oracle(message: impl Into<String>) -> Self {
        Self::Oracle(message.into())
    }
}
