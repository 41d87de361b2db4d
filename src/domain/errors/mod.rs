// Domain errors - Error types for the domain layer

use std::path::PathBuf;

use thiserror::Error;

/// Domain-specific error types
#[derive(Error, Debug)]
pub enum DomainError {
    /// File extension is not one of the recognised video containers
    #[error("Unsupported input file: {path} (extension '{extension}' is not a video format)")]
    UnsupportedInput { path: PathBuf, extension: String },

    /// The media inspector could not analyse the file
    #[error("Failed to probe {path}: {message}")]
    ProbeFailed { path: PathBuf, message: String },

    /// The container was readable but holds no video stream
    #[error("No video stream found in {path}")]
    NoVideoStream { path: PathBuf },

    /// Trim start is not before trim end
    #[error("Invalid trimming: start ({start}) must be before end ({end})")]
    InvalidTrimming { start: String, end: String },

    /// Invalid arguments provided
    #[error("Bad arguments: {0}")]
    BadArgs(String),

    /// The external tool could not be started
    #[error("Failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Settings could not be read or written
    #[error("Settings error: {0}")]
    Settings(String),

    /// Batch manifest could not be parsed or written
    #[error("Manifest error: {0}")]
    Manifest(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for domain operations
pub type DomainResult<T> = std::result::Result<T, DomainError>;
