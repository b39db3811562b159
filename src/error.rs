//! Error types for model loading
//!
//! Structural problems inside a model never surface here; those are
//! collected as `StructuralError` values during validation. This enum covers
//! the operational failures of getting a model document into memory.

use thiserror::Error;

/// Result type for model import operations
pub type Result<T> = std::result::Result<T, ModelError>;

/// Model loading errors
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Unsupported model document format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid model document: {0}")]
    InvalidDocument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
