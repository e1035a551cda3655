//! Error kinds for the OCR pipeline.
//!
//! One variant per error kind named by the pipeline's error-handling
//! contract: bad input, model load failure, model shape mismatch,
//! unsupported configuration, and inference failure. Stage functions
//! fail fast; the orchestrator never catches and continues.

use std::path::PathBuf;

/// Errors produced by the OCR pipeline.
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    /// Unsupported channel count, empty image, non-existent file, etc.
    #[error("bad input: {reason}")]
    BadInput {
        /// Human-readable description of what was wrong with the input.
        reason: String,
    },

    /// A model file could not be loaded (missing, unreadable, unparsable).
    #[error("failed to load model at {path}: {message}")]
    ModelLoad {
        /// Path or byte-source identifier that failed to load.
        path: PathBuf,
        /// Underlying error message.
        message: String,
    },

    /// A model output didn't match the shape the pipeline requires.
    #[error("shape mismatch in {context}: expected {expected}, got {actual:?}")]
    ShapeMismatch {
        /// What was being decoded (e.g. "detector output").
        context: String,
        /// Human-readable description of the expected shape.
        expected: String,
        /// The shape that was actually observed.
        actual: Vec<i64>,
    },

    /// An unsupported or incomplete configuration (unknown language,
    /// unsupported channel order, recognizer without charset, ...).
    #[error("unsupported configuration: {reason}")]
    UnsupportedConfig {
        /// Human-readable description of the problem.
        reason: String,
    },

    /// Propagated from the inference runtime, message intact.
    #[error("inference failed: {0}")]
    Inference(String),

    /// File IO failure (manifest, charset, model bytes).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Manifest or trace payload JSON failure.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, OcrError>;
