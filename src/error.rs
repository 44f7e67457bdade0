//! Error taxonomy shared by the scoring pipeline, the renderer and the artifact service.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A raster, dataset or store could not be read. Recoverable by zero-fill or row-skip
    /// where the caller has a degraded-input policy.
    #[error("data unavailable: {what}: {reason}")]
    DataUnavailable { what: String, reason: String },

    /// The caller supplied a tensor whose shape differs from the one the model declares.
    /// Indicates version skew between pipeline and model artifact; never retried.
    #[error("shape mismatch for {model} model: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        model: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("{model} model produced a non-finite output ({value})")]
    InvalidOutput { model: String, value: f64 },

    /// A model artifact failed to load or validate. Fatal at startup.
    #[error("failed to load {model} model from {path}: {reason}")]
    ModelLoad {
        model: String,
        path: String,
        reason: String,
    },

    #[error("report generation failed: {0}")]
    GenerationFailure(String),

    #[error("No report found for company: {company}")]
    NotFound { company: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    pub fn data_unavailable(what: impl Into<String>, reason: impl ToString) -> Self {
        Error::DataUnavailable {
            what: what.into(),
            reason: reason.to_string(),
        }
    }

    /// HTTP-equivalent status for the retrieval surface.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            _ => 500,
        }
    }
}

/// Structured error payload returned by the artifact service.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ErrorBody {
    pub status: u16,
    pub detail: String,
}

impl From<&Error> for ErrorBody {
    fn from(err: &Error) -> Self {
        ErrorBody {
            status: err.status_code(),
            detail: err.to_string(),
        }
    }
}
