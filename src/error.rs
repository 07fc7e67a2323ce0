//! Error taxonomy for validation, sampling, dispatch and I/O.

use thiserror::Error;

use crate::config::ConfigError;

/// Every failure an ERP run can surface to its caller.
#[derive(Debug, Error)]
pub enum ErpError {
    /// Malformed or out-of-range configuration, reported before any simulation work.
    #[error("invalid input `{field}`: {message}")]
    InvalidInput { field: String, message: String },

    /// A request that would only produce vacuous probabilities (zero trials, zero-length outage).
    #[error("degenerate input `{field}`: {message}")]
    NumericDegeneracy { field: String, message: String },

    /// A single dispatch replay hit an impossible numeric state. Aborts the whole run.
    #[error("dispatch failed (trial {trial}, start step {start}, duration {duration}): {message}")]
    WorkerFailure {
        trial: usize,
        start: usize,
        duration: usize,
        message: String,
    },

    #[error("run cancelled after {completed_batches} of {total_batches} batches")]
    Cancelled {
        completed_batches: usize,
        total_batches: usize,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ErpError {
    pub(crate) fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    pub(crate) fn degenerate(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NumericDegeneracy {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Field name carried by input errors, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::InvalidInput { field, .. } | Self::NumericDegeneracy { field, .. } => {
                Some(field)
            }
            Self::Config(e) => Some(&e.field),
            _ => None,
        }
    }
}
