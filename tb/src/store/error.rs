//! Store error types

use std::time::Duration;
use thiserror::Error;

/// Errors from a single store call
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    /// The store answered with a non-success status
    #[error("Rejected ({status}): {reason}")]
    Rejected { status: u16, reason: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// The call never produced an answer from the store
    pub fn is_transport(&self) -> bool {
        matches!(self, StoreError::Network(_) | StoreError::Timeout(_))
    }

    /// The store answered and said no
    pub fn is_rejection(&self) -> bool {
        matches!(self, StoreError::Rejected { .. })
    }

    /// Human-readable reason suitable for a failure notice
    pub fn reason(&self) -> String {
        match self {
            StoreError::Rejected { reason, .. } => reason.clone(),
            other => other.to_string(),
        }
    }
}
