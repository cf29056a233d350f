use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors shared by every retrieval component.
///
/// `Config` is fatal at build time, `DimensionMismatch` and `InvalidArgument`
/// are fatal per call, `Timeout` is retryable by the caller. Running out of
/// candidates after filtering is not an error; see `PartialResults` in
/// [`crate::types`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Embedding provider failed: {0}")]
    Embedding(String),

    /// The task running a query was cancelled, e.g. by runtime shutdown.
    #[error("Search task cancelled: {0}")]
    Cancelled(String),

    #[error("Malformed document {id}: {reason}")]
    MalformedDocument { id: String, reason: String },

    #[error("Snapshot {}: {reason}", path.display())]
    Snapshot { path: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// `true` for failures a caller may retry with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Embedding(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Check an embedding length against the deployment dimension.
pub fn validate_dimension(expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::DimensionMismatch { expected, actual })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_check() {
        assert!(validate_dimension(4, 4).is_ok());
        let err = validate_dimension(4, 3).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 4, actual: 3 }));
        assert_eq!(err.to_string(), "Embedding dimension mismatch: expected 4, got 3");
    }

    #[test]
    fn only_transient_failures_are_retryable() {
        assert!(Error::Timeout(Duration::from_millis(10)).is_retryable());
        assert!(Error::Embedding("connection reset".into()).is_retryable());
        assert!(!Error::Config("bad".into()).is_retryable());
        assert!(!Error::InvalidArgument("top_k".into()).is_retryable());
        assert!(!Error::Cancelled("runtime shutting down".into()).is_retryable());
    }
}
