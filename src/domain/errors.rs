//! Errors raised while executing signals.

use thiserror::Error;

use crate::domain::models::SchemaViolation;
use crate::infrastructure::remote::RemoteError;

/// Fatal errors for a signal call.
///
/// Every variant aborts the call it was raised in. Items already yielded
/// before the error remain valid.
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("Setup failed for signal '{signal}': {reason}")]
    Setup { signal: String, reason: String },

    #[error("Batch {batch} of signal '{signal}' failed: {reason}")]
    BatchCompute {
        signal: String,
        batch: usize,
        reason: String,
    },

    #[error("Signal '{signal}' returned {actual} items for a batch of {expected} documents")]
    OutputCountMismatch {
        signal: String,
        expected: usize,
        actual: usize,
    },

    #[error("Signal '{signal}' produced a non-conforming item at position {index}: {violation}")]
    SchemaMismatch {
        signal: String,
        index: usize,
        #[source]
        violation: SchemaViolation,
    },

    #[error("Signal '{0}' does not support remote execution")]
    RemoteNotSupported(String),

    #[error("Remote execution requested but no remote client is configured")]
    RemoteUnavailable,

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl SignalError {
    /// Returns true when the call failed before any Item could be produced
    pub const fn is_pre_stream(&self) -> bool {
        matches!(
            self,
            Self::Setup { .. } | Self::RemoteNotSupported(_) | Self::RemoteUnavailable
        )
    }
}

/// Outcome of a single detector on a single document
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DetectorError {
    /// The document is not valid input for this detector. Not fatal: the
    /// document's Item becomes null.
    #[error("document is not textual")]
    NonTextInput,

    /// The detector itself failed. Fatal for the batch.
    #[error("detector '{detector}' failed: {reason}")]
    Failed { detector: String, reason: String },
}

/// Convenience alias for signal results
pub type SignalResult<T> = Result<T, SignalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pre_stream_classification() {
        assert!(SignalError::RemoteUnavailable.is_pre_stream());
        assert!(SignalError::Setup {
            signal: "pii".to_string(),
            reason: "boom".to_string()
        }
        .is_pre_stream());
        assert!(!SignalError::BatchCompute {
            signal: "pii".to_string(),
            batch: 2,
            reason: "boom".to_string()
        }
        .is_pre_stream());
    }

    #[test]
    fn test_messages() {
        let err = SignalError::OutputCountMismatch {
            signal: "perplexity".to_string(),
            expected: 3,
            actual: 2,
        };
        assert_eq!(
            err.to_string(),
            "Signal 'perplexity' returned 2 items for a batch of 3 documents"
        );
    }
}
