use reqwest::StatusCode;
use thiserror::Error;

use super::codec::CodecError;

/// Errors that can occur when offloading a call to the remote service
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Response status outside the success range. The message is the full
    /// response body. No Items are produced for the call.
    #[error("Remote request failed ({status}): {message}")]
    Request { status: StatusCode, message: String },

    /// The encoding scheme header is absent
    #[error("Response is missing the '{0}' header")]
    MissingEncodingScheme(&'static str),

    /// The encoding scheme header names no known decoder
    #[error("Unknown encoding scheme '{0}'")]
    UnknownEncodingScheme(String),

    /// A stream line failed to decode. No Item is yielded for it.
    #[error("Failed to decode line {line}: {source}")]
    Decode {
        line: usize,
        #[source]
        source: CodecError,
    },

    /// The stream did not carry exactly one line per document
    #[error("Expected {expected} rows from the remote stream, got {actual}")]
    RowCountMismatch { expected: usize, actual: usize },

    /// Network or connection error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Request body could not be encoded
    #[error("Failed to encode request: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The API key cannot be used in a header
    #[error("Invalid API key: {0}")]
    InvalidApiKey(String),
}

impl RemoteError {
    /// Returns true if the request may succeed when sent again
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Self::Network(_) => true,
            _ => false,
        }
    }

    /// Returns true for encoding-scheme negotiation failures
    pub const fn is_protocol(&self) -> bool {
        matches!(
            self,
            Self::MissingEncodingScheme(_) | Self::UnknownEncodingScheme(_)
        )
    }
}
