//! Line codecs for the remote response stream.
//!
//! The decoder is chosen from the response's encoding scheme header via a
//! fixed lookup table; each non-empty line is one encoded Item.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::errors::RemoteError;
use super::npy::{read_npy, write_npy, NpyError};
use crate::domain::models::Item;

/// Response header naming the encoding scheme
pub const ENCODING_SCHEME_HEADER: &str = "X-Signal-EncodingScheme";

/// Errors decoding or encoding a single line
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid NPY payload: {0}")]
    Npy(#[from] NpyError),

    #[error("scheme {0} can only encode array items")]
    NotAnArray(EncodingScheme),
}

/// How each line of a response stream is serialized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingScheme {
    /// One JSON document per line
    Json,
    /// Base64 of an NPY-serialized numeric array per line
    B64Npy,
}

const DECODERS: [(&str, EncodingScheme); 2] = [
    ("json", EncodingScheme::Json),
    ("b64-npy", EncodingScheme::B64Npy),
];

impl EncodingScheme {
    /// Header value for this scheme
    pub fn as_str(self) -> &'static str {
        DECODERS
            .iter()
            .find(|(_, scheme)| *scheme == self)
            .map_or("json", |(name, _)| name)
    }

    /// Decode one line into an Item
    pub fn decode(self, line: &[u8]) -> Result<Item, CodecError> {
        match self {
            Self::Json => {
                let value: serde_json::Value = serde_json::from_slice(line)?;
                Ok(Item::from(value))
            }
            Self::B64Npy => {
                let raw = STANDARD.decode(line)?;
                Ok(Item::Array(read_npy(&raw)?))
            }
        }
    }

    /// Encode one Item as a line, without the trailing newline
    pub fn encode(self, item: &Item) -> Result<String, CodecError> {
        match (self, item) {
            (Self::Json, item) => Ok(serde_json::to_string(&item.to_json())?),
            (Self::B64Npy, Item::Array(array)) => Ok(STANDARD.encode(write_npy(array))),
            (Self::B64Npy, _) => Err(CodecError::NotAnArray(self)),
        }
    }
}

impl FromStr for EncodingScheme {
    type Err = RemoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DECODERS
            .iter()
            .find(|(name, _)| *name == s)
            .map(|(_, scheme)| *scheme)
            .ok_or_else(|| RemoteError::UnknownEncodingScheme(s.to_string()))
    }
}

impl fmt::Display for EncodingScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
