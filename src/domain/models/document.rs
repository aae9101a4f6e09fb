//! Documents, per-document Items and text spans.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ndarray::NdArray;

/// One input unit. Identity is positional: a document is known by its index
/// in the sequence handed to a signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Document {
    /// Textual content
    Text(String),
    /// Any other raw content (numbers, objects, binary placeholders...)
    Other(Value),
}

impl Document {
    /// The document text, or `None` when the content is not textual
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Other(_) => None,
        }
    }
}

impl From<&str> for Document {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Document {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Value> for Document {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text),
            other => Self::Other(other),
        }
    }
}

/// Output record for one document.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    /// Detection was impossible for this document
    Null,
    /// A structured value
    Json(Value),
    /// A typed numeric array, as produced by the `b64-npy` encoding
    Array(NdArray),
}

impl Item {
    /// Returns true for the null Item
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow the JSON value, if this Item carries one
    pub const fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Convert into a JSON value for output. Arrays become
    /// `{"dtype", "shape", "data"}` objects.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Json(value) => value.clone(),
            Self::Array(array) => array.to_json(),
        }
    }
}

impl From<Value> for Item {
    fn from(value: Value) -> Self {
        if value.is_null() {
            Self::Null
        } else {
            Self::Json(value)
        }
    }
}

impl From<Option<Value>> for Item {
    fn from(value: Option<Value>) -> Self {
        value.map_or(Self::Null, Self::from)
    }
}

impl From<NdArray> for Item {
    fn from(array: NdArray) -> Self {
        Self::Array(array)
    }
}

/// A `(start, end)` byte offset pair into a document's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Inclusive start offset
    pub start: usize,
    /// Exclusive end offset
    pub end: usize,
}

impl Span {
    /// Create a span
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// The covered substring of `text`, if the offsets fall on char boundaries
    pub fn slice<'a>(&self, text: &'a str) -> Option<&'a str> {
        text.get(self.start..self.end)
    }
}

impl From<regex::Match<'_>> for Span {
    fn from(m: regex::Match<'_>) -> Self {
        Self::new(m.start(), m.end())
    }
}
