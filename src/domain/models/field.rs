//! Recursive output schema of a signal.
//!
//! Wire form:
//! - a primitive type tag: `"float32"`
//! - a named mapping: `{"fields": {"label_0": "float32"}}`
//! - a list of spans: `["string_span"]`

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

use super::document::Item;

/// Primitive type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    String,
    StringSpan,
    Boolean,
    Int32,
    Int64,
    Float32,
    Float64,
    Embedding,
}

impl DataType {
    /// Wire tag, e.g. `string_span`
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::StringSpan => "string_span",
            Self::Boolean => "boolean",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Embedding => "embedding",
        }
    }

    const fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Int32 | Self::Int64 | Self::Float32 | Self::Float64
        )
    }
}

/// Descriptor of a signal's output shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FieldRepr", into = "FieldRepr")]
pub enum Field {
    Primitive(DataType),
    Map(BTreeMap<String, Field>),
    SpanList,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum FieldRepr {
    Primitive(DataType),
    Repeated([DataType; 1]),
    Map { fields: BTreeMap<String, Field> },
}

impl TryFrom<FieldRepr> for Field {
    type Error = String;

    fn try_from(repr: FieldRepr) -> Result<Self, Self::Error> {
        match repr {
            FieldRepr::Primitive(dtype) => Ok(Self::Primitive(dtype)),
            FieldRepr::Repeated([DataType::StringSpan]) => Ok(Self::SpanList),
            FieldRepr::Repeated([other]) => Err(format!(
                "only [\"string_span\"] is supported as a list field, got [{other:?}]"
            )),
            FieldRepr::Map { fields } => Ok(Self::Map(fields)),
        }
    }
}

impl From<Field> for FieldRepr {
    fn from(field: Field) -> Self {
        match field {
            Field::Primitive(dtype) => Self::Primitive(dtype),
            Field::SpanList => Self::Repeated([DataType::StringSpan]),
            Field::Map(fields) => Self::Map { fields },
        }
    }
}

/// An Item that does not match the declared schema
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("schema violation at '{path}': expected {expected}, found {found}")]
pub struct SchemaViolation {
    pub path: String,
    pub expected: String,
    pub found: String,
}

impl Field {
    /// Mapping field from `(name, sub-field)` pairs
    pub fn map<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Self)>,
        K: Into<String>,
    {
        Self::Map(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Check that `item` structurally matches this schema.
    ///
    /// Null Items and null sub-values always conform. Mappings reject keys they
    /// do not declare; declared keys may be absent.
    pub fn check(&self, item: &Item) -> Result<(), SchemaViolation> {
        match item {
            Item::Null => Ok(()),
            Item::Json(value) => self.check_value("$", value),
            Item::Array(array) => match self {
                Self::Primitive(dtype) if *dtype == DataType::Embedding || dtype.is_numeric() => {
                    Ok(())
                }
                _ => Err(self.violation("$", &format!("{} array", array.dtype().as_str()))),
            },
        }
    }

    fn check_value(&self, path: &str, value: &Value) -> Result<(), SchemaViolation> {
        if value.is_null() {
            return Ok(());
        }
        match self {
            Self::Primitive(dtype) => {
                let ok = match dtype {
                    DataType::String => value.is_string(),
                    DataType::StringSpan => is_span(value),
                    DataType::Boolean => value.is_boolean(),
                    DataType::Int32 | DataType::Int64 => value.is_i64() || value.is_u64(),
                    DataType::Float32 | DataType::Float64 => value.is_number(),
                    DataType::Embedding => value
                        .as_array()
                        .is_some_and(|values| values.iter().all(Value::is_number)),
                };
                if ok {
                    Ok(())
                } else {
                    Err(self.violation(path, &describe(value)))
                }
            }
            Self::SpanList => {
                let Some(spans) = value.as_array() else {
                    return Err(self.violation(path, &describe(value)));
                };
                for (idx, span) in spans.iter().enumerate() {
                    if !is_span(span) {
                        return Err(SchemaViolation {
                            path: format!("{path}[{idx}]"),
                            expected: "span".to_string(),
                            found: describe(span),
                        });
                    }
                }
                Ok(())
            }
            Self::Map(fields) => {
                let Some(object) = value.as_object() else {
                    return Err(self.violation(path, &describe(value)));
                };
                for (key, sub_value) in object {
                    let sub_path = format!("{path}.{key}");
                    match fields.get(key) {
                        Some(sub_field) => sub_field.check_value(&sub_path, sub_value)?,
                        None => {
                            return Err(SchemaViolation {
                                path: sub_path,
                                expected: "no such field".to_string(),
                                found: describe(sub_value),
                            })
                        }
                    }
                }
                Ok(())
            }
        }
    }

    fn violation(&self, path: &str, found: &str) -> SchemaViolation {
        SchemaViolation {
            path: path.to_string(),
            expected: self.expected(),
            found: found.to_string(),
        }
    }

    fn expected(&self) -> String {
        match self {
            Self::Primitive(dtype) => dtype.as_str().to_string(),
            Self::SpanList => "list of spans".to_string(),
            Self::Map(_) => "mapping".to_string(),
        }
    }
}

fn is_span(value: &Value) -> bool {
    value.as_object().is_some_and(|span| {
        span.get("start").is_some_and(Value::is_u64) && span.get("end").is_some_and(Value::is_u64)
    })
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
    .to_string()
}
