//! Domain models: documents, items, schemas and execution selectors.

pub mod config;
pub mod device;
pub mod document;
pub mod execution;
pub mod field;
pub mod ndarray;

pub use config::{Config, LocalConfig, LoggingConfig, RemoteConfig, RetryConfig};
pub use device::DeviceKind;
pub use document::{Document, Item, Span};
pub use execution::{
    BatchSize, ExecutionConfig, Parallelism, ResolvedExecution, SelectorError,
};
pub use field::{DataType, Field, SchemaViolation};
pub use ndarray::{ArrayData, DType, NdArray, ShapeMismatch};
