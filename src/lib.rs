//! docsignals - per-document signal computation
//!
//! A signal maps each document of a batch to exactly one Item, declared up
//! front by an output schema. Signals run in-process, where the executor
//! batches the input and owns the signal's setup and teardown, or on a remote
//! HTTP service that streams one encoded Item per line.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): documents, items, schemas, selectors and the
//!   `Signal`, `Detector` and runtime ports
//! - **Service Layer** (`services`): local executor, dispatcher and composite
//!   signals
//! - **Signals** (`signals`): built-in signals and the name-based registry
//! - **Infrastructure Layer** (`infrastructure`): remote client and wire codec,
//!   detectors, configuration, logging and credentials
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```no_run
//! use docsignals::{Dispatcher, Document, ExecutionTarget};
//! use futures::StreamExt;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let mut signal = docsignals::signals::pii();
//! let documents = vec![Document::from("reach me at jane@example.com")];
//! let mut items = Dispatcher::default()
//!     .compute(&mut signal, &documents, ExecutionTarget::Local)
//!     .await?;
//! while let Some(item) = items.next().await {
//!     println!("{}", item?.to_json());
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;
pub mod signals;

// Re-export commonly used types for convenience
pub use domain::errors::{DetectorError, SignalError, SignalResult};
pub use domain::models::{
    BatchSize, Config, DataType, Document, ExecutionConfig, Field, Item, LocalConfig,
    LoggingConfig, NdArray, Parallelism, RemoteConfig, RetryConfig, Span,
};
pub use domain::ports::{Detector, Signal, SignalCapability, SignalState};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use infrastructure::remote::{RemoteClient, RemoteError};
pub use services::{CompositeSignal, Dispatcher, ExecutionTarget, ItemStream, LocalExecutor};
pub use signals::SignalRegistry;
