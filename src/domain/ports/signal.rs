use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::models::{Document, ExecutionConfig, Field, Item};

/// How a signal may be executed.
///
/// The dispatcher branches on this discriminant; it never probes the concrete
/// signal type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalCapability {
    /// In-process only
    Local,
    /// In-process, or offloaded to the named remote operation
    Remote { operation: String },
    /// Union of several detectors computed in-process; optionally offloaded
    /// as a whole to a remote operation that performs the merge itself
    Composite { remote_operation: Option<String> },
}

impl SignalCapability {
    /// Remote operation name, if offload is supported
    pub fn remote_operation(&self) -> Option<&str> {
        match self {
            Self::Local => None,
            Self::Remote { operation } => Some(operation),
            Self::Composite { remote_operation } => remote_operation.as_deref(),
        }
    }
}

/// Lifecycle state of a signal instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignalState {
    /// Constructed with configuration only, no resources held
    #[default]
    Uninitialized,
    /// Resources acquired, `compute` may be called
    Ready,
    /// Resources released by `teardown`
    Released,
}

impl fmt::Display for SignalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Ready => "ready",
            Self::Released => "released",
        };
        f.write_str(name)
    }
}

/// Tracks the lifecycle state machine for a signal implementation.
///
/// `Uninitialized -> Ready -> Released`; `release` is valid from any state and
/// idempotent.
#[derive(Debug, Default)]
pub struct Lifecycle {
    state: SignalState,
}

impl Lifecycle {
    pub const fn new() -> Self {
        Self {
            state: SignalState::Uninitialized,
        }
    }

    pub const fn state(&self) -> SignalState {
        self.state
    }

    pub fn mark_ready(&mut self) {
        self.state = SignalState::Ready;
    }

    /// Move to `Released`. Returns true if resources were held before.
    pub fn release(&mut self) -> bool {
        let was_ready = self.state == SignalState::Ready;
        self.state = SignalState::Released;
        was_ready
    }
}

/// A configured computation deriving one Item per input document.
///
/// Heavy resources (model weights, device handles) are acquired in `setup`
/// and dropped in `teardown`, never cached outside the instance.
#[async_trait]
pub trait Signal: Send + Sync {
    /// Registry name, e.g. `pii`
    fn name(&self) -> &str;

    /// Declared output schema. Every Item must conform.
    fn fields(&self) -> Field;

    /// Execution capability
    fn capability(&self) -> SignalCapability {
        SignalCapability::Local
    }

    /// Declared batching preferences
    fn execution(&self) -> ExecutionConfig {
        ExecutionConfig::default()
    }

    /// Keyword options sent as query parameters when offloaded
    fn remote_options(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    /// Current lifecycle state
    fn state(&self) -> SignalState;

    /// Acquire resources. A failure aborts the call before any output.
    fn setup(&mut self) -> Result<()>;

    /// Release resources. Idempotent and valid from any state.
    fn teardown(&mut self);

    /// Compute one Item per document of `batch`, in order
    async fn compute(&self, batch: &[Document]) -> Result<Vec<Item>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_transitions() {
        let mut lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.state(), SignalState::Uninitialized);

        lifecycle.mark_ready();
        assert_eq!(lifecycle.state(), SignalState::Ready);

        assert!(lifecycle.release());
        assert!(!lifecycle.release());
        assert_eq!(lifecycle.state(), SignalState::Released);
    }

    #[test]
    fn test_release_from_uninitialized() {
        let mut lifecycle = Lifecycle::new();
        assert!(!lifecycle.release());
        assert_eq!(lifecycle.state(), SignalState::Released);
    }

    #[test]
    fn test_remote_operation() {
        assert_eq!(SignalCapability::Local.remote_operation(), None);
        assert_eq!(
            SignalCapability::Remote {
                operation: "perplexity".to_string()
            }
            .remote_operation(),
            Some("perplexity")
        );
        assert_eq!(
            SignalCapability::Composite {
                remote_operation: None
            }
            .remote_operation(),
            None
        );
    }
}
