//! Common test utilities for integration tests
//!
//! Provides a scripted signal, document fixtures and a remote client pointed
//! at a mock server.

#![allow(dead_code)]

use async_trait::async_trait;
use docsignals::domain::models::{
    DataType, Document, ExecutionConfig, Field, Item, RemoteConfig, RetryConfig,
};
use docsignals::domain::ports::{Signal, SignalCapability, SignalState};
use docsignals::infrastructure::credentials::ApiKey;
use docsignals::infrastructure::remote::RemoteClient;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const TEST_API_KEY: &str = "sk-test-0123456789";

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// `count` text documents, "doc 0" ... "doc {count-1}"
pub fn text_documents(count: usize) -> Vec<Document> {
    (0..count).map(|i| Document::from(format!("doc {i}"))).collect()
}

/// Remote client for `base_url` with retries disabled
pub fn remote_client(base_url: &str) -> RemoteClient {
    remote_client_with_retries(base_url, 0)
}

pub fn remote_client_with_retries(base_url: &str, max_retries: u32) -> RemoteClient {
    let config = RemoteConfig {
        base_url: base_url.to_string(),
        retry: RetryConfig {
            max_retries,
            initial_backoff_ms: 10,
            max_backoff_ms: 50,
        },
        ..RemoteConfig::default()
    };
    RemoteClient::from_config(&config, ApiKey::new(TEST_API_KEY)).expect("client should build")
}

/// Shared counters observed by tests after the signal is borrowed
#[derive(Debug, Default)]
pub struct Probes {
    pub setups: AtomicUsize,
    pub teardowns: AtomicUsize,
    pub batches: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl Probes {
    pub fn setups(&self) -> usize {
        self.setups.load(Ordering::SeqCst)
    }

    pub fn teardowns(&self) -> usize {
        self.teardowns.load(Ordering::SeqCst)
    }

    pub fn batches(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    /// Most batches ever inside `compute` at the same time
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Signal mapping "doc N" to `{"index": N}`, with scripted failures
pub struct ScriptedSignal {
    pub probes: Arc<Probes>,
    pub execution: ExecutionConfig,
    pub remote_operation: Option<String>,
    pub fail_setup: bool,
    /// Fail any batch containing this document position
    pub fail_at: Option<usize>,
    /// Emit one Item too few for every batch
    pub drop_last: bool,
    /// Block the calling thread this long in every batch
    pub delay: Option<Duration>,
    state: SignalState,
}

impl ScriptedSignal {
    pub fn new(execution: ExecutionConfig) -> Self {
        Self {
            probes: Arc::new(Probes::default()),
            execution,
            remote_operation: None,
            fail_setup: false,
            fail_at: None,
            drop_last: false,
            delay: None,
            state: SignalState::Uninitialized,
        }
    }

    pub fn probes(&self) -> Arc<Probes> {
        Arc::clone(&self.probes)
    }
}

fn position(document: &Document) -> Option<usize> {
    document.as_text()?.strip_prefix("doc ")?.parse().ok()
}

#[async_trait]
impl Signal for ScriptedSignal {
    fn name(&self) -> &str {
        "scripted"
    }

    fn fields(&self) -> Field {
        Field::map([("index", Field::Primitive(DataType::Int64))])
    }

    fn capability(&self) -> SignalCapability {
        match &self.remote_operation {
            Some(operation) => SignalCapability::Remote {
                operation: operation.clone(),
            },
            None => SignalCapability::Local,
        }
    }

    fn execution(&self) -> ExecutionConfig {
        self.execution
    }

    fn state(&self) -> SignalState {
        self.state
    }

    fn setup(&mut self) -> anyhow::Result<()> {
        self.probes.setups.fetch_add(1, Ordering::SeqCst);
        if self.fail_setup {
            anyhow::bail!("weights missing");
        }
        self.state = SignalState::Ready;
        Ok(())
    }

    fn teardown(&mut self) {
        self.probes.teardowns.fetch_add(1, Ordering::SeqCst);
        self.state = SignalState::Released;
    }

    async fn compute(&self, batch: &[Document]) -> anyhow::Result<Vec<Item>> {
        self.probes.batches.fetch_add(1, Ordering::SeqCst);
        let active = self.probes.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.probes.peak.fetch_max(active, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.probes.active.fetch_sub(1, Ordering::SeqCst);
        let mut items = Vec::with_capacity(batch.len());
        for document in batch {
            let index = position(document);
            if index.is_some() && index == self.fail_at {
                anyhow::bail!("device lost");
            }
            items.push(index.map_or(Item::Null, |index| Item::Json(json!({"index": index}))));
        }
        if self.drop_last {
            items.pop();
        }
        Ok(items)
    }
}
