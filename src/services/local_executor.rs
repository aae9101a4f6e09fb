use anyhow::anyhow;
use futures::future::join_all;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::VecDeque;
use std::ops::Range;
use std::thread;
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{debug, info, warn};

use crate::domain::errors::SignalError;
use crate::domain::models::{
    BatchSize, Document, ExecutionConfig, Field, Item, LocalConfig, Parallelism, ResolvedExecution,
    SelectorError,
};
use crate::domain::ports::{Signal, SignalState};

/// Lazy, ordered sequence of Items for one call
pub type ItemStream<'a> = BoxStream<'a, Result<Item, SignalError>>;

/// Drives in-process computation of a signal.
///
/// Owns the signal's lifecycle for the duration of one call: `setup` runs
/// before the stream is returned and `teardown` runs exactly once when the
/// stream completes, fails, or is dropped early.
///
/// # Examples
///
/// ```no_run
/// use docsignals::domain::models::Document;
/// use docsignals::services::LocalExecutor;
/// use docsignals::signals::pii;
/// use futures::StreamExt;
///
/// # async fn example() -> anyhow::Result<()> {
/// let mut signal = pii();
/// let documents = vec![Document::from("Call me at 555-123-4567")];
/// let mut items = LocalExecutor::default().run(&mut signal, &documents)?;
/// while let Some(item) = items.next().await {
///     println!("{:?}", item?);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalExecutor {
    defaults: ExecutionConfig,
    overrides: ExecutionConfig,
}

impl LocalExecutor {
    /// Executor with `defaults` as the lowest-precedence layer
    pub const fn new(defaults: ExecutionConfig) -> Self {
        Self {
            defaults,
            overrides: ExecutionConfig::new(BatchSize::Unset, Parallelism::Unset),
        }
    }

    pub fn from_config(config: &LocalConfig) -> Result<Self, SelectorError> {
        Ok(Self::new(ExecutionConfig::new(
            BatchSize::from_selector(config.batch_size)?,
            Parallelism::from_selector(config.parallelism)?,
        )))
    }

    /// Per-call selectors, taking precedence over the signal's own
    #[must_use]
    pub const fn with_overrides(mut self, overrides: ExecutionConfig) -> Self {
        self.overrides = overrides;
        self
    }

    /// Batching plan for `signal`
    pub fn plan(&self, signal: &dyn Signal) -> ResolvedExecution {
        ExecutionConfig::resolve(&self.overrides, &signal.execution(), &self.defaults)
    }

    /// Start computing `signal` over `documents`.
    ///
    /// A setup failure is returned here, after `teardown` has run, and no
    /// stream is produced. Once the stream exists, the first batch failure is
    /// yielded as the last element; Items of earlier batches stay valid.
    pub fn run<'a>(
        &self,
        signal: &'a mut dyn Signal,
        documents: &'a [Document],
    ) -> Result<ItemStream<'a>, SignalError> {
        let plan = self.plan(signal);
        let name = signal.name().to_string();

        if documents.is_empty() {
            debug!(signal = %name, "No documents, skipping setup");
            return Ok(stream::empty().boxed());
        }

        if signal.state() != SignalState::Ready {
            if let Err(err) = signal.setup() {
                warn!(signal = %name, error = %err, "Signal setup failed");
                signal.teardown();
                return Err(SignalError::Setup {
                    signal: name,
                    reason: format!("{err:#}"),
                });
            }
        }

        let batches: VecDeque<(usize, Range<usize>)> =
            plan.batches(documents.len()).into_iter().enumerate().collect();

        info!(
            signal = %name,
            documents = documents.len(),
            batches = batches.len(),
            workers = plan.workers,
            "Computing signal locally"
        );

        let state = RunState {
            fields: signal.fields(),
            lease: Lease::new(signal),
            name,
            documents,
            batches,
            workers: plan.workers.max(1),
            pending: VecDeque::new(),
            done: false,
        };

        Ok(stream::unfold(state, |mut state| async move {
            loop {
                if let Some(next) = state.pending.pop_front() {
                    return Some((next, state));
                }
                if state.done {
                    return None;
                }
                state.next_wave().await;
            }
        })
        .boxed())
    }
}

/// Holds the signal for the duration of a call and tears it down on drop
struct Lease<'a> {
    signal: &'a mut dyn Signal,
    released: bool,
}

impl<'a> Lease<'a> {
    fn new(signal: &'a mut dyn Signal) -> Self {
        Self {
            signal,
            released: false,
        }
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.signal.teardown();
            debug!(signal = self.signal.name(), "Signal released");
        }
    }
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

struct RunState<'a> {
    lease: Lease<'a>,
    name: String,
    fields: Field,
    documents: &'a [Document],
    batches: VecDeque<(usize, Range<usize>)>,
    workers: usize,
    pending: VecDeque<Result<Item, SignalError>>,
    done: bool,
}

impl RunState<'_> {
    /// Compute up to `workers` batches in parallel and queue their Items in
    /// input order. Stops at the first failing batch.
    async fn next_wave(&mut self) {
        let wave: Vec<(usize, Range<usize>)> = (0..self.workers)
            .map_while(|_| self.batches.pop_front())
            .collect();

        if wave.is_empty() {
            self.finish();
            info!(signal = %self.name, "Local computation complete");
            return;
        }

        let ranges: Vec<Range<usize>> = wave.iter().map(|(_, range)| range.clone()).collect();
        let results = self.compute_wave(&ranges).await;

        for ((batch, range), result) in wave.into_iter().zip(results) {
            match self.check_batch(batch, range, result) {
                Ok(items) => self.pending.extend(items.into_iter().map(Ok)),
                Err(err) => {
                    warn!(signal = %self.name, batch, error = %err, "Batch failed");
                    self.pending.push_back(Err(err));
                    self.finish();
                    return;
                }
            }
        }
    }

    /// Compute the batches of one wave, results in input order.
    ///
    /// On a multi-threaded runtime each batch gets its own scoped thread
    /// driving `compute` through the runtime handle, so CPU-bound signals run
    /// in parallel. A current-thread runtime only interleaves the futures.
    async fn compute_wave(&self, ranges: &[Range<usize>]) -> Vec<anyhow::Result<Vec<Item>>> {
        let signal: &dyn Signal = &*self.lease.signal;
        let documents = self.documents;

        if ranges.len() > 1 {
            if let Ok(handle) = Handle::try_current() {
                if handle.runtime_flavor() == RuntimeFlavor::MultiThread {
                    return tokio::task::block_in_place(|| {
                        thread::scope(|scope| {
                            let workers: Vec<_> = ranges
                                .iter()
                                .map(|range| {
                                    let handle = handle.clone();
                                    let batch = &documents[range.clone()];
                                    scope.spawn(move || handle.block_on(signal.compute(batch)))
                                })
                                .collect();
                            workers
                                .into_iter()
                                .map(|worker| {
                                    worker
                                        .join()
                                        .unwrap_or_else(|_| Err(anyhow!("batch worker panicked")))
                                })
                                .collect()
                        })
                    });
                }
            }
        }

        join_all(ranges.iter().map(|range| signal.compute(&documents[range.clone()]))).await
    }

    fn check_batch(
        &self,
        batch: usize,
        range: Range<usize>,
        result: anyhow::Result<Vec<Item>>,
    ) -> Result<Vec<Item>, SignalError> {
        let items = result.map_err(|err| SignalError::BatchCompute {
            signal: self.name.clone(),
            batch,
            reason: format!("{err:#}"),
        })?;

        if items.len() != range.len() {
            return Err(SignalError::OutputCountMismatch {
                signal: self.name.clone(),
                expected: range.len(),
                actual: items.len(),
            });
        }

        for (offset, item) in items.iter().enumerate() {
            self.fields
                .check(item)
                .map_err(|violation| SignalError::SchemaMismatch {
                    signal: self.name.clone(),
                    index: range.start + offset,
                    violation,
                })?;
        }

        debug!(signal = %self.name, batch, documents = range.len(), "Batch computed");
        Ok(items)
    }

    fn finish(&mut self) {
        self.batches.clear();
        self.done = true;
        self.lease.release();
    }
}
