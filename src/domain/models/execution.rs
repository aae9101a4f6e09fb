//! Batch-size and parallelism selectors for local execution.
//!
//! Raw selectors are integers, as they appear in configuration and on the
//! command line: absent means unset, a negative value is the "everything"
//! sentinel, a positive value is a fixed count and zero is rejected.
//!
//! Resolution order, highest first:
//! 1. an exclusive signal always runs sequentially
//! 2. per-call override
//! 3. the signal's declared selector
//! 4. the configured default
//!
//! `Unset` falls through to the next layer. If every layer is unset the input
//! is computed as a single batch by a single worker.

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::ops::Range;
use thiserror::Error;

/// Invalid raw selector
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("{0} selector must not be 0")]
    Zero(&'static str),

    #[error("{name} selector {value} is too large")]
    TooLarge { name: &'static str, value: i64 },
}

fn positive(name: &'static str, value: i64) -> Result<NonZeroUsize, SelectorError> {
    let count = usize::try_from(value).map_err(|_| SelectorError::TooLarge { name, value })?;
    NonZeroUsize::new(count).ok_or(SelectorError::Zero(name))
}

/// How the input is chunked into batches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BatchSize {
    /// Inherit from the next layer
    #[default]
    Unset,
    /// Pass everything through as one batch, never chunk
    Unchunked,
    /// Chunks of N documents, the last one may be smaller
    Fixed(NonZeroUsize),
}

impl BatchSize {
    /// Parse a raw selector
    pub fn from_selector(raw: Option<i64>) -> Result<Self, SelectorError> {
        match raw {
            None => Ok(Self::Unset),
            Some(value) if value < 0 => Ok(Self::Unchunked),
            Some(value) => positive("batch size", value).map(Self::Fixed),
        }
    }

    /// Fixed-size chunks of `n` documents. `n == 0` means unchunked.
    pub fn fixed(n: usize) -> Self {
        NonZeroUsize::new(n).map_or(Self::Unchunked, Self::Fixed)
    }

    /// `self` unless it is unset
    #[must_use]
    pub const fn or(self, fallback: Self) -> Self {
        match self {
            Self::Unset => fallback,
            other => other,
        }
    }
}

/// How many batches may be computed at once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Parallelism {
    /// Inherit from the next layer
    #[default]
    Unset,
    /// Strictly one batch at a time
    Sequential,
    /// As many workers as the host offers
    Max,
    /// A fixed number of workers
    Fixed(NonZeroUsize),
}

impl Parallelism {
    /// Parse a raw selector. `1` is sequential.
    pub fn from_selector(raw: Option<i64>) -> Result<Self, SelectorError> {
        match raw {
            None => Ok(Self::Unset),
            Some(value) if value < 0 => Ok(Self::Max),
            Some(1) => Ok(Self::Sequential),
            Some(value) => positive("parallelism", value).map(Self::Fixed),
        }
    }

    #[must_use]
    pub const fn or(self, fallback: Self) -> Self {
        match self {
            Self::Unset => fallback,
            other => other,
        }
    }

    /// Concrete worker count
    pub fn workers(self) -> usize {
        match self {
            Self::Unset | Self::Sequential => 1,
            Self::Max => std::thread::available_parallelism().map_or(1, NonZeroUsize::get),
            Self::Fixed(n) => n.get(),
        }
    }
}

/// Execution preferences, declared by a signal or supplied by a caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecutionConfig {
    pub batch_size: BatchSize,
    pub parallelism: Parallelism,
    /// The signal holds a resource that must never be invoked concurrently
    #[serde(default)]
    pub exclusive: bool,
}

impl ExecutionConfig {
    pub const fn new(batch_size: BatchSize, parallelism: Parallelism) -> Self {
        Self {
            batch_size,
            parallelism,
            exclusive: false,
        }
    }

    /// Mark the signal as holding an exclusive, device-bound resource
    #[must_use]
    pub const fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }

    /// Resolve the three layers into a concrete plan
    pub fn resolve(overrides: &Self, declared: &Self, defaults: &Self) -> ResolvedExecution {
        let batch_size = overrides
            .batch_size
            .or(declared.batch_size)
            .or(defaults.batch_size);

        let workers = if declared.exclusive {
            1
        } else {
            overrides
                .parallelism
                .or(declared.parallelism)
                .or(defaults.parallelism)
                .workers()
        };

        ResolvedExecution {
            chunk: match batch_size {
                BatchSize::Fixed(n) => Some(n),
                BatchSize::Unset | BatchSize::Unchunked => None,
            },
            workers,
        }
    }
}

/// Concrete batching plan for one call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedExecution {
    /// Chunk length, `None` for a single batch
    pub chunk: Option<NonZeroUsize>,
    /// Number of batches computed concurrently
    pub workers: usize,
}

impl ResolvedExecution {
    /// Partition `0..total` into batch ranges without reordering or dropping
    pub fn batches(&self, total: usize) -> Vec<Range<usize>> {
        if total == 0 {
            return Vec::new();
        }
        let chunk = self.chunk.map_or(total, NonZeroUsize::get);
        (0..total)
            .step_by(chunk)
            .map(|start| start..(start + chunk).min(total))
            .collect()
    }
}
