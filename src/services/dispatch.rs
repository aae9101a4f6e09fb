//! Choice between in-process and remote execution for a call.

use futures::future;
use futures::stream::{Stream, StreamExt};
use std::fmt;
use tracing::info;

use super::local_executor::{ItemStream, LocalExecutor};
use crate::domain::errors::SignalError;
use crate::domain::models::{Document, Item};
use crate::domain::ports::Signal;
use crate::infrastructure::remote::RemoteClient;

/// Where a call is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionTarget {
    #[default]
    Local,
    Remote,
}

impl fmt::Display for ExecutionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Remote => f.write_str("remote"),
        }
    }
}

/// Commits each call wholly to one execution path.
///
/// There is no per-document fallback: a remote call that fails part-way is
/// not finished locally.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    local: LocalExecutor,
    remote: Option<RemoteClient>,
}

impl Dispatcher {
    pub const fn new(local: LocalExecutor, remote: Option<RemoteClient>) -> Self {
        Self { local, remote }
    }

    pub const fn local(&self) -> &LocalExecutor {
        &self.local
    }

    pub const fn remote(&self) -> Option<&RemoteClient> {
        self.remote.as_ref()
    }

    /// Compute `signal` over `documents` on `target`.
    ///
    /// Remote execution fails before any request is sent when the signal has
    /// no remote operation or no client is configured. Items from either path
    /// are checked against the signal's schema.
    pub async fn compute<'a>(
        &self,
        signal: &'a mut dyn Signal,
        documents: &'a [Document],
        target: ExecutionTarget,
    ) -> Result<ItemStream<'a>, SignalError> {
        info!(
            signal = signal.name(),
            documents = documents.len(),
            %target,
            "Dispatching signal"
        );

        match target {
            ExecutionTarget::Local => self.local.run(signal, documents),
            ExecutionTarget::Remote => self.compute_remote(&*signal, documents).await,
        }
    }

    async fn compute_remote<'a>(
        &self,
        signal: &dyn Signal,
        documents: &[Document],
    ) -> Result<ItemStream<'a>, SignalError> {
        let capability = signal.capability();
        let operation = capability
            .remote_operation()
            .ok_or_else(|| SignalError::RemoteNotSupported(signal.name().to_string()))?;
        let client = self.remote.as_ref().ok_or(SignalError::RemoteUnavailable)?;

        let lines = client
            .call(operation, documents, &signal.remote_options())
            .await?;

        let name = signal.name().to_string();
        let fields = signal.fields();
        let checked = lines
            .enumerate()
            .map(move |(index, line)| -> Result<Item, SignalError> {
                let item = line?;
                fields
                    .check(&item)
                    .map_err(|violation| SignalError::SchemaMismatch {
                        signal: name.clone(),
                        index,
                        violation,
                    })?;
                Ok(item)
            });

        Ok(until_first_error(checked).boxed())
    }
}

/// Pass elements through up to and including the first error
fn until_first_error<S>(stream: S) -> impl Stream<Item = Result<Item, SignalError>>
where
    S: Stream<Item = Result<Item, SignalError>>,
{
    stream.scan(false, |failed, result| {
        if *failed {
            return future::ready(None);
        }
        *failed = result.is_err();
        future::ready(Some(result))
    })
}
