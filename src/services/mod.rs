//! Signal execution services: in-process batching, composite merge and
//! local/remote dispatch.

pub mod composite;
pub mod dispatch;
pub mod local_executor;

pub use composite::CompositeSignal;
pub use dispatch::{Dispatcher, ExecutionTarget};
pub use local_executor::{ItemStream, LocalExecutor};
