//! Communication with the step-implementation runner
//!
//! The executor only sees the [`Runner`] trait: one message in, one
//! execution result out. [`RunnerClient`] implements it against a runner
//! process; tests and the manual console provide their own implementations.

pub mod client;
pub mod protocol;
pub mod transport;

use async_trait::async_trait;

use crate::common::Result;

pub use client::{ProcessRunnerFactory, RunnerClient};
pub use protocol::{ExecutionResult, Message};

/// Something that can process runner messages
///
/// Calls block until the runner answers. There are no retries at this
/// layer; an `Err` means the message never got a proper answer.
#[async_trait]
pub trait Runner: Send {
    async fn execute(&mut self, message: Message) -> Result<ExecutionResult>;

    /// Release the connection; the default does nothing
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Creates one runner connection per stream
#[async_trait]
pub trait RunnerFactory: Send + Sync {
    async fn create(&self, stream: usize) -> Result<Box<dyn Runner>>;
}

#[async_trait]
impl<R: Runner + ?Sized> Runner for Box<R> {
    async fn execute(&mut self, message: Message) -> Result<ExecutionResult> {
        (**self).execute(message).await
    }

    async fn close(&mut self) -> Result<()> {
        (**self).close().await
    }
}
