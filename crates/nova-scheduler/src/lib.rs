//! Background execution for Nova.
//!
//! Analysis passes run on a Rayon pool and stop cooperatively through a [`CancellationToken`].
//! [`BlockingTask`] delivers the result to async callers.

mod scheduler;
mod task;

pub use scheduler::{Scheduler, SchedulerConfig};
pub use task::BlockingTask;
pub use tokio_util::sync::CancellationToken;

use thiserror::Error;

/// A job observed cancellation and stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cancelled")]
pub struct Cancelled;

impl Cancelled {
    pub fn check(token: &CancellationToken) -> Result<(), Cancelled> {
        if token.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("task was cancelled")]
    Cancelled,
    #[error("task panicked")]
    Panicked,
}

impl From<Cancelled> for TaskError {
    fn from(_: Cancelled) -> Self {
        TaskError::Cancelled
    }
}
