use tokio::sync::oneshot;

use crate::{CancellationToken, TaskError};

/// A job submitted to the [`Scheduler`](crate::Scheduler).
pub struct BlockingTask<T> {
    token: CancellationToken,
    rx: oneshot::Receiver<Result<T, TaskError>>,
}

impl<T> BlockingTask<T> {
    pub(crate) fn new(
        token: CancellationToken,
        rx: oneshot::Receiver<Result<T, TaskError>>,
    ) -> Self {
        Self { token, rx }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves with [`TaskError::Cancelled`] as soon as the token is cancelled, even if the
    /// job has already produced a value.
    pub async fn join(self) -> Result<T, TaskError> {
        let Self { token, rx } = self;
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(TaskError::Cancelled),
            result = rx => result.unwrap_or(Err(TaskError::Panicked)),
        }
    }
}
