use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use rayon::ThreadPool;
use tokio::sync::oneshot;

use nova_core::panic_payload_to_str;

use crate::{task::BlockingTask, CancellationToken, Cancelled, TaskError};

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Worker threads for background analysis (usage scans and verification).
    pub background_threads: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        // Hosts create one engine per workspace and tests one per case; two workers keep a
        // long scan from starving the next pass without oversubscribing small machines.
        let available = std::thread::available_parallelism().map_or(1, |n| n.get());
        Self {
            background_threads: available.clamp(1, 2),
        }
    }
}

/// Runs cancellable jobs off the model-mutation thread.
#[derive(Clone)]
pub struct Scheduler {
    pool: Arc<WorkerPool>,
}

enum WorkerPool {
    Rayon(ThreadPool),
    /// No thread could be started; jobs run on the caller.
    Inline,
}

impl WorkerPool {
    fn build(name: &'static str, threads: usize) -> Self {
        let mut threads = threads.max(1);
        loop {
            let built = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(move |idx| format!("{name}-{idx}"))
                .build();
            match built {
                Ok(pool) => return WorkerPool::Rayon(pool),
                // Thread limits (RLIMIT_NPROC, EAGAIN) in sandboxes: retry smaller.
                Err(err) if threads > 1 => {
                    tracing::warn!(target: "nova.scheduler", threads, error = %err, "shrinking worker pool");
                    threads /= 2;
                }
                Err(err) => {
                    tracing::warn!(target: "nova.scheduler", error = %err, "running jobs inline");
                    return WorkerPool::Inline;
                }
            }
        }
    }

    fn spawn(&self, job: impl FnOnce() + Send + 'static) {
        match self {
            WorkerPool::Rayon(pool) => pool.spawn(job),
            WorkerPool::Inline => job(),
        }
    }
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            pool: Arc::new(WorkerPool::build("nova-background", config.background_threads)),
        }
    }

    pub fn spawn_background<T, F>(&self, f: F) -> BlockingTask<T>
    where
        T: Send + 'static,
        F: FnOnce(CancellationToken) -> Result<T, Cancelled> + Send + 'static,
    {
        self.spawn_background_with_token(CancellationToken::new(), f)
    }

    /// Runs `f` on a worker unless `token` is already cancelled. A panic in `f` resolves the
    /// task with [`TaskError::Panicked`].
    pub fn spawn_background_with_token<T, F>(
        &self,
        token: CancellationToken,
        f: F,
    ) -> BlockingTask<T>
    where
        T: Send + 'static,
        F: FnOnce(CancellationToken) -> Result<T, Cancelled> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        if token.is_cancelled() {
            let _ = tx.send(Err(TaskError::Cancelled));
            return BlockingTask::new(token, rx);
        }

        let job_token = token.clone();
        self.pool.spawn(move || {
            let result = match catch_unwind(AssertUnwindSafe(|| f(job_token))) {
                Ok(result) => result.map_err(TaskError::from),
                Err(panic) => {
                    tracing::error!(
                        target: "nova.scheduler",
                        panic = %panic_payload_to_str(&*panic),
                        "background task panicked"
                    );
                    Err(TaskError::Panicked)
                }
            };
            // The receiver is gone when nobody awaits the task.
            let _ = tx.send(result);
        });
        BlockingTask::new(token, rx)
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}
