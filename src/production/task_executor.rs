//! Tokio-backed task executor
//!
//! Work runs on the runtime's blocking pool. Completions either run right
//! there, or are queued for the interactive thread, which drains them with
//! [`InteractiveQueue`].

use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::traits::{Job, TaskExecutor};

pub struct TokioTaskExecutor {
    handle: Handle,
    completions: Option<mpsc::UnboundedSender<Job>>,
}

impl TokioTaskExecutor {
    /// Completions run on the blocking pool thread that did the work
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            completions: None,
        }
    }

    /// Completions are queued for the returned [`InteractiveQueue`]
    pub fn with_interactive_queue(handle: Handle) -> (Self, InteractiveQueue) {
        let (tx, rx) = mpsc::unbounded_channel();
        let executor = Self {
            handle,
            completions: Some(tx),
        };
        (executor, InteractiveQueue { rx })
    }
}

impl TaskExecutor for TokioTaskExecutor {
    fn execute(&self, job: Job) {
        // Detached: results travel through the job's own completion handler
        drop(self.handle.spawn_blocking(job));
    }

    fn deliver(&self, job: Job) {
        match &self.completions {
            Some(tx) => {
                if let Err(mpsc::error::SendError(job)) = tx.send(job) {
                    tracing::debug!("Interactive queue closed, running completion in place");
                    job();
                }
            }
            None => job(),
        }
    }
}

/// Completion handlers waiting for the interactive thread
pub struct InteractiveQueue {
    rx: mpsc::UnboundedReceiver<Job>,
}

impl InteractiveQueue {
    /// Run every completion that is ready now. Returns how many ran.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            job();
            ran += 1;
        }
        ran
    }

    /// Wait for the next completion and run it.
    /// Returns `false` once every executor feeding this queue is gone.
    pub async fn run_next(&mut self) -> bool {
        match self.rx.recv().await {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }
}
