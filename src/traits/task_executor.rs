//! Background execution capability

/// Unit of work handed to an executor
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs work off the calling thread
///
/// Production: tokio blocking pool
/// Testing: inline or manually drained queues
pub trait TaskExecutor: Send + Sync {
    /// Run `job` in the background
    fn execute(&self, job: Job);

    /// Run a completion handler on the thread completions belong to.
    /// Defaults to running it right away on the current thread.
    fn deliver(&self, job: Job) {
        job()
    }
}
