//! Background tasks with success/failure completion handlers

use std::fmt::Display;
use std::sync::Arc;

use crate::traits::TaskExecutor;

type Work<T, E> = Box<dyn FnOnce() -> Result<T, E> + Send + 'static>;
type Handler<V> = Box<dyn FnOnce(V) + Send + 'static>;

/// A unit of fallible work plus what to do with its outcome.
///
/// Successes are handed to [`TaskExecutor::deliver`]; failures never reach
/// the success handler. A failure without its own handler is logged.
pub struct BackgroundTask<T, E> {
    name: &'static str,
    work: Work<T, E>,
    on_success: Option<Handler<T>>,
    on_failure: Option<Handler<E>>,
}

impl<T, E> BackgroundTask<T, E>
where
    T: Send + 'static,
    E: Display + Send + 'static,
{
    pub fn wrap(work: impl FnOnce() -> Result<T, E> + Send + 'static) -> Self {
        Self {
            name: "background task",
            work: Box::new(work),
            on_success: None,
            on_failure: None,
        }
    }

    /// Name used when logging failures
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn on_success(mut self, handler: impl FnOnce(T) + Send + 'static) -> Self {
        self.on_success = Some(Box::new(handler));
        self
    }

    pub fn on_failure(mut self, handler: impl FnOnce(E) + Send + 'static) -> Self {
        self.on_failure = Some(Box::new(handler));
        self
    }

    pub fn execute_with(self, executor: Arc<dyn TaskExecutor>) {
        let Self {
            name,
            work,
            on_success,
            on_failure,
        } = self;
        let deliverer = Arc::clone(&executor);

        executor.execute(Box::new(move || match work() {
            Ok(value) => {
                if let Some(handler) = on_success {
                    deliverer.deliver(Box::new(move || handler(value)));
                }
            }
            Err(e) => match on_failure {
                Some(handler) => handler(e),
                None => tracing::error!(task = name, error = %e, "Background task failed"),
            },
        }));
    }
}
