//! Bounded-worker execution pool for model calls.
//!
//! Request handlers never call into model code directly. They submit a
//! closure to the [`Executor`], which runs it on a dedicated blocking
//! thread while the handler suspends, and await the result. A semaphore
//! sized at the configured pool capacity enforces the hard worker cap: with
//! capacity 1 every model call is serialized (the right default for
//! non-reentrant scientific code); with capacity > 1 calls run in true
//! parallel threads. Oversubscription queues FIFO on the semaphore rather
//! than dropping or timing out a request.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Semaphore;
use umbridge_protocol::ProtocolError;

/// A bounded pool of worker threads that owns all calls into model code.
#[derive(Clone)]
pub struct Executor {
    permits: Arc<Semaphore>,
}

impl Executor {
    /// Creates an executor with the given worker capacity. Capacity 0 is
    /// treated as 1 — a server with no workers could never complete a call.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(capacity.max(1))),
        }
    }

    /// Runs `f` on a worker thread, suspending the caller until it
    /// completes. A model panic is caught and surfaced as `InvalidOutput`
    /// rather than taking down the connection or the server.
    pub async fn submit<F, T>(&self, f: F) -> Result<T, ProtocolError>
    where
        F: FnOnce() -> Result<T, ProtocolError> + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .expect("executor semaphore is never closed");

        let join = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            std::panic::catch_unwind(AssertUnwindSafe(f))
        })
        .await;

        match join {
            Ok(Ok(result)) => result,
            Ok(Err(panic)) => Err(ProtocolError::invalid_output(format!(
                "model implementation panicked: {}",
                panic_message(&panic)
            ))),
            Err(join_err) => Err(ProtocolError::invalid_output(format!(
                "model worker task failed to complete: {join_err}"
            ))),
        }
    }
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn runs_closure_and_returns_its_result() {
        let executor = Executor::new(1);
        let result = executor.submit(|| Ok::<_, ProtocolError>(42)).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn single_worker_serializes_calls() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let executor = Executor::new(1);
        let concurrent = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let executor = executor.clone();
            let concurrent = concurrent.clone();
            let max_seen = max_seen.clone();
            handles.push(tokio::spawn(async move {
                executor
                    .submit(move || {
                        let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        std::thread::sleep(std::time::Duration::from_millis(5));
                        concurrent.fetch_sub(1, Ordering::SeqCst);
                        Ok::<_, ProtocolError>(())
                    })
                    .await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn catches_model_panic_as_invalid_output() {
        let executor = Executor::new(1);
        let result = executor
            .submit(|| -> Result<(), ProtocolError> { panic!("boom") })
            .await;
        let err = result.unwrap_err();
        assert_eq!(err.kind, umbridge_protocol::ErrorKind::InvalidOutput);
        assert!(err.message.contains("boom"));
    }
}
