//! Execution context for orchestrator calls

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::domain::DomainError;

use super::stream::{self, EntityStream, Emitter};

/// Default number of pending stream items before a stream fails
pub const DEFAULT_BUFFER_CAPACITY: usize = 10_000;

/// Runs source work on a runtime and tracks detached background tasks
#[derive(Debug, Clone)]
pub struct Dispatcher {
    runtime: Option<Handle>,
    buffer_capacity: usize,
    background: BackgroundTasks,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(None, DEFAULT_BUFFER_CAPACITY)
    }
}

impl Dispatcher {
    /// Uses `runtime` when given, otherwise the runtime current at call time
    pub fn new(runtime: Option<Handle>, buffer_capacity: usize) -> Self {
        Self {
            runtime,
            buffer_capacity: buffer_capacity.max(1),
            background: BackgroundTasks::default(),
        }
    }

    pub fn buffer_capacity(&self) -> usize {
        self.buffer_capacity
    }

    fn handle(&self) -> Result<Handle, DomainError> {
        match &self.runtime {
            Some(handle) => Ok(handle.clone()),
            None => Handle::try_current()
                .map_err(|e| DomainError::internal(format!("No async runtime available: {}", e))),
        }
    }

    /// Runs `future` on the runtime and waits for its output
    ///
    /// Dropping the returned future aborts the spawned task.
    pub async fn run<T, F>(&self, future: F) -> Result<T, DomainError>
    where
        F: Future<Output = Result<T, DomainError>> + Send + 'static,
        T: Send + 'static,
    {
        let task = AbortOnDrop(self.handle()?.spawn(future));
        task.join().await
    }

    /// Starts `producer` on the runtime, feeding the returned stream
    pub fn stream<T, F, Fut>(&self, producer: F) -> Result<EntityStream<T>, DomainError>
    where
        F: FnOnce(Emitter<T>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
        T: Send + 'static,
    {
        let handle = self.handle()?;
        let (emitter, mut stream) = stream::channel(self.buffer_capacity);
        let task = handle.spawn(producer(emitter));
        stream.attach(task.abort_handle());
        Ok(stream)
    }

    /// Starts `future` without waiting for it
    ///
    /// Fails only when no runtime is available to start the task.
    pub fn detach<F>(&self, future: F) -> Result<(), DomainError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = self.handle()?;
        self.background.spawn(&handle, future);
        Ok(())
    }

    /// Waits until every detached task has finished
    pub async fn settle(&self) {
        self.background.wait_idle().await;
    }

    /// Number of detached tasks still running
    pub fn pending_background_tasks(&self) -> usize {
        self.background.pending()
    }
}

struct AbortOnDrop<T>(JoinHandle<Result<T, DomainError>>);

impl<T> AbortOnDrop<T> {
    async fn join(mut self) -> Result<T, DomainError> {
        match (&mut self.0).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => {
                Err(DomainError::internal(format!("Source task panicked: {}", e)))
            }
            Err(e) => Err(DomainError::internal(format!("Source task cancelled: {}", e))),
        }
    }
}

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Supervisor for fire-and-forget tasks that outlive the call spawning them
#[derive(Debug, Clone, Default)]
struct BackgroundTasks {
    inner: Arc<BackgroundState>,
}

#[derive(Debug, Default)]
struct BackgroundState {
    pending: AtomicUsize,
    idle: Notify,
}

/// Decrements the pending count even when the task panics or is aborted
struct PendingGuard(Arc<BackgroundState>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.0.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

impl BackgroundTasks {
    fn spawn<F>(&self, handle: &Handle, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.inner.pending.fetch_add(1, Ordering::SeqCst);
        let guard = PendingGuard(Arc::clone(&self.inner));

        handle.spawn(async move {
            let _guard = guard;
            future.await;
        });
    }

    fn pending(&self) -> usize {
        self.inner.pending.load(Ordering::SeqCst)
    }

    async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.pending() == 0 {
                return;
            }

            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    #[tokio::test]
    async fn test_run_returns_task_output() {
        let dispatcher = Dispatcher::default();

        let value = dispatcher.run(async { Ok(21 * 2) }).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_run_reports_panics_as_internal_errors() {
        let dispatcher = Dispatcher::default();

        let result: Result<(), DomainError> = dispatcher
            .run(async {
                let fail = true;
                if fail {
                    panic!("source blew up");
                }
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(DomainError::Internal { .. })));
    }

    #[test]
    fn test_no_runtime_is_an_internal_error() {
        let dispatcher = Dispatcher::default();

        let result = dispatcher.detach(async {});
        assert!(matches!(result, Err(DomainError::Internal { .. })));
    }

    #[tokio::test]
    async fn test_settle_waits_for_detached_tasks() {
        let dispatcher = Dispatcher::default();
        let done = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&done);
        dispatcher
            .detach(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                flag.store(true, Ordering::SeqCst);
            })
            .unwrap();

        assert_eq!(dispatcher.pending_background_tasks(), 1);
        dispatcher.settle().await;

        assert!(done.load(Ordering::SeqCst));
        assert_eq!(dispatcher.pending_background_tasks(), 0);
    }

    #[tokio::test]
    async fn test_settle_survives_panicking_task() {
        let dispatcher = Dispatcher::default();

        dispatcher
            .detach(async {
                let fail = true;
                if fail {
                    panic!("cache write failed");
                }
            })
            .unwrap();
        dispatcher.settle().await;

        assert_eq!(dispatcher.pending_background_tasks(), 0);
    }

    #[tokio::test]
    async fn test_stream_delivers_producer_items() {
        let dispatcher = Dispatcher::new(None, 16);

        let stream = dispatcher
            .stream(|emitter| async move {
                for i in 0..3 {
                    emitter.emit(Ok(i));
                }
            })
            .unwrap();

        let items: Vec<i32> = stream.map(|r| r.unwrap()).collect().await;
        assert_eq!(items, vec![0, 1, 2]);
    }
}
