//! Bounded emission channel between source tasks and the caller

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::AbortHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::warn;

use crate::domain::DomainError;

/// Producer half handed to the task that queries sources
///
/// Emission never waits for the consumer. Once `capacity` items are
/// pending the producer is told to stop and the stream ends with
/// [`DomainError::BufferOverflow`].
#[derive(Debug)]
pub struct Emitter<T> {
    tx: mpsc::Sender<Result<T, DomainError>>,
    overflowed: Arc<AtomicBool>,
    capacity: usize,
}

impl<T> Emitter<T> {
    /// Queues an item; returns false when the producer must stop
    pub fn emit(&self, item: Result<T, DomainError>) -> bool {
        match self.tx.try_send(item) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(capacity = self.capacity, "Emission buffer full, failing stream");
                self.overflowed.store(true, Ordering::SeqCst);
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Whether the consumer dropped its stream
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Asynchronous sequence of results produced by an orchestrator call
///
/// Dropping the stream aborts the task feeding it.
#[derive(Debug)]
pub struct EntityStream<T> {
    inner: ReceiverStream<Result<T, DomainError>>,
    overflowed: Arc<AtomicBool>,
    overflow_reported: bool,
    capacity: usize,
    task: Option<AbortHandle>,
}

/// Creates a connected emitter/stream pair holding at most `capacity` pending items
pub fn channel<T>(capacity: usize) -> (Emitter<T>, EntityStream<T>) {
    let capacity = capacity.max(1);
    let (tx, rx) = mpsc::channel(capacity);
    let overflowed = Arc::new(AtomicBool::new(false));

    let emitter = Emitter {
        tx,
        overflowed: Arc::clone(&overflowed),
        capacity,
    };
    let stream = EntityStream {
        inner: ReceiverStream::new(rx),
        overflowed,
        overflow_reported: false,
        capacity,
        task: None,
    };

    (emitter, stream)
}

impl<T> EntityStream<T> {
    pub(crate) fn attach(&mut self, task: AbortHandle) {
        self.task = Some(task);
    }
}

impl<T> Stream for EntityStream<T> {
    type Item = Result<T, DomainError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(None)
                if this.overflowed.load(Ordering::SeqCst) && !this.overflow_reported =>
            {
                this.overflow_reported = true;
                Poll::Ready(Some(Err(DomainError::buffer_overflow(this.capacity))))
            }
            other => other,
        }
    }
}

impl<T> Drop for EntityStream<T> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
