use std::sync::Mutex;

use tokio::sync::mpsc;

use crate::error::HostError;

/// Abnormal stream completion, surfaced to the consumer after any items
/// that were enqueued before the failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct StreamError(pub String);

/// Creates the producer/consumer halves of a single-producer,
/// single-consumer stream.
///
/// The buffer is unbounded: producers never block, and a slow consumer
/// grows the queue instead of exerting backpressure. A production
/// hardening would add a high-water mark and a backpressure signal.
pub fn stream_channel<T>() -> (StreamProducer<T>, StreamConsumer<T>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (
        StreamProducer {
            sender: Mutex::new(Some(sender)),
        },
        StreamConsumer { receiver },
    )
}

/// Write half of a stream. `enqueue` is legal from creation until
/// `finish` or `fail`; both terminators are idempotent.
#[derive(Debug)]
pub struct StreamProducer<T> {
    sender: Mutex<Option<mpsc::UnboundedSender<Result<T, StreamError>>>>,
}

impl<T> StreamProducer<T> {
    pub fn enqueue(&self, item: T) -> Result<(), HostError> {
        let guard = self.sender.lock().expect("stream producer lock poisoned");
        match guard.as_ref() {
            Some(sender) => sender.send(Ok(item)).map_err(|_| HostError::StreamClosed),
            None => Err(HostError::StreamClosed),
        }
    }

    /// Marks graceful completion. The consumer still drains anything
    /// already enqueued.
    pub fn finish(&self) {
        self.sender
            .lock()
            .expect("stream producer lock poisoned")
            .take();
    }

    /// Marks abnormal completion. Items enqueued earlier are still
    /// delivered; the consumer then observes the stored error.
    pub fn fail(&self, reason: impl Into<String>) {
        let mut guard = self.sender.lock().expect("stream producer lock poisoned");
        if let Some(sender) = guard.take() {
            let _ = sender.send(Err(StreamError(reason.into())));
        }
    }

    pub fn is_finished(&self) -> bool {
        self.sender
            .lock()
            .expect("stream producer lock poisoned")
            .is_none()
    }
}

/// Read half of a stream: a lazy, single-pass, non-restartable sequence.
/// Ownership of this half is exclusive to one logical task.
#[derive(Debug)]
pub struct StreamConsumer<T> {
    receiver: mpsc::UnboundedReceiver<Result<T, StreamError>>,
}

impl<T> StreamConsumer<T> {
    /// Yields the next item in FIFO order. `None` is graceful completion;
    /// `Some(Err(_))` is the stored failure and is the final item.
    pub async fn next(&mut self) -> Option<Result<T, StreamError>> {
        self.receiver.recv().await
    }
}
