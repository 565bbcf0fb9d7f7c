//! Concurrency gate — serializes bursty notifications through one consumer.
//!
//! A [`Gate`] admits items from any number of producer tasks into a bounded
//! FIFO queue; the matching [`GateQueue`] is held by exactly one consumer.
//! Admission never drops: when the queue is full, `admit` waits until the
//! consumer has made room. Items come out in arrival order, so work hanging
//! off the queue runs strictly one at a time even under bursts.

use thiserror::Error;
use tokio::sync::mpsc;

/// Error returned by [`Gate::admit`] when the consumer side is gone.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Gate closed: consumer dropped")]
pub struct GateClosed;

/// Producer half of a gate. Cheap to clone; every clone feeds the same queue.
pub struct Gate<T> {
    tx: mpsc::Sender<T>,
}

impl<T> Clone for Gate<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

/// Consumer half of a gate. Not cloneable; one consumer per gate.
pub struct GateQueue<T> {
    rx: mpsc::Receiver<T>,
}

impl<T> Gate<T> {
    /// Create a gate with the given queue capacity (minimum 1).
    pub fn bounded(capacity: usize) -> (Gate<T>, GateQueue<T>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Gate { tx }, GateQueue { rx })
    }

    /// Enqueue an item, waiting for room if the queue is full.
    pub async fn admit(&self, item: T) -> Result<(), GateClosed> {
        self.tx.send(item).await.map_err(|_| GateClosed)
    }
}

impl<T> GateQueue<T> {
    /// Take the next item in arrival order. `None` once every producer is
    /// dropped and the queue is drained.
    pub async fn next(&mut self) -> Option<T> {
        self.rx.recv().await
    }
}
