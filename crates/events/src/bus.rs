//! Post-commit event distribution (pub/sub mechanics only).
//!
//! The ledger publishes committed material events here so read models (the
//! low-stock report) can follow stock levels without touching the store.
//!
//! The bus is not a source of truth: the store is. A subscriber that misses a
//! message can be rebuilt from stored materials; delivery is best-effort and
//! subscribers must tolerate duplicates.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvError, RecvTimeoutError, TryRecvError};
use std::time::Duration;

/// A subscription to a bus. Every subscription receives its own copy of each
/// message published after it was created.
///
/// Intended for a single consuming thread (see the projection worker).
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// Event bus (pub/sub abstraction).
///
/// ```text
/// StockLedger (commit) → EventBus (publish) → subscribers
///                                              └─ LowStockProjection
/// ```
///
/// `publish` may fail; the ledger logs the failure and keeps the committed
/// result, since the transaction has already been made durable.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
