//! The capability the hub uses to address a connection.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::chat::Message;

/// Unique key of a registered connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(Uuid);

impl ClientId {
    /// Generate a fresh id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the hub sees of a connection.
///
/// The hub never touches transports; it only hands messages to `deliver`,
/// which must return without blocking.
pub trait HubClient: Send + Sync {
    /// Stable key for the connection set.
    fn id(&self) -> ClientId;

    /// Display name, fixed for the lifetime of the connection.
    fn identity(&self) -> &str;

    /// Queue a message for this peer.
    ///
    /// Never fails observably. A peer that cannot keep up is disconnected
    /// instead.
    fn deliver(&self, message: Message);

    /// Stop accepting messages. Called once when the hub shuts down; the
    /// peer is disconnected after draining what was already queued.
    fn close(&self) {}
}

/// Result of pushing onto an [`OutboundQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The message was queued.
    Queued,
    /// The queue was full; it is now closed and the message was dropped.
    Overflowed,
    /// The queue was already closed; the message was dropped.
    Closed,
}

/// Bounded FIFO of messages waiting for a connection's outbound pump.
///
/// Closing drops the only sender, so the pump drains whatever was already
/// queued, then sees the end of the channel. The sender slot is taken under
/// a mutex, so closing happens exactly once even when the hub and the
/// connection race to close it.
pub struct OutboundQueue {
    sender: Mutex<Option<mpsc::Sender<Message>>>,
}

impl OutboundQueue {
    /// Create a queue and the receiver its pump drains.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Message>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let queue = Self {
            sender: Mutex::new(Some(sender)),
        };
        (queue, receiver)
    }

    fn slot(&self) -> MutexGuard<'_, Option<mpsc::Sender<Message>>> {
        self.sender.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueue without waiting. A full queue is closed for good.
    pub fn push(&self, message: Message) -> Delivery {
        let mut slot = self.slot();
        let Some(sender) = slot.as_ref() else {
            return Delivery::Closed;
        };

        match sender.try_send(message) {
            Ok(()) => Delivery::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => {
                *slot = None;
                Delivery::Overflowed
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                *slot = None;
                Delivery::Closed
            }
        }
    }

    /// Close the queue.
    ///
    /// Returns true if this call closed it, false if it was already closed.
    pub fn close(&self) -> bool {
        self.slot().take().is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.slot().is_none()
    }
}
