//! # Message Receiving
//!
//! Defines the receiving side of a mailbox.

use std::sync::Arc;
use tokio::sync::mpsc;

/// The single receiving end of a mailbox.
///
/// When dropped, every `Address` pointing at it starts reporting `Closed`.
pub struct Mailbox<M> {
    name: Arc<str>,
    receiver: mpsc::Receiver<M>,
}

impl<M> Mailbox<M> {
    pub(crate) fn new(name: Arc<str>, receiver: mpsc::Receiver<M>) -> Self {
        Self { name, receiver }
    }

    /// Mailbox name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Receive the next message.
    ///
    /// # Returns
    ///
    /// - `Some(message)` - The next message
    /// - `None` - Every address was dropped and the queue is drained
    pub async fn recv(&mut self) -> Option<M> {
        self.receiver.recv().await
    }

    /// Receive a message if one is already queued.
    pub fn try_recv(&mut self) -> Option<M> {
        self.receiver.try_recv().ok()
    }
}
