//! # Message Sending
//!
//! Defines the sending side of a mailbox.

use crate::subscriber::Mailbox;
use crate::DeliveryError;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Anything that can be handed a message of type `M`.
///
/// This is the interface a subsystem depends on when it has to reply to
/// "whoever asked", without knowing what kind of actor that is.
pub trait Recipient<M>: Send + Sync {
    /// Deliver a message without waiting for it to be processed.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError` if the recipient can no longer accept messages.
    fn tell(&self, message: M) -> Result<(), DeliveryError>;

    /// Human-readable name of the recipient, used in logs.
    fn name(&self) -> &str;
}

/// Create a bounded mailbox and the first address pointing at it.
#[must_use]
pub fn mailbox<M>(name: impl Into<String>, capacity: usize) -> (Address<M>, Mailbox<M>) {
    let name: Arc<str> = Arc::from(name.into());
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    let address = Address {
        name: Arc::clone(&name),
        sender,
        capacity: capacity.max(1),
    };
    debug!(mailbox = %name, capacity = capacity, "Mailbox created");
    (address, Mailbox::new(name, receiver))
}

/// Cloneable handle for sending messages to one mailbox.
pub struct Address<M> {
    name: Arc<str>,
    sender: mpsc::Sender<M>,
    capacity: usize,
}

impl<M> Clone for Address<M> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            sender: self.sender.clone(),
            capacity: self.capacity,
        }
    }
}

impl<M> fmt::Debug for Address<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Address")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl<M: Send> Address<M> {
    /// Mailbox name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Enqueue a message, failing immediately if the mailbox is full or gone.
    pub fn tell(&self, message: M) -> Result<(), DeliveryError> {
        match self.sender.try_send(message) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(
                    mailbox = %self.name,
                    capacity = self.capacity,
                    "Mailbox full, message dropped"
                );
                Err(DeliveryError::Full {
                    name: self.name.to_string(),
                    capacity: self.capacity,
                })
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(DeliveryError::Closed {
                name: self.name.to_string(),
            }),
        }
    }
}

impl<M: Send> Recipient<M> for Address<M> {
    fn tell(&self, message: M) -> Result<(), DeliveryError> {
        Address::tell(self, message)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
