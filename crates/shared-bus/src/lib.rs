//! # Shared Bus - Actor Mailboxes for Node-Local Messaging
//!
//! Every message-capable handler on a node (an "actor") owns a [`Mailbox`]
//! and hands out cloneable [`Address`]es. Senders never hold a reference to
//! the actor itself, only to its address.
//!
//! ```text
//! ┌──────────────┐   tell(msg)    ┌──────────────┐   recv()   ┌──────────────┐
//! │   Sender A   │ ─────────────→ │  Address<M>  │ ─────────→ │  Mailbox<M>  │
//! └──────────────┘                │  (cloneable) │            │  (one owner) │
//! ┌──────────────┐   tell(msg)    │              │            └──────────────┘
//! │   Sender B   │ ─────────────→ │              │
//! └──────────────┘                └──────────────┘
//! ```
//!
//! ## Delivery Semantics
//!
//! - `tell` never blocks: a full mailbox is reported as [`DeliveryError::Full`]
//! - A dropped mailbox is reported as [`DeliveryError::Closed`]
//! - Messages from one sender arrive in the order they were told
//!
//! Any type that can receive messages implements [`Recipient`], which is the
//! only contract other subsystems depend on.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod publisher;
pub mod subscriber;

use thiserror::Error;

// Re-export main types
pub use publisher::{mailbox, Address, Recipient};
pub use subscriber::Mailbox;

/// Maximum messages to buffer per mailbox before `tell` reports `Full`.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 1000;

/// Errors from message delivery.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The receiving mailbox was dropped.
    #[error("Mailbox {name} is closed")]
    Closed { name: String },

    /// The receiving mailbox has no free slot.
    #[error("Mailbox {name} is full (capacity: {capacity})")]
    Full { name: String, capacity: usize },
}
