//! Driving ports: how the rest of the node uses the relay.

use async_trait::async_trait;
use shared_bus::Recipient;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::{ParcelMessage, ParcelNotification, Payload};
use crate::error::ParcelError;

/// Request to move a payload out of band to `recipient`.
pub struct RelayRequest {
    pub payload: Payload,
    /// Who gets the notification (or envelope)
    pub recipient: Arc<dyn Recipient<ParcelMessage>>,
    /// Store timeout for this parcel; `None` uses the configured default
    pub ttl: Option<Duration>,
}

impl RelayRequest {
    pub fn new<T: Any + Send + Sync>(
        value: T,
        recipient: Arc<dyn Recipient<ParcelMessage>>,
    ) -> Self {
        Self::from_payload(Payload::new(value), recipient)
    }

    pub fn from_payload(payload: Payload, recipient: Arc<dyn Recipient<ParcelMessage>>) -> Self {
        Self {
            payload,
            recipient,
            ttl: None,
        }
    }

    /// Override the store timeout for this parcel.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

impl fmt::Debug for RelayRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayRequest")
            .field("payload", &self.payload)
            .field("recipient", &self.recipient.name())
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Relay front end.
///
/// Fire-and-forget: failures are logged and counted, never returned.
pub trait ParcelRelayApi: Send + Sync {
    fn relay(&self, request: RelayRequest);
}

/// Retrieves the payload a notification points at.
#[async_trait]
pub trait ParcelFetcher: Send + Sync {
    /// Fetch and decode the parcel. Consumes the notification.
    async fn fetch(&self, notification: ParcelNotification) -> Result<Payload, ParcelError>;
}
