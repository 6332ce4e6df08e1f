//! What a recipient is told about a stored parcel.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::parcel_id::ParcelId;
use super::payload::Envelope;

/// Routing metadata for one stored parcel.
///
/// Holds no payload bytes, so its size does not depend on the payload. A
/// notification is single-use: fetching consumes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParcelNotification {
    /// Host the parcel server advertises
    pub host: String,
    /// Port the parcel server is bound to
    pub port: u16,
    /// Parcel to request
    pub id: ParcelId,
    /// Codec type tag of the payload
    pub payload_type: String,
}

impl ParcelNotification {
    /// `host:port` of the parcel server.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for ParcelNotification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parcel {} ({}) at {}:{}",
            self.id, self.payload_type, self.host, self.port
        )
    }
}

/// Message delivered to a relay recipient.
#[derive(Debug)]
pub enum ParcelMessage {
    /// No enveloper claimed the parcel
    Notification(ParcelNotification),
    /// An enveloper wrapped the notification
    Envelope(Envelope),
}

impl ParcelMessage {
    /// Borrow the bare notification, if that is what was delivered.
    pub fn as_notification(&self) -> Option<&ParcelNotification> {
        match self {
            Self::Notification(notification) => Some(notification),
            Self::Envelope(_) => None,
        }
    }

    /// Take the bare notification, if that is what was delivered.
    pub fn into_notification(self) -> Option<ParcelNotification> {
        match self {
            Self::Notification(notification) => Some(notification),
            Self::Envelope(_) => None,
        }
    }

    /// Take the envelope, if one was delivered.
    pub fn into_envelope(self) -> Option<Envelope> {
        match self {
            Self::Envelope(envelope) => Some(envelope),
            Self::Notification(_) => None,
        }
    }

    pub fn is_envelope(&self) -> bool {
        matches!(self, Self::Envelope(_))
    }
}
