//! Driven ports: what the relay needs from its environment.

use crate::domain::{EncodedPayload, Envelope, ParcelNotification, Payload, Timestamp};
use crate::error::CodecError;
use crate::ports::inbound::RelayRequest;

/// Turns payload values into bytes and back.
///
/// The type tag produced by `encode` travels in the notification and is the
/// only thing the receiving side needs to pick the right decoder.
pub trait Codec: Send + Sync {
    /// Encode a payload, returning its bytes and type tag.
    fn encode(&self, payload: &Payload) -> Result<EncodedPayload, CodecError>;

    /// Whether `type_tag` names a type this codec can decode.
    fn resolve(&self, type_tag: &str) -> bool;

    /// Decode bytes previously produced for `type_tag`.
    fn decode(&self, type_tag: &str, bytes: &[u8]) -> Result<Payload, CodecError>;
}

/// Time source abstraction (for testability)
pub trait TimeSource: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// System time implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| Timestamp::from_millis(u64::try_from(d.as_millis()).unwrap_or(u64::MAX)))
            // Clock before Unix epoch
            .unwrap_or_default()
    }
}

/// Wraps a notification in a recipient-specific envelope.
///
/// Envelopers are consulted in descending `priority`; the first one that
/// returns `Some` decides what the recipient receives.
pub trait NotificationEnveloper: Send + Sync {
    /// Higher runs first.
    fn priority(&self) -> i32 {
        0
    }

    /// Produce an envelope for this request, or `None` to pass.
    fn envelope(
        &self,
        request: &RelayRequest,
        notification: &ParcelNotification,
    ) -> Option<Envelope>;

    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
