//! Ports layer: the traits the relay is driven through and depends on.

pub mod inbound;
pub mod outbound;

pub use inbound::{ParcelFetcher, ParcelRelayApi, RelayRequest};
pub use outbound::{Codec, NotificationEnveloper, SystemTimeSource, TimeSource};
