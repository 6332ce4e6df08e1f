//! # Parcel Relay
//!
//! Out-of-band delivery for payloads too large for the node's message
//! transport.
//!
//! A caller hands the relay a payload and a recipient. The relay stores the
//! encoded payload in memory and tells the recipient where to get it; the
//! recipient then pulls the bytes over a dedicated TCP connection, exactly
//! once. Parcels nobody fetches are evicted after their TTL.
//!
//! ## Architecture
//!
//! This crate follows Hexagonal Architecture (Ports & Adapters):
//!
//! - **Domain Layer** (`domain/`): ids, notifications, records, wire constants,
//!   configuration
//! - **Ports Layer** (`ports/`): `ParcelRelayApi` and `ParcelFetcher` (driving),
//!   `Codec`, `TimeSource` and `NotificationEnveloper` (driven)
//! - **Service Layer** (`service/`): `ParcelStore`, `EnveloperRegistry`,
//!   `ParcelManager`, `TtlSweeper`, and `ParcelRelayService` wiring them up
//! - **Adapters Layer** (`adapters/`): `BincodeCodec`, `ParcelServer`,
//!   `ParcelClient`
//!
//! ## Guarantees
//!
//! - Every parcel id is fresh; the store never overwrites
//! - A parcel is handed out at most once, even under concurrent fetches
//! - Taken, expired and unknown ids all look the same to a client: `NotFound`
//!
//! ## Usage Example
//!
//! ```ignore
//! use parcel_relay::{BincodeCodec, ParcelRelayService, RelayConfig, RelayRequest};
//! use std::sync::Arc;
//!
//! let handle = ParcelRelayService::new(
//!     RelayConfig::default(),
//!     Arc::new(BincodeCodec::with_primitives()),
//! )
//! .start()
//! .await?;
//!
//! // recipient: Arc<dyn Recipient<ParcelMessage>>
//! handle.relay(RelayRequest::new(big_report, recipient))?;
//!
//! // ...on the receiving side
//! let report: String = handle.client().fetch_as(notification).await?;
//! ```

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]
#![deny(unsafe_code)]

pub mod adapters;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod service;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export main types
pub use adapters::{BincodeCodec, ParcelClient, ParcelServer};
pub use domain::{
    ClientConfig, EncodedPayload, Envelope, ManagerConfig, ParcelId, ParcelMessage,
    ParcelNotification, ParcelRecord, Payload, RelayConfig, ResponseCode, ServerConfig,
    StoreConfig, Timestamp,
};
pub use error::{CodecError, ConfigError, ParcelError, RelayError};
pub use metrics::{MetricsSnapshot, RelayMetrics};
pub use ports::{
    Codec, NotificationEnveloper, ParcelFetcher, ParcelRelayApi, RelayRequest, SystemTimeSource,
    TimeSource,
};
pub use service::{
    AdvertisedEndpoint, EnveloperRegistry, ParcelManager, ParcelRelayService, ParcelStore,
    RelayHandle, TtlSweeper,
};

#[cfg(feature = "test-utils")]
pub use test_utils::{ManualTimeSource, TagEnveloper, TaggedEnvelope};
