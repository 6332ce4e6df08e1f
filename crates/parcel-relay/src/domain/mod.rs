//! Domain layer: plain data and rules, no I/O.

pub mod config;
pub mod notification;
pub mod parcel_id;
pub mod payload;
pub mod record;
pub mod wire;

pub use config::{ClientConfig, ManagerConfig, RelayConfig, ServerConfig, StoreConfig};
pub use notification::{ParcelMessage, ParcelNotification};
pub use parcel_id::ParcelId;
pub use payload::{EncodedPayload, Envelope, Payload};
pub use record::{ParcelRecord, Timestamp};
pub use wire::ResponseCode;
