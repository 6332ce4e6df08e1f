//! Service layer: the relay's moving parts and their wiring.

pub mod manager;
pub mod registry;
pub mod relay_service;
pub mod store;
pub mod sweeper;

pub use manager::{AdvertisedEndpoint, ParcelManager, Relayed};
pub use registry::EnveloperRegistry;
pub use relay_service::{ParcelRelayService, RelayHandle, MANAGER_MAILBOX};
pub use store::{ParcelStore, StoreStats};
pub use sweeper::TtlSweeper;
