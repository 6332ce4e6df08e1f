//! Error types for the parcel relay

use shared_bus::DeliveryError;
use thiserror::Error;

use crate::domain::ParcelId;

/// Errors a notification holder can get from fetching a parcel
#[derive(Debug, Error)]
pub enum ParcelError {
    #[error("Unknown payload type: {type_tag}")]
    UnknownType { type_tag: String },

    #[error("Parcel server {addr} unreachable: {reason}")]
    ServerUnreachable { addr: String, reason: String },

    #[error("Timed out during {stage} after {timeout_ms}ms")]
    Timeout { stage: &'static str, timeout_ms: u64 },

    #[error("Parcel not found: {id}")]
    NotFound { id: ParcelId },

    #[error("Parcel server error: {0}")]
    ServerError(String),

    #[error("Unknown response status: {status}")]
    UnknownStatus { status: u8 },

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Payload type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
}

impl ParcelError {
    /// Whether the failure was a timeout (the only kind worth retrying).
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Errors from encoding or decoding payloads
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Type not registered with codec: {type_name}")]
    UnregisteredType { type_name: String },

    #[error("Unknown type tag: {tag}")]
    UnknownTag { tag: String },

    #[error("Serialization error: {0}")]
    Serialize(String),

    #[error("Deserialization error: {0}")]
    Deserialize(String),
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {error}")]
    Io { path: String, error: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid timeout: {0}")]
    InvalidTimeout(String),

    #[error("Invalid limit: {0}")]
    InvalidLimit(String),
}

/// Errors from starting or running the relay
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to bind parcel server on {addr}: {reason}")]
    Bind { addr: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Delivery failed: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Payload too large for the wire: {size} bytes")]
    PayloadTooLarge { size: usize },
}
