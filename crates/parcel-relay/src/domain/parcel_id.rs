//! Parcel identifier.
//!
//! A random UUID (v4). On the wire it is always the 16 bytes in big-endian
//! (RFC 4122) order, independent of the host platform.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::wire::PARCEL_ID_LEN;

/// Identifier of one stored parcel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParcelId(Uuid);

impl ParcelId {
    /// Generate a new random parcel ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Rebuild an ID from its wire representation.
    pub fn from_bytes(bytes: [u8; PARCEL_ID_LEN]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Wire representation (big-endian).
    pub fn to_bytes(&self) -> [u8; PARCEL_ID_LEN] {
        *self.0.as_bytes()
    }

    /// Parse from string
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ParcelId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ParcelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ParcelId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<ParcelId> for Uuid {
    fn from(id: ParcelId) -> Self {
        id.0
    }
}
