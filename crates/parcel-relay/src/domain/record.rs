//! Stored parcels and the clock they are aged against.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::parcel_id::ParcelId;

/// Milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(1000))
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Timestamp `duration` later, saturating at the maximum.
    pub fn saturating_add(&self, duration: Duration) -> Self {
        Self(self.0.saturating_add(duration_millis(duration)))
    }

    /// Timestamp `duration` earlier, saturating at the epoch.
    pub fn saturating_sub(&self, duration: Duration) -> Self {
        Self(self.0.saturating_sub(duration_millis(duration)))
    }

    /// Time between `self` and a later `now`; zero if `now` is earlier.
    pub fn elapsed(&self, now: Timestamp) -> Duration {
        Duration::from_millis(now.0.saturating_sub(self.0))
    }
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub(crate) fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// One parcel held by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParcelRecord {
    pub id: ParcelId,
    /// Encoded payload
    pub payload: Vec<u8>,
    /// Codec type tag
    pub payload_type: String,
    pub created_at: Timestamp,
    /// How long the record may wait for retrieval
    pub ttl: Duration,
}

impl ParcelRecord {
    /// Whether the record outlived its TTL at `now`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.created_at.elapsed(now) > self.ttl
    }

    pub fn expires_at(&self) -> Timestamp {
        self.created_at.saturating_add(self.ttl)
    }

    pub fn size(&self) -> usize {
        self.payload.len()
    }
}
