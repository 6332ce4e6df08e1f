//! Parcel Store - node-local, in-memory parcels awaiting retrieval.
//!
//! Retrieval is a single atomic remove, so any number of concurrent takes of
//! one id see exactly one success.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

use crate::domain::{EncodedPayload, ParcelId, ParcelRecord, Timestamp};

/// Statistics for the parcel store
#[derive(Debug, Default)]
pub struct StoreStats {
    /// Parcels stored
    pub total_stored: AtomicU64,
    /// Parcels handed out
    pub total_taken: AtomicU64,
    /// Takes of absent ids
    pub total_missed: AtomicU64,
    /// Parcels removed by eviction
    pub total_evicted: AtomicU64,
}

/// Concurrent map of parcel id to record.
#[derive(Debug, Default)]
pub struct ParcelStore {
    parcels: DashMap<ParcelId, ParcelRecord>,
    stats: StoreStats,
}

impl ParcelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an encoded payload under a fresh id.
    ///
    /// Never overwrites: on the (astronomically unlikely) collision with a
    /// live id another id is drawn.
    pub fn put(&self, encoded: EncodedPayload, created_at: Timestamp, ttl: Duration) -> ParcelId {
        loop {
            let id = ParcelId::new();
            match self.parcels.entry(id) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(slot) => {
                    let size = encoded.bytes.len();
                    slot.insert(ParcelRecord {
                        id,
                        payload: encoded.bytes,
                        payload_type: encoded.type_tag,
                        created_at,
                        ttl,
                    });
                    self.stats.total_stored.fetch_add(1, Ordering::Relaxed);
                    debug!(parcel_id = %id, size = size, "Stored parcel");
                    return id;
                }
            }
        }
    }

    /// Remove and return the record, if it is still there.
    pub fn take_if_present(&self, id: &ParcelId) -> Option<ParcelRecord> {
        match self.parcels.remove(id) {
            Some((_, record)) => {
                self.stats.total_taken.fetch_add(1, Ordering::Relaxed);
                Some(record)
            }
            None => {
                self.stats.total_missed.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Drop a record nobody will ask for (its announcement was never delivered).
    pub fn discard(&self, id: &ParcelId) -> bool {
        self.parcels.remove(id).is_some()
    }

    /// Remove every record created before `cutoff`, accessed or not.
    pub fn evict_older_than(&self, cutoff: Timestamp) -> Vec<ParcelId> {
        self.evict_where(|record| record.created_at < cutoff)
    }

    /// Remove every record whose own TTL has elapsed at `now`.
    pub fn evict_expired(&self, now: Timestamp) -> Vec<ParcelId> {
        self.evict_where(|record| record.is_expired(now))
    }

    fn evict_where(&self, expired: impl Fn(&ParcelRecord) -> bool) -> Vec<ParcelId> {
        let mut evicted = Vec::new();

        self.parcels.retain(|id, record| {
            if expired(record) {
                evicted.push(*id);
                false // Remove
            } else {
                true // Keep
            }
        });

        if !evicted.is_empty() {
            self.stats
                .total_evicted
                .fetch_add(evicted.len() as u64, Ordering::Relaxed);
        }
        evicted
    }

    /// Number of parcels currently held
    pub fn len(&self) -> usize {
        self.parcels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parcels.is_empty()
    }

    /// Check whether a parcel is held, without taking it
    pub fn contains(&self, id: &ParcelId) -> bool {
        self.parcels.contains_key(id)
    }

    /// Get statistics
    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }
}
