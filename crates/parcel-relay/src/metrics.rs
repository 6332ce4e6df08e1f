//! Counters for relay operations
//!
//! Shared between the manager, server and sweeper through an `Arc`.
//!
//! ## Usage
//!
//! ```ignore
//! use parcel_relay::metrics::RelayMetrics;
//!
//! let metrics = RelayMetrics::new();
//! metrics.record_relayed(false);
//! metrics.record_served(4096);
//! assert_eq!(metrics.snapshot().bytes_served, 4096);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics collector for the relay
#[derive(Debug, Default)]
pub struct RelayMetrics {
    /// Parcels stored and announced to their recipient
    pub parcels_relayed: AtomicU64,
    /// Relay requests dropped (encode, size or delivery failure)
    pub relay_failures: AtomicU64,
    /// Announcements that went out wrapped in an envelope
    pub envelopes_produced: AtomicU64,
    /// Parcels handed out over TCP
    pub fetches_served: AtomicU64,
    /// Requests for absent, taken or expired parcels
    pub fetches_not_found: AtomicU64,
    /// Connections that never sent a full parcel id
    pub bad_requests: AtomicU64,
    /// Parcels removed by the TTL sweep
    pub parcels_evicted: AtomicU64,
    /// Payload bytes written to clients
    pub bytes_served: AtomicU64,
}

impl RelayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful relay.
    ///
    /// # Arguments
    /// * `enveloped` - Whether an enveloper wrapped the notification
    pub fn record_relayed(&self, enveloped: bool) {
        self.parcels_relayed.fetch_add(1, Ordering::Relaxed);
        if enveloped {
            self.envelopes_produced.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_relay_failure(&self) {
        self.relay_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a parcel served to a client
    ///
    /// # Arguments
    /// * `bytes` - Payload size written
    pub fn record_served(&self, bytes: usize) {
        self.fetches_served.fetch_add(1, Ordering::Relaxed);
        self.bytes_served.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_not_found(&self) {
        self.fetches_not_found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bad_request(&self) {
        self.bad_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evicted(&self, count: usize) {
        self.parcels_evicted.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            parcels_relayed: self.parcels_relayed.load(Ordering::Relaxed),
            relay_failures: self.relay_failures.load(Ordering::Relaxed),
            envelopes_produced: self.envelopes_produced.load(Ordering::Relaxed),
            fetches_served: self.fetches_served.load(Ordering::Relaxed),
            fetches_not_found: self.fetches_not_found.load(Ordering::Relaxed),
            bad_requests: self.bad_requests.load(Ordering::Relaxed),
            parcels_evicted: self.parcels_evicted.load(Ordering::Relaxed),
            bytes_served: self.bytes_served.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time metrics snapshot
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub parcels_relayed: u64,
    pub relay_failures: u64,
    pub envelopes_produced: u64,
    pub fetches_served: u64,
    pub fetches_not_found: u64,
    pub bad_requests: u64,
    pub parcels_evicted: u64,
    pub bytes_served: u64,
}
