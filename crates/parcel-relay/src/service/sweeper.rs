//! TTL Sweeper - evicts parcels nobody came for.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::metrics::RelayMetrics;
use crate::ports::TimeSource;
use crate::service::store::ParcelStore;

pub struct TtlSweeper {
    store: Arc<ParcelStore>,
    time_source: Arc<dyn TimeSource>,
    metrics: Arc<RelayMetrics>,
    interval: Duration,
}

impl TtlSweeper {
    pub fn new(
        store: Arc<ParcelStore>,
        time_source: Arc<dyn TimeSource>,
        metrics: Arc<RelayMetrics>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            time_source,
            metrics,
            interval,
        }
    }

    /// Evict everything expired as of now. Returns the number removed.
    pub fn sweep(&self) -> usize {
        let evicted = self.store.evict_expired(self.time_source.now());
        for id in &evicted {
            debug!(parcel_id = %id, "Evicted expired parcel");
        }
        self.metrics.record_evicted(evicted.len());
        evicted.len()
    }

    /// Sweep every `interval` until shutdown.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut sweep_interval = tokio::time::interval(self.interval);
        sweep_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick completes immediately
        sweep_interval.tick().await;

        info!(interval_secs = self.interval.as_secs(), "TTL sweeper started");

        loop {
            tokio::select! {
                _ = sweep_interval.tick() => {
                    let removed = self.sweep();
                    if removed > 0 {
                        debug!(
                            removed = removed,
                            remaining = self.store.len(),
                            "Swept expired parcels"
                        );
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("TTL sweeper stopped");
    }
}
