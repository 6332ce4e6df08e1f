//! Relay Service - wires store, manager, server and sweeper together.
//!
//! ```text
//! RelayRequest ──→ Address ──→ ParcelManager ──→ ParcelStore ←── TtlSweeper
//!                                   │                 ↑
//!                                   ↓                 │ take_if_present
//!                         recipient.tell(msg)    ParcelServer ←── TCP ←── ParcelClient
//! ```
//!
//! All background tasks share one `watch` shutdown signal.

use shared_bus::{mailbox, Address};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::adapters::{ParcelClient, ParcelServer};
use crate::domain::RelayConfig;
use crate::error::RelayError;
use crate::metrics::RelayMetrics;
use crate::ports::{Codec, NotificationEnveloper, RelayRequest, SystemTimeSource, TimeSource};
use crate::service::manager::{AdvertisedEndpoint, ParcelManager};
use crate::service::registry::EnveloperRegistry;
use crate::service::store::ParcelStore;
use crate::service::sweeper::TtlSweeper;

/// Name of the manager's mailbox.
pub const MANAGER_MAILBOX: &str = "parcel-manager";

/// Builder for a running relay.
pub struct ParcelRelayService {
    config: RelayConfig,
    codec: Arc<dyn Codec>,
    envelopers: EnveloperRegistry,
    time_source: Arc<dyn TimeSource>,
}

impl ParcelRelayService {
    pub fn new(config: RelayConfig, codec: Arc<dyn Codec>) -> Self {
        Self {
            config,
            codec,
            envelopers: EnveloperRegistry::new(),
            time_source: Arc::new(SystemTimeSource),
        }
    }

    /// Replace the clock used for record ages and sweeps.
    pub fn with_time_source(mut self, time_source: Arc<dyn TimeSource>) -> Self {
        self.time_source = time_source;
        self
    }

    pub fn register_enveloper(&mut self, enveloper: Arc<dyn NotificationEnveloper>) -> &mut Self {
        self.envelopers.register(enveloper);
        self
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Validate config, bind the server and spawn the background tasks.
    pub async fn start(self) -> Result<RelayHandle, RelayError> {
        self.config.validate()?;

        let store = Arc::new(ParcelStore::new());
        let metrics = Arc::new(RelayMetrics::new());

        let server = ParcelServer::bind(
            &self.config.server,
            Arc::clone(&store),
            Arc::clone(&metrics),
        )
        .await?;
        let local_addr = server.local_addr()?;

        let manager = Arc::new(
            ParcelManager::new(
                Arc::clone(&store),
                Arc::clone(&self.codec),
                self.envelopers,
                AdvertisedEndpoint {
                    host: self.config.server.public_host.clone(),
                    port: local_addr.port(),
                },
                self.config.store.ttl(),
            )
            .with_time_source(Arc::clone(&self.time_source))
            .with_metrics(Arc::clone(&metrics)),
        );

        let sweeper = Arc::new(TtlSweeper::new(
            Arc::clone(&store),
            Arc::clone(&self.time_source),
            Arc::clone(&metrics),
            self.config.store.sweep_interval(),
        ));

        let (address, requests) =
            mailbox::<RelayRequest>(MANAGER_MAILBOX, self.config.manager.mailbox_capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let tasks = vec![
            tokio::spawn(server.run(shutdown_rx.clone())),
            tokio::spawn(Arc::clone(&manager).run(requests, shutdown_rx.clone())),
            tokio::spawn(Arc::clone(&sweeper).run(shutdown_rx)),
        ];

        info!(
            addr = %local_addr,
            public_host = %self.config.server.public_host,
            ttl_secs = self.config.store.ttl_secs,
            "Parcel relay started"
        );

        Ok(RelayHandle {
            address,
            manager,
            sweeper,
            store,
            metrics,
            client: ParcelClient::new(self.codec, self.config.client.clone()),
            local_addr,
            shutdown_tx,
            tasks,
        })
    }
}

/// Handle to a running relay.
pub struct RelayHandle {
    address: Address<RelayRequest>,
    manager: Arc<ParcelManager>,
    sweeper: Arc<TtlSweeper>,
    store: Arc<ParcelStore>,
    metrics: Arc<RelayMetrics>,
    client: ParcelClient,
    local_addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl RelayHandle {
    /// Address of the manager actor.
    pub fn address(&self) -> Address<RelayRequest> {
        self.address.clone()
    }

    /// Queue a request for the manager.
    pub fn relay(&self, request: RelayRequest) -> Result<(), RelayError> {
        Ok(self.address.tell(request)?)
    }

    /// Address the parcel server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Endpoint written into notifications.
    pub fn endpoint(&self) -> &AdvertisedEndpoint {
        self.manager.endpoint()
    }

    pub fn store(&self) -> &Arc<ParcelStore> {
        &self.store
    }

    pub fn metrics(&self) -> &Arc<RelayMetrics> {
        &self.metrics
    }

    /// A client sharing this relay's codec and client config.
    pub fn client(&self) -> ParcelClient {
        self.client.clone()
    }

    /// Run one TTL sweep now instead of waiting for the interval.
    pub fn sweep_now(&self) -> usize {
        self.sweeper.sweep()
    }

    /// Stop all background tasks and wait for them.
    pub async fn shutdown(self) {
        info!("Shutting down parcel relay");
        // Receivers only go away when their tasks already ended
        let _ = self.shutdown_tx.send(true);

        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Relay task ended abnormally");
            }
        }
    }
}
