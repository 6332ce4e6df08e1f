//! Parcel Manager - turns relay requests into stored parcels and notifications.
//!
//! Runs as an actor: requests arrive on a `shared_bus` mailbox and are handled
//! one at a time. A request is never answered; failures are logged and counted.

use shared_bus::Mailbox;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::domain::wire::MAX_PAYLOAD_LEN;
use crate::domain::{ParcelId, ParcelMessage, ParcelNotification};
use crate::error::RelayError;
use crate::metrics::RelayMetrics;
use crate::ports::{Codec, ParcelRelayApi, RelayRequest, SystemTimeSource, TimeSource};
use crate::service::registry::EnveloperRegistry;
use crate::service::store::ParcelStore;

/// Where recipients are told to fetch parcels from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisedEndpoint {
    pub host: String,
    /// The port the parcel server actually bound
    pub port: u16,
}

/// Result of a successful relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relayed {
    pub id: ParcelId,
    pub enveloped: bool,
}

pub struct ParcelManager {
    store: Arc<ParcelStore>,
    codec: Arc<dyn Codec>,
    envelopers: EnveloperRegistry,
    endpoint: AdvertisedEndpoint,
    default_ttl: Duration,
    time_source: Arc<dyn TimeSource>,
    metrics: Arc<RelayMetrics>,
}

impl ParcelManager {
    pub fn new(
        store: Arc<ParcelStore>,
        codec: Arc<dyn Codec>,
        envelopers: EnveloperRegistry,
        endpoint: AdvertisedEndpoint,
        default_ttl: Duration,
    ) -> Self {
        Self {
            store,
            codec,
            envelopers,
            endpoint,
            default_ttl,
            time_source: Arc::new(SystemTimeSource),
            metrics: Arc::new(RelayMetrics::new()),
        }
    }

    pub fn with_time_source(mut self, time_source: Arc<dyn TimeSource>) -> Self {
        self.time_source = time_source;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<RelayMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn endpoint(&self) -> &AdvertisedEndpoint {
        &self.endpoint
    }

    /// Store the payload and announce it to the recipient.
    ///
    /// If the announcement cannot be delivered the parcel is dropped again,
    /// since nobody could ever fetch it.
    pub fn try_relay(&self, request: RelayRequest) -> Result<Relayed, RelayError> {
        let encoded = self.codec.encode(&request.payload)?;
        if encoded.bytes.len() > MAX_PAYLOAD_LEN {
            return Err(RelayError::PayloadTooLarge {
                size: encoded.bytes.len(),
            });
        }

        let payload_type = encoded.type_tag.clone();
        let ttl = request.ttl.unwrap_or(self.default_ttl);
        let id = self.store.put(encoded, self.time_source.now(), ttl);

        let notification = ParcelNotification {
            host: self.endpoint.host.clone(),
            port: self.endpoint.port,
            id,
            payload_type,
        };

        let message = match self.envelopers.select_envelope(&request, &notification) {
            Some(envelope) => ParcelMessage::Envelope(envelope),
            None => ParcelMessage::Notification(notification),
        };
        let enveloped = message.is_envelope();

        if let Err(e) = request.recipient.tell(message) {
            self.store.discard(&id);
            return Err(e.into());
        }

        Ok(Relayed { id, enveloped })
    }

    /// Actor loop: handle requests until the mailbox empties or shutdown fires.
    pub async fn run(
        self: Arc<Self>,
        mut mailbox: Mailbox<RelayRequest>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(mailbox = mailbox.name(), "Parcel manager started");

        loop {
            tokio::select! {
                request = mailbox.recv() => match request {
                    Some(request) => self.relay(request),
                    None => {
                        warn!("All manager addresses dropped");
                        break;
                    }
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Parcel manager stopped");
    }
}

impl ParcelRelayApi for ParcelManager {
    fn relay(&self, request: RelayRequest) {
        let recipient = request.recipient.name().to_string();
        let type_name = request.payload.type_name();

        match self.try_relay(request) {
            Ok(relayed) => {
                self.metrics.record_relayed(relayed.enveloped);
                debug!(
                    parcel_id = %relayed.id,
                    recipient = %recipient,
                    enveloped = relayed.enveloped,
                    "Relayed parcel"
                );
            }
            Err(e) => {
                self.metrics.record_relay_failure();
                error!(
                    recipient = %recipient,
                    payload_type = type_name,
                    error = %e,
                    "Failed to relay parcel"
                );
            }
        }
    }
}
