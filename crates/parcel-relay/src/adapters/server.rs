//! Parcel Server - hands out stored parcels over raw TCP.
//!
//! One exchange per connection; see `domain::wire` for the byte layout. Each
//! accepted connection is served in its own task.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::domain::record::duration_millis;
use crate::domain::wire::{encode_length, PARCEL_ID_LEN};
use crate::domain::{ParcelId, ResponseCode, ServerConfig};
use crate::error::RelayError;
use crate::metrics::RelayMetrics;
use crate::service::store::ParcelStore;

/// Pause after a failed `accept` before trying again.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

pub struct ParcelServer {
    listener: TcpListener,
    store: Arc<ParcelStore>,
    metrics: Arc<RelayMetrics>,
    read_timeout: Duration,
}

impl ParcelServer {
    /// Bind the listener. Port 0 picks an ephemeral port; see `local_addr`.
    pub async fn bind(
        config: &ServerConfig,
        store: Arc<ParcelStore>,
        metrics: Arc<RelayMetrics>,
    ) -> Result<Self, RelayError> {
        let addr = config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| RelayError::Bind {
                addr: addr.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            listener,
            store,
            metrics,
            read_timeout: config.read_timeout(),
        })
    }

    /// Address actually bound.
    pub fn local_addr(&self) -> Result<SocketAddr, RelayError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until shutdown.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        match self.listener.local_addr() {
            Ok(addr) => info!(addr = %addr, "Parcel server listening"),
            Err(e) => warn!(error = %e, "Parcel server listening on unknown address"),
        }

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let store = Arc::clone(&self.store);
                        let metrics = Arc::clone(&self.metrics);
                        let read_timeout = self.read_timeout;
                        tokio::spawn(async move {
                            let served =
                                serve_connection(stream, &store, &metrics, read_timeout).await;
                            if let Err(e) = served {
                                warn!(peer = %peer, error = %e, "Parcel connection failed");
                            }
                        });
                    }
                    Err(e) => pause_after_accept_error(&e).await,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Parcel server stopped");
    }
}

/// Log a failed `accept` and wait before the next one.
///
/// Errors such as EMFILE persist until a connection closes, so retrying at
/// once would spin.
async fn pause_after_accept_error(e: &io::Error) {
    error!(error = %e, "Failed to accept parcel connection");
    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
}

/// Serve one request on an accepted stream and close it.
///
/// Returns the response code that was sent.
pub async fn serve_connection<S>(
    mut stream: S,
    store: &ParcelStore,
    metrics: &RelayMetrics,
    read_timeout: Duration,
) -> io::Result<ResponseCode>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut id_bytes = [0u8; PARCEL_ID_LEN];
    let code = match timeout(read_timeout, stream.read_exact(&mut id_bytes)).await {
        Ok(Ok(_)) => {
            let id = ParcelId::from_bytes(id_bytes);
            match store.take_if_present(&id) {
                Some(record) => {
                    let length = encode_length(record.payload.len()).ok_or_else(|| {
                        io::Error::new(
                            io::ErrorKind::InvalidData,
                            "parcel exceeds wire length limit",
                        )
                    })?;
                    stream.write_all(&[ResponseCode::Ok.as_byte()]).await?;
                    stream.write_all(&length).await?;
                    stream.write_all(&record.payload).await?;
                    metrics.record_served(record.payload.len());
                    debug!(parcel_id = %id, size = record.payload.len(), "Served parcel");
                    ResponseCode::Ok
                }
                None => {
                    metrics.record_not_found();
                    debug!(parcel_id = %id, "Parcel not found");
                    stream.write_all(&[ResponseCode::NotFound.as_byte()]).await?;
                    ResponseCode::NotFound
                }
            }
        }
        Ok(Err(e)) => {
            metrics.record_bad_request();
            warn!(error = %e, "Could not read parcel id");
            stream.write_all(&[ResponseCode::BadRequest.as_byte()]).await?;
            ResponseCode::BadRequest
        }
        Err(_) => {
            metrics.record_bad_request();
            warn!(
                timeout_ms = duration_millis(read_timeout),
                "Timed out waiting for parcel id"
            );
            stream.write_all(&[ResponseCode::BadRequest.as_byte()]).await?;
            ResponseCode::BadRequest
        }
    };

    stream.flush().await?;
    stream.shutdown().await?;
    Ok(code)
}
