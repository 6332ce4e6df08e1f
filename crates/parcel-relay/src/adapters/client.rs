//! Parcel Client - fetches the payload a notification points at.
//!
//! Every connect and read is bounded by its own timeout; there is no overall
//! deadline. `fetch` never retries. `fetch_with_retry` is the opt-in variant
//! that retries timed-out attempts.

use async_trait::async_trait;
use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::domain::record::duration_millis;
use crate::domain::wire::{decode_length, LENGTH_PREFIX_LEN, STATUS_LEN};
use crate::domain::{ClientConfig, ParcelId, ParcelNotification, Payload, ResponseCode};
use crate::error::ParcelError;
use crate::ports::{Codec, ParcelFetcher};

/// Upper bound on the buffer reserved up front for a payload.
const MAX_PREALLOC: usize = 1024 * 1024;

#[derive(Clone)]
pub struct ParcelClient {
    codec: Arc<dyn Codec>,
    config: ClientConfig,
}

impl ParcelClient {
    pub fn new(codec: Arc<dyn Codec>, config: ClientConfig) -> Self {
        Self { codec, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetch and decode the parcel.
    ///
    /// # Errors
    ///
    /// - `UnknownType` - the codec cannot decode `payload_type`; nothing is sent
    /// - `ServerUnreachable` / `Timeout` - connecting failed or a read stalled
    /// - `NotFound` - already fetched, expired, or never existed
    /// - `ServerError` / `UnknownStatus` - the server broke the protocol
    /// - `Codec` - the bytes did not decode
    pub async fn fetch(&self, notification: ParcelNotification) -> Result<Payload, ParcelError> {
        if !self.codec.resolve(&notification.payload_type) {
            return Err(ParcelError::UnknownType {
                type_tag: notification.payload_type,
            });
        }

        let bytes = self.fetch_bytes(&notification).await?;
        let payload = self.codec.decode(&notification.payload_type, &bytes)?;

        if self.config.log_receive {
            info!(
                parcel_id = %notification.id,
                payload_type = %notification.payload_type,
                size = bytes.len(),
                "Received parcel"
            );
        } else {
            debug!(parcel_id = %notification.id, size = bytes.len(), "Received parcel");
        }

        Ok(payload)
    }

    /// Fetch and downcast to `T`.
    pub async fn fetch_as<T: Any>(
        &self,
        notification: ParcelNotification,
    ) -> Result<T, ParcelError> {
        self.fetch(notification)
            .await?
            .downcast::<T>()
            .map_err(|payload| ParcelError::TypeMismatch {
                expected: type_name::<T>(),
                actual: payload.type_name(),
            })
    }

    /// Fetch, retrying attempts that timed out.
    ///
    /// Makes up to `max_read_attempts` attempts, `reread_interval` apart. Any
    /// other error ends the loop at once.
    pub async fn fetch_with_retry(
        &self,
        notification: ParcelNotification,
    ) -> Result<Payload, ParcelError> {
        let attempts = self.config.max_read_attempts.max(1);

        for attempt in 1..=attempts {
            match self.fetch(notification.clone()).await {
                Err(e) if e.is_timeout() => {
                    warn!(
                        parcel_id = %notification.id,
                        attempt = attempt,
                        max_attempts = attempts,
                        error = %e,
                        "Parcel fetch timed out"
                    );
                    if attempt < attempts {
                        tokio::time::sleep(self.config.reread_interval()).await;
                    }
                }
                result => return result,
            }
        }

        Err(ParcelError::ServerError("server is unresponsive".to_string()))
    }

    async fn fetch_bytes(&self, notification: &ParcelNotification) -> Result<Vec<u8>, ParcelError> {
        let addr = notification.endpoint();
        let connect_timeout = self.config.connect_timeout();

        let mut stream = match timeout(connect_timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(ParcelError::ServerUnreachable {
                    addr,
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                return Err(ParcelError::Timeout {
                    stage: "connect",
                    timeout_ms: duration_millis(connect_timeout),
                })
            }
        };

        stream
            .write_all(&notification.id.to_bytes())
            .await
            .map_err(|e| ParcelError::ServerError(format!("failed to send parcel id: {e}")))?;

        read_response(&mut stream, notification.id, &self.config).await
    }
}

impl fmt::Debug for ParcelClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParcelClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ParcelFetcher for ParcelClient {
    async fn fetch(&self, notification: ParcelNotification) -> Result<Payload, ParcelError> {
        ParcelClient::fetch(self, notification).await
    }
}

/// Read status, length and payload from the server side of an exchange.
async fn read_response<S>(
    stream: &mut S,
    id: ParcelId,
    config: &ClientConfig,
) -> Result<Vec<u8>, ParcelError>
where
    S: AsyncRead + Unpin,
{
    let read_timeout = config.read_timeout();

    let mut status = [0u8; STATUS_LEN];
    read_exact_bounded(stream, &mut status, "status", read_timeout).await?;
    match ResponseCode::from_byte(status[0]) {
        Some(ResponseCode::Ok) => {}
        Some(ResponseCode::NotFound) => return Err(ParcelError::NotFound { id }),
        Some(ResponseCode::BadRequest) => {
            return Err(ParcelError::ServerError(
                "server rejected the parcel request".to_string(),
            ))
        }
        None => return Err(ParcelError::UnknownStatus { status: status[0] }),
    }

    let mut length = [0u8; LENGTH_PREFIX_LEN];
    read_exact_bounded(stream, &mut length, "length", read_timeout).await?;
    let length = decode_length(length) as usize;

    let mut payload = Vec::with_capacity(length.min(MAX_PREALLOC));
    let mut chunk = vec![0u8; config.chunk_size.max(1)];
    while payload.len() < length {
        let wanted = (length - payload.len()).min(chunk.len());
        let read = timeout(read_timeout, stream.read(&mut chunk[..wanted]))
            .await
            .map_err(|_| ParcelError::Timeout {
                stage: "payload",
                timeout_ms: duration_millis(read_timeout),
            })?
            .map_err(|e| ParcelError::ServerError(format!("payload read failed: {e}")))?;

        if read == 0 {
            return Err(ParcelError::ServerError(format!(
                "connection closed after {} of {} payload bytes",
                payload.len(),
                length
            )));
        }
        payload.extend_from_slice(&chunk[..read]);
    }

    Ok(payload)
}

async fn read_exact_bounded<S>(
    stream: &mut S,
    buf: &mut [u8],
    stage: &'static str,
    read_timeout: Duration,
) -> Result<(), ParcelError>
where
    S: AsyncRead + Unpin,
{
    timeout(read_timeout, stream.read_exact(buf))
        .await
        .map_err(|_| ParcelError::Timeout {
            stage,
            timeout_ms: duration_millis(read_timeout),
        })?
        .map_err(|e| ParcelError::ServerError(format!("failed to read {stage}: {e}")))?;
    Ok(())
}
