//! # Wire Protocol
//!
//! Drives each side of the parcel protocol with a raw TCP peer:
//!
//! - the real server against hand-written client bytes
//! - the real client against scripted fake servers

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    use parcel_relay::test_utils::{recipient_mailbox, ManualTimeSource};
    use parcel_relay::{
        BincodeCodec, Codec, ParcelClient, ParcelError, ParcelId, ParcelNotification,
        ParcelRelayService, Payload, RelayConfig, RelayHandle, RelayRequest,
    };

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    async fn start_relay() -> RelayHandle {
        ParcelRelayService::new(
            RelayConfig::for_testing(),
            Arc::new(BincodeCodec::with_primitives()),
        )
        .with_time_source(Arc::new(ManualTimeSource::at_secs(1)))
        .start()
        .await
        .expect("relay should start")
    }

    async fn stored_parcel(handle: &RelayHandle, value: String) -> ParcelNotification {
        let (recipient, mut inbox) = recipient_mailbox("caller");
        handle.relay(RelayRequest::new(value, recipient)).unwrap();
        tokio::time::timeout(Duration::from_secs(2), inbox.recv())
            .await
            .unwrap()
            .and_then(|m| m.into_notification())
            .unwrap()
    }

    fn client() -> ParcelClient {
        ParcelClient::new(
            Arc::new(BincodeCodec::with_primitives()),
            RelayConfig::for_testing().client,
        )
    }

    fn notification_for(addr: SocketAddr, payload_type: &str) -> ParcelNotification {
        ParcelNotification {
            host: addr.ip().to_string(),
            port: addr.port(),
            id: ParcelId::new(),
            payload_type: payload_type.to_string(),
        }
    }

    /// Accepts connections forever, handing each to `handler`.
    ///
    /// Returns the address and a counter of accepted connections.
    async fn fake_server<F, Fut>(handler: F) -> (SocketAddr, Arc<AtomicUsize>)
    where
        F: Fn(TcpStream) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&accepted);

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(handler(stream));
            }
        });

        (addr, accepted)
    }

    /// Fake server that reads the id and then answers with `response`.
    async fn scripted_server(response: &'static [u8]) -> (SocketAddr, Arc<AtomicUsize>) {
        fake_server(move |mut stream| async move {
            let mut id = [0u8; 16];
            if stream.read_exact(&mut id).await.is_ok() {
                let _ = stream.write_all(response).await;
                let _ = stream.shutdown().await;
            }
        })
        .await
    }

    /// Fake server that reads the id, answers with `response` and then holds
    /// the connection open without closing it.
    async fn lingering_server(response: &'static [u8]) -> (SocketAddr, Arc<AtomicUsize>) {
        fake_server(move |mut stream| async move {
            let mut id = [0u8; 16];
            if stream.read_exact(&mut id).await.is_ok() {
                let _ = stream.write_all(response).await;
                let _ = stream.flush().await;
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
        })
        .await
    }

    /// Fake server that reads the id and never answers.
    async fn silent_server() -> (SocketAddr, Arc<AtomicUsize>) {
        fake_server(|mut stream| async move {
            let mut id = [0u8; 16];
            let _ = stream.read_exact(&mut id).await;
            tokio::time::sleep(Duration::from_secs(30)).await;
        })
        .await
    }

    // =============================================================================
    // SERVER SIDE
    // =============================================================================

    #[tokio::test]
    async fn test_server_response_layout() {
        let handle = start_relay().await;
        let notification = stored_parcel(&handle, "Hello world".to_string()).await;

        let mut stream = TcpStream::connect(handle.local_addr()).await.unwrap();
        stream.write_all(&notification.id.to_bytes()).await.unwrap();
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();

        assert_eq!(response[0], 0);
        let length = u32::from_be_bytes([response[1], response[2], response[3], response[4]]);
        assert_eq!(length as usize, response.len() - 5);

        let codec = BincodeCodec::with_primitives();
        let payload = codec.decode("string", &response[5..]).unwrap();
        assert_eq!(payload.downcast_ref::<String>().unwrap(), "Hello world");

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_server_truncated_id_is_bad_request() {
        let handle = start_relay().await;
        let notification = stored_parcel(&handle, "kept".to_string()).await;

        let mut stream = TcpStream::connect(handle.local_addr()).await.unwrap();
        stream.write_all(&notification.id.to_bytes()[..10]).await.unwrap();
        stream.shutdown().await.unwrap();
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();

        assert_eq!(response, vec![1]);
        assert!(handle.store().contains(&notification.id));
        assert_eq!(handle.metrics().snapshot().bad_requests, 1);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_server_silent_client_is_bad_request() {
        let handle = start_relay().await;

        let mut stream = TcpStream::connect(handle.local_addr()).await.unwrap();
        let mut response = Vec::new();
        tokio::time::timeout(Duration::from_secs(3), stream.read_to_end(&mut response))
            .await
            .expect("server should answer after its read timeout")
            .unwrap();

        assert_eq!(response, vec![1]);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_server_unknown_id_is_not_found() {
        let handle = start_relay().await;

        let mut stream = TcpStream::connect(handle.local_addr()).await.unwrap();
        stream.write_all(&ParcelId::new().to_bytes()).await.unwrap();
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();

        assert_eq!(response, vec![2]);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_server_stops_accepting_after_shutdown() {
        let handle = start_relay().await;
        let addr = handle.local_addr();
        handle.shutdown().await;

        let result = client().fetch(notification_for(addr, "string")).await;
        assert!(matches!(result, Err(ParcelError::ServerUnreachable { .. })));
    }

    // =============================================================================
    // CLIENT SIDE
    // =============================================================================

    #[tokio::test]
    async fn test_client_unknown_type_never_connects() {
        let (addr, accepted) = scripted_server(&[2]).await;

        let result = client().fetch(notification_for(addr, "matrix")).await;

        assert!(matches!(result, Err(ParcelError::UnknownType { .. })));
        assert_eq!(accepted.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_client_refused_connection_is_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = client().fetch(notification_for(addr, "string")).await;
        assert!(matches!(result, Err(ParcelError::ServerUnreachable { .. })));
    }

    #[tokio::test]
    async fn test_client_unknown_status() {
        let (addr, _) = scripted_server(&[7]).await;

        let result = client().fetch(notification_for(addr, "string")).await;
        assert!(matches!(result, Err(ParcelError::UnknownStatus { status: 7 })));
    }

    #[tokio::test]
    async fn test_client_bad_request_is_server_error() {
        let (addr, _) = scripted_server(&[1]).await;

        let result = client().fetch(notification_for(addr, "string")).await;
        assert!(matches!(result, Err(ParcelError::ServerError(_))));
    }

    #[tokio::test]
    async fn test_client_short_payload_is_server_error() {
        let (addr, _) = scripted_server(&[0, 0, 0, 0, 10, 1, 2, 3]).await;

        let result = client().fetch(notification_for(addr, "bytes")).await;
        assert!(matches!(result, Err(ParcelError::ServerError(_))));
    }

    #[tokio::test]
    async fn test_client_undecodable_payload_is_codec_error() {
        let (addr, _) = scripted_server(&[0, 0, 0, 0, 2, 0xff, 0xff]).await;

        let result = client().fetch(notification_for(addr, "string")).await;
        assert!(matches!(result, Err(ParcelError::Codec(_))));
    }

    #[tokio::test]
    async fn test_client_silent_server_times_out() {
        let (addr, _) = silent_server().await;

        let result = client().fetch(notification_for(addr, "string")).await;
        assert!(matches!(
            result,
            Err(ParcelError::Timeout { stage: "status", .. })
        ));
    }

    #[tokio::test]
    async fn test_client_stalled_length_times_out() {
        let (addr, _) = lingering_server(&[0, 0, 0]).await;

        let result = client().fetch(notification_for(addr, "u32")).await;
        assert!(matches!(
            result,
            Err(ParcelError::Timeout { stage: "length", timeout_ms: 500 })
        ));
    }

    #[tokio::test]
    async fn test_client_stalled_payload_times_out() {
        let (addr, _) = lingering_server(&[0, 0, 0, 0, 4, 99]).await;

        let result = client().fetch(notification_for(addr, "u32")).await;
        assert!(matches!(
            result,
            Err(ParcelError::Timeout { stage: "payload", timeout_ms: 500 })
        ));
    }

    #[tokio::test]
    async fn test_client_stops_reading_at_payload_length() {
        let (addr, _) = lingering_server(&[0, 0, 0, 0, 4, 99, 0, 0, 0]).await;
        let client = client();
        let started = std::time::Instant::now();

        let value = client
            .fetch_as::<u32>(notification_for(addr, "u32"))
            .await
            .unwrap();

        assert_eq!(value, 99);
        // An extra read on the open connection would sit out the read timeout
        assert!(started.elapsed() < client.config().read_timeout());
    }

    #[tokio::test]
    async fn test_client_reads_scripted_payload() {
        let codec = BincodeCodec::with_primitives();
        let encoded = codec.encode(&Payload::new(99_u32)).unwrap();
        // u32 encodes to 4 bytes
        assert_eq!(encoded.bytes, vec![99, 0, 0, 0]);
        let (addr, _) = scripted_server(&[0, 0, 0, 0, 4, 99, 0, 0, 0]).await;

        let value = client()
            .fetch_as::<u32>(notification_for(addr, "u32"))
            .await
            .unwrap();
        assert_eq!(value, 99);
    }

    // =============================================================================
    // OPT-IN RETRY
    // =============================================================================

    #[tokio::test]
    async fn test_retry_gives_up_on_unresponsive_server() {
        let (addr, accepted) = silent_server().await;
        let client = client();
        let attempts = client.config().max_read_attempts as usize;

        let result = client
            .fetch_with_retry(notification_for(addr, "string"))
            .await;

        match result {
            Err(ParcelError::ServerError(message)) => assert_eq!(message, "server is unresponsive"),
            other => panic!("expected ServerError, got {other:?}"),
        }
        assert_eq!(accepted.load(Ordering::SeqCst), attempts);
    }

    #[tokio::test]
    async fn test_retry_does_not_repeat_not_found() {
        let (addr, accepted) = scripted_server(&[2]).await;

        let result = client()
            .fetch_with_retry(notification_for(addr, "string"))
            .await;

        assert!(matches!(result, Err(ParcelError::NotFound { .. })));
        assert_eq!(accepted.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_plain_fetch_never_retries() {
        let (addr, accepted) = silent_server().await;

        let result = client().fetch(notification_for(addr, "string")).await;

        assert!(result.unwrap_err().is_timeout());
        assert_eq!(accepted.load(Ordering::SeqCst), 1);
    }
}
