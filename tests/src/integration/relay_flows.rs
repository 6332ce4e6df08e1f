//! # Relay Flows
//!
//! End-to-end flows through a started relay: a request goes into the manager
//! mailbox, the recipient gets a notification (or an envelope), and the
//! payload is pulled back over a real TCP connection.
//!
//! ## Flows Tested:
//!
//! 1. **Round trip**: relay → notification → fetch → same value
//! 2. **At-most-once**: a second fetch of the same notification is `NotFound`
//! 3. **TTL**: unfetched parcels disappear after the sweep
//! 4. **Enveloping**: highest-priority matching enveloper wins
//! 5. **Races**: concurrent fetches of one parcel produce one winner

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    use parcel_relay::test_utils::{
        recipient_mailbox, ManualTimeSource, TagEnveloper, TaggedEnvelope,
    };
    use parcel_relay::{
        BincodeCodec, NotificationEnveloper, ParcelError, ParcelFetcher, ParcelId, ParcelMessage,
        ParcelNotification, ParcelRelayService, RelayConfig, RelayHandle, RelayRequest,
    };
    use serde::{Deserialize, Serialize};
    use shared_bus::Mailbox;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct QueryResult {
        columns: Vec<String>,
        rows: Vec<Vec<i64>>,
    }

    fn codec() -> BincodeCodec {
        BincodeCodec::with_primitives().with_type::<QueryResult>()
    }

    async fn start_relay(
        clock: &ManualTimeSource,
        envelopers: Vec<Arc<dyn NotificationEnveloper>>,
    ) -> RelayHandle {
        let mut service = ParcelRelayService::new(RelayConfig::for_testing(), Arc::new(codec()))
            .with_time_source(Arc::new(clock.clone()));
        for enveloper in envelopers {
            service.register_enveloper(enveloper);
        }
        service.start().await.expect("relay should start")
    }

    async fn next_message(inbox: &mut Mailbox<ParcelMessage>) -> ParcelMessage {
        timeout(Duration::from_secs(2), inbox.recv())
            .await
            .expect("timed out waiting for relay message")
            .expect("recipient mailbox closed")
    }

    async fn relay_and_notify<T>(handle: &RelayHandle, value: T) -> ParcelNotification
    where
        T: std::any::Any + Send + Sync,
    {
        let (recipient, mut inbox) = recipient_mailbox("caller");
        handle.relay(RelayRequest::new(value, recipient)).unwrap();
        next_message(&mut inbox)
            .await
            .into_notification()
            .expect("expected a bare notification")
    }

    // =============================================================================
    // ROUND TRIP & AT-MOST-ONCE
    // =============================================================================

    #[tokio::test]
    async fn test_hello_world_round_trip() {
        let clock = ManualTimeSource::at_secs(1_000);
        let handle = start_relay(&clock, vec![]).await;

        let notification = relay_and_notify(&handle, "Hello world".to_string()).await;
        assert_eq!(notification.payload_type, "string");
        assert_eq!(notification.port, handle.local_addr().port());

        let value: String = handle.client().fetch_as(notification.clone()).await.unwrap();
        assert_eq!(value, "Hello world");

        // The parcel was consumed by the first fetch
        let second = handle.client().fetch(notification).await;
        assert!(matches!(second, Err(ParcelError::NotFound { .. })));

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_custom_type_round_trip() {
        let clock = ManualTimeSource::at_secs(1_000);
        let handle = start_relay(&clock, vec![]).await;
        let result = QueryResult {
            columns: vec!["id".to_string(), "balance".to_string()],
            rows: (0..100).map(|i| vec![i, i * 1_000]).collect(),
        };

        let notification = relay_and_notify(&handle, result.clone()).await;
        let fetched: QueryResult = handle.client().fetch_as(notification).await.unwrap();

        assert_eq!(fetched, result);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_large_payload_arrives_intact() {
        let clock = ManualTimeSource::at_secs(1_000);
        let handle = start_relay(&clock, vec![]).await;
        let blob: Vec<u8> = (0..2 * 1024 * 1024).map(|i| (i % 251) as u8).collect();

        let notification = relay_and_notify(&handle, blob.clone()).await;
        let fetched: Vec<u8> = handle.client().fetch_as(notification).await.unwrap();

        assert_eq!(fetched.len(), blob.len());
        assert_eq!(fetched, blob);
        assert!(handle.metrics().snapshot().bytes_served > blob.len() as u64);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let clock = ManualTimeSource::at_secs(1_000);
        let handle = start_relay(&clock, vec![]).await;

        let notification = ParcelNotification {
            host: "127.0.0.1".to_string(),
            port: handle.local_addr().port(),
            id: ParcelId::new(),
            payload_type: "string".to_string(),
        };
        let result = handle.client().fetch(notification).await;

        assert!(matches!(result, Err(ParcelError::NotFound { .. })));
        assert_eq!(handle.metrics().snapshot().fetches_not_found, 1);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_type_mismatch_still_consumes_parcel() {
        let clock = ManualTimeSource::at_secs(1_000);
        let handle = start_relay(&clock, vec![]).await;

        let notification = relay_and_notify(&handle, 12_i64).await;
        let result = handle.client().fetch_as::<String>(notification.clone()).await;
        assert!(matches!(result, Err(ParcelError::TypeMismatch { .. })));

        let again = handle.client().fetch(notification).await;
        assert!(matches!(again, Err(ParcelError::NotFound { .. })));
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_client_as_fetcher_port() {
        let clock = ManualTimeSource::at_secs(1_000);
        let handle = start_relay(&clock, vec![]).await;
        let fetcher: Arc<dyn ParcelFetcher> = Arc::new(handle.client());

        let notification = relay_and_notify(&handle, 2.5_f64).await;
        let payload = fetcher.fetch(notification).await.unwrap();

        assert_eq!(payload.downcast_ref::<f64>(), Some(&2.5));
        handle.shutdown().await;
    }

    // =============================================================================
    // TTL EVICTION
    // =============================================================================

    #[tokio::test]
    async fn test_expired_parcel_is_not_found() {
        let clock = ManualTimeSource::at_secs(1_000);
        let handle = start_relay(&clock, vec![]).await;

        let notification = relay_and_notify(&handle, "stale".to_string()).await;
        clock.advance(Duration::from_secs(6 * 60));
        assert_eq!(handle.sweep_now(), 1);

        let result = handle.client().fetch(notification).await;
        assert!(matches!(result, Err(ParcelError::NotFound { .. })));
        assert_eq!(handle.metrics().snapshot().parcels_evicted, 1);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_parcel_within_ttl_survives_sweep() {
        let clock = ManualTimeSource::at_secs(1_000);
        let handle = start_relay(&clock, vec![]).await;

        let notification = relay_and_notify(&handle, "fresh".to_string()).await;
        clock.advance(Duration::from_secs(4 * 60));
        assert_eq!(handle.sweep_now(), 0);

        let value: String = handle.client().fetch_as(notification).await.unwrap();
        assert_eq!(value, "fresh");
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_per_request_ttl() {
        let clock = ManualTimeSource::at_secs(1_000);
        let handle = start_relay(&clock, vec![]).await;
        let (recipient, mut inbox) = recipient_mailbox("caller");

        handle
            .relay(RelayRequest::new(1_u32, recipient).with_ttl(Duration::from_secs(10)))
            .unwrap();
        let notification = next_message(&mut inbox).await.into_notification().unwrap();

        clock.advance(Duration::from_secs(11));
        assert_eq!(handle.sweep_now(), 1);
        assert!(!handle.store().contains(&notification.id));
        handle.shutdown().await;
    }

    // =============================================================================
    // ENVELOPING
    // =============================================================================

    fn envelopers() -> Vec<Arc<dyn NotificationEnveloper>> {
        vec![
            Arc::new(TagEnveloper::<i32>::new("int2", 0)),
            Arc::new(TagEnveloper::<i32>::new("int", 1)),
            Arc::new(TagEnveloper::<f64>::new("double", 0)),
        ]
    }

    async fn relay_and_unwrap<T>(handle: &RelayHandle, value: T) -> TaggedEnvelope
    where
        T: std::any::Any + Send + Sync,
    {
        let (recipient, mut inbox) = recipient_mailbox("caller");
        handle.relay(RelayRequest::new(value, recipient)).unwrap();
        next_message(&mut inbox)
            .await
            .into_envelope()
            .expect("expected an envelope")
            .downcast::<TaggedEnvelope>()
            .expect("expected a TaggedEnvelope")
    }

    #[tokio::test]
    async fn test_highest_priority_enveloper_wins() {
        let clock = ManualTimeSource::at_secs(1_000);
        let handle = start_relay(&clock, envelopers()).await;

        let envelope = relay_and_unwrap(&handle, 42_i32).await;
        assert_eq!(envelope.tag, "int");

        let value: i32 = handle.client().fetch_as(envelope.notification).await.unwrap();
        assert_eq!(value, 42);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_matching_enveloper_by_type() {
        let clock = ManualTimeSource::at_secs(1_000);
        let handle = start_relay(&clock, envelopers()).await;

        let envelope = relay_and_unwrap(&handle, 0.25_f64).await;
        assert_eq!(envelope.tag, "double");
        assert_eq!(envelope.notification.payload_type, "f64");
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_no_matching_enveloper_sends_notification() {
        let clock = ManualTimeSource::at_secs(1_000);
        let handle = start_relay(&clock, envelopers()).await;

        let notification = relay_and_notify(&handle, "plain".to_string()).await;
        assert_eq!(notification.payload_type, "string");

        let snapshot = handle.metrics().snapshot();
        assert_eq!(snapshot.parcels_relayed, 1);
        assert_eq!(snapshot.envelopes_produced, 0);
        handle.shutdown().await;
    }

    // =============================================================================
    // FAILURES & CONCURRENCY
    // =============================================================================

    #[tokio::test]
    async fn test_unregistered_payload_is_dropped_silently() {
        struct NotSerializable;

        let clock = ManualTimeSource::at_secs(1_000);
        let handle = start_relay(&clock, vec![]).await;
        let (recipient, mut inbox) = recipient_mailbox("caller");

        handle
            .relay(RelayRequest::new(NotSerializable, recipient))
            .unwrap();

        let received = timeout(Duration::from_millis(200), inbox.recv()).await;
        assert!(received.is_err() || received.unwrap().is_none());
        assert!(handle.store().is_empty());
        assert_eq!(handle.metrics().snapshot().relay_failures, 1);
        handle.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_fetch_has_one_winner() {
        let clock = ManualTimeSource::at_secs(1_000);
        let handle = start_relay(&clock, vec![]).await;

        for round in 0..20 {
            let notification = relay_and_notify(&handle, format!("round {round}")).await;
            let first = handle.client();
            let second = handle.client();

            let (a, b) = tokio::join!(
                first.fetch(notification.clone()),
                second.fetch(notification)
            );

            let not_found = [&a, &b]
                .iter()
                .filter(|r| matches!(r, Err(ParcelError::NotFound { .. })))
                .count();
            assert_eq!(not_found, 1, "round {round}");

            let winner = a.or(b).expect("one fetch should win");
            assert_eq!(
                winner.downcast_ref::<String>().map(String::as_str),
                Some(format!("round {round}").as_str()),
                "round {round}"
            );
        }

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_many_parcels_to_one_recipient() {
        let clock = ManualTimeSource::at_secs(1_000);
        let handle = start_relay(&clock, vec![]).await;
        let (recipient, mut inbox) = recipient_mailbox("bulk");

        for i in 0..10_u64 {
            handle
                .address()
                .tell(RelayRequest::new(i, Arc::clone(&recipient)))
                .unwrap();
        }

        let mut values = Vec::new();
        for _ in 0..10 {
            let notification = next_message(&mut inbox).await.into_notification().unwrap();
            values.push(handle.client().fetch_as::<u64>(notification).await.unwrap());
        }

        // One sender, so mailbox order is preserved
        assert_eq!(values, (0..10).collect::<Vec<_>>());
        assert!(handle.store().is_empty());
        handle.shutdown().await;
    }
}
