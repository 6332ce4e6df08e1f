//! Test utilities for the parcel relay.
//!
//! Enable with the `test-utils` feature flag.
//!
//! # Example
//!
//! ```ignore
//! use parcel_relay::test_utils::ManualTimeSource;
//! use parcel_relay::TimeSource;
//! use std::time::Duration;
//!
//! let clock = ManualTimeSource::at_secs(1000);
//! clock.advance(Duration::from_secs(360));
//! assert_eq!(clock.now().as_millis(), 1_360_000);
//! ```

use shared_bus::{mailbox, Mailbox, Recipient};
use std::any::Any;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::{Envelope, ParcelMessage, ParcelNotification, Timestamp};
use crate::ports::{NotificationEnveloper, RelayRequest, TimeSource};

/// A clock that only moves when told to.
///
/// Clones share the same time, so one handle can be given to the relay and
/// another kept by the test.
#[derive(Debug, Clone, Default)]
pub struct ManualTimeSource {
    millis: Arc<AtomicU64>,
}

impl ManualTimeSource {
    pub fn new(start: Timestamp) -> Self {
        Self {
            millis: Arc::new(AtomicU64::new(start.as_millis())),
        }
    }

    pub fn at_secs(secs: u64) -> Self {
        Self::new(Timestamp::from_secs(secs))
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let by = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.millis.fetch_add(by, Ordering::SeqCst);
    }

    pub fn set(&self, to: Timestamp) {
        self.millis.store(to.as_millis(), Ordering::SeqCst);
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.millis.load(Ordering::SeqCst))
    }
}

/// Envelope produced by [`TagEnveloper`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedEnvelope {
    pub tag: &'static str,
    pub notification: ParcelNotification,
}

/// Envelopes payloads of type `T` with a fixed tag and passes on the rest.
pub struct TagEnveloper<T> {
    tag: &'static str,
    priority: i32,
    _payload: PhantomData<fn() -> T>,
}

impl<T: Any> TagEnveloper<T> {
    pub fn new(tag: &'static str, priority: i32) -> Self {
        Self {
            tag,
            priority,
            _payload: PhantomData,
        }
    }
}

impl<T: Any> NotificationEnveloper for TagEnveloper<T> {
    fn priority(&self) -> i32 {
        self.priority
    }

    fn envelope(
        &self,
        request: &RelayRequest,
        notification: &ParcelNotification,
    ) -> Option<Envelope> {
        request.payload.is::<T>().then(|| {
            Envelope::new(TaggedEnvelope {
                tag: self.tag,
                notification: notification.clone(),
            })
        })
    }

    fn name(&self) -> &str {
        self.tag
    }
}

/// A mailbox to stand in for the relay's caller.
pub fn recipient_mailbox(
    name: &str,
) -> (Arc<dyn Recipient<ParcelMessage>>, Mailbox<ParcelMessage>) {
    let (address, inbox) = mailbox::<ParcelMessage>(name, 16);
    (Arc::new(address), inbox)
}
