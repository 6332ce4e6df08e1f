//! Enveloper Registry - picks how a notification is presented to its recipient.

use std::cmp::Reverse;
use std::sync::Arc;
use tracing::debug;

use crate::domain::{Envelope, ParcelNotification};
use crate::ports::{NotificationEnveloper, RelayRequest};

/// Envelopers ordered by descending priority.
///
/// Equal priorities keep registration order.
#[derive(Default, Clone)]
pub struct EnveloperRegistry {
    envelopers: Vec<Arc<dyn NotificationEnveloper>>,
}

impl EnveloperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an enveloper.
    pub fn register(&mut self, enveloper: Arc<dyn NotificationEnveloper>) {
        debug!(
            enveloper = enveloper.name(),
            priority = enveloper.priority(),
            "Registered notification enveloper"
        );
        self.envelopers.push(enveloper);
        // Stable sort
        self.envelopers.sort_by_key(|e| Reverse(e.priority()));
    }

    /// Ask envelopers in priority order; the first `Some` wins.
    pub fn select_envelope(
        &self,
        request: &RelayRequest,
        notification: &ParcelNotification,
    ) -> Option<Envelope> {
        self.envelopers
            .iter()
            .find_map(|enveloper| enveloper.envelope(request, notification))
    }

    pub fn len(&self) -> usize {
        self.envelopers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.envelopers.is_empty()
    }
}

impl std::fmt::Debug for EnveloperRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.envelopers.iter().map(|e| (e.name(), e.priority())))
            .finish()
    }
}
