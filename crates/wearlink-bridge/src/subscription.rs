use std::fmt;
use std::sync::Arc;

use tracing::info;
use wearlink_core::StreamKind;

use crate::bridge::Shared;

/// Handle to one (device, stream kind) subscription.
///
/// Dropping the handle does not stop the stream; call [`Subscription::cancel`].
/// Cancelling an already replaced or torn-down subscription is a no-op.
#[derive(Clone)]
pub struct Subscription {
    shared: Arc<Shared>,
    device_id: String,
    kind: StreamKind,
    generation: u64,
}

impl Subscription {
    pub(crate) fn new(
        shared: Arc<Shared>,
        device_id: String,
        kind: StreamKind,
        generation: u64,
    ) -> Self {
        Self {
            shared,
            device_id,
            kind,
            generation,
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    pub fn is_active(&self) -> bool {
        self.shared
            .registry()
            .is_live(&self.device_id, self.kind, self.generation)
    }

    /// Unsubscribes from the SDK. Other streams of the device are untouched.
    pub fn cancel(&self) -> bool {
        let cancelled = self.shared.registry().cancel_stream(
            &self.device_id,
            self.kind,
            Some(self.generation),
        );
        if cancelled {
            info!(
                device_id = %self.device_id,
                kind = %self.kind,
                generation = self.generation,
                "subscription cancelled"
            );
        }
        cancelled
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("device_id", &self.device_id)
            .field("kind", &self.kind)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}
