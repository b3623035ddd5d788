use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::{FutureExt, StreamExt};
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use wearlink_codec::{
    degraded_envelope_count, encode_envelope, DeviceInfo, SensorSamples, SensorSetting,
    WireEncode,
};
use wearlink_core::{ConnectionState, StreamKind};
use wearlink_transport::channel::SinkHealthSnapshot;
use wearlink_transport::{EventSink, OutboundEvent, SampleStream, SdkError, SensorSdk};

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::events::streaming_error_event;
use crate::registry::Registry;
use crate::subscription::Subscription;

/// Point-in-time bridge counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    pub events_emitted: u64,
    /// Batches or callbacks that arrived after their stream or device was
    /// torn down.
    pub late_callbacks_dropped: u64,
    pub stream_errors: u64,
    /// Process-wide count of envelopes encoded without a codec.
    pub degraded_envelopes: u64,
    pub active_streams: usize,
    pub sink: SinkHealthSnapshot,
}

#[derive(Debug, Default)]
struct Counters {
    events_emitted: AtomicU64,
    late_callbacks_dropped: AtomicU64,
    stream_errors: AtomicU64,
}

pub(crate) struct Shared {
    pub(crate) sdk: Arc<dyn SensorSdk>,
    sink: Arc<dyn EventSink>,
    registry: Mutex<Registry>,
    pub(crate) config: BridgeConfig,
    counters: Counters,
}

impl Shared {
    pub(crate) fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn emit(&self, event: OutboundEvent) {
        self.counters.events_emitted.fetch_add(1, Ordering::Relaxed);
        self.sink.emit(event);
    }

    pub(crate) fn count_late_callbacks(&self, dropped: u64) {
        self.counters
            .late_callbacks_dropped
            .fetch_add(dropped, Ordering::Relaxed);
    }

    /// Delivers one stream item while holding the registry lock, so a
    /// concurrent disconnect either happens fully before or fully after.
    /// Returns whether the stream should keep running.
    fn deliver(
        &self,
        device_id: &str,
        kind: StreamKind,
        generation: u64,
        item: Result<SensorSamples, SdkError>,
    ) -> bool {
        let mut registry = self.registry();
        if !registry.is_live(device_id, kind, generation) {
            self.count_late_callbacks(1);
            registry.finish_stream(device_id, kind, generation);
            debug!(device_id, kind = %kind, generation, "dropping late stream batch");
            return false;
        }
        match item {
            Ok(batch) => {
                let envelope = encode_envelope(&batch);
                self.emit(OutboundEvent::new(
                    kind.event_name(),
                    Value::String(envelope.to_wire_string()),
                ));
                true
            }
            Err(err) => {
                registry.finish_stream(device_id, kind, generation);
                self.counters.stream_errors.fetch_add(1, Ordering::Relaxed);
                warn!(device_id, kind = %kind, error = %err, "stream terminated by sdk");
                if self.config.emit_stream_errors {
                    self.emit(streaming_error_event(device_id, kind, &err));
                }
                false
            }
        }
    }
}

async fn run_stream(
    shared: Arc<Shared>,
    device_id: String,
    kind: StreamKind,
    generation: u64,
    mut samples: SampleStream,
    mut stop: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            biased;
            _ = &mut stop => {
                // Batches the SDK queued before teardown are never delivered.
                let mut late = 0;
                while let Some(Some(_)) = samples.next().now_or_never() {
                    late += 1;
                }
                if late > 0 {
                    shared.count_late_callbacks(late);
                    debug!(device_id = %device_id, kind = %kind, late, "dropped queued batches");
                }
                return;
            }
            item = samples.next() => match item {
                Some(item) => {
                    if !shared.deliver(&device_id, kind, generation, item) {
                        return;
                    }
                }
                None => break,
            },
        }
    }
    if shared
        .registry()
        .finish_stream(&device_id, kind, generation)
    {
        debug!(device_id = %device_id, kind = %kind, "stream completed");
    }
}

/// Transport adapter between the application channel and the device SDK.
///
/// Cheap to clone; clones share the registry and the SDK handle.
#[derive(Clone)]
pub struct Bridge {
    pub(crate) shared: Arc<Shared>,
}

impl Bridge {
    pub fn new(sdk: Arc<dyn SensorSdk>, sink: Arc<dyn EventSink>, config: BridgeConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                sdk,
                sink,
                registry: Mutex::new(Registry::default()),
                config,
                counters: Counters::default(),
            }),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.shared.config
    }

    pub fn connection_state(&self, device_id: &str) -> ConnectionState {
        self.shared.registry().connection_state(device_id)
    }

    /// Device info from the latest connection callback for `device_id`.
    pub fn device_info(&self, device_id: &str) -> Option<DeviceInfo> {
        self.shared.registry().device_info(device_id).cloned()
    }

    pub fn is_streaming(&self, device_id: &str, kind: StreamKind) -> bool {
        self.shared.registry().is_streaming(device_id, kind)
    }

    pub fn active_streams(&self, device_id: &str) -> Vec<StreamKind> {
        self.shared.registry().active_streams(device_id)
    }

    pub fn stats(&self) -> BridgeStats {
        let counters = &self.shared.counters;
        BridgeStats {
            events_emitted: counters.events_emitted.load(Ordering::Relaxed),
            late_callbacks_dropped: counters.late_callbacks_dropped.load(Ordering::Relaxed),
            stream_errors: counters.stream_errors.load(Ordering::Relaxed),
            degraded_envelopes: degraded_envelope_count(),
            active_streams: self.shared.registry().stream_count(),
            sink: self.shared.sink.health_snapshot(),
        }
    }

    /// Opens an SDK subscription and forwards its batches as
    /// `<kind>DataReceived` events until cancelled, failed or disconnected.
    ///
    /// Must be called from within a tokio runtime.
    pub fn subscribe(
        &self,
        device_id: &str,
        kind: StreamKind,
        settings: SensorSetting,
    ) -> Result<Subscription, BridgeError> {
        let (stop, stopped) = oneshot::channel();
        let generation = self
            .shared
            .registry()
            .begin_stream(device_id, kind, stop)?;
        let samples = self.shared.sdk.start_stream(device_id, kind, settings);
        tokio::spawn(run_stream(
            Arc::clone(&self.shared),
            device_id.to_string(),
            kind,
            generation,
            samples,
            stopped,
        ));
        info!(device_id, kind = %kind, generation, "stream subscribed");
        Ok(Subscription::new(
            Arc::clone(&self.shared),
            device_id.to_string(),
            kind,
            generation,
        ))
    }

    /// Cancels whichever subscription of `kind` is active on the device.
    pub fn stop_stream(&self, device_id: &str, kind: StreamKind) -> bool {
        let stopped = self.shared.registry().cancel_stream(device_id, kind, None);
        if stopped {
            info!(device_id, kind = %kind, "stream stopped");
        }
        stopped
    }
}
