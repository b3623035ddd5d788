//! Application lifecycle passthrough.

use tracing::info;

use crate::bridge::Bridge;

/// Host application lifecycle transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Foreground,
    Background,
    /// The host is going away; every stream is cancelled before the SDK
    /// is shut down.
    Teardown,
}

impl Bridge {
    pub fn handle_lifecycle(&self, event: LifecycleEvent) {
        let sdk = &self.shared.sdk;
        match event {
            LifecycleEvent::Foreground => sdk.foreground_entered(),
            LifecycleEvent::Background => sdk.background_entered(),
            LifecycleEvent::Teardown => {
                let cancelled = self.shared.registry().cancel_all();
                info!(cancelled_streams = cancelled, "bridge teardown");
                sdk.shutdown();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use wearlink_codec::{DeviceInfo, SensorSetting};
    use wearlink_core::StreamKind;
    use wearlink_transport::mock::{MemoryEventSink, MockSdk};
    use wearlink_transport::SdkEvent;

    use super::*;
    use crate::config::BridgeConfig;

    #[tokio::test]
    async fn lifecycle_hooks_reach_the_sdk_and_teardown_stops_streams() {
        let sdk = Arc::new(MockSdk::new());
        let sink = Arc::new(MemoryEventSink::new());
        let bridge = Bridge::new(sdk.clone(), sink, BridgeConfig::default());
        bridge.handle_sdk_event(SdkEvent::DeviceConnected(DeviceInfo::unnamed("A1")));
        bridge
            .subscribe("A1", StreamKind::Acc, SensorSetting::new())
            .expect("connected device can stream");

        bridge.handle_lifecycle(LifecycleEvent::Background);
        bridge.handle_lifecycle(LifecycleEvent::Foreground);
        bridge.handle_lifecycle(LifecycleEvent::Teardown);

        assert!(bridge.active_streams("A1").is_empty());
        let calls = sdk.calls();
        assert_eq!(
            calls[calls.len() - 3..],
            ["background", "foreground", "shutdown"]
        );
    }
}
