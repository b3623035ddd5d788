//! SDK callback translation into application events.

use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, info};
use wearlink_codec::{encode_envelope, SensorSamples, WireEncode};
use wearlink_core::{ConnectionState, StreamKind};
use wearlink_transport::{OutboundEvent, SdkError, SdkEvent};

use crate::bridge::Bridge;

pub const BLE_POWER_STATE_CHANGED: &str = "blePowerStateChanged";
pub const DEVICE_CONNECTING: &str = "deviceConnecting";
pub const DEVICE_CONNECTED: &str = "deviceConnected";
pub const DEVICE_DISCONNECTED: &str = "deviceDisconnected";
pub const STREAMING_FEATURES_READY: &str = "streamingFeaturesReady";
pub const SDK_MODE_FEATURE_AVAILABLE: &str = "sdkModeFeatureAvailable";
pub const HR_FEATURE_READY: &str = "hrFeatureReady";
pub const FTP_FEATURE_READY: &str = "polarFtpFeatureReady";
pub const DIS_INFORMATION_RECEIVED: &str = "disInformationReceived";
pub const BATTERY_LEVEL_RECEIVED: &str = "batteryLevelReceived";
pub const HR_NOTIFICATION_RECEIVED: &str = "hrNotificationReceived";
pub const DISK_SPACE_RECEIVED: &str = "diskSpaceReceived";
pub const STREAMING_ERROR: &str = "streamingError";

/// Maps one SDK callback to its application event. Structured payloads are
/// carried as serialized JSON strings.
pub fn translate(event: &SdkEvent) -> OutboundEvent {
    match event {
        SdkEvent::BlePowerStateChanged { powered } => {
            OutboundEvent::new(BLE_POWER_STATE_CHANGED, Value::Bool(*powered))
        }
        SdkEvent::DeviceConnecting(info) => {
            OutboundEvent::new(DEVICE_CONNECTING, Value::String(info.to_wire_string()))
        }
        SdkEvent::DeviceConnected(info) => {
            OutboundEvent::new(DEVICE_CONNECTED, Value::String(info.to_wire_string()))
        }
        SdkEvent::DeviceDisconnected(info) => {
            OutboundEvent::new(DEVICE_DISCONNECTED, Value::String(info.to_wire_string()))
        }
        SdkEvent::StreamingFeaturesReady {
            device_id,
            features,
        } => {
            let names: Vec<&str> = features.iter().map(|feature| feature.name()).collect();
            OutboundEvent::new(
                STREAMING_FEATURES_READY,
                json!([device_id, Value::from(names).to_string()]),
            )
        }
        SdkEvent::SdkModeFeatureAvailable { device_id } => {
            OutboundEvent::new(SDK_MODE_FEATURE_AVAILABLE, json!(device_id))
        }
        SdkEvent::HrFeatureReady { device_id } => {
            OutboundEvent::new(HR_FEATURE_READY, json!(device_id))
        }
        SdkEvent::FtpFeatureReady { device_id } => {
            OutboundEvent::new(FTP_FEATURE_READY, json!(device_id))
        }
        SdkEvent::DisInformationReceived {
            device_id,
            uuid,
            value,
        } => OutboundEvent::new(DIS_INFORMATION_RECEIVED, json!([device_id, uuid, value])),
        SdkEvent::BatteryLevelReceived { device_id, level } => {
            OutboundEvent::new(BATTERY_LEVEL_RECEIVED, json!([device_id, level]))
        }
        SdkEvent::HrNotificationReceived { device_id, sample } => {
            let envelope = encode_envelope(&SensorSamples::Hr(vec![sample.clone()]));
            OutboundEvent::new(
                HR_NOTIFICATION_RECEIVED,
                json!([device_id, envelope.to_wire_string()]),
            )
        }
        SdkEvent::DiskSpaceReceived { device_id, disk } => OutboundEvent::new(
            DISK_SPACE_RECEIVED,
            json!([device_id, disk.to_wire_string()]),
        ),
    }
}

pub(crate) fn streaming_error_event(
    device_id: &str,
    kind: StreamKind,
    err: &SdkError,
) -> OutboundEvent {
    OutboundEvent::new(
        STREAMING_ERROR,
        json!([device_id, kind.wire_name(), err.to_string()]),
    )
}

impl Bridge {
    /// Applies one SDK callback to the registry and forwards it.
    ///
    /// Safe to call from any thread. A disconnect cancels every stream of
    /// the device before `deviceDisconnected` is emitted. Device callbacks
    /// other than connection changes are dropped and counted unless the
    /// device is Connected.
    pub fn handle_sdk_event(&self, event: SdkEvent) {
        let mut registry = self.shared.registry();
        match &event {
            SdkEvent::BlePowerStateChanged { .. } => {}
            SdkEvent::DeviceConnecting(device) => {
                let cancelled = registry.set_connecting(device);
                if !cancelled.is_empty() {
                    info!(
                        device_id = %device.device_id,
                        cancelled_streams = cancelled.len(),
                        "device reconnecting"
                    );
                }
            }
            SdkEvent::DeviceConnected(device) => {
                registry.set_connected(device);
                info!(device_id = %device.device_id, "device connected");
            }
            SdkEvent::DeviceDisconnected(device) => {
                let cancelled = registry.set_disconnected(&device.device_id);
                info!(
                    device_id = %device.device_id,
                    cancelled_streams = cancelled.len(),
                    "device disconnected"
                );
            }
            _ => {
                if let Some(device_id) = event.device_id() {
                    if registry.connection_state(device_id) != ConnectionState::Connected {
                        self.shared.count_late_callbacks(1);
                        debug!(device_id, "dropping callback for device that is not connected");
                        return;
                    }
                }
            }
        }
        self.shared.emit(translate(&event));
    }

    /// Forwards SDK callbacks from a channel until the sender side closes.
    pub async fn pump_sdk_events(&self, mut events: mpsc::UnboundedReceiver<SdkEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_sdk_event(event);
        }
        debug!("sdk event channel closed");
    }
}
