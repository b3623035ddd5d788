use async_trait::async_trait;
use futures_util::stream::BoxStream;
use thiserror::Error;
use wearlink_codec::ftu::FirstTimeUseConfig;
use wearlink_codec::offline::{OfflineRecordingData, OfflineRecordingEntry};
use wearlink_codec::records::{DeviceInfo, DiskSpaceData, ExerciseEntry, LedConfig};
use wearlink_codec::sample::HrSample;
use wearlink_codec::settings::{AvailableSettings, SensorSetting};
use wearlink_codec::SensorSamples;
use wearlink_core::{DeviceDataType, StreamKind};

/// Failure reported by the device SDK.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SdkError {
    #[error("device {0} is not connected")]
    NotConnected(String),
    #[error("device {device_id} does not support {feature}")]
    Unsupported { device_id: String, feature: String },
    #[error("operation timed out")]
    Timeout,
    #[error("sdk operation failed: {0}")]
    Failed(String),
}

/// Live sample batches for one (device, stream kind) subscription.
///
/// The SDK subscription is held by the stream; dropping it unsubscribes.
pub type SampleStream = BoxStream<'static, Result<SensorSamples, SdkError>>;

/// Callback delivered by the SDK from its own worker context.
#[derive(Debug, Clone, PartialEq)]
pub enum SdkEvent {
    BlePowerStateChanged {
        powered: bool,
    },
    DeviceConnecting(DeviceInfo),
    DeviceConnected(DeviceInfo),
    DeviceDisconnected(DeviceInfo),
    StreamingFeaturesReady {
        device_id: String,
        features: Vec<DeviceDataType>,
    },
    SdkModeFeatureAvailable {
        device_id: String,
    },
    HrFeatureReady {
        device_id: String,
    },
    FtpFeatureReady {
        device_id: String,
    },
    DisInformationReceived {
        device_id: String,
        uuid: String,
        value: String,
    },
    BatteryLevelReceived {
        device_id: String,
        level: u8,
    },
    HrNotificationReceived {
        device_id: String,
        sample: HrSample,
    },
    DiskSpaceReceived {
        device_id: String,
        disk: DiskSpaceData,
    },
}

impl SdkEvent {
    /// Device the event concerns; `None` for adapter-wide events.
    pub fn device_id(&self) -> Option<&str> {
        match self {
            SdkEvent::BlePowerStateChanged { .. } => None,
            SdkEvent::DeviceConnecting(info)
            | SdkEvent::DeviceConnected(info)
            | SdkEvent::DeviceDisconnected(info) => Some(&info.device_id),
            SdkEvent::StreamingFeaturesReady { device_id, .. }
            | SdkEvent::SdkModeFeatureAvailable { device_id }
            | SdkEvent::HrFeatureReady { device_id }
            | SdkEvent::FtpFeatureReady { device_id }
            | SdkEvent::DisInformationReceived { device_id, .. }
            | SdkEvent::BatteryLevelReceived { device_id, .. }
            | SdkEvent::HrNotificationReceived { device_id, .. }
            | SdkEvent::DiskSpaceReceived { device_id, .. } => Some(device_id),
        }
    }
}

/// Device SDK contract used by the bridge.
///
/// Connection methods only request a transition; the resulting state change
/// arrives later as an [`SdkEvent`].
#[async_trait]
pub trait SensorSdk: Send + Sync + 'static {
    async fn connect(&self, device_id: &str) -> Result<(), SdkError>;
    async fn disconnect(&self, device_id: &str) -> Result<(), SdkError>;

    async fn request_stream_settings(
        &self,
        device_id: &str,
        kind: StreamKind,
    ) -> Result<AvailableSettings, SdkError>;

    /// Opens a sample subscription. Kinds that take no settings receive an
    /// empty [`SensorSetting`].
    fn start_stream(&self, device_id: &str, kind: StreamKind, settings: SensorSetting)
        -> SampleStream;

    async fn disk_space(&self, device_id: &str) -> Result<DiskSpaceData, SdkError>;
    async fn set_led_config(&self, device_id: &str, config: LedConfig) -> Result<(), SdkError>;
    async fn do_first_time_use(
        &self,
        device_id: &str,
        config: FirstTimeUseConfig,
    ) -> Result<(), SdkError>;

    async fn list_exercises(&self, device_id: &str) -> Result<Vec<ExerciseEntry>, SdkError>;
    async fn remove_exercise(&self, device_id: &str, entry: ExerciseEntry)
        -> Result<(), SdkError>;

    async fn list_offline_recordings(
        &self,
        device_id: &str,
    ) -> Result<Vec<OfflineRecordingEntry>, SdkError>;
    async fn get_offline_record(
        &self,
        device_id: &str,
        entry: &OfflineRecordingEntry,
    ) -> Result<OfflineRecordingData, SdkError>;
    async fn remove_offline_record(
        &self,
        device_id: &str,
        entry: &OfflineRecordingEntry,
    ) -> Result<(), SdkError>;

    fn foreground_entered(&self) {}

    fn background_entered(&self) {}

    /// Releases SDK resources; no further calls follow.
    fn shutdown(&self) {}
}
