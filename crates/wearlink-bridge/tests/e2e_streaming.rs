use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use wearlink_bridge::{Bridge, BridgeConfig};
use wearlink_codec::sample::{AccSample, EcgSample, HrSample};
use wearlink_codec::{AvailableSettings, DeviceInfo, SensorSamples, SensorSetting, SettingType};
use wearlink_core::{ConnectionState, StreamKind};
use wearlink_transport::mock::{MemoryEventSink, MockSdk};
use wearlink_transport::{MethodCall, MethodResponse, SdkError, SdkEvent};

const DEVICE: &str = "C19E1A21";

struct Harness {
    sdk: Arc<MockSdk>,
    sink: Arc<MemoryEventSink>,
    bridge: Bridge,
}

impl Harness {
    fn new(config: BridgeConfig) -> Self {
        let sdk = Arc::new(MockSdk::new());
        let sink = Arc::new(MemoryEventSink::new());
        let bridge = Bridge::new(sdk.clone(), sink.clone(), config);
        Self { sdk, sink, bridge }
    }

    fn connected() -> Self {
        let harness = Self::new(BridgeConfig::default());
        harness
            .bridge
            .handle_sdk_event(SdkEvent::DeviceConnecting(DeviceInfo::unnamed(DEVICE)));
        harness
            .bridge
            .handle_sdk_event(SdkEvent::DeviceConnected(DeviceInfo::unnamed(DEVICE)));
        harness
    }

    async fn call(&self, method: &str, arguments: Value) -> MethodResponse {
        self.bridge
            .handle_method_call(MethodCall::new(method, arguments))
            .await
    }

    fn envelopes(&self, event: &str) -> Vec<Value> {
        self.sink
            .named(event)
            .into_iter()
            .map(|event| {
                let raw = event.payload.as_str().expect("envelope should be serialized");
                serde_json::from_str(raw).expect("envelope should be json")
            })
            .collect()
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

fn ecg(timestamp: u64, voltage: i32) -> EcgSample {
    EcgSample { timestamp, voltage }
}

#[tokio::test]
async fn ecg_batch_arrives_once_in_acquisition_order() {
    let h = Harness::connected();
    let response = h
        .call("startStreaming", json!([DEVICE, "ecg", "{\"0\":[130]}"]))
        .await;
    assert_eq!(response, MethodResponse::ok());

    settle().await;
    assert!(h.sink.named("ecgDataReceived").is_empty());

    let started = h.sdk.started_streams();
    assert_eq!(started.len(), 1);
    assert_eq!(started[0].1, StreamKind::Ecg);
    assert_eq!(started[0].2.get(SettingType::SampleRate), Some(130));

    let batch = SensorSamples::Ecg(vec![ecg(100, 10), ecg(200, -5), ecg(300, 7)]);
    assert!(h.sdk.push_samples(DEVICE, StreamKind::Ecg, batch));
    assert!(wait_until(|| !h.sink.named("ecgDataReceived").is_empty()).await);
    settle().await;

    let envelopes = h.envelopes("ecgDataReceived");
    assert_eq!(envelopes.len(), 1);
    assert_eq!(
        envelopes[0],
        json!({
            "samples": [
                { "timeStamp": 100, "voltage": 10 },
                { "timeStamp": 200, "voltage": -5 },
                { "timeStamp": 300, "voltage": 7 },
            ]
        })
    );
}

#[tokio::test]
async fn unspecified_settings_start_at_the_device_maximum() {
    let h = Harness::connected();
    h.sdk.set_available_settings(
        AvailableSettings::new()
            .with(SettingType::SampleRate, [25, 50, 100, 200])
            .with(SettingType::Range, [2, 4, 8]),
    );
    assert!(h.call("startStreaming", json!([DEVICE, "acc"])).await.is_success());

    let started = h.sdk.started_streams();
    let settings = &started[0].2;
    assert_eq!(settings.get(SettingType::SampleRate), Some(200));
    assert_eq!(settings.get(SettingType::Range), Some(8));
    assert!(h
        .sdk
        .calls()
        .contains(&format!("requestStreamSettings:{DEVICE}:acc")));
}

#[tokio::test]
async fn max_settings_lookup_can_be_disabled() {
    let h = Harness::new(BridgeConfig {
        use_max_settings_when_unspecified: false,
        ..BridgeConfig::default()
    });
    h.bridge
        .handle_sdk_event(SdkEvent::DeviceConnected(DeviceInfo::unnamed(DEVICE)));
    assert!(h.call("startStreaming", json!([DEVICE, "gyro"])).await.is_success());
    assert!(h.sdk.started_streams()[0].2.is_empty());
}

#[tokio::test]
async fn streaming_before_connected_is_a_state_error() {
    let h = Harness::new(BridgeConfig::default());
    h.bridge
        .handle_sdk_event(SdkEvent::DeviceConnecting(DeviceInfo::unnamed(DEVICE)));
    assert_eq!(h.bridge.connection_state(DEVICE), ConnectionState::Connecting);

    let response = h.call("startStreaming", json!([DEVICE, "ecg"])).await;
    assert_eq!(response.error_code(), Some("state"));
    let response = h.call("startPpiStreaming", json!(DEVICE)).await;
    assert_eq!(response.error_code(), Some("state"));
    assert!(h.sdk.started_streams().is_empty());
}

#[tokio::test]
async fn stopping_one_stream_leaves_the_other_running() {
    let h = Harness::connected();
    assert!(h
        .call("startStreaming", json!([DEVICE, "ecg", { "0": [130] }]))
        .await
        .is_success());
    assert!(h
        .call("startStreaming", json!([DEVICE, "acc", { "0": [52] }]))
        .await
        .is_success());

    assert_eq!(
        h.call("stopStreaming", json!([DEVICE, "ecg"])).await,
        MethodResponse::Success(json!(true))
    );
    assert_eq!(
        h.call("stopStreaming", json!([DEVICE, "ecg"])).await,
        MethodResponse::Success(json!(false))
    );
    assert!(!h.bridge.is_streaming(DEVICE, StreamKind::Ecg));
    assert!(h.bridge.is_streaming(DEVICE, StreamKind::Acc));
    assert!(wait_until(|| !h.sdk.is_streaming(DEVICE, StreamKind::Ecg)).await);
    assert!(h.sdk.is_streaming(DEVICE, StreamKind::Acc));

    let acc = SensorSamples::Acc(vec![AccSample {
        timestamp: 1,
        x: 1,
        y: 2,
        z: 3,
    }]);
    assert!(h.sdk.push_samples(DEVICE, StreamKind::Acc, acc));
    assert!(wait_until(|| h.sink.named("accDataReceived").len() == 1).await);
    assert_eq!(h.bridge.active_streams(DEVICE), vec![StreamKind::Acc]);
}

#[tokio::test]
async fn disconnect_cancels_every_stream_of_the_device() {
    let h = Harness::connected();
    assert!(h
        .call("startStreaming", json!([DEVICE, "ecg", {}]))
        .await
        .is_success());
    assert!(h.call("startPpiStreaming", json!(DEVICE)).await.is_success());
    assert_eq!(h.bridge.stats().active_streams, 2);

    h.bridge
        .handle_sdk_event(SdkEvent::DeviceDisconnected(DeviceInfo::unnamed(DEVICE)));
    assert_eq!(h.bridge.stats().active_streams, 0);
    assert!(wait_until(|| {
        !h.sdk.is_streaming(DEVICE, StreamKind::Ecg) && !h.sdk.is_streaming(DEVICE, StreamKind::Ppi)
    })
    .await);
    assert!(!h
        .sdk
        .push_samples(DEVICE, StreamKind::Ecg, SensorSamples::Ecg(vec![ecg(1, 1)])));
    settle().await;
    assert!(h.sink.named("ecgDataReceived").is_empty());
    assert_eq!(h.sink.named("deviceDisconnected").len(), 1);
}

#[tokio::test]
async fn falling_back_to_connecting_releases_streams() {
    let h = Harness::connected();
    assert!(h
        .call("startStreaming", json!([DEVICE, "ecg", { "0": [130] }]))
        .await
        .is_success());
    assert!(h.bridge.is_streaming(DEVICE, StreamKind::Ecg));

    h.bridge
        .handle_sdk_event(SdkEvent::DeviceConnecting(DeviceInfo::unnamed(DEVICE)));
    assert!(!h.bridge.is_streaming(DEVICE, StreamKind::Ecg));
    assert_eq!(h.bridge.stats().active_streams, 0);
    assert!(wait_until(|| !h.sdk.is_streaming(DEVICE, StreamKind::Ecg)).await);

    h.bridge
        .handle_sdk_event(SdkEvent::DeviceConnected(DeviceInfo::unnamed(DEVICE)));
    assert!(h.bridge.active_streams(DEVICE).is_empty());
    assert_eq!(
        h.call("stopStreaming", json!([DEVICE, "ecg"])).await,
        MethodResponse::Success(json!(false))
    );

    assert!(h
        .call("startStreaming", json!([DEVICE, "ecg", { "0": [130] }]))
        .await
        .is_success());
    assert!(h
        .sdk
        .push_samples(DEVICE, StreamKind::Ecg, SensorSamples::Ecg(vec![ecg(5, 5)])));
    assert!(wait_until(|| h.sink.named("ecgDataReceived").len() == 1).await);
}

#[tokio::test]
async fn batch_queued_before_disconnect_is_dropped_and_counted() {
    let h = Harness::connected();
    h.bridge
        .subscribe(DEVICE, StreamKind::Ecg, SensorSetting::new())
        .expect("ecg subscription");

    // No await between the push and the disconnect: the stream task has
    // not seen the batch yet.
    assert!(h
        .sdk
        .push_samples(DEVICE, StreamKind::Ecg, SensorSamples::Ecg(vec![ecg(1, 1)])));
    h.bridge
        .handle_sdk_event(SdkEvent::DeviceDisconnected(DeviceInfo::unnamed(DEVICE)));

    assert!(wait_until(|| h.bridge.stats().late_callbacks_dropped == 1).await);
    assert!(wait_until(|| !h.sdk.is_streaming(DEVICE, StreamKind::Ecg)).await);
    settle().await;
    assert!(h.sink.named("ecgDataReceived").is_empty());
    assert_eq!(h.bridge.stats().late_callbacks_dropped, 1);
}

#[tokio::test]
async fn device_callbacks_require_a_connected_device() {
    let h = Harness::new(BridgeConfig::default());
    h.bridge.handle_sdk_event(SdkEvent::BatteryLevelReceived {
        device_id: DEVICE.to_string(),
        level: 80,
    });
    h.bridge
        .handle_sdk_event(SdkEvent::DeviceConnecting(DeviceInfo::unnamed(DEVICE)));
    h.bridge.handle_sdk_event(SdkEvent::HrFeatureReady {
        device_id: DEVICE.to_string(),
    });
    h.bridge
        .handle_sdk_event(SdkEvent::BlePowerStateChanged { powered: true });
    assert!(h.sink.named("batteryLevelReceived").is_empty());
    assert!(h.sink.named("hrFeatureReady").is_empty());
    assert_eq!(h.sink.named("blePowerStateChanged").len(), 1);
    assert_eq!(h.bridge.stats().late_callbacks_dropped, 2);

    h.bridge
        .handle_sdk_event(SdkEvent::DeviceConnected(DeviceInfo::unnamed(DEVICE)));
    h.bridge.handle_sdk_event(SdkEvent::DisInformationReceived {
        device_id: DEVICE.to_string(),
        uuid: "00002a28".to_string(),
        value: "3.1.0".to_string(),
    });
    h.bridge
        .handle_sdk_event(SdkEvent::DeviceDisconnected(DeviceInfo::unnamed(DEVICE)));
    h.bridge.handle_sdk_event(SdkEvent::BatteryLevelReceived {
        device_id: DEVICE.to_string(),
        level: 79,
    });
    assert_eq!(h.sink.named("disInformationReceived").len(), 1);
    assert!(h.sink.named("batteryLevelReceived").is_empty());
    assert_eq!(h.bridge.stats().late_callbacks_dropped, 3);
}

#[tokio::test]
async fn late_hr_notification_is_dropped_and_counted() {
    let h = Harness::connected();
    let sample = HrSample {
        timestamp: 0,
        hr: 70,
        ppg_quality: 0,
        corrected_hr: 0,
        rrs_ms: Vec::new(),
        rr_available: false,
        contact_status: true,
        contact_status_supported: true,
    };
    h.bridge.handle_sdk_event(SdkEvent::HrNotificationReceived {
        device_id: DEVICE.to_string(),
        sample: sample.clone(),
    });
    h.bridge
        .handle_sdk_event(SdkEvent::DeviceDisconnected(DeviceInfo::unnamed(DEVICE)));
    h.bridge.handle_sdk_event(SdkEvent::HrNotificationReceived {
        device_id: DEVICE.to_string(),
        sample,
    });

    assert_eq!(h.sink.named("hrNotificationReceived").len(), 1);
    assert_eq!(h.bridge.stats().late_callbacks_dropped, 1);
}

#[tokio::test]
async fn stream_failure_emits_streaming_error_and_frees_the_slot() {
    let h = Harness::connected();
    assert!(h
        .call("startStreaming", json!([DEVICE, "ohr", { "0": [55] }]))
        .await
        .is_success());
    assert!(h.sdk.fail_stream(
        DEVICE,
        StreamKind::Ohr,
        SdkError::Failed("pmd control point rejected".to_string())
    ));
    assert!(wait_until(|| !h.sink.named("streamingError").is_empty()).await);

    let error = &h.sink.named("streamingError")[0];
    assert_eq!(
        error.payload,
        json!([DEVICE, "ohr", "sdk operation failed: pmd control point rejected"])
    );
    assert!(h.bridge.active_streams(DEVICE).is_empty());
    assert_eq!(h.bridge.stats().stream_errors, 1);
}

#[tokio::test]
async fn subscription_cancel_only_affects_its_own_generation() {
    let h = Harness::connected();
    let first = h
        .bridge
        .subscribe(DEVICE, StreamKind::Temperature, SensorSetting::new())
        .expect("first subscription");
    let second = h
        .bridge
        .subscribe(DEVICE, StreamKind::Temperature, SensorSetting::new())
        .expect("replacement subscription");

    assert!(!first.is_active());
    assert!(!first.cancel());
    assert!(second.is_active());
    assert!(second.cancel());
    assert!(!second.is_active());
    assert!(wait_until(|| !h.sdk.is_streaming(DEVICE, StreamKind::Temperature)).await);
}

#[tokio::test]
async fn unrecognized_batch_emits_empty_envelope_and_is_counted() {
    let h = Harness::connected();
    h.bridge
        .subscribe(DEVICE, StreamKind::Pressure, SensorSetting::new())
        .expect("pressure subscription");
    assert!(h.sdk.push_samples(
        DEVICE,
        StreamKind::Pressure,
        SensorSamples::Unrecognized {
            source_type: "BarometerV2".to_string(),
        }
    ));
    assert!(wait_until(|| !h.sink.named("pressureDataReceived").is_empty()).await);
    assert_eq!(h.envelopes("pressureDataReceived")[0], json!({ "samples": [] }));
    assert!(h.bridge.stats().degraded_envelopes >= 1);
}
