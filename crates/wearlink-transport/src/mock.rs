//! In-memory SDK and event sink for tests and simulations.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use tokio::sync::mpsc;
use wearlink_codec::ftu::FirstTimeUseConfig;
use wearlink_codec::offline::{OfflineRecordingData, OfflineRecordingEntry};
use wearlink_codec::records::{DiskSpaceData, ExerciseEntry, LedConfig};
use wearlink_codec::settings::{AvailableSettings, SensorSetting};
use wearlink_codec::SensorSamples;
use wearlink_core::StreamKind;

use crate::channel::{EventSink, OutboundEvent, SinkHealthSnapshot};
use crate::sdk::{SampleStream, SdkError, SensorSdk};

type StreamSender = mpsc::UnboundedSender<Result<SensorSamples, SdkError>>;

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<String>,
    streams: HashMap<(String, StreamKind), StreamSender>,
    started: Vec<(String, StreamKind, SensorSetting)>,
    available: AvailableSettings,
    disk: Option<DiskSpaceData>,
    led: Option<LedConfig>,
    first_time_use: Option<FirstTimeUseConfig>,
    exercises: Vec<ExerciseEntry>,
    recordings: Vec<(OfflineRecordingEntry, OfflineRecordingData)>,
    fail_next: Option<SdkError>,
}

/// Scriptable [`SensorSdk`]: records every call and lets tests push sample
/// batches into open subscriptions.
#[derive(Debug, Default)]
pub struct MockSdk {
    state: Mutex<MockState>,
}

impl MockSdk {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: String) -> Result<(), SdkError> {
        let mut state = self.state();
        state.calls.push(call);
        match state.fail_next.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Every call made so far, as `"<method>:<device>"`.
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    /// Makes the next SDK call fail with `err`.
    pub fn fail_next(&self, err: SdkError) {
        self.state().fail_next = Some(err);
    }

    pub fn set_available_settings(&self, available: AvailableSettings) {
        self.state().available = available;
    }

    pub fn set_disk_space(&self, disk: DiskSpaceData) {
        self.state().disk = Some(disk);
    }

    pub fn add_exercise(&self, entry: ExerciseEntry) {
        self.state().exercises.push(entry);
    }

    pub fn add_recording(&self, entry: OfflineRecordingEntry, data: OfflineRecordingData) {
        self.state().recordings.push((entry, data));
    }

    pub fn led_config(&self) -> Option<LedConfig> {
        self.state().led
    }

    pub fn first_time_use(&self) -> Option<FirstTimeUseConfig> {
        self.state().first_time_use.clone()
    }

    pub fn exercises(&self) -> Vec<ExerciseEntry> {
        self.state().exercises.clone()
    }

    pub fn recording_count(&self) -> usize {
        self.state().recordings.len()
    }

    /// Settings each subscription was opened with, in open order.
    pub fn started_streams(&self) -> Vec<(String, StreamKind, SensorSetting)> {
        self.state().started.clone()
    }

    /// Whether a subscriber still holds the stream for `(device_id, kind)`.
    pub fn is_streaming(&self, device_id: &str, kind: StreamKind) -> bool {
        self.state()
            .streams
            .get(&(device_id.to_string(), kind))
            .is_some_and(|tx| !tx.is_closed())
    }

    /// Delivers one batch; `false` when nobody is subscribed.
    pub fn push_samples(&self, device_id: &str, kind: StreamKind, batch: SensorSamples) -> bool {
        self.send(device_id, kind, Ok(batch))
    }

    /// Terminates the subscription with an error item.
    pub fn fail_stream(&self, device_id: &str, kind: StreamKind, err: SdkError) -> bool {
        self.send(device_id, kind, Err(err))
    }

    fn send(
        &self,
        device_id: &str,
        kind: StreamKind,
        item: Result<SensorSamples, SdkError>,
    ) -> bool {
        self.state()
            .streams
            .get(&(device_id.to_string(), kind))
            .is_some_and(|tx| tx.send(item).is_ok())
    }
}

#[async_trait]
impl SensorSdk for MockSdk {
    async fn connect(&self, device_id: &str) -> Result<(), SdkError> {
        self.record(format!("connect:{device_id}"))
    }

    async fn disconnect(&self, device_id: &str) -> Result<(), SdkError> {
        self.record(format!("disconnect:{device_id}"))
    }

    async fn request_stream_settings(
        &self,
        device_id: &str,
        kind: StreamKind,
    ) -> Result<AvailableSettings, SdkError> {
        self.record(format!("requestStreamSettings:{device_id}:{kind}"))?;
        Ok(self.state().available.clone())
    }

    fn start_stream(
        &self,
        device_id: &str,
        kind: StreamKind,
        settings: SensorSetting,
    ) -> SampleStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state();
        state.calls.push(format!("startStream:{device_id}:{kind}"));
        state
            .started
            .push((device_id.to_string(), kind, settings));
        state.streams.insert((device_id.to_string(), kind), tx);
        stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })
        .boxed()
    }

    async fn disk_space(&self, device_id: &str) -> Result<DiskSpaceData, SdkError> {
        self.record(format!("diskSpace:{device_id}"))?;
        self.state().disk.ok_or_else(|| SdkError::Unsupported {
            device_id: device_id.to_string(),
            feature: "disk space".to_string(),
        })
    }

    async fn set_led_config(&self, device_id: &str, config: LedConfig) -> Result<(), SdkError> {
        self.record(format!("setLedConfig:{device_id}"))?;
        self.state().led = Some(config);
        Ok(())
    }

    async fn do_first_time_use(
        &self,
        device_id: &str,
        config: FirstTimeUseConfig,
    ) -> Result<(), SdkError> {
        self.record(format!("doFirstTimeUse:{device_id}"))?;
        self.state().first_time_use = Some(config);
        Ok(())
    }

    async fn list_exercises(&self, device_id: &str) -> Result<Vec<ExerciseEntry>, SdkError> {
        self.record(format!("listExercises:{device_id}"))?;
        Ok(self.state().exercises.clone())
    }

    async fn remove_exercise(
        &self,
        device_id: &str,
        entry: ExerciseEntry,
    ) -> Result<(), SdkError> {
        self.record(format!("removeExercise:{device_id}"))?;
        self.state()
            .exercises
            .retain(|existing| existing.path != entry.path);
        Ok(())
    }

    async fn list_offline_recordings(
        &self,
        device_id: &str,
    ) -> Result<Vec<OfflineRecordingEntry>, SdkError> {
        self.record(format!("listOfflineRecordings:{device_id}"))?;
        Ok(self
            .state()
            .recordings
            .iter()
            .map(|(entry, _)| entry.clone())
            .collect())
    }

    async fn get_offline_record(
        &self,
        device_id: &str,
        entry: &OfflineRecordingEntry,
    ) -> Result<OfflineRecordingData, SdkError> {
        self.record(format!("getOfflineRecord:{device_id}"))?;
        self.state()
            .recordings
            .iter()
            .find(|(stored, _)| stored.path == entry.path)
            .map(|(_, data)| data.clone())
            .ok_or_else(|| SdkError::Failed(format!("no recording at {}", entry.path)))
    }

    async fn remove_offline_record(
        &self,
        device_id: &str,
        entry: &OfflineRecordingEntry,
    ) -> Result<(), SdkError> {
        self.record(format!("removeOfflineRecord:{device_id}"))?;
        self.state()
            .recordings
            .retain(|(stored, _)| stored.path != entry.path);
        Ok(())
    }

    fn foreground_entered(&self) {
        self.state().calls.push("foreground".to_string());
    }

    fn background_entered(&self) {
        self.state().calls.push("background".to_string());
    }

    fn shutdown(&self) {
        let mut state = self.state();
        state.calls.push("shutdown".to_string());
        state.streams.clear();
    }
}

/// Captures every emitted event in memory.
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<OutboundEvent>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn events_mut(&self) -> MutexGuard<'_, Vec<OutboundEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn events(&self) -> Vec<OutboundEvent> {
        self.events_mut().clone()
    }

    /// Events with the given name, in emission order.
    pub fn named(&self, name: &str) -> Vec<OutboundEvent> {
        self.events_mut()
            .iter()
            .filter(|event| event.name == name)
            .cloned()
            .collect()
    }

    /// Drains and returns everything captured so far.
    pub fn take(&self) -> Vec<OutboundEvent> {
        std::mem::take(&mut *self.events_mut())
    }
}

impl EventSink for MemoryEventSink {
    fn emit(&self, event: OutboundEvent) -> bool {
        self.events_mut().push(event);
        true
    }

    fn health_snapshot(&self) -> SinkHealthSnapshot {
        SinkHealthSnapshot {
            delivered: self.events_mut().len() as u64,
            dropped: 0,
        }
    }
}
