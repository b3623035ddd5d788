//! Synthetic sensor device.
//!
//! Produces plausible-looking ECG, ACC, PPG, PPI and HR data so the bridge
//! can be exercised end to end without hardware.

use std::f64::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;
use tracing::{debug, info};
use wearlink_codec::ftu::FirstTimeUseConfig;
use wearlink_codec::offline::{OfflineRecordingData, OfflineRecordingEntry};
use wearlink_codec::records::{DeviceInfo, DiskSpaceData, ExerciseEntry, LedConfig};
use wearlink_codec::sample::{
    AccSample, EcgSample, GyroSample, HrSample, MagnetometerSample, PpgDataType, PpgSample,
    PpiSample, PressureSample, TemperatureSample,
};
use wearlink_codec::settings::{AvailableSettings, SensorSetting, SettingType};
use wearlink_codec::SensorSamples;
use wearlink_core::{DeviceDataType, StreamKind};
use wearlink_transport::{SampleStream, SdkError, SdkEvent, SensorSdk};

use crate::config::SimConfig;

const DISK_TOTAL: u64 = 16_777_216;
const NANOS_PER_MILLI: u64 = 1_000_000;

#[derive(Debug, Default)]
struct SimState {
    led: LedConfig,
    first_time_use: Option<FirstTimeUseConfig>,
    exercises: Vec<ExerciseEntry>,
    recordings: Vec<(OfflineRecordingEntry, OfflineRecordingData)>,
}

/// In-process [`SensorSdk`] backed by a random generator.
///
/// Callbacks go out through the channel handed to [`SimSdk::new`].
pub struct SimSdk {
    device: DeviceInfo,
    batch_interval: Duration,
    hr_interval: Duration,
    ecg_sample_rate: u32,
    battery_level: u8,
    seed: u64,
    events: mpsc::UnboundedSender<SdkEvent>,
    connected: Arc<AtomicBool>,
    state: Mutex<SimState>,
}

impl SimSdk {
    pub fn new(config: &SimConfig, events: mpsc::UnboundedSender<SdkEvent>) -> Self {
        let device = DeviceInfo {
            device_id: config.device_id.clone(),
            address: "A0:9E:1A:C1:9E:21".to_string(),
            rssi: -58,
            name: config.device_name.clone(),
            connectable: true,
        };
        let seed = config.seed.unwrap_or_else(rand::random);
        let state = SimState {
            recordings: vec![seed_recording(seed)],
            exercises: vec![ExerciseEntry {
                path: "/U/0/20240301/E/070000/00".to_string(),
                date: Utc::now(),
                entry_id: "20240301070000".to_string(),
            }],
            ..SimState::default()
        };
        Self {
            device,
            batch_interval: config.batch_interval,
            hr_interval: config.hr_interval,
            ecg_sample_rate: config.ecg_sample_rate,
            battery_level: config.battery_level,
            seed,
            events,
            connected: Arc::new(AtomicBool::new(false)),
            state: Mutex::new(state),
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn send(&self, event: SdkEvent) {
        if self.events.send(event).is_err() {
            debug!("sdk event receiver closed");
        }
    }

    fn check_device(&self, device_id: &str) -> Result<(), SdkError> {
        if device_id != self.device.device_id {
            return Err(SdkError::Failed(format!("unknown device {device_id}")));
        }
        if !self.connected.load(Ordering::Acquire) {
            return Err(SdkError::NotConnected(device_id.to_string()));
        }
        Ok(())
    }

    fn available(&self, kind: StreamKind) -> AvailableSettings {
        match kind {
            StreamKind::Ecg => AvailableSettings::new()
                .with(SettingType::SampleRate, [self.ecg_sample_rate])
                .with(SettingType::Resolution, [14]),
            StreamKind::Acc => AvailableSettings::new()
                .with(SettingType::SampleRate, [25, 50, 100, 200])
                .with(SettingType::Resolution, [16])
                .with(SettingType::Range, [2, 4, 8]),
            StreamKind::Gyro => AvailableSettings::new()
                .with(SettingType::SampleRate, [52])
                .with(SettingType::Range, [250, 500]),
            StreamKind::Magnetometer => AvailableSettings::new()
                .with(SettingType::SampleRate, [10, 20, 50, 100])
                .with(SettingType::Range, [50]),
            StreamKind::Ohr => AvailableSettings::new()
                .with(SettingType::SampleRate, [55, 135])
                .with(SettingType::Resolution, [22])
                .with(SettingType::Channels, [4]),
            StreamKind::Temperature | StreamKind::Pressure => {
                AvailableSettings::new().with(SettingType::SampleRate, [1])
            }
            StreamKind::Ppi => AvailableSettings::new(),
        }
    }

    fn spawn_hr_notifications(&self) {
        let connected = Arc::clone(&self.connected);
        let events = self.events.clone();
        let device_id = self.device.device_id.clone();
        let period = self.hr_interval;
        let mut signal = Signal::new(self.seed ^ 0x4852);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            while connected.load(Ordering::Acquire) {
                ticker.tick().await;
                if !connected.load(Ordering::Acquire) {
                    break;
                }
                let event = SdkEvent::HrNotificationReceived {
                    device_id: device_id.clone(),
                    sample: signal.hr_sample(),
                };
                if events.send(event).is_err() {
                    break;
                }
            }
        });
    }
}

#[async_trait]
impl SensorSdk for SimSdk {
    async fn connect(&self, device_id: &str) -> Result<(), SdkError> {
        if device_id != self.device.device_id {
            return Err(SdkError::Failed(format!("no device {device_id} in range")));
        }
        if self.connected.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        info!(device_id = %device_id, "simulated device connecting");
        self.send(SdkEvent::DeviceConnecting(self.device.clone()));
        self.send(SdkEvent::DeviceConnected(self.device.clone()));
        self.send(SdkEvent::DisInformationReceived {
            device_id: device_id.to_string(),
            uuid: "00002a28-0000-1000-8000-00805f9b34fb".to_string(),
            value: "5.0.0".to_string(),
        });
        self.send(SdkEvent::BatteryLevelReceived {
            device_id: device_id.to_string(),
            level: self.battery_level,
        });
        self.send(SdkEvent::HrFeatureReady {
            device_id: device_id.to_string(),
        });
        self.send(SdkEvent::StreamingFeaturesReady {
            device_id: device_id.to_string(),
            features: StreamKind::ALL.iter().map(|kind| kind.data_type()).collect(),
        });
        self.send(SdkEvent::SdkModeFeatureAvailable {
            device_id: device_id.to_string(),
        });
        self.send(SdkEvent::FtpFeatureReady {
            device_id: device_id.to_string(),
        });
        self.spawn_hr_notifications();
        Ok(())
    }

    async fn disconnect(&self, device_id: &str) -> Result<(), SdkError> {
        if device_id != self.device.device_id {
            return Err(SdkError::Failed(format!("unknown device {device_id}")));
        }
        if self.connected.swap(false, Ordering::AcqRel) {
            self.send(SdkEvent::DeviceDisconnected(self.device.clone()));
        }
        Ok(())
    }

    async fn request_stream_settings(
        &self,
        device_id: &str,
        kind: StreamKind,
    ) -> Result<AvailableSettings, SdkError> {
        self.check_device(device_id)?;
        Ok(self.available(kind))
    }

    fn start_stream(
        &self,
        device_id: &str,
        kind: StreamKind,
        settings: SensorSetting,
    ) -> SampleStream {
        if let Err(err) = self.check_device(device_id) {
            return stream::once(async move { Err(err) }).boxed();
        }
        let rate = settings
            .get(SettingType::SampleRate)
            .or_else(|| {
                self.available(kind)
                    .max_settings()
                    .get(SettingType::SampleRate)
            })
            .unwrap_or(1);
        debug!(device_id = %device_id, kind = %kind, rate, "simulated stream opened");

        let generator = Generator {
            kind,
            rate,
            period: self.batch_interval,
            signal: Signal::new(self.seed ^ kind.data_type().ordinal() as u64),
            ticker: None,
        };
        let connected = Arc::clone(&self.connected);
        stream::unfold(generator, move |mut generator| {
            let connected = Arc::clone(&connected);
            async move {
                generator.tick().await;
                if !connected.load(Ordering::Acquire) {
                    return None;
                }
                let batch = generator.batch();
                Some((Ok::<_, SdkError>(batch), generator))
            }
        })
        .boxed()
    }

    async fn disk_space(&self, device_id: &str) -> Result<DiskSpaceData, SdkError> {
        self.check_device(device_id)?;
        let used: u64 = self
            .state()
            .recordings
            .iter()
            .map(|(entry, _)| entry.size)
            .sum();
        Ok(DiskSpaceData {
            total_space: DISK_TOTAL,
            free_space: DISK_TOTAL.saturating_sub(used),
        })
    }

    async fn set_led_config(&self, device_id: &str, config: LedConfig) -> Result<(), SdkError> {
        self.check_device(device_id)?;
        self.state().led = config;
        Ok(())
    }

    async fn do_first_time_use(
        &self,
        device_id: &str,
        config: FirstTimeUseConfig,
    ) -> Result<(), SdkError> {
        self.check_device(device_id)?;
        info!(device_id = %device_id, "first time use applied");
        self.state().first_time_use = Some(config);
        Ok(())
    }

    async fn list_exercises(&self, device_id: &str) -> Result<Vec<ExerciseEntry>, SdkError> {
        self.check_device(device_id)?;
        Ok(self.state().exercises.clone())
    }

    async fn remove_exercise(
        &self,
        device_id: &str,
        entry: ExerciseEntry,
    ) -> Result<(), SdkError> {
        self.check_device(device_id)?;
        self.state()
            .exercises
            .retain(|existing| existing.path != entry.path);
        Ok(())
    }

    async fn list_offline_recordings(
        &self,
        device_id: &str,
    ) -> Result<Vec<OfflineRecordingEntry>, SdkError> {
        self.check_device(device_id)?;
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
        self.check_device(device_id)?;
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
        self.check_device(device_id)?;
        self.state()
            .recordings
            .retain(|(stored, _)| stored.path != entry.path);
        Ok(())
    }

    fn shutdown(&self) {
        self.connected.store(false, Ordering::Release);
        info!("simulated sdk shut down");
    }
}

fn seed_recording(seed: u64) -> (OfflineRecordingEntry, OfflineRecordingData) {
    let start_time = Utc::now();
    let mut signal = Signal::new(seed);
    let samples: Vec<HrSample> = (0..60).map(|_| signal.hr_sample()).collect();
    let entry = OfflineRecordingEntry {
        path: "/U/0/20240301/R/080000/HR.REC".to_string(),
        size: samples.len() as u64 * 8,
        date: start_time,
        data_type: DeviceDataType::Hr,
    };
    (entry, OfflineRecordingData::Hr { samples, start_time })
}

/// Random walk around a resting heart rate.
struct Signal {
    rng: StdRng,
    hr: f64,
    phase: f64,
}

impl Signal {
    fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            hr: 62.0,
            phase: 0.0,
        }
    }

    fn step_hr(&mut self) -> f64 {
        self.hr = (self.hr + self.rng.gen_range(-1.5..1.5)).clamp(45.0, 150.0);
        self.hr
    }

    fn noise(&mut self, amplitude: f64) -> f64 {
        self.rng.gen_range(-amplitude..amplitude)
    }

    fn hr_sample(&mut self) -> HrSample {
        let hr = self.step_hr();
        let rr = (60_000.0 / hr) as u16;
        HrSample {
            timestamp: 0,
            hr: hr.round() as u8,
            ppg_quality: 0,
            corrected_hr: 0,
            rrs_ms: vec![rr],
            rr_available: true,
            contact_status: true,
            contact_status_supported: true,
        }
    }

    fn pp_interval(&mut self) -> PpiSample {
        let hr = self.step_hr();
        PpiSample {
            timestamp: 0,
            pp_in_ms: (60_000.0 / hr) as i32,
            pp_error_estimate: self.rng.gen_range(5..20),
            hr: hr.round() as i32,
            blocker_bit: false,
            skin_contact_status: true,
            skin_contact_supported: true,
        }
    }
}

/// Batch producer for one simulated stream.
struct Generator {
    kind: StreamKind,
    rate: u32,
    period: Duration,
    signal: Signal,
    ticker: Option<tokio::time::Interval>,
}

impl Generator {
    async fn tick(&mut self) {
        let period = self.period;
        self.ticker
            .get_or_insert_with(|| tokio::time::interval(period))
            .tick()
            .await;
    }

    fn samples_per_batch(&self) -> usize {
        let per_second = f64::from(self.rate) * self.period.as_secs_f64();
        (per_second.round() as usize).max(1)
    }

    /// Sample timestamps in epoch nanoseconds, ending now.
    fn timestamps(&self) -> Vec<u64> {
        let count = self.samples_per_batch();
        let step = 1_000_000_000 / u64::from(self.rate.max(1));
        let now = Utc::now().timestamp_millis().max(0) as u64 * NANOS_PER_MILLI;
        (0..count as u64)
            .map(|index| now.saturating_sub((count as u64 - 1 - index) * step))
            .collect()
    }

    fn batch(&mut self) -> SensorSamples {
        let timestamps = self.timestamps();
        let rate = f64::from(self.rate.max(1));
        let signal = &mut self.signal;
        match self.kind {
            StreamKind::Ecg => {
                let hr = signal.step_hr();
                SensorSamples::Ecg(
                    timestamps
                        .into_iter()
                        .map(|timestamp| {
                            signal.phase = (signal.phase + hr / 60.0 / rate) % 1.0;
                            let beat = if signal.phase < 0.04 { 1_100.0 } else { 0.0 };
                            let baseline = 120.0 * (TAU * signal.phase).sin();
                            EcgSample {
                                timestamp,
                                voltage: (beat + baseline + signal.noise(25.0)) as i32,
                            }
                        })
                        .collect(),
                )
            }
            StreamKind::Acc => SensorSamples::Acc(
                timestamps
                    .into_iter()
                    .map(|timestamp| AccSample {
                        timestamp,
                        x: signal.noise(30.0) as i32,
                        y: signal.noise(30.0) as i32,
                        z: 1_000 + signal.noise(30.0) as i32,
                    })
                    .collect(),
            ),
            StreamKind::Gyro => SensorSamples::Gyro(
                timestamps
                    .into_iter()
                    .map(|timestamp| GyroSample {
                        timestamp,
                        x: signal.noise(2.0) as f32,
                        y: signal.noise(2.0) as f32,
                        z: signal.noise(2.0) as f32,
                    })
                    .collect(),
            ),
            StreamKind::Magnetometer => SensorSamples::Magnetometer(
                timestamps
                    .into_iter()
                    .map(|timestamp| MagnetometerSample {
                        timestamp,
                        x: (0.21 + signal.noise(0.01)) as f32,
                        y: (-0.05 + signal.noise(0.01)) as f32,
                        z: (0.43 + signal.noise(0.01)) as f32,
                    })
                    .collect(),
            ),
            StreamKind::Ohr => {
                let hr = signal.step_hr();
                let samples = timestamps
                    .into_iter()
                    .map(|timestamp| {
                        signal.phase = (signal.phase + hr / 60.0 / rate) % 1.0;
                        let pulse = 4_000.0 * (TAU * signal.phase).sin();
                        let mut channel_samples: Vec<i32> = (0..3)
                            .map(|_| (200_000.0 + pulse + signal.noise(300.0)) as i32)
                            .collect();
                        channel_samples.push((1_500.0 + signal.noise(50.0)) as i32);
                        PpgSample {
                            timestamp,
                            channel_samples,
                        }
                    })
                    .collect();
                SensorSamples::Ppg {
                    kind: PpgDataType::Ppg3Ambient1,
                    samples,
                }
            }
            StreamKind::Ppi => {
                let beats = (self.period.as_secs_f64() * signal.hr / 60.0).round() as usize;
                SensorSamples::Ppi((0..beats.max(1)).map(|_| signal.pp_interval()).collect())
            }
            StreamKind::Temperature => SensorSamples::Temperature(
                timestamps
                    .into_iter()
                    .map(|timestamp| TemperatureSample {
                        timestamp,
                        temperature: (33.4 + signal.noise(0.2)) as f32,
                    })
                    .collect(),
            ),
            StreamKind::Pressure => SensorSamples::Pressure(
                timestamps
                    .into_iter()
                    .map(|timestamp| PressureSample {
                        timestamp,
                        pressure: (1_013.2 + signal.noise(0.5)) as f32,
                    })
                    .collect(),
            ),
        }
    }
}
