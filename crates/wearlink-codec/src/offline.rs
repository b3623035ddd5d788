//! Offline recordings: metadata entries and the recorded payloads.
//!
//! Both decode strictly. Entry metadata drives later file retrieval, and the
//! payload tag decides which sample codec rebuilds the data, so neither can
//! be guessed.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use wearlink_core::time::to_epoch_millis;
use wearlink_core::DeviceDataType;

use crate::envelope::{decode_ppg_type, decode_samples, encode_envelope, SensorSamples};
use crate::error::CodecError;
use crate::policy::{
    expect_object, required, required_date, required_i64, required_str, required_u64,
    DecodePolicy, LenientDecode, StrictDecode, WireEncode, WireRecord,
};
use crate::sample::{
    AccSample, GyroSample, HrSample, MagnetometerSample, PpgDataType, PpgSample, PpiSample,
    TemperatureSample,
};
use crate::settings::SensorSetting;

/// Metadata for one recording stored on the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfflineRecordingEntry {
    pub path: String,
    pub size: u64,
    pub date: DateTime<Utc>,
    pub data_type: DeviceDataType,
}

impl WireRecord for OfflineRecordingEntry {
    const POLICY: DecodePolicy = DecodePolicy::Strict;
}

impl WireEncode for OfflineRecordingEntry {
    fn to_wire(&self) -> Value {
        serde_json::json!({
            "path": self.path,
            "size": self.size,
            "date": to_epoch_millis(&self.date),
            "type": self.data_type.ordinal(),
        })
    }
}

impl StrictDecode for OfflineRecordingEntry {
    fn decode_wire(value: &Value) -> Result<Self, CodecError> {
        let object = expect_object(value)?;
        Ok(Self {
            path: required_str(object, "path")?,
            size: required_u64(object, "size")?,
            date: required_date(object, "date")?,
            data_type: DeviceDataType::from_ordinal(required_i64(object, "type")?)?,
        })
    }
}

/// A recorded payload, tagged by the kind of data it holds.
///
/// Motion and optical kinds carry the settings they were recorded with;
/// the others do not.
#[derive(Debug, Clone, PartialEq)]
pub enum OfflineRecordingData {
    Acc {
        samples: Vec<AccSample>,
        start_time: DateTime<Utc>,
        settings: SensorSetting,
    },
    Gyro {
        samples: Vec<GyroSample>,
        start_time: DateTime<Utc>,
        settings: SensorSetting,
    },
    Magnetometer {
        samples: Vec<MagnetometerSample>,
        start_time: DateTime<Utc>,
        settings: SensorSetting,
    },
    Ppg {
        kind: PpgDataType,
        samples: Vec<PpgSample>,
        start_time: DateTime<Utc>,
        settings: SensorSetting,
    },
    Ppi {
        samples: Vec<PpiSample>,
        start_time: DateTime<Utc>,
    },
    Hr {
        samples: Vec<HrSample>,
        start_time: DateTime<Utc>,
    },
    Temperature {
        samples: Vec<TemperatureSample>,
        start_time: DateTime<Utc>,
    },
    SkinTemperature {
        samples: Vec<TemperatureSample>,
        start_time: DateTime<Utc>,
    },
}

pub const TAG_ACC: &str = "accOfflineRecordingData";
pub const TAG_GYRO: &str = "gyroOfflineRecordingData";
pub const TAG_MAGNETOMETER: &str = "magOfflineRecordingData";
pub const TAG_PPG: &str = "ppgOfflineRecordingData";
pub const TAG_PPI: &str = "ppiOfflineRecordingData";
pub const TAG_HR: &str = "hrOfflineRecordingData";
pub const TAG_TEMPERATURE: &str = "temperatureOfflineRecordingData";
pub const TAG_SKIN_TEMPERATURE: &str = "skinTemperatureOfflineRecordingData";

impl OfflineRecordingData {
    pub fn tag(&self) -> &'static str {
        match self {
            OfflineRecordingData::Acc { .. } => TAG_ACC,
            OfflineRecordingData::Gyro { .. } => TAG_GYRO,
            OfflineRecordingData::Magnetometer { .. } => TAG_MAGNETOMETER,
            OfflineRecordingData::Ppg { .. } => TAG_PPG,
            OfflineRecordingData::Ppi { .. } => TAG_PPI,
            OfflineRecordingData::Hr { .. } => TAG_HR,
            OfflineRecordingData::Temperature { .. } => TAG_TEMPERATURE,
            OfflineRecordingData::SkinTemperature { .. } => TAG_SKIN_TEMPERATURE,
        }
    }

    pub fn data_type(&self) -> DeviceDataType {
        match self {
            OfflineRecordingData::Acc { .. } => DeviceDataType::Acc,
            OfflineRecordingData::Gyro { .. } => DeviceDataType::Gyro,
            OfflineRecordingData::Magnetometer { .. } => DeviceDataType::Magnetometer,
            OfflineRecordingData::Ppg { .. } => DeviceDataType::Ppg,
            OfflineRecordingData::Ppi { .. } => DeviceDataType::Ppi,
            OfflineRecordingData::Hr { .. } => DeviceDataType::Hr,
            OfflineRecordingData::Temperature { .. } => DeviceDataType::Temperature,
            OfflineRecordingData::SkinTemperature { .. } => DeviceDataType::SkinTemperature,
        }
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        match self {
            OfflineRecordingData::Acc { start_time, .. }
            | OfflineRecordingData::Gyro { start_time, .. }
            | OfflineRecordingData::Magnetometer { start_time, .. }
            | OfflineRecordingData::Ppg { start_time, .. }
            | OfflineRecordingData::Ppi { start_time, .. }
            | OfflineRecordingData::Hr { start_time, .. }
            | OfflineRecordingData::Temperature { start_time, .. }
            | OfflineRecordingData::SkinTemperature { start_time, .. } => *start_time,
        }
    }

    pub fn settings(&self) -> Option<&SensorSetting> {
        match self {
            OfflineRecordingData::Acc { settings, .. }
            | OfflineRecordingData::Gyro { settings, .. }
            | OfflineRecordingData::Magnetometer { settings, .. }
            | OfflineRecordingData::Ppg { settings, .. } => Some(settings),
            OfflineRecordingData::Ppi { .. }
            | OfflineRecordingData::Hr { .. }
            | OfflineRecordingData::Temperature { .. }
            | OfflineRecordingData::SkinTemperature { .. } => None,
        }
    }

    fn batch(&self) -> SensorSamples {
        match self {
            OfflineRecordingData::Acc { samples, .. } => SensorSamples::Acc(samples.clone()),
            OfflineRecordingData::Gyro { samples, .. } => SensorSamples::Gyro(samples.clone()),
            OfflineRecordingData::Magnetometer { samples, .. } => {
                SensorSamples::Magnetometer(samples.clone())
            }
            OfflineRecordingData::Ppg { kind, samples, .. } => SensorSamples::Ppg {
                kind: *kind,
                samples: samples.clone(),
            },
            OfflineRecordingData::Ppi { samples, .. } => SensorSamples::Ppi(samples.clone()),
            OfflineRecordingData::Hr { samples, .. } => SensorSamples::Hr(samples.clone()),
            OfflineRecordingData::Temperature { samples, .. }
            | OfflineRecordingData::SkinTemperature { samples, .. } => {
                SensorSamples::Temperature(samples.clone())
            }
        }
    }
}

impl WireRecord for OfflineRecordingData {
    const POLICY: DecodePolicy = DecodePolicy::Strict;
}

impl WireEncode for OfflineRecordingData {
    /// `{ "type", "data", "startTime", "settings"? }`; `settings` is present
    /// (possibly empty) exactly for the kinds that record with settings.
    fn to_wire(&self) -> Value {
        let mut object = Map::new();
        object.insert("type".to_string(), Value::from(self.tag()));
        object.insert("data".to_string(), encode_envelope(&self.batch()).to_wire());
        object.insert(
            "startTime".to_string(),
            Value::from(to_epoch_millis(&self.start_time())),
        );
        if let Some(settings) = self.settings() {
            object.insert("settings".to_string(), settings.to_wire());
        }
        Value::Object(object)
    }
}

impl StrictDecode for OfflineRecordingData {
    fn decode_wire(value: &Value) -> Result<Self, CodecError> {
        let object = expect_object(value)?;
        let tag = required_str(object, "type")?;
        let data = required(object, "data")?;
        let start_time = required_date(object, "startTime")?;
        let settings = || {
            object
                .get("settings")
                .map(SensorSetting::decode_wire_lenient)
                .unwrap_or_default()
        };

        let decoded = match tag.as_str() {
            TAG_ACC => OfflineRecordingData::Acc {
                samples: decode_samples(data)?,
                start_time,
                settings: settings(),
            },
            TAG_GYRO => OfflineRecordingData::Gyro {
                samples: decode_samples(data)?,
                start_time,
                settings: settings(),
            },
            TAG_MAGNETOMETER => OfflineRecordingData::Magnetometer {
                samples: decode_samples(data)?,
                start_time,
                settings: settings(),
            },
            TAG_PPG => OfflineRecordingData::Ppg {
                kind: decode_ppg_type(data),
                samples: decode_samples(data)?,
                start_time,
                settings: settings(),
            },
            TAG_PPI => OfflineRecordingData::Ppi {
                samples: decode_samples(data)?,
                start_time,
            },
            TAG_HR => OfflineRecordingData::Hr {
                samples: decode_samples(data)?,
                start_time,
            },
            TAG_TEMPERATURE => OfflineRecordingData::Temperature {
                samples: decode_samples(data)?,
                start_time,
            },
            TAG_SKIN_TEMPERATURE => OfflineRecordingData::SkinTemperature {
                samples: decode_samples(data)?,
                start_time,
            },
            _ => return Err(CodecError::UnknownTag(tag)),
        };
        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SettingType;
    use serde_json::json;
    use wearlink_core::time::from_epoch_millis;

    fn date(millis: i64) -> DateTime<Utc> {
        from_epoch_millis(millis).expect("millis should convert")
    }

    fn entry(data_type: DeviceDataType) -> OfflineRecordingEntry {
        OfflineRecordingEntry {
            path: "/U/0/20240101/R/101500/ACC.REC".to_string(),
            size: 4_096,
            date: date(1_704_104_100_000),
            data_type,
        }
    }

    #[test]
    fn entry_type_is_encoded_as_canonical_ordinal() {
        let wire = entry(DeviceDataType::Ppi).to_wire();
        assert_eq!(wire["type"], json!(3));
        assert_eq!(wire["date"], json!(1_704_104_100_000_i64));
    }

    #[test]
    fn entry_roundtrips_for_every_valid_ordinal() {
        for ordinal in 0..10_i64 {
            let mut wire = entry(DeviceDataType::Ecg).to_wire();
            wire["type"] = json!(ordinal);
            let decoded =
                OfflineRecordingEntry::decode_wire(&wire).expect("valid ordinal should decode");
            assert_eq!(decoded.data_type.ordinal() as i64, ordinal);
            assert_eq!(decoded.to_wire(), wire);
        }
    }

    #[test]
    fn entry_rejects_ordinal_past_the_last_kind() {
        let mut wire = entry(DeviceDataType::Ecg).to_wire();
        wire["type"] = json!(10);
        let err = OfflineRecordingEntry::decode_wire(&wire).expect_err("ordinal 10 must fail");
        assert!(matches!(err, CodecError::Enum(_)));
        assert_eq!(OfflineRecordingEntry::POLICY, DecodePolicy::Strict);
    }

    #[test]
    fn entry_rejects_negative_size() {
        let mut wire = entry(DeviceDataType::Acc).to_wire();
        wire["size"] = json!(-1);
        assert!(OfflineRecordingEntry::decode_wire(&wire).is_err());
    }

    #[test]
    fn ppi_payload_omits_settings_key() {
        let data = OfflineRecordingData::Ppi {
            samples: vec![PpiSample {
                timestamp: 0,
                pp_in_ms: 800,
                pp_error_estimate: 5,
                hr: 75,
                blocker_bit: false,
                skin_contact_status: true,
                skin_contact_supported: true,
            }],
            start_time: date(1_000),
        };
        let wire = data.to_wire();
        assert_eq!(wire["type"], json!("ppiOfflineRecordingData"));
        assert!(wire.get("settings").is_none());
        assert_eq!(
            OfflineRecordingData::decode_wire(&wire).expect("ppi should decode"),
            data
        );
    }

    #[test]
    fn motion_payloads_always_carry_settings() {
        let acc = OfflineRecordingData::Acc {
            samples: Vec::new(),
            start_time: date(0),
            settings: SensorSetting::new(),
        };
        assert_eq!(acc.to_wire()["settings"], json!({}));

        let mag = OfflineRecordingData::Magnetometer {
            samples: vec![MagnetometerSample {
                timestamp: 10,
                x: 0.25,
                y: -0.5,
                z: 1.0,
            }],
            start_time: date(2_000),
            settings: SensorSetting::new().with(SettingType::SampleRate, 50),
        };
        let wire = mag.to_wire();
        assert_eq!(wire["type"], json!("magOfflineRecordingData"));
        assert_eq!(wire["settings"], json!({ "0": [50] }));
        assert_eq!(
            OfflineRecordingData::decode_wire(&wire).expect("mag should decode"),
            mag
        );
    }

    #[test]
    fn ppg_payload_keeps_its_channel_configuration() {
        let ppg = OfflineRecordingData::Ppg {
            kind: PpgDataType::Ppg3Ambient1,
            samples: vec![PpgSample {
                timestamp: 1,
                channel_samples: vec![100, 200, 300, 4],
            }],
            start_time: date(3_000),
            settings: SensorSetting::new().with(SettingType::SampleRate, 55),
        };
        let decoded = OfflineRecordingData::decode_wire_str(&ppg.to_wire_string())
            .expect("ppg should decode");
        assert_eq!(decoded, ppg);
    }

    #[test]
    fn skin_temperature_reuses_temperature_samples() {
        let data = OfflineRecordingData::SkinTemperature {
            samples: vec![TemperatureSample {
                timestamp: 5,
                temperature: 33.5,
            }],
            start_time: date(0),
        };
        let wire = data.to_wire();
        assert_eq!(wire["data"]["samples"][0]["temperature"], json!(33.5));
        assert_eq!(data.data_type(), DeviceDataType::SkinTemperature);
        assert_eq!(
            OfflineRecordingData::decode_wire(&wire).expect("skin temperature should decode"),
            data
        );
    }

    #[test]
    fn unknown_tag_is_a_hard_failure() {
        let wire = json!({
            "type": "eegOfflineRecordingData",
            "data": { "samples": [] },
            "startTime": 0,
        });
        let err = OfflineRecordingData::decode_wire(&wire).expect_err("unknown tag must fail");
        assert!(matches!(err, CodecError::UnknownTag(tag) if tag == "eegOfflineRecordingData"));
    }

    #[test]
    fn mismatched_sample_shape_is_a_hard_failure() {
        let wire = json!({
            "type": TAG_ACC,
            "data": { "samples": [{ "timeStamp": 1, "voltage": 3 }] },
            "startTime": 0,
            "settings": {},
        });
        assert!(OfflineRecordingData::decode_wire(&wire).is_err());
    }
}
