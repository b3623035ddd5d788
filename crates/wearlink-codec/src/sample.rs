//! Per-sensor sample records.
//!
//! Samples only ever flow device → application, so encoding is the primary
//! direction: `to_wire` is total and keeps the numeric width of every field
//! (u64 timestamps, i32 integer axes, f32 float axes widened exactly).
//! `Deserialize` exists for rebuilding offline-recording payloads.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::policy::WireEncode;

/// Heart-rate notification.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HrSample {
    #[serde(rename = "timeStamp")]
    pub timestamp: u64,
    pub hr: u8,
    pub ppg_quality: u8,
    pub corrected_hr: u8,
    pub rrs_ms: Vec<u16>,
    pub rr_available: bool,
    pub contact_status: bool,
    pub contact_status_supported: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct EcgSample {
    #[serde(rename = "timeStamp")]
    pub timestamp: u64,
    /// Microvolts.
    pub voltage: i32,
}

/// Accelerometer sample in milli-G.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AccSample {
    #[serde(rename = "timeStamp")]
    pub timestamp: u64,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

/// Gyroscope sample in deg/s.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct GyroSample {
    #[serde(rename = "timeStamp")]
    pub timestamp: u64,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Magnetometer sample in Gauss.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct MagnetometerSample {
    #[serde(rename = "timeStamp")]
    pub timestamp: u64,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// One optical frame; channel layout depends on [`PpgDataType`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PpgSample {
    #[serde(rename = "timeStamp")]
    pub timestamp: u64,
    pub channel_samples: Vec<i32>,
}

/// Pulse-to-pulse interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PpiSample {
    #[serde(rename = "timeStamp")]
    pub timestamp: u64,
    pub pp_in_ms: i32,
    pub pp_error_estimate: i32,
    pub hr: i32,
    pub blocker_bit: bool,
    pub skin_contact_status: bool,
    pub skin_contact_supported: bool,
}

/// Temperature in Celsius; also used for skin temperature.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TemperatureSample {
    #[serde(rename = "timeStamp")]
    pub timestamp: u64,
    pub temperature: f32,
}

/// Barometric pressure in mBar.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PressureSample {
    #[serde(rename = "timeStamp")]
    pub timestamp: u64,
    pub pressure: f32,
}

/// PPG channel configuration.
///
/// Frames of different configurations share the same shape, so the envelope
/// carries this tag explicitly. Wire form is the position in [`PpgDataType::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PpgDataType {
    /// Three optical channels plus one ambient channel.
    #[default]
    Ppg3Ambient1,
    Ppg1,
    Ppg2,
    Ppg16,
    Unknown,
}

impl PpgDataType {
    pub const ALL: [PpgDataType; 5] = [
        PpgDataType::Ppg3Ambient1,
        PpgDataType::Ppg1,
        PpgDataType::Ppg2,
        PpgDataType::Ppg16,
        PpgDataType::Unknown,
    ];

    pub fn code(self) -> u8 {
        match self {
            PpgDataType::Ppg3Ambient1 => 0,
            PpgDataType::Ppg1 => 1,
            PpgDataType::Ppg2 => 2,
            PpgDataType::Ppg16 => 3,
            PpgDataType::Unknown => 4,
        }
    }

    /// Unrecognised codes map to [`PpgDataType::Unknown`].
    pub fn from_code(code: i64) -> Self {
        usize::try_from(code)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
            .unwrap_or(PpgDataType::Unknown)
    }
}

impl WireEncode for HrSample {
    fn to_wire(&self) -> Value {
        json!({
            "timeStamp": self.timestamp,
            "hr": self.hr,
            "ppgQuality": self.ppg_quality,
            "correctedHr": self.corrected_hr,
            "rrsMs": self.rrs_ms,
            "rrAvailable": self.rr_available,
            "contactStatus": self.contact_status,
            "contactStatusSupported": self.contact_status_supported,
        })
    }
}

impl WireEncode for EcgSample {
    fn to_wire(&self) -> Value {
        json!({ "timeStamp": self.timestamp, "voltage": self.voltage })
    }
}

impl WireEncode for AccSample {
    fn to_wire(&self) -> Value {
        json!({ "timeStamp": self.timestamp, "x": self.x, "y": self.y, "z": self.z })
    }
}

impl WireEncode for GyroSample {
    fn to_wire(&self) -> Value {
        json!({ "timeStamp": self.timestamp, "x": self.x, "y": self.y, "z": self.z })
    }
}

impl WireEncode for MagnetometerSample {
    fn to_wire(&self) -> Value {
        json!({ "timeStamp": self.timestamp, "x": self.x, "y": self.y, "z": self.z })
    }
}

impl WireEncode for PpgSample {
    fn to_wire(&self) -> Value {
        json!({ "timeStamp": self.timestamp, "channelSamples": self.channel_samples })
    }
}

impl WireEncode for PpiSample {
    fn to_wire(&self) -> Value {
        json!({
            "timeStamp": self.timestamp,
            "ppInMs": self.pp_in_ms,
            "ppErrorEstimate": self.pp_error_estimate,
            "hr": self.hr,
            "blockerBit": self.blocker_bit,
            "skinContactStatus": self.skin_contact_status,
            "skinContactSupported": self.skin_contact_supported,
        })
    }
}

impl WireEncode for TemperatureSample {
    fn to_wire(&self) -> Value {
        json!({ "timeStamp": self.timestamp, "temperature": self.temperature })
    }
}

impl WireEncode for PressureSample {
    fn to_wire(&self) -> Value {
        json!({ "timeStamp": self.timestamp, "pressure": self.pressure })
    }
}
