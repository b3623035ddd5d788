//! Small compound records: device info, disk space, LED config, exercises.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use wearlink_core::time::{epoch, to_epoch_millis};

use crate::error::CodecError;
use crate::policy::{
    lenient_bool, lenient_date, lenient_str, DecodePolicy, LenientDecode, StrictDecode,
    WireEncode, WireRecord,
};

/// Snapshot of one discovery or connection event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub device_id: String,
    pub address: String,
    pub rssi: i32,
    pub name: String,
    pub connectable: bool,
}

impl DeviceInfo {
    /// Info for a device known only by id, e.g. a disconnect of an unseen device.
    pub fn unnamed(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            address: String::new(),
            rssi: 0,
            name: String::new(),
            connectable: false,
        }
    }
}

impl WireRecord for DeviceInfo {
    const POLICY: DecodePolicy = DecodePolicy::Strict;
}

impl WireEncode for DeviceInfo {
    fn to_wire(&self) -> Value {
        json!({
            "deviceId": self.device_id,
            "address": self.address,
            "rssi": self.rssi,
            "name": self.name,
            "connectable": self.connectable,
        })
    }
}

impl StrictDecode for DeviceInfo {
    fn decode_wire(value: &Value) -> Result<Self, CodecError> {
        Ok(Self::deserialize(value)?)
    }
}

/// Device storage, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskSpaceData {
    pub total_space: u64,
    pub free_space: u64,
}

impl WireRecord for DiskSpaceData {
    const POLICY: DecodePolicy = DecodePolicy::Strict;
}

impl WireEncode for DiskSpaceData {
    fn to_wire(&self) -> Value {
        json!({ "totalSpace": self.total_space, "freeSpace": self.free_space })
    }
}

impl StrictDecode for DiskSpaceData {
    fn decode_wire(value: &Value) -> Result<Self, CodecError> {
        Ok(Self::deserialize(value)?)
    }
}

/// Device LED behaviour. Cosmetic, so decoding fails open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedConfig {
    pub sdk_mode_led_enabled: bool,
    pub ppi_mode_led_enabled: bool,
}

impl Default for LedConfig {
    fn default() -> Self {
        Self {
            sdk_mode_led_enabled: true,
            ppi_mode_led_enabled: true,
        }
    }
}

impl WireRecord for LedConfig {
    const POLICY: DecodePolicy = DecodePolicy::Lenient;
}

impl WireEncode for LedConfig {
    fn to_wire(&self) -> Value {
        json!({
            "sdkModeLedEnabled": self.sdk_mode_led_enabled,
            "ppiModeLedEnabled": self.ppi_mode_led_enabled,
        })
    }
}

impl LenientDecode for LedConfig {
    /// Each missing or malformed flag defaults to enabled.
    fn decode_wire_lenient(value: &Value) -> Self {
        Self {
            sdk_mode_led_enabled: lenient_bool(value, "sdkModeLedEnabled", true),
            ppi_mode_led_enabled: lenient_bool(value, "ppiModeLedEnabled", true),
        }
    }
}

/// One exercise stored on the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExerciseEntry {
    pub path: String,
    pub date: DateTime<Utc>,
    pub entry_id: String,
}

impl Default for ExerciseEntry {
    fn default() -> Self {
        Self {
            path: String::new(),
            date: epoch(),
            entry_id: String::new(),
        }
    }
}

impl WireRecord for ExerciseEntry {
    const POLICY: DecodePolicy = DecodePolicy::Lenient;
}

impl WireEncode for ExerciseEntry {
    fn to_wire(&self) -> Value {
        json!({
            "path": self.path,
            "date": to_epoch_millis(&self.date),
            "entryId": self.entry_id,
        })
    }
}

impl LenientDecode for ExerciseEntry {
    /// Malformed fields become their zero value: empty strings, epoch date.
    fn decode_wire_lenient(value: &Value) -> Self {
        Self {
            path: lenient_str(value, "path"),
            date: lenient_date(value, "date"),
            entry_id: lenient_str(value, "entryId"),
        }
    }
}
