use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::WearError;

/// Device-side data kinds, in canonical order.
///
/// The position in [`DeviceDataType::ALL`] is the wire ordinal used by
/// offline-recording metadata, so the order must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceDataType {
    Ecg,
    Acc,
    Ppg,
    Ppi,
    Gyro,
    Magnetometer,
    Hr,
    Temperature,
    Pressure,
    SkinTemperature,
}

impl DeviceDataType {
    pub const ALL: [DeviceDataType; 10] = [
        DeviceDataType::Ecg,
        DeviceDataType::Acc,
        DeviceDataType::Ppg,
        DeviceDataType::Ppi,
        DeviceDataType::Gyro,
        DeviceDataType::Magnetometer,
        DeviceDataType::Hr,
        DeviceDataType::Temperature,
        DeviceDataType::Pressure,
        DeviceDataType::SkinTemperature,
    ];

    /// Position of this kind in the canonical list.
    pub fn ordinal(self) -> usize {
        Self::ALL
            .iter()
            .position(|kind| *kind == self)
            .unwrap_or_default()
    }

    /// Looks up a kind by canonical ordinal.
    pub fn from_ordinal(ordinal: i64) -> Result<Self, WearError> {
        usize::try_from(ordinal)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
            .ok_or(WearError::OrdinalOutOfRange {
                kind: "device data type",
                ordinal,
            })
    }

    pub fn name(self) -> &'static str {
        match self {
            DeviceDataType::Ecg => "ecg",
            DeviceDataType::Acc => "acc",
            DeviceDataType::Ppg => "ppg",
            DeviceDataType::Ppi => "ppi",
            DeviceDataType::Gyro => "gyro",
            DeviceDataType::Magnetometer => "magnetometer",
            DeviceDataType::Hr => "hr",
            DeviceDataType::Temperature => "temperature",
            DeviceDataType::Pressure => "pressure",
            DeviceDataType::SkinTemperature => "skinTemperature",
        }
    }
}

impl fmt::Display for DeviceDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Online stream kinds an application can subscribe to.
///
/// `Ohr` is the optical heart-rate (PPG) stream; it keeps the name the
/// application layer uses for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StreamKind {
    Ecg,
    Acc,
    Gyro,
    Magnetometer,
    Ohr,
    Ppi,
    Temperature,
    Pressure,
}

impl StreamKind {
    pub const ALL: [StreamKind; 8] = [
        StreamKind::Ecg,
        StreamKind::Acc,
        StreamKind::Gyro,
        StreamKind::Magnetometer,
        StreamKind::Ohr,
        StreamKind::Ppi,
        StreamKind::Temperature,
        StreamKind::Pressure,
    ];

    pub fn wire_name(self) -> &'static str {
        match self {
            StreamKind::Ecg => "ecg",
            StreamKind::Acc => "acc",
            StreamKind::Gyro => "gyro",
            StreamKind::Magnetometer => "magnetometer",
            StreamKind::Ohr => "ohr",
            StreamKind::Ppi => "ppi",
            StreamKind::Temperature => "temperature",
            StreamKind::Pressure => "pressure",
        }
    }

    /// Name of the inbound event carrying this stream's envelopes.
    pub fn event_name(self) -> String {
        format!("{}DataReceived", self.wire_name())
    }

    /// Device data kind backing this stream.
    pub fn data_type(self) -> DeviceDataType {
        match self {
            StreamKind::Ecg => DeviceDataType::Ecg,
            StreamKind::Acc => DeviceDataType::Acc,
            StreamKind::Gyro => DeviceDataType::Gyro,
            StreamKind::Magnetometer => DeviceDataType::Magnetometer,
            StreamKind::Ohr => DeviceDataType::Ppg,
            StreamKind::Ppi => DeviceDataType::Ppi,
            StreamKind::Temperature => DeviceDataType::Temperature,
            StreamKind::Pressure => DeviceDataType::Pressure,
        }
    }

    /// PPI streams take no sensor settings.
    pub fn accepts_settings(self) -> bool {
        !matches!(self, StreamKind::Ppi)
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for StreamKind {
    type Err = WearError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.wire_name() == raw)
            .ok_or_else(|| WearError::UnknownName {
                kind: "stream kind",
                name: raw.to_string(),
            })
    }
}

/// Logical connection state of one device, driven by SDK callbacks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}
