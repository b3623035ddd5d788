//! Sensor settings.
//!
//! Internally a setting is an enum-keyed map. The transport can only carry
//! string-keyed maps with collection values, so the wire form is
//! `{"<code>": [value, ...]}`; that shape never leaves `to_wire` and the
//! lenient decoders below.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

use crate::policy::{DecodePolicy, LenientDecode, WireEncode, WireRecord};

/// Configurable sensor parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SettingType {
    SampleRate,
    Resolution,
    Range,
    RangeMilliunit,
    Channels,
    Factor,
    /// Sentinel for any code this bridge does not know.
    Unknown,
}

impl SettingType {
    pub const KNOWN: [SettingType; 6] = [
        SettingType::SampleRate,
        SettingType::Resolution,
        SettingType::Range,
        SettingType::RangeMilliunit,
        SettingType::Channels,
        SettingType::Factor,
    ];

    pub fn code(self) -> u8 {
        match self {
            SettingType::SampleRate => 0,
            SettingType::Resolution => 1,
            SettingType::Range => 2,
            SettingType::RangeMilliunit => 3,
            SettingType::Channels => 4,
            SettingType::Factor => 5,
            SettingType::Unknown => 0xff,
        }
    }

    pub fn from_code(code: i64) -> Self {
        Self::KNOWN
            .iter()
            .copied()
            .find(|kind| i64::from(kind.code()) == code)
            .unwrap_or(SettingType::Unknown)
    }

    /// Parses a stringified wire key; anything unparseable is `Unknown`.
    pub fn from_wire_key(key: &str) -> Self {
        key.trim()
            .parse::<i64>()
            .map(Self::from_code)
            .unwrap_or(SettingType::Unknown)
    }

    fn wire_key(self) -> String {
        self.code().to_string()
    }
}

/// One selected value per setting type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorSetting {
    values: BTreeMap<SettingType, u32>,
}

impl SensorSetting {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: SettingType, value: u32) -> Self {
        self.values.insert(kind, value);
        self
    }

    /// Replaces any previous value for `kind`.
    pub fn insert(&mut self, kind: SettingType, value: u32) -> Option<u32> {
        self.values.insert(kind, value)
    }

    pub fn get(&self, kind: SettingType) -> Option<u32> {
        self.values.get(&kind).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SettingType, u32)> + '_ {
        self.values.iter().map(|(kind, value)| (*kind, *value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl WireRecord for SensorSetting {
    const POLICY: DecodePolicy = DecodePolicy::Lenient;
}

impl WireEncode for SensorSetting {
    fn to_wire(&self) -> Value {
        let object: Map<String, Value> = self
            .values
            .iter()
            .map(|(kind, value)| (kind.wire_key(), Value::from(vec![*value])))
            .collect();
        Value::Object(object)
    }
}

fn wire_u32(value: &Value) -> Option<u32> {
    value.as_u64().and_then(|raw| u32::try_from(raw).ok())
}

impl LenientDecode for SensorSetting {
    /// Unknown keys collapse into one `Unknown` entry (last write wins);
    /// absent, empty or malformed values become 0.
    fn decode_wire_lenient(value: &Value) -> Self {
        let mut setting = SensorSetting::new();
        let Some(object) = value.as_object() else {
            return setting;
        };
        for (key, raw) in object {
            let selected = raw
                .as_array()
                .and_then(|values| values.first())
                .and_then(wire_u32)
                .unwrap_or(0);
            setting.insert(SettingType::from_wire_key(key), selected);
        }
        setting
    }
}

/// Every value the device supports, per setting type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailableSettings {
    values: BTreeMap<SettingType, BTreeSet<u32>>,
}

impl AvailableSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: SettingType, values: impl IntoIterator<Item = u32>) -> Self {
        self.values.entry(kind).or_default().extend(values);
        self
    }

    pub fn values(&self, kind: SettingType) -> Option<&BTreeSet<u32>> {
        self.values.get(&kind)
    }

    /// Selects the largest supported value of every setting type.
    pub fn max_settings(&self) -> SensorSetting {
        let mut setting = SensorSetting::new();
        for (kind, values) in &self.values {
            if let Some(max) = values.iter().next_back() {
                setting.insert(*kind, *max);
            }
        }
        setting
    }

    /// Whether every selected value of `setting` is supported.
    pub fn supports(&self, setting: &SensorSetting) -> bool {
        setting.iter().all(|(kind, value)| {
            self.values
                .get(&kind)
                .is_some_and(|supported| supported.contains(&value))
        })
    }
}

impl WireRecord for AvailableSettings {
    const POLICY: DecodePolicy = DecodePolicy::Lenient;
}

impl WireEncode for AvailableSettings {
    fn to_wire(&self) -> Value {
        let object: Map<String, Value> = self
            .values
            .iter()
            .map(|(kind, values)| {
                (
                    kind.wire_key(),
                    Value::from(values.iter().copied().collect::<Vec<u32>>()),
                )
            })
            .collect();
        Value::Object(object)
    }
}

impl LenientDecode for AvailableSettings {
    /// Malformed entries inside a value list are skipped.
    fn decode_wire_lenient(value: &Value) -> Self {
        let mut available = AvailableSettings::new();
        let Some(object) = value.as_object() else {
            return available;
        };
        for (key, raw) in object {
            let values = raw
                .as_array()
                .map(|values| values.iter().filter_map(wire_u32).collect::<Vec<_>>())
                .unwrap_or_default();
            available = available.with(SettingType::from_wire_key(key), values);
        }
        available
    }
}
