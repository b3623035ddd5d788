#![allow(unexpected_cfgs)]

use flutter_rust_bridge::frb;

#[frb]
pub mod api {
    use flutter_rust_bridge::frb;
    use serde_json::Value;
    use wearlink_codec::policy::{LenientDecode, StrictDecode, WireEncode};
    use wearlink_codec::{
        AvailableSettings, FirstTimeUseConfig, LedConfig, OfflineRecordingData,
        OfflineRecordingEntry, SensorSetting, SettingType,
    };
    use wearlink_core::time::to_epoch_millis;
    use wearlink_core::StreamKind;

    #[derive(Clone, Debug, PartialEq, Eq)]
    #[frb]
    pub struct SettingEntry {
        pub setting_type: u8,
        pub value: u32,
    }

    #[derive(Clone, Debug)]
    #[frb]
    pub struct OfflineEntryMeta {
        pub path: String,
        pub size: u64,
        pub date_millis: i64,
        pub data_type: String,
        pub ordinal: u8,
    }

    #[derive(Clone, Debug)]
    #[frb]
    pub struct OfflineRecordingMeta {
        pub tag: String,
        pub data_type: String,
        pub start_time_millis: i64,
        pub sample_count: usize,
        pub settings: Option<Vec<SettingEntry>>,
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    #[frb]
    pub struct LedConfigMeta {
        pub sdk_mode_led_enabled: bool,
        pub ppi_mode_led_enabled: bool,
    }

    fn entries(setting: &SensorSetting) -> Vec<SettingEntry> {
        setting
            .iter()
            .map(|(kind, value)| SettingEntry {
                setting_type: kind.code(),
                value,
            })
            .collect()
    }

    fn parse(json: &str) -> Result<Value, String> {
        serde_json::from_str(json).map_err(|e| e.to_string())
    }

    /// Wire form of a setting selection. Repeated types keep the last value.
    #[frb]
    pub fn encode_sensor_setting(entries: Vec<SettingEntry>) -> String {
        let mut setting = SensorSetting::new();
        for entry in entries {
            setting.insert(
                SettingType::from_code(i64::from(entry.setting_type)),
                entry.value,
            );
        }
        setting.to_wire_string()
    }

    #[frb]
    pub fn decode_sensor_setting(json: String) -> Vec<SettingEntry> {
        entries(&SensorSetting::decode_wire_str_lenient(&json))
    }

    /// Largest supported value of every setting type.
    #[frb]
    pub fn max_stream_settings(available_json: String) -> Vec<SettingEntry> {
        entries(&AvailableSettings::decode_wire_str_lenient(&available_json).max_settings())
    }

    #[frb]
    pub fn decode_offline_entry_meta(json: String) -> Result<OfflineEntryMeta, String> {
        let entry = OfflineRecordingEntry::decode_wire_str(&json).map_err(|e| e.to_string())?;
        Ok(OfflineEntryMeta {
            path: entry.path,
            size: entry.size,
            date_millis: to_epoch_millis(&entry.date),
            data_type: entry.data_type.name().to_string(),
            ordinal: entry.data_type.ordinal() as u8,
        })
    }

    #[frb]
    pub fn decode_offline_recording_meta(json: String) -> Result<OfflineRecordingMeta, String> {
        let wire = parse(&json)?;
        let data = OfflineRecordingData::decode_wire(&wire).map_err(|e| e.to_string())?;
        let sample_count = wire
            .get("data")
            .and_then(|data| data.get("samples"))
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        Ok(OfflineRecordingMeta {
            tag: data.tag().to_string(),
            data_type: data.data_type().name().to_string(),
            start_time_millis: to_epoch_millis(&data.start_time()),
            sample_count,
            settings: data.settings().map(entries),
        })
    }

    #[frb]
    pub fn decode_led_config(json: String) -> LedConfigMeta {
        let config = LedConfig::decode_wire_str_lenient(&json);
        LedConfigMeta {
            sdk_mode_led_enabled: config.sdk_mode_led_enabled,
            ppi_mode_led_enabled: config.ppi_mode_led_enabled,
        }
    }

    /// Checks a first-time-use profile without sending it anywhere.
    #[frb]
    pub fn validate_first_time_use(json: String) -> Result<(), String> {
        FirstTimeUseConfig::decode_wire_str(&json)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    #[frb]
    pub fn envelope_sample_count(json: String) -> Result<usize, String> {
        parse(&json)?
            .get("samples")
            .and_then(Value::as_array)
            .map(Vec::len)
            .ok_or_else(|| "envelope has no samples array".to_string())
    }

    /// Event name carrying envelopes for `sensor_type`, e.g. `ecgDataReceived`.
    #[frb]
    pub fn stream_event_name(sensor_type: String) -> Result<String, String> {
        sensor_type
            .parse::<StreamKind>()
            .map(StreamKind::event_name)
            .map_err(|e| e.to_string())
    }
}
