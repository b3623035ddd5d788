#![no_main]

use libfuzzer_sys::fuzz_target;
use serde_json::Value;
use wearlink_codec::{
    AvailableSettings, DeviceInfo, DiskSpaceData, ExerciseEntry, FirstTimeUseConfig, LedConfig,
    LenientDecode, OfflineRecordingData, OfflineRecordingEntry, SensorSetting, StrictDecode,
};

fuzz_target!(|data: &[u8]| {
    let Ok(wire) = serde_json::from_slice::<Value>(data) else {
        return;
    };
    let _ = OfflineRecordingEntry::decode_wire(&wire);
    let _ = OfflineRecordingData::decode_wire(&wire);
    let _ = FirstTimeUseConfig::decode_wire(&wire);
    let _ = DeviceInfo::decode_wire(&wire);
    let _ = DiskSpaceData::decode_wire(&wire);
    let _ = SensorSetting::decode_wire_lenient(&wire);
    let _ = AvailableSettings::decode_wire_lenient(&wire);
    let _ = LedConfig::decode_wire_lenient(&wire);
    let _ = ExerciseEntry::decode_wire_lenient(&wire);
});
