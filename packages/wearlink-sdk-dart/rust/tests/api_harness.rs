use wearlink_sdk_bridge::api::{
    decode_led_config, decode_offline_entry_meta, decode_offline_recording_meta,
    decode_sensor_setting, encode_sensor_setting, envelope_sample_count, max_stream_settings,
    stream_event_name, validate_first_time_use, LedConfigMeta, SettingEntry,
};

fn entry(setting_type: u8, value: u32) -> SettingEntry {
    SettingEntry {
        setting_type,
        value,
    }
}

#[test]
fn settings_roundtrip_through_the_api() {
    let json = encode_sensor_setting(vec![entry(0, 130), entry(1, 16)]);
    assert_eq!(json, "{\"0\":[130],\"1\":[16]}");
    assert_eq!(
        decode_sensor_setting(json),
        vec![entry(0, 130), entry(1, 16)]
    );
}

#[test]
fn unknown_setting_codes_collapse_to_the_sentinel() {
    let decoded = decode_sensor_setting("{\"999\":[7]}".to_string());
    assert_eq!(decoded, vec![entry(255, 7)]);
}

#[test]
fn max_settings_pick_largest_values() {
    let max = max_stream_settings("{\"0\":[25,50,200],\"2\":[2,8,4]}".to_string());
    assert_eq!(max, vec![entry(0, 200), entry(2, 8)]);
}

#[test]
fn offline_entry_meta_reports_kind_name() {
    let meta = decode_offline_entry_meta(
        "{\"path\":\"/U/0/R/HR.REC\",\"size\":12,\"date\":1000,\"type\":6}".to_string(),
    )
    .expect("entry should decode");
    assert_eq!(meta.data_type, "hr");
    assert_eq!(meta.ordinal, 6);
    assert_eq!(meta.date_millis, 1_000);

    let err = decode_offline_entry_meta(
        "{\"path\":\"x\",\"size\":1,\"date\":0,\"type\":10}".to_string(),
    )
    .expect_err("ordinal 10 must fail");
    assert!(err.contains("10"));
}

#[test]
fn offline_recording_meta_exposes_settings_only_when_present() {
    let acc = decode_offline_recording_meta(
        "{\"type\":\"accOfflineRecordingData\",\"data\":{\"samples\":[{\"timeStamp\":1,\"x\":1,\"y\":2,\"z\":3}]},\"startTime\":5,\"settings\":{\"0\":[52]}}"
            .to_string(),
    )
    .expect("acc recording should decode");
    assert_eq!(acc.sample_count, 1);
    assert_eq!(acc.settings, Some(vec![entry(0, 52)]));

    let ppi = decode_offline_recording_meta(
        "{\"type\":\"ppiOfflineRecordingData\",\"data\":{\"samples\":[]},\"startTime\":5}"
            .to_string(),
    )
    .expect("ppi recording should decode");
    assert_eq!(ppi.data_type, "ppi");
    assert!(ppi.settings.is_none());
}

#[test]
fn led_config_defaults_to_enabled() {
    assert_eq!(
        decode_led_config("{}".to_string()),
        LedConfigMeta {
            sdk_mode_led_enabled: true,
            ppi_mode_led_enabled: true,
        }
    );
}

#[test]
fn first_time_use_validation_reports_the_failing_field() {
    let err = validate_first_time_use(
        "{\"gender\":\"Female\",\"birthDate\":0,\"height\":300,\"weight\":60,\"maxHeartRate\":180,\"vo2Max\":40,\"restingHeartRate\":60,\"trainingBackground\":10,\"deviceTime\":\"t\",\"typicalDay\":1,\"sleepGoalMinutes\":420}"
            .to_string(),
    )
    .expect_err("height 300 is out of range");
    assert!(err.contains("height"));
}

#[test]
fn envelope_helpers() {
    assert_eq!(
        envelope_sample_count("{\"samples\":[{},{}],\"type\":0}".to_string()),
        Ok(2)
    );
    assert!(envelope_sample_count("{}".to_string()).is_err());
    assert_eq!(
        stream_event_name("ohr".to_string()),
        Ok("ohrDataReceived".to_string())
    );
    assert!(stream_event_name("eeg".to_string()).is_err());
}
