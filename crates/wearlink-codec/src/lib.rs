//! wearlink wire codec.
//!
//! Converts sensor samples and compound device records to and from the
//! transport-neutral JSON form. Each record type declares whether malformed
//! input is an error or is replaced by defaults; see [`policy`].

pub mod envelope;
pub mod error;
pub mod ftu;
pub mod offline;
pub mod policy;
pub mod records;
pub mod sample;
pub mod settings;

pub use envelope::{degraded_envelope_count, encode_envelope, SampleEnvelope, SensorSamples};
pub use error::CodecError;
pub use ftu::{FirstTimeUseConfig, Gender, TrainingBackground, TypicalDay};
pub use offline::{OfflineRecordingData, OfflineRecordingEntry};
pub use policy::{DecodePolicy, LenientDecode, StrictDecode, WireEncode, WireRecord};
pub use records::{DeviceInfo, DiskSpaceData, ExerciseEntry, LedConfig};
pub use sample::PpgDataType;
pub use settings::{AvailableSettings, SensorSetting, SettingType};
