//! Sample envelopes: one homogeneous, ordered batch per SDK callback.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::CodecError;
use crate::policy::{expect_object, required, WireEncode};
use crate::sample::{
    AccSample, EcgSample, GyroSample, HrSample, MagnetometerSample, PpgDataType, PpgSample,
    PpiSample, PressureSample, TemperatureSample,
};

static DEGRADED_ENVELOPES: AtomicU64 = AtomicU64::new(0);

/// Number of envelopes encoded with an empty sample list because the SDK
/// reported a data class with no codec.
pub fn degraded_envelope_count() -> u64 {
    DEGRADED_ENVELOPES.load(Ordering::Relaxed)
}

/// A batch of samples as delivered by one SDK callback.
///
/// Homogeneous by construction; PPG additionally carries its channel
/// configuration because the frame shape alone does not identify it.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorSamples {
    Hr(Vec<HrSample>),
    Ecg(Vec<EcgSample>),
    Acc(Vec<AccSample>),
    Gyro(Vec<GyroSample>),
    Magnetometer(Vec<MagnetometerSample>),
    Ppg {
        kind: PpgDataType,
        samples: Vec<PpgSample>,
    },
    Ppi(Vec<PpiSample>),
    Temperature(Vec<TemperatureSample>),
    Pressure(Vec<PressureSample>),
    /// The SDK delivered a data class the bridge has no codec for.
    Unrecognized { source_type: String },
}

impl SensorSamples {
    pub fn len(&self) -> usize {
        match self {
            SensorSamples::Hr(samples) => samples.len(),
            SensorSamples::Ecg(samples) => samples.len(),
            SensorSamples::Acc(samples) => samples.len(),
            SensorSamples::Gyro(samples) => samples.len(),
            SensorSamples::Magnetometer(samples) => samples.len(),
            SensorSamples::Ppg { samples, .. } => samples.len(),
            SensorSamples::Ppi(samples) => samples.len(),
            SensorSamples::Temperature(samples) => samples.len(),
            SensorSamples::Pressure(samples) => samples.len(),
            SensorSamples::Unrecognized { .. } => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Wire container: `{ "samples": [...], "type"?: int }`.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleEnvelope {
    pub samples: Vec<Value>,
    /// PPG channel configuration; absent for every other sensor.
    pub ppg_type: Option<PpgDataType>,
}

impl WireEncode for SampleEnvelope {
    fn to_wire(&self) -> Value {
        let mut object = Map::new();
        object.insert("samples".to_string(), Value::Array(self.samples.clone()));
        if let Some(kind) = self.ppg_type {
            object.insert("type".to_string(), Value::from(kind.code()));
        }
        Value::Object(object)
    }
}

fn encode_all<T: WireEncode>(samples: &[T]) -> Vec<Value> {
    samples.iter().map(WireEncode::to_wire).collect()
}

/// Encodes one batch, preserving acquisition order.
pub fn encode_envelope(batch: &SensorSamples) -> SampleEnvelope {
    let (samples, ppg_type) = match batch {
        SensorSamples::Hr(samples) => (encode_all(samples), None),
        SensorSamples::Ecg(samples) => (encode_all(samples), None),
        SensorSamples::Acc(samples) => (encode_all(samples), None),
        SensorSamples::Gyro(samples) => (encode_all(samples), None),
        SensorSamples::Magnetometer(samples) => (encode_all(samples), None),
        SensorSamples::Ppg { kind, samples } => (encode_all(samples), Some(*kind)),
        SensorSamples::Ppi(samples) => (encode_all(samples), None),
        SensorSamples::Temperature(samples) => (encode_all(samples), None),
        SensorSamples::Pressure(samples) => (encode_all(samples), None),
        SensorSamples::Unrecognized { source_type } => {
            DEGRADED_ENVELOPES.fetch_add(1, Ordering::Relaxed);
            warn!(
                source_type = %source_type,
                "no codec for sdk sample type; emitting empty envelope"
            );
            (Vec::new(), None)
        }
    };
    SampleEnvelope { samples, ppg_type }
}

/// Decodes the `samples` array of an envelope into one concrete sample type.
pub(crate) fn decode_samples<T: DeserializeOwned>(envelope: &Value) -> Result<Vec<T>, CodecError> {
    let object = expect_object(envelope)?;
    let samples = required(object, "samples")?;
    Ok(serde_json::from_value(samples.clone())?)
}

/// Reads the PPG `type` tag; absent or unknown codes map to `Unknown`.
pub(crate) fn decode_ppg_type(envelope: &Value) -> PpgDataType {
    envelope
        .get("type")
        .and_then(Value::as_i64)
        .map(PpgDataType::from_code)
        .unwrap_or(PpgDataType::Unknown)
}
