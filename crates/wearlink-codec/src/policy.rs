//! Encode/decode contracts and the per-record decode policy.
//!
//! Every wire record names its policy through [`WireRecord::POLICY`] and
//! implements exactly one of the two decode traits. Strict records return a
//! `Result` and abort on the first malformed field; lenient records always
//! return a value, substituting documented defaults.

use serde_json::{Map, Value};
use wearlink_core::time::{epoch, from_epoch_millis};

use chrono::{DateTime, Utc};

use crate::error::CodecError;

/// How a record reacts to malformed wire input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodePolicy {
    /// Malformed input is a decode error propagated to the caller.
    Strict,
    /// Malformed input is replaced by the record's documented defaults.
    Lenient,
}

/// A record type with a wire representation.
pub trait WireRecord {
    const POLICY: DecodePolicy;
}

/// Total encoding into the transport-neutral JSON form.
pub trait WireEncode {
    fn to_wire(&self) -> Value;

    /// String-serialized form, as carried by the transport.
    fn to_wire_string(&self) -> String {
        self.to_wire().to_string()
    }
}

/// Decoding that fails on malformed input.
pub trait StrictDecode: WireRecord + Sized {
    fn decode_wire(value: &Value) -> Result<Self, CodecError>;

    fn decode_wire_str(raw: &str) -> Result<Self, CodecError> {
        let value: Value = serde_json::from_str(raw)?;
        Self::decode_wire(&value)
    }
}

/// Decoding that never fails.
pub trait LenientDecode: WireRecord + Sized {
    fn decode_wire_lenient(value: &Value) -> Self;

    /// Unparseable strings decode as if the payload were `null`.
    fn decode_wire_str_lenient(raw: &str) -> Self {
        let value = serde_json::from_str::<Value>(raw).unwrap_or(Value::Null);
        Self::decode_wire_lenient(&value)
    }
}

pub(crate) fn expect_object(value: &Value) -> Result<&Map<String, Value>, CodecError> {
    value.as_object().ok_or(CodecError::InvalidField {
        field: "$",
        reason: "expected an object",
    })
}

pub(crate) fn required<'a>(
    object: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a Value, CodecError> {
    object.get(field).ok_or(CodecError::MissingField(field))
}

pub(crate) fn required_str(
    object: &Map<String, Value>,
    field: &'static str,
) -> Result<String, CodecError> {
    required(object, field)?
        .as_str()
        .map(str::to_string)
        .ok_or(CodecError::InvalidField {
            field,
            reason: "expected a string",
        })
}

pub(crate) fn required_i64(
    object: &Map<String, Value>,
    field: &'static str,
) -> Result<i64, CodecError> {
    required(object, field)?
        .as_i64()
        .ok_or(CodecError::InvalidField {
            field,
            reason: "expected an integer",
        })
}

pub(crate) fn required_u64(
    object: &Map<String, Value>,
    field: &'static str,
) -> Result<u64, CodecError> {
    required(object, field)?
        .as_u64()
        .ok_or(CodecError::InvalidField {
            field,
            reason: "expected a non-negative integer",
        })
}

pub(crate) fn required_f64(
    object: &Map<String, Value>,
    field: &'static str,
) -> Result<f64, CodecError> {
    required(object, field)?
        .as_f64()
        .ok_or(CodecError::InvalidField {
            field,
            reason: "expected a number",
        })
}

pub(crate) fn required_date(
    object: &Map<String, Value>,
    field: &'static str,
) -> Result<DateTime<Utc>, CodecError> {
    from_epoch_millis(required_i64(object, field)?).ok_or(CodecError::InvalidField {
        field,
        reason: "epoch millis out of range",
    })
}

pub(crate) fn lenient_str(value: &Value, field: &str) -> String {
    value
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

pub(crate) fn lenient_bool(value: &Value, field: &str, default: bool) -> bool {
    value.get(field).and_then(Value::as_bool).unwrap_or(default)
}

pub(crate) fn lenient_date(value: &Value, field: &str) -> DateTime<Utc> {
    value
        .get(field)
        .and_then(Value::as_i64)
        .and_then(from_epoch_millis)
        .unwrap_or_else(epoch)
}
