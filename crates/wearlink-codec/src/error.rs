use thiserror::Error;
use wearlink_core::WearError;

/// Errors returned by strict wire decoding.
///
/// Lenient record types never produce these; they substitute documented
/// defaults instead.
#[derive(Debug, Error)]
pub enum CodecError {
    /// JSON parse or shape mismatch.
    #[error("decode error: {0}")]
    Json(#[from] serde_json::Error),
    /// Closed-enumeration lookup failure (ordinal or name).
    #[error("decode error: {0}")]
    Enum(#[from] WearError),
    /// Required field absent from the wire object.
    #[error("missing field: {0}")]
    MissingField(&'static str),
    /// Field present but of the wrong type or unrepresentable.
    #[error("invalid field {field}: {reason}")]
    InvalidField {
        field: &'static str,
        reason: &'static str,
    },
    /// Offline-recording discriminator not among the known tags.
    #[error("unknown offline recording type: {0}")]
    UnknownTag(String),
    #[error("invalid typical day: {0}")]
    InvalidTypicalDay(i64),
    #[error("invalid gender: {0}")]
    InvalidGender(String),
    #[error("invalid training background: {0}")]
    InvalidTrainingBackground(i64),
    /// Physiological value outside the range the device accepts.
    #[error("{field} {value} is outside {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::CodecError;
    use wearlink_core::WearError;

    #[test]
    fn error_messages_are_stable() {
        assert_eq!(
            CodecError::UnknownTag("eegOfflineRecordingData".to_string()).to_string(),
            "unknown offline recording type: eegOfflineRecordingData"
        );
        assert_eq!(
            CodecError::InvalidTypicalDay(4).to_string(),
            "invalid typical day: 4"
        );
        assert_eq!(
            CodecError::from(WearError::OrdinalOutOfRange {
                kind: "device data type",
                ordinal: 10,
            })
            .to_string(),
            "decode error: device data type ordinal 10 is out of range"
        );
        assert_eq!(
            CodecError::OutOfRange {
                field: "height",
                value: 300.0,
                min: 90.0,
                max: 240.0,
            }
            .to_string(),
            "height 300 is outside 90..=240"
        );
    }
}
