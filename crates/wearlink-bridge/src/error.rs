use thiserror::Error;
use wearlink_codec::CodecError;
use wearlink_transport::{MethodResponse, SdkError};

/// Failure of one remote operation.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Argument list has the wrong shape for the method.
    #[error("invalid arguments for {method}: {reason}")]
    InvalidArguments { method: String, reason: String },
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Sdk(#[from] SdkError),
    #[error("device {device_id} is not connected")]
    NotConnected { device_id: String },
}

impl BridgeError {
    pub(crate) fn invalid(method: &str, reason: impl Into<String>) -> Self {
        BridgeError::InvalidArguments {
            method: method.to_string(),
            reason: reason.into(),
        }
    }

    /// Stable code reported to the application.
    pub fn code(&self) -> &'static str {
        match self {
            BridgeError::InvalidArguments { .. } => "transport",
            BridgeError::Codec(_) => "decode",
            BridgeError::Sdk(_) => "sdk",
            BridgeError::NotConnected { .. } => "state",
        }
    }

    pub fn into_response(self) -> MethodResponse {
        MethodResponse::Error {
            code: self.code().to_string(),
            message: self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(BridgeError::invalid("connect", "missing").code(), "transport");
        assert_eq!(
            BridgeError::from(CodecError::InvalidTypicalDay(4)).code(),
            "decode"
        );
        assert_eq!(BridgeError::from(SdkError::Timeout).code(), "sdk");
        assert_eq!(
            BridgeError::NotConnected {
                device_id: "A1".to_string()
            }
            .code(),
            "state"
        );
    }

    #[test]
    fn response_carries_code_and_message() {
        let response = BridgeError::from(CodecError::InvalidTypicalDay(4)).into_response();
        assert_eq!(
            response,
            MethodResponse::Error {
                code: "decode".to_string(),
                message: "invalid typical day: 4".to_string(),
            }
        );
    }
}
