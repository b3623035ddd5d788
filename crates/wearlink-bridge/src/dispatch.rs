//! Remote-operation dispatch.
//!
//! Arguments arrive as a positional JSON array (a bare string for calls
//! that only take a device id). Record arguments may be JSON objects or
//! serialized JSON strings. Every argument is decoded before the SDK is
//! touched, so a rejected call never executes partially.

use serde_json::Value;
use tracing::{debug, warn};
use wearlink_codec::{
    CodecError, ExerciseEntry, FirstTimeUseConfig, LedConfig, LenientDecode,
    OfflineRecordingEntry, SensorSetting, StrictDecode, WireEncode,
};
use wearlink_core::{ConnectionState, StreamKind};
use wearlink_transport::{MethodCall, MethodResponse};

use crate::bridge::Bridge;
use crate::error::BridgeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Connect,
    Disconnect,
    StartStreaming,
    StartPpiStreaming,
    StopStreaming,
    RequestStreamSettings,
    GetDiskSpace,
    SetLedConfig,
    DoFirstTimeUse,
    ListExercises,
    RemoveExercise,
    ListOfflineRecordings,
    GetOfflineRecord,
    RemoveOfflineRecord,
}

impl Method {
    fn parse(name: &str) -> Option<Self> {
        let method = match name {
            "connect" => Method::Connect,
            "disconnect" => Method::Disconnect,
            "startStreaming" => Method::StartStreaming,
            "startPpiStreaming" => Method::StartPpiStreaming,
            "stopStreaming" => Method::StopStreaming,
            "requestStreamSettings" => Method::RequestStreamSettings,
            "getDiskSpace" => Method::GetDiskSpace,
            "setLedConfig" => Method::SetLedConfig,
            "doFirstTimeUse" => Method::DoFirstTimeUse,
            "listExercises" => Method::ListExercises,
            "removeExercise" => Method::RemoveExercise,
            "listOfflineRecordings" => Method::ListOfflineRecordings,
            "getOfflineRecord" => Method::GetOfflineRecord,
            "removeOfflineRecord" => Method::RemoveOfflineRecord,
            _ => return None,
        };
        Some(method)
    }
}

struct Args<'a> {
    method: &'a str,
    values: Vec<&'a Value>,
}

impl<'a> Args<'a> {
    fn new(call: &'a MethodCall) -> Result<Self, BridgeError> {
        let method = call.method.as_str();
        let values = match &call.arguments {
            Value::Array(values) => values.iter().collect(),
            Value::String(_) => vec![&call.arguments],
            Value::Null => Vec::new(),
            _ => return Err(BridgeError::invalid(method, "expected an argument list")),
        };
        Ok(Self { method, values })
    }

    fn required(&self, index: usize, name: &str) -> Result<&'a Value, BridgeError> {
        self.values
            .get(index)
            .copied()
            .filter(|value| !value.is_null())
            .ok_or_else(|| BridgeError::invalid(self.method, format!("missing {name}")))
    }

    fn string(&self, index: usize, name: &str) -> Result<&'a str, BridgeError> {
        self.required(index, name)?
            .as_str()
            .ok_or_else(|| BridgeError::invalid(self.method, format!("{name} must be a string")))
    }

    fn device_id(&self) -> Result<&'a str, BridgeError> {
        self.string(0, "deviceId")
    }

    fn stream_kind(&self, index: usize) -> Result<StreamKind, BridgeError> {
        self.string(index, "sensorType")?
            .parse()
            .map_err(|err| BridgeError::invalid(self.method, format!("{err}")))
    }

    fn optional(&self, index: usize) -> Option<&'a Value> {
        self.values
            .get(index)
            .copied()
            .filter(|value| !value.is_null())
    }

    /// Record argument for a strict decoder; an unparseable string is a
    /// decode error.
    fn strict_record(&self, index: usize, name: &str) -> Result<Value, BridgeError> {
        match self.required(index, name)? {
            Value::String(raw) => Ok(serde_json::from_str(raw).map_err(CodecError::from)?),
            other => Ok(other.clone()),
        }
    }

    /// Record argument for a lenient decoder; anything unparseable becomes
    /// `null` and decodes to defaults.
    fn lenient_record(&self, index: usize) -> Value {
        match self.optional(index) {
            Some(Value::String(raw)) => serde_json::from_str(raw).unwrap_or(Value::Null),
            Some(other) => other.clone(),
            None => Value::Null,
        }
    }
}

fn serialized<T: WireEncode>(record: &T) -> Value {
    Value::String(record.to_wire_string())
}

impl Bridge {
    /// Executes one remote operation. Unknown methods yield
    /// [`MethodResponse::NotImplemented`].
    pub async fn handle_method_call(&self, call: MethodCall) -> MethodResponse {
        let Some(method) = Method::parse(&call.method) else {
            debug!(method = %call.method, "method not implemented");
            return MethodResponse::NotImplemented;
        };
        match self.dispatch(method, &call).await {
            Ok(result) => MethodResponse::Success(result),
            Err(err) => {
                warn!(method = %call.method, code = err.code(), error = %err, "method call failed");
                err.into_response()
            }
        }
    }

    async fn dispatch(&self, method: Method, call: &MethodCall) -> Result<Value, BridgeError> {
        let args = Args::new(call)?;
        let sdk = &self.shared.sdk;
        match method {
            Method::Connect => {
                sdk.connect(args.device_id()?).await?;
                Ok(Value::Null)
            }
            Method::Disconnect => {
                sdk.disconnect(args.device_id()?).await?;
                Ok(Value::Null)
            }
            Method::StartStreaming => {
                let device_id = args.device_id()?;
                let kind = args.stream_kind(1)?;
                if kind == StreamKind::Ppi {
                    return Err(BridgeError::invalid(
                        args.method,
                        "ppi streams are started with startPpiStreaming",
                    ));
                }
                let explicit = args
                    .optional(2)
                    .map(|_| SensorSetting::decode_wire_lenient(&args.lenient_record(2)));
                self.ensure_connected(device_id)?;
                let settings = match explicit {
                    Some(settings) => settings,
                    None => self.default_settings(device_id, kind).await?,
                };
                self.subscribe(device_id, kind, settings)?;
                Ok(Value::Null)
            }
            Method::StartPpiStreaming => {
                let device_id = args.device_id()?;
                self.subscribe(device_id, StreamKind::Ppi, SensorSetting::new())?;
                Ok(Value::Null)
            }
            Method::StopStreaming => {
                let device_id = args.device_id()?;
                let kind = args.stream_kind(1)?;
                Ok(Value::Bool(self.stop_stream(device_id, kind)))
            }
            Method::RequestStreamSettings => {
                let device_id = args.device_id()?;
                let kind = args.stream_kind(1)?;
                let available = sdk.request_stream_settings(device_id, kind).await?;
                Ok(serialized(&available))
            }
            Method::GetDiskSpace => {
                let disk = sdk.disk_space(args.device_id()?).await?;
                Ok(serialized(&disk))
            }
            Method::SetLedConfig => {
                let device_id = args.device_id()?;
                let config = LedConfig::decode_wire_lenient(&args.lenient_record(1));
                sdk.set_led_config(device_id, config).await?;
                Ok(Value::Null)
            }
            Method::DoFirstTimeUse => {
                let device_id = args.device_id()?;
                let config =
                    FirstTimeUseConfig::decode_wire(&args.strict_record(1, "config")?)?;
                sdk.do_first_time_use(device_id, config).await?;
                Ok(Value::Null)
            }
            Method::ListExercises => {
                let entries = sdk.list_exercises(args.device_id()?).await?;
                Ok(Value::Array(entries.iter().map(serialized).collect()))
            }
            Method::RemoveExercise => {
                let device_id = args.device_id()?;
                args.required(1, "entry")?;
                let entry = ExerciseEntry::decode_wire_lenient(&args.lenient_record(1));
                sdk.remove_exercise(device_id, entry).await?;
                Ok(Value::Null)
            }
            Method::ListOfflineRecordings => {
                let entries = sdk.list_offline_recordings(args.device_id()?).await?;
                Ok(Value::Array(entries.iter().map(serialized).collect()))
            }
            Method::GetOfflineRecord => {
                let device_id = args.device_id()?;
                let entry = OfflineRecordingEntry::decode_wire(&args.strict_record(1, "entry")?)?;
                let data = sdk.get_offline_record(device_id, &entry).await?;
                Ok(serialized(&data))
            }
            Method::RemoveOfflineRecord => {
                let device_id = args.device_id()?;
                let entry = OfflineRecordingEntry::decode_wire(&args.strict_record(1, "entry")?)?;
                sdk.remove_offline_record(device_id, &entry).await?;
                Ok(Value::Null)
            }
        }
    }

    fn ensure_connected(&self, device_id: &str) -> Result<(), BridgeError> {
        if self.connection_state(device_id) == ConnectionState::Connected {
            Ok(())
        } else {
            Err(BridgeError::NotConnected {
                device_id: device_id.to_string(),
            })
        }
    }

    /// Settings used when `startStreaming` names none.
    async fn default_settings(
        &self,
        device_id: &str,
        kind: StreamKind,
    ) -> Result<SensorSetting, BridgeError> {
        if !(kind.accepts_settings() && self.shared.config.use_max_settings_when_unspecified) {
            return Ok(SensorSetting::new());
        }
        let available = self
            .shared
            .sdk
            .request_stream_settings(device_id, kind)
            .await?;
        Ok(available.max_settings())
    }
}
