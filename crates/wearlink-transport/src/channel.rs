use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

/// Named remote operation invoked by the application.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub method: String,
    /// Positional JSON array, or a bare string for device-id-only calls.
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }
}

/// Result of one [`MethodCall`].
#[derive(Debug, Clone, PartialEq)]
pub enum MethodResponse {
    Success(Value),
    Error { code: String, message: String },
    /// The method name is not one the bridge handles. Not an error.
    NotImplemented,
}

impl MethodResponse {
    pub fn ok() -> Self {
        MethodResponse::Success(Value::Null)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, MethodResponse::Success(_))
    }

    pub fn error_code(&self) -> Option<&str> {
        match self {
            MethodResponse::Error { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// Named inbound event for the application.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundEvent {
    pub name: String,
    pub payload: Value,
}

impl OutboundEvent {
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}

/// Coarse per-sink delivery counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkHealthSnapshot {
    pub delivered: u64,
    pub dropped: u64,
}

/// Destination for outbound events.
///
/// Called from SDK callback context and from stream tasks, so it must not
/// block. Backpressure, if any, belongs to the sink.
pub trait EventSink: Send + Sync + 'static {
    /// Returns `false` when the event could not be delivered.
    fn emit(&self, event: OutboundEvent) -> bool;

    fn health_snapshot(&self) -> SinkHealthSnapshot {
        SinkHealthSnapshot::default()
    }
}

/// Forwards events into an unbounded tokio channel.
#[derive(Debug)]
pub struct ChannelEventSink {
    tx: mpsc::UnboundedSender<OutboundEvent>,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl ChannelEventSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                delivered: AtomicU64::new(0),
                dropped: AtomicU64::new(0),
            },
            rx,
        )
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: OutboundEvent) -> bool {
        match self.tx.send(event) {
            Ok(()) => {
                self.delivered.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(mpsc::error::SendError(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                debug!(event = %event.name, "event receiver closed; dropping");
                false
            }
        }
    }

    fn health_snapshot(&self) -> SinkHealthSnapshot {
        SinkHealthSnapshot {
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}
