//! Collaborator interfaces for the wearlink bridge.
//!
//! The bridge depends only on the [`sdk::SensorSdk`] trait for device access
//! and on the call/event primitives in [`channel`] for the application side.
//! [`mock`] holds in-memory implementations of both for tests and simulation.

pub mod channel;
pub mod mock;
pub mod sdk;

pub use channel::{ChannelEventSink, EventSink, MethodCall, MethodResponse, OutboundEvent};
pub use sdk::{SampleStream, SdkError, SdkEvent, SensorSdk};
