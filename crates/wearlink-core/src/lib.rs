//! Core wearlink primitives shared across crates.
//!
//! Includes device data kinds, stream kinds, connection state, epoch-millis
//! time helpers, and base errors.

pub mod error;
pub mod time;
pub mod types;

pub use error::WearError;
pub use types::{ConnectionState, DeviceDataType, StreamKind};
