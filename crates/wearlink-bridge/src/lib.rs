//! wearlink transport adapter.
//!
//! Turns application method calls into SDK calls and SDK callbacks into
//! application events, tracking per-device connection state and per-kind
//! stream subscriptions in between.

pub mod bridge;
pub mod config;
mod dispatch;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod registry;
pub mod subscription;

pub use bridge::{Bridge, BridgeStats};
pub use config::BridgeConfig;
pub use error::BridgeError;
pub use lifecycle::LifecycleEvent;
pub use subscription::Subscription;
