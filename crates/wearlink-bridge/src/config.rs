/// Bridge behaviour knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// When `startStreaming` carries no settings, ask the device for its
    /// supported values and start with the maximum of each.
    pub use_max_settings_when_unspecified: bool,
    /// Emit `streamingError` when a subscription terminates with an error.
    pub emit_stream_errors: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            use_max_settings_when_unspecified: true,
            emit_stream_errors: true,
        }
    }
}
