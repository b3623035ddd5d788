use thiserror::Error;

/// Shared lightweight error type for core primitive lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WearError {
    /// Ordinal/code does not name a member of a closed enumeration.
    #[error("{kind} ordinal {ordinal} is out of range")]
    OrdinalOutOfRange { kind: &'static str, ordinal: i64 },
    /// Wire name does not name a member of a closed enumeration.
    #[error("unknown {kind} name: {name}")]
    UnknownName { kind: &'static str, name: String },
}
