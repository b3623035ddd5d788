//! Epoch-millisecond conversions.
//!
//! Dates never cross the wire as a native date type; they are always signed
//! milliseconds since the Unix epoch.

use chrono::{DateTime, TimeZone, Utc};

/// The Unix epoch, used as the zero-value date for lenient decoding.
pub fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

pub fn to_epoch_millis(date: &DateTime<Utc>) -> i64 {
    date.timestamp_millis()
}

/// Converts epoch millis to a UTC date; `None` when out of chrono's range.
pub fn from_epoch_millis(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}
