use std::time::SystemTime;

pub mod list;
pub mod stream;
pub mod string;

pub use list::{ListStore, ListWaiter};
pub use stream::{StreamEntry, StreamEntryId, StreamStore};
pub use string::StringStore;

/// Wall-clock milliseconds since the epoch. Expiries and stream IDs are
/// absolute timestamps in this unit.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
