//! Point-in-time statistics about the log

use serde::Serialize;

/// Counters captured under the log lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LogStats {
    pub capacity: usize,
    #[serde(rename = "recordCount")]
    pub record_count: usize,
    #[serde(rename = "totalBytes")]
    pub total_bytes: u64,
    /// Records dropped by eviction since the log was created
    pub evictions: u64,
}

impl LogStats {
    /// Whether every slot of the ring is in use
    pub fn is_full(&self) -> bool {
        self.record_count == self.capacity
    }
}
