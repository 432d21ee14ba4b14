//! Cache Statistics Module
//!
//! Point-in-time instrumentation of the memory tier.

use serde::Serialize;

/// Fixed per-entry metadata overhead counted by the memory estimate.
pub const ENTRY_OVERHEAD_BYTES: usize = 64;

// == Memory Stats ==
/// Snapshot of the memory tier's contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStats {
    /// Number of entries physically stored, live or stale
    pub total_entries: usize,
    /// Stored entries that are still live
    pub valid_entries: usize,
    /// Stored entries that are stale but not yet purged
    pub expired_entries: usize,
    /// `valid_entries / total reads of valid entries`, or 0
    pub hit_rate: f64,
    /// Estimated footprint in bytes
    pub memory_usage: usize,
    /// Reads summed over valid entries
    #[serde(skip)]
    accesses: u64,
}

impl MemoryStats {
    // == Constructor ==
    /// Creates a snapshot with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Record Entry ==
    /// Folds one stored entry into the snapshot.
    ///
    /// # Arguments
    /// * `key` - The entry's key
    /// * `json_len` - UTF-16 length of the entry's JSON-serialized value
    /// * `access_count` - Reads recorded on the entry
    /// * `expired` - Whether the entry is stale
    pub fn record_entry(&mut self, key: &str, json_len: usize, access_count: u64, expired: bool) {
        self.total_entries += 1;
        self.memory_usage += 2 * utf16_len(key) + 2 * json_len + ENTRY_OVERHEAD_BYTES;
        if expired {
            self.expired_entries += 1;
        } else {
            self.valid_entries += 1;
            self.accesses += access_count;
        }
    }

    // == Finish ==
    /// Turns the accumulated read total into the hit rate.
    pub fn finish(mut self) -> Self {
        self.hit_rate = if self.accesses > 0 {
            self.valid_entries as f64 / self.accesses as f64
        } else {
            0.0
        };
        self
    }
}

// == Utility Functions ==
/// Length of `s` in UTF-16 code units.
pub fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = MemoryStats::new().finish();
        assert_eq!(stats.total_entries, 0);
        assert_eq!(stats.valid_entries, 0);
        assert_eq!(stats.expired_entries, 0);
        assert_eq!(stats.hit_rate, 0.0);
        assert_eq!(stats.memory_usage, 0);
    }

    #[test]
    fn test_hit_rate_is_valid_entries_over_accesses() {
        let mut stats = MemoryStats::new();
        stats.record_entry("a", 1, 3, false);
        stats.record_entry("b", 1, 1, false);
        let stats = stats.finish();

        // 2 valid entries, 4 reads
        assert_eq!(stats.hit_rate, 0.5);
    }

    #[test]
    fn test_hit_rate_ignores_expired_accesses() {
        let mut stats = MemoryStats::new();
        stats.record_entry("a", 1, 0, false);
        stats.record_entry("b", 1, 10, true);
        let stats = stats.finish();

        assert_eq!(stats.valid_entries, 1);
        assert_eq!(stats.expired_entries, 1);
        assert_eq!(stats.hit_rate, 0.0);
    }

    #[test]
    fn test_memory_usage_estimate() {
        let mut stats = MemoryStats::new();
        // key "abc" (3 units), value `1` (1 unit)
        stats.record_entry("abc", 1, 0, false);
        assert_eq!(stats.memory_usage, 2 * 3 + 2 * 1 + 64);
    }

    #[test]
    fn test_utf16_len_counts_code_units() {
        assert_eq!(utf16_len("abc"), 3);
        assert_eq!(utf16_len("é"), 1);
        // outside the BMP: a surrogate pair
        assert_eq!(utf16_len("😀"), 2);
    }

    #[test]
    fn test_stats_serialize_camel_case() {
        let json = serde_json::to_string(&MemoryStats::new()).unwrap();
        assert!(json.contains("totalEntries"));
        assert!(json.contains("hitRate"));
        assert!(json.contains("memoryUsage"));
    }
}
