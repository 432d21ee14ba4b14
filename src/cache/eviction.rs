//! Eviction Module
//!
//! Victim selection for the bounded memory tier.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cache::CacheEntry;
use crate::error::CacheError;

// == Eviction Strategy ==
/// Policy used to pick the entry removed when the memory tier is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EvictionStrategy {
    /// Least recently used: oldest `last_accessed`
    #[default]
    Lru,
    /// Least frequently used: lowest `access_count`
    Lfu,
    /// First in, first out: oldest `timestamp`
    Fifo,
}

impl EvictionStrategy {
    /// The metric minimised by this strategy.
    fn rank<T>(self, entry: &CacheEntry<T>) -> u64 {
        match self {
            EvictionStrategy::Lru => entry.last_accessed,
            EvictionStrategy::Lfu => entry.access_count,
            EvictionStrategy::Fifo => entry.timestamp,
        }
    }

    // == Select Victim ==
    /// Scans the entries once and returns the key to evict.
    ///
    /// Ties on the strategy's metric go to the entry inserted first.
    /// Returns None only when there are no entries.
    pub fn select_victim<'a, T: 'a, I>(self, entries: I) -> Option<String>
    where
        I: IntoIterator<Item = (&'a String, &'a CacheEntry<T>)>,
    {
        entries
            .into_iter()
            .min_by_key(|(_, entry)| (self.rank(entry), entry.sequence))
            .map(|(key, _)| key.clone())
    }
}

impl fmt::Display for EvictionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EvictionStrategy::Lru => "LRU",
            EvictionStrategy::Lfu => "LFU",
            EvictionStrategy::Fifo => "FIFO",
        };
        f.write_str(name)
    }
}

impl FromStr for EvictionStrategy {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LRU" => Ok(EvictionStrategy::Lru),
            "LFU" => Ok(EvictionStrategy::Lfu),
            "FIFO" => Ok(EvictionStrategy::Fifo),
            _ => Err(CacheError::UnknownStrategy(s.to_string())),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn entry(timestamp: u64, access_count: u64, last_accessed: u64, sequence: u64) -> CacheEntry<()> {
        CacheEntry {
            data: (),
            timestamp,
            ttl: 10_000,
            access_count,
            last_accessed,
            sequence,
        }
    }

    fn sample() -> HashMap<String, CacheEntry<()>> {
        let mut entries = HashMap::new();
        // written first, read often, read long ago
        entries.insert("a".to_string(), entry(100, 5, 150, 0));
        // written second, never read
        entries.insert("b".to_string(), entry(200, 0, 200, 1));
        // written last, read once, just now
        entries.insert("c".to_string(), entry(300, 1, 900, 2));
        entries
    }

    #[test]
    fn test_lru_picks_oldest_access() {
        let entries = sample();
        assert_eq!(
            EvictionStrategy::Lru.select_victim(&entries),
            Some("a".to_string())
        );
    }

    #[test]
    fn test_lfu_picks_fewest_accesses() {
        let entries = sample();
        assert_eq!(
            EvictionStrategy::Lfu.select_victim(&entries),
            Some("b".to_string())
        );
    }

    #[test]
    fn test_fifo_picks_oldest_write() {
        let entries = sample();
        assert_eq!(
            EvictionStrategy::Fifo.select_victim(&entries),
            Some("a".to_string())
        );
    }

    #[test]
    fn test_ties_go_to_first_inserted() {
        let mut entries = HashMap::new();
        for (i, key) in ["k3", "k1", "k2", "k0"].iter().enumerate() {
            entries.insert(key.to_string(), entry(100, 0, 100, 10 - i as u64));
        }

        // k0 carries the smallest sequence
        for strategy in [
            EvictionStrategy::Lru,
            EvictionStrategy::Lfu,
            EvictionStrategy::Fifo,
        ] {
            assert_eq!(strategy.select_victim(&entries), Some("k0".to_string()));
        }
    }

    #[test]
    fn test_select_victim_empty() {
        let entries: HashMap<String, CacheEntry<()>> = HashMap::new();
        assert_eq!(EvictionStrategy::Lru.select_victim(&entries), None);
    }

    #[test]
    fn test_strategy_parse_and_display() {
        assert_eq!("lru".parse::<EvictionStrategy>().unwrap(), EvictionStrategy::Lru);
        assert_eq!(" LFU ".parse::<EvictionStrategy>().unwrap(), EvictionStrategy::Lfu);
        assert_eq!("Fifo".parse::<EvictionStrategy>().unwrap(), EvictionStrategy::Fifo);
        assert!(matches!(
            "random".parse::<EvictionStrategy>(),
            Err(CacheError::UnknownStrategy(_))
        ));
        assert_eq!(EvictionStrategy::Fifo.to_string(), "FIFO");
    }

    #[test]
    fn test_strategy_serde_uses_uppercase_names() {
        let json = serde_json::to_string(&EvictionStrategy::Lfu).unwrap();
        assert_eq!(json, r#""LFU""#);
        let parsed: EvictionStrategy = serde_json::from_str(r#""FIFO""#).unwrap();
        assert_eq!(parsed, EvictionStrategy::Fifo);
    }
}
