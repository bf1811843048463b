// ── Persistent store abstraction ──
//
// The store is the single source of truth for cross-process consumers:
// other gateway processes read network info, membership sets, and config
// history from here. The trait mirrors the key/value, hash, set, and
// sorted-set operations the control plane needs; `MemoryStore` is the
// in-process implementation, and a networked backend can implement the
// same trait for multi-process deployments.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;

/// Well-known store keys.
pub mod keys {
    use crate::model::Mode;

    /// `NetworkInfo` rows keyed by interface name.
    pub const NETWORK_INFO: &str = "sys:network:info";
    /// `NetworkInfo` rows keyed by interface UUID.
    pub const NETWORK_UUID: &str = "sys:network:uuid";
    /// Current operating mode.
    pub const MODE: &str = "mode";

    // Global membership sets consumed by the interception processes.
    pub const MONITORED_HOSTS: &str = "monitored_hosts";
    pub const UNMONITORED_HOSTS: &str = "unmonitored_hosts";
    pub const UNMONITORED_HOSTS_ALL: &str = "unmonitored_hosts_all";
    pub const MONITORED_HOSTS6: &str = "monitored_hosts6";
    pub const UNMONITORED_HOSTS6: &str = "unmonitored_hosts6";

    /// Time-scored config history for a mode.
    pub fn config_history(mode: &Mode) -> String {
        format!("history:networkConfig:{mode}")
    }

    /// Per-interface membership sets, cleared on deregistration.
    pub fn monitored_hosts_intf(interface: &str) -> String {
        format!("monitored_hosts_{interface}")
    }

    pub fn unmonitored_hosts_intf(interface: &str) -> String {
        format!("unmonitored_hosts_{interface}")
    }

    pub fn monitored_hosts6_intf(interface: &str) -> String {
        format!("monitored_hosts6_{interface}")
    }

    /// Per-device record (manual-override flag, addresses).
    pub fn host_record(mac: &str) -> String {
        format!("host:mac:{mac}")
    }
}

/// Store backend failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Key/value + hash + set + sorted-set store operations.
///
/// `zrevrange` returns `(member, score)` pairs ordered most-recent-first:
/// score descending, insertion order breaking ties (later insert first).
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    async fn del(&self, key: &str) -> Result<(), StoreError>;

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError>;
    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, StoreError>;
    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, StoreError>;

    async fn sadd(&self, key: &str, member: &str) -> Result<(), StoreError>;
    async fn srem(&self, key: &str, member: &str) -> Result<(), StoreError>;
    async fn sismember(&self, key: &str, member: &str) -> Result<bool, StoreError>;
    async fn smembers(&self, key: &str) -> Result<Vec<String>, StoreError>;

    async fn zadd(&self, key: &str, score: i64, member: &str) -> Result<(), StoreError>;
    /// Inclusive index range over the descending ordering, redis-style.
    async fn zrevrange(
        &self,
        key: &str,
        start: usize,
        stop: usize,
    ) -> Result<Vec<(String, i64)>, StoreError>;
}

// ── In-memory implementation ────────────────────────────────────────

enum Entry {
    Value(String),
    Hash(HashMap<String, String>),
    Set(HashSet<String>),
    /// (score, insertion seq, member)
    Sorted(Vec<(i64, u64, String)>),
}

/// Concurrent in-memory store.
///
/// Writes of a different type replace the key wholesale; reads of a
/// mismatched type behave as if the key were absent.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, Entry>,
    seq: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).and_then(|e| match e.value() {
            Entry::Value(v) => Some(v.clone()),
            _ => None,
        }))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .insert(key.to_owned(), Entry::Value(value.to_owned()));
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError> {
        let mut entry = self
            .entries
            .entry(key.to_owned())
            .or_insert_with(|| Entry::Hash(HashMap::new()));
        match entry.value_mut() {
            Entry::Hash(map) => {
                map.insert(field.to_owned(), value.to_owned());
            }
            other => {
                let mut map = HashMap::new();
                map.insert(field.to_owned(), value.to_owned());
                *other = Entry::Hash(map);
            }
        }
        Ok(())
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).and_then(|e| match e.value() {
            Entry::Hash(map) => map.get(field).cloned(),
            _ => None,
        }))
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        Ok(self
            .entries
            .get(key)
            .and_then(|e| match e.value() {
                Entry::Hash(map) => Some(map.clone()),
                _ => None,
            })
            .unwrap_or_default())
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let mut entry = self
            .entries
            .entry(key.to_owned())
            .or_insert_with(|| Entry::Set(HashSet::new()));
        match entry.value_mut() {
            Entry::Set(set) => {
                set.insert(member.to_owned());
            }
            other => {
                let mut set = HashSet::new();
                set.insert(member.to_owned());
                *other = Entry::Set(set);
            }
        }
        Ok(())
    }

    async fn srem(&self, key: &str, member: &str) -> Result<(), StoreError> {
        if let Some(mut entry) = self.entries.get_mut(key) {
            if let Entry::Set(set) = entry.value_mut() {
                set.remove(member);
            }
        }
        Ok(())
    }

    async fn sismember(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        Ok(self.entries.get(key).is_some_and(|e| match e.value() {
            Entry::Set(set) => set.contains(member),
            _ => false,
        }))
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .entries
            .get(key)
            .and_then(|e| match e.value() {
                Entry::Set(set) => Some(set.iter().cloned().collect()),
                _ => None,
            })
            .unwrap_or_default())
    }

    async fn zadd(&self, key: &str, score: i64, member: &str) -> Result<(), StoreError> {
        let seq = self.next_seq();
        let mut entry = self
            .entries
            .entry(key.to_owned())
            .or_insert_with(|| Entry::Sorted(Vec::new()));
        match entry.value_mut() {
            Entry::Sorted(items) => {
                // re-adding an existing member updates its score
                items.retain(|(_, _, m)| m != member);
                items.push((score, seq, member.to_owned()));
            }
            other => {
                *other = Entry::Sorted(vec![(score, seq, member.to_owned())]);
            }
        }
        Ok(())
    }

    async fn zrevrange(
        &self,
        key: &str,
        start: usize,
        stop: usize,
    ) -> Result<Vec<(String, i64)>, StoreError> {
        let Some(entry) = self.entries.get(key) else {
            return Ok(Vec::new());
        };
        let Entry::Sorted(items) = entry.value() else {
            return Ok(Vec::new());
        };

        let mut ordered: Vec<_> = items.clone();
        ordered.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));

        Ok(ordered
            .into_iter()
            .skip(start)
            .take(stop.saturating_sub(start).saturating_add(1))
            .map(|(score, _, member)| (member, score))
            .collect())
    }
}
