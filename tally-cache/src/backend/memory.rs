use super::StoreBackend;
use crate::error::{Result, TallyError};
use crate::value::Value;
use async_trait::async_trait;
use parking_lot::RwLock;
use radix_trie::{Trie, TrieCommon};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info};

/// Entry stored under a single key
#[derive(Debug, Clone)]
enum Entry {
    Scalar(Vec<u8>),
    List(VecDeque<Vec<u8>>),
}

/// Operation counters for the in-memory backend
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStats {
    pub sets: u64,
    pub gets: u64,
    pub hits: u64,
    pub misses: u64,
    pub increments: u64,
    pub appends: u64,
    pub flushes: u64,
}

/// In-process backend using a radix trie keyed by string
///
/// Every primitive runs under one write lock, so increments and appends
/// are atomic with respect to concurrent callers sharing the handle.
#[derive(Clone)]
pub struct MemoryBackend {
    data: Arc<RwLock<Trie<String, Entry>>>,
    stats: Arc<RwLock<MemoryStats>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(Trie::new())),
            stats: Arc::new(RwLock::new(MemoryStats::default())),
        }
    }

    /// Number of keys currently stored
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> MemoryStats {
        self.stats.read().clone()
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Clamp inclusive Redis-style indices into `0..len`, `None` when the range is empty
fn normalize_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = len as i64;
    if len == 0 {
        return None;
    }

    let start = if start < 0 {
        (len + start).max(0)
    } else {
        start
    };

    let stop = if stop < 0 {
        len + stop
    } else {
        stop.min(len - 1)
    };

    if start > stop || start >= len {
        return None;
    }

    Some((start as usize, stop as usize))
}

#[async_trait]
impl StoreBackend for MemoryBackend {
    async fn set(&self, key: &str, value: &Value) -> Result<()> {
        let bytes = value.to_bytes();
        debug!("SET key={}, kind={}, size={}", key, value.kind(), bytes.len());

        self.data.write().insert(key.to_string(), Entry::Scalar(bytes));
        self.stats.write().sets += 1;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        debug!("GET key={}", key);

        let data = self.data.read();
        let mut stats = self.stats.write();
        stats.gets += 1;

        match data.get(key) {
            Some(Entry::Scalar(bytes)) => {
                stats.hits += 1;
                Ok(Some(bytes.clone()))
            }
            Some(Entry::List(_)) => Err(TallyError::WrongType(key.to_string())),
            None => {
                stats.misses += 1;
                Ok(None)
            }
        }
    }

    async fn increment(&self, key: &str) -> Result<i64> {
        debug!("INCR key={}", key);

        let mut data = self.data.write();

        let current = match data.get(key) {
            Some(Entry::Scalar(bytes)) => std::str::from_utf8(bytes)
                .ok()
                .and_then(|s| s.parse::<i64>().ok())
                .ok_or_else(|| {
                    TallyError::InvalidValue("Value is not a valid integer".to_string())
                })?,
            Some(Entry::List(_)) => return Err(TallyError::WrongType(key.to_string())),
            None => 0,
        };

        let next = current
            .checked_add(1)
            .ok_or_else(|| TallyError::InvalidValue("Increment would overflow".to_string()))?;

        data.insert(
            key.to_string(),
            Entry::Scalar(next.to_string().into_bytes()),
        );
        self.stats.write().increments += 1;

        Ok(next)
    }

    async fn append_list(&self, key: &str, value: &str) -> Result<usize> {
        debug!("RPUSH key={}, size={}", key, value.len());

        let mut data = self.data.write();

        let length = match data.get_mut(key) {
            Some(Entry::List(items)) => {
                items.push_back(value.as_bytes().to_vec());
                items.len()
            }
            Some(Entry::Scalar(_)) => return Err(TallyError::WrongType(key.to_string())),
            None => {
                let mut items = VecDeque::new();
                items.push_back(value.as_bytes().to_vec());
                data.insert(key.to_string(), Entry::List(items));
                1
            }
        };
        self.stats.write().appends += 1;

        Ok(length)
    }

    async fn range_list(&self, key: &str, start: i64, stop: i64) -> Result<Vec<Vec<u8>>> {
        debug!("LRANGE key={}, start={}, stop={}", key, start, stop);

        let data = self.data.read();

        match data.get(key) {
            Some(Entry::List(items)) => Ok(normalize_range(items.len(), start, stop)
                .map(|(from, to)| items.range(from..=to).cloned().collect())
                .unwrap_or_default()),
            Some(Entry::Scalar(_)) => Err(TallyError::WrongType(key.to_string())),
            None => Ok(Vec::new()),
        }
    }

    async fn flush_all(&self) -> Result<()> {
        let mut data = self.data.write();
        let flushed = data.len();
        *data = Trie::new();
        self.stats.write().flushes += 1;

        info!("FLUSHALL dropped {} keys", flushed);
        Ok(())
    }
}
