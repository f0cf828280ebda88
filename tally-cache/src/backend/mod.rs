//! Key-value store backends
//!
//! The cache only needs six primitives from its store. Any Redis-like
//! store that offers an atomic increment and an order-preserving list
//! append can sit behind [`StoreBackend`].

mod memory;
mod synap;

pub use memory::{MemoryBackend, MemoryStats};
pub use synap::SynapBackend;

use crate::config::{BackendConfig, BackendKind};
use crate::error::Result;
use crate::value::Value;
use async_trait::async_trait;
use std::sync::Arc;

/// Capability interface of the backing key-value store
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Store a scalar value under `key`, replacing any previous scalar
    async fn set(&self, key: &str, value: &Value) -> Result<()>;

    /// Raw bytes stored under `key`, `None` if the key does not exist
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Atomically increment the integer at `key` (missing counts as 0)
    async fn increment(&self, key: &str) -> Result<i64>;

    /// Append to the tail of the list at `key`, returning the new length
    async fn append_list(&self, key: &str, value: &str) -> Result<usize>;

    /// Inclusive range of the list at `key`; negative indices count from the tail
    async fn range_list(&self, key: &str, start: i64, stop: i64) -> Result<Vec<Vec<u8>>>;

    /// Drop every key in the backend namespace
    async fn flush_all(&self) -> Result<()>;

    /// Declare that `key` holds a list
    ///
    /// Backends that cannot enumerate their lists during `flush_all` use
    /// this to know what to empty.
    fn track_list(&self, _key: &str) {}
}

/// Build the backend selected by the configuration
pub fn connect(config: &BackendConfig) -> Result<Arc<dyn StoreBackend>> {
    match config.kind {
        BackendKind::Memory => Ok(Arc::new(MemoryBackend::new())),
        BackendKind::Synap => Ok(Arc::new(SynapBackend::new(config)?)),
    }
}
