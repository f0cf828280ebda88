//! # Tally
//!
//! Instrumented cache over a Redis-like key-value store.
//!
//! ## Features
//!
//! - **Cache**: store strings, bytes, integers and floats under random keys
//! - **Call counting**: every `store` increments a per-operation counter
//! - **Call history**: arguments and results are appended to backend lists
//! - **Replay**: render the recorded calls of any instrumented operation
//! - **Backends**: in-process memory store or a remote Synap server
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tally_cache::{Cache, MemoryBackend};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cache = Cache::new(Arc::new(MemoryBackend::new())).await?;
//!
//!     let key = cache.store("hello").await?;
//!     let value = cache.retrieve_string(&key).await?;
//!     println!("Value: {:?}", value);
//!
//!     print!("{}", cache.replay(&Cache::STORE).await?);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod interceptor;
pub mod operation;
pub mod replay;
pub mod value;

pub use backend::{MemoryBackend, MemoryStats, StoreBackend, SynapBackend};
pub use cache::Cache;
pub use config::{BackendKind, TallyConfig};
pub use error::{Result, TallyError};
pub use interceptor::{CountingInterceptor, HistoryInterceptor};
pub use operation::{Operation, OperationId};
pub use replay::{CallLog, CallRecord, replay};
pub use value::{Args, Value};
