//! Common test utilities

use std::sync::Arc;
use tally_cache::{Cache, MemoryBackend, SynapBackend, TallyConfig};

/// Fresh cache over an in-memory backend, plus a handle to inspect the backend
#[allow(dead_code)] // Used by other test modules
pub async fn setup_memory_cache() -> (Cache, MemoryBackend) {
    let backend = MemoryBackend::new();
    let cache = Cache::new(Arc::new(backend.clone()))
        .await
        .expect("flush on a memory backend cannot fail");
    (cache, backend)
}

/// Synap backend for S2S tests (requires running server)
#[allow(dead_code)] // Used by S2S test modules
pub fn setup_s2s_backend() -> SynapBackend {
    let url = std::env::var("SYNAP_URL").unwrap_or_else(|_| "http://localhost:15500".to_string());
    let config = TallyConfig::default().with_url(url);
    SynapBackend::new(&config.backend).unwrap()
}
