use crate::backend::{self, StoreBackend};
use crate::config::TallyConfig;
use crate::error::{Result, TallyError};
use crate::interceptor::{CountingInterceptor, HistoryInterceptor};
use crate::operation::{Operation, OperationId};
use crate::replay::{self, CallLog};
use crate::value::{Args, Value};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Writes a value under a fresh random key
struct StoreOperation {
    id: OperationId,
    backend: Arc<dyn StoreBackend>,
}

#[async_trait]
impl Operation for StoreOperation {
    fn identity(&self) -> &OperationId {
        &self.id
    }

    async fn invoke(&self, args: &Args) -> Result<Value> {
        let value = args
            .get(0)
            .ok_or_else(|| TallyError::InvalidValue("store expects one argument".to_string()))?;

        let key = uuid::Uuid::new_v4().to_string();
        self.backend.set(&key, value).await?;

        Ok(Value::Str(key))
    }
}

/// Cache over a key-value backend with an instrumented `store`
///
/// Every `store` call increments the `Cache.store` counter and records its
/// argument and returned key; [`Cache::replay`] renders that history.
pub struct Cache {
    backend: Arc<dyn StoreBackend>,
    store_op: Box<dyn Operation>,
}

impl Cache {
    /// Identity of the instrumented store operation
    pub const STORE: OperationId = OperationId::from_static("Cache.store");

    /// Create a cache and flush everything the backend holds
    pub async fn new(backend: Arc<dyn StoreBackend>) -> Result<Self> {
        backend.track_list(&Self::STORE.inputs_key());
        backend.track_list(&Self::STORE.outputs_key());
        backend.flush_all().await?;
        info!("Cache initialized on a flushed backend");
        Ok(Self::attach(backend))
    }

    /// Create a cache over the backend's existing contents
    pub fn attach(backend: Arc<dyn StoreBackend>) -> Self {
        let store_op = StoreOperation {
            id: Self::STORE,
            backend: backend.clone(),
        };

        // Counting wraps history: one INCR, then one input/output pair
        let store_op = CountingInterceptor::new(
            Box::new(HistoryInterceptor::new(Box::new(store_op), backend.clone())),
            backend.clone(),
        );

        Self {
            backend,
            store_op: Box::new(store_op),
        }
    }

    /// Connect to the configured backend and flush it
    pub async fn from_config(config: &TallyConfig) -> Result<Self> {
        let backend = backend::connect(&config.backend)?;
        Self::new(backend).await
    }

    pub fn backend(&self) -> &Arc<dyn StoreBackend> {
        &self.backend
    }

    /// Store a value under a newly generated key and return the key
    pub async fn store(&self, value: impl Into<Value>) -> Result<String> {
        let args = Args::one(value);

        match self.store_op.invoke(&args).await? {
            Value::Str(key) => Ok(key),
            other => Err(TallyError::InvalidResponse(format!(
                "store returned a {} instead of a key",
                other.kind()
            ))),
        }
    }

    /// Raw bytes stored under `key`, `None` if the key does not exist
    pub async fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.backend.get(key).await
    }

    /// Retrieve and convert the stored bytes
    ///
    /// The converter only runs for existing keys; a missing key is always
    /// `None`.
    pub async fn retrieve_with<T, F>(&self, key: &str, converter: F) -> Result<Option<T>>
    where
        F: FnOnce(Vec<u8>) -> T,
    {
        Ok(self.backend.get(key).await?.map(converter))
    }

    /// Retrieve as UTF-8 text, replacing invalid sequences
    pub async fn retrieve_string(&self, key: &str) -> Result<Option<String>> {
        self.retrieve_with(key, |bytes| String::from_utf8_lossy(&bytes).into_owned())
            .await
    }

    /// Retrieve as an integer; values that do not parse read as 0
    pub async fn retrieve_integer(&self, key: &str) -> Result<Option<i64>> {
        self.retrieve_with(key, |bytes| parse_int_or_zero(&bytes))
            .await
    }

    /// Render the recorded calls of an operation
    pub async fn replay(&self, id: &OperationId) -> Result<CallLog> {
        replay::replay(self.backend.as_ref(), id).await
    }
}

fn parse_int_or_zero(bytes: &[u8]) -> i64 {
    match std::str::from_utf8(bytes).map(|s| s.trim().parse::<i64>()) {
        Ok(Ok(n)) => n,
        _ => {
            debug!("stored value is not an integer, reading as 0");
            0
        }
    }
}
