//! Call interceptors
//!
//! Both interceptors wrap another [`Operation`] and keep its identity, so
//! they stack in any order:
//!
//! ```text
//! CountingInterceptor          INCR  <id>
//!   └─ HistoryInterceptor      RPUSH <id>:inputs / <id>:outputs
//!        └─ StoreOperation     SET   <uuid>
//! ```

use crate::backend::StoreBackend;
use crate::error::Result;
use crate::operation::{Operation, OperationId};
use crate::value::{Args, Value};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Counts every invocation of the wrapped operation
///
/// The counter is incremented before the inner operation runs, so a call
/// that fails downstream is still counted. The result passes through
/// unchanged.
pub struct CountingInterceptor {
    inner: Box<dyn Operation>,
    backend: Arc<dyn StoreBackend>,
}

impl CountingInterceptor {
    pub fn new(inner: Box<dyn Operation>, backend: Arc<dyn StoreBackend>) -> Self {
        Self { inner, backend }
    }
}

#[async_trait]
impl Operation for CountingInterceptor {
    fn identity(&self) -> &OperationId {
        self.inner.identity()
    }

    async fn invoke(&self, args: &Args) -> Result<Value> {
        let id = self.inner.identity();
        let calls = self.backend.increment(id.counter_key()).await?;
        debug!("{} call #{}", id, calls);

        self.inner.invoke(args).await
    }
}

/// Records the arguments and result of every invocation
///
/// Returns the rendered result as `Value::Str` rather than the inner
/// operation's value. A failed call records `<error: ...>` as its output
/// and the error is returned unchanged.
pub struct HistoryInterceptor {
    inner: Box<dyn Operation>,
    backend: Arc<dyn StoreBackend>,
}

impl HistoryInterceptor {
    pub fn new(inner: Box<dyn Operation>, backend: Arc<dyn StoreBackend>) -> Self {
        Self { inner, backend }
    }
}

#[async_trait]
impl Operation for HistoryInterceptor {
    fn identity(&self) -> &OperationId {
        self.inner.identity()
    }

    async fn invoke(&self, args: &Args) -> Result<Value> {
        let id = self.inner.identity();

        let input = args.to_string();
        self.backend.append_list(&id.inputs_key(), &input).await?;

        let output = match self.inner.invoke(args).await {
            Ok(value) => value.render(),
            Err(err) => {
                // Keep inputs and outputs index-aligned for later calls
                let placeholder = format!("<error: {}>", err);
                if let Err(append_err) =
                    self.backend.append_list(&id.outputs_key(), &placeholder).await
                {
                    warn!("failed to record error output of {}: {}", id, append_err);
                }
                return Err(err);
            }
        };
        self.backend.append_list(&id.outputs_key(), &output).await?;

        debug!("{}(*{}) -> {}", id, input, output);
        Ok(Value::Str(output))
    }
}
