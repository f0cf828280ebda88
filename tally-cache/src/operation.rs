//! Invocable operations and their identities

use crate::error::Result;
use crate::value::{Args, Value};
use async_trait::async_trait;
use std::borrow::Cow;
use std::fmt;

/// Stable name of an instrumented operation
///
/// The identity is the namespace for the operation's counter and history
/// lists in the backend, so it must not change between releases.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationId(Cow<'static, str>);

impl OperationId {
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Backend key holding the call counter
    pub fn counter_key(&self) -> &str {
        self.as_str()
    }

    /// Backend key of the list of recorded arguments
    pub fn inputs_key(&self) -> String {
        format!("{}:inputs", self.0)
    }

    /// Backend key of the list of recorded results
    pub fn outputs_key(&self) -> String {
        format!("{}:outputs", self.0)
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OperationId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for OperationId {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// An operation that can be wrapped by interceptors
///
/// Wrappers report the identity of the operation they wrap, so any stack
/// of interceptors resolves to the innermost operation's name.
#[async_trait]
pub trait Operation: Send + Sync {
    fn identity(&self) -> &OperationId;

    async fn invoke(&self, args: &Args) -> Result<Value>;
}
