//! Reconstruct the call log of an instrumented operation

use crate::backend::StoreBackend;
use crate::error::Result;
use crate::operation::OperationId;
use std::fmt;
use tracing::warn;

/// One recorded invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    pub input: String,
    pub output: String,
}

/// Counter and history of an operation as read from the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallLog {
    pub identity: OperationId,
    pub calls: i64,
    pub entries: Vec<CallRecord>,
}

impl CallLog {
    /// Summary line followed by one line per recorded call
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.entries.len() + 1);
        lines.push(format!("{} was called {} times:", self.identity, self.calls));
        lines.extend(self.entries.iter().map(|entry| {
            format!("{}(*{}) -> {}", self.identity, entry.input, entry.output)
        }));
        lines
    }
}

impl fmt::Display for CallLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.lines() {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

fn to_text(bytes: Vec<u8>) -> String {
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Read the counter and history lists of `id`
///
/// A missing counter reads as zero calls. Inputs and outputs are paired by
/// index; if the lists ever differ in length the extra entries are dropped.
pub async fn replay(backend: &dyn StoreBackend, id: &OperationId) -> Result<CallLog> {
    let calls = match backend.get(id.counter_key()).await? {
        Some(bytes) => std::str::from_utf8(&bytes)
            .ok()
            .and_then(|s| s.trim().parse::<i64>().ok())
            .unwrap_or_else(|| {
                warn!("counter of {} is not an integer, reading as 0", id);
                0
            }),
        None => 0,
    };

    let inputs = backend.range_list(&id.inputs_key(), 0, -1).await?;
    let outputs = backend.range_list(&id.outputs_key(), 0, -1).await?;

    if inputs.len() != outputs.len() {
        warn!(
            "history of {} has {} inputs and {} outputs",
            id,
            inputs.len(),
            outputs.len()
        );
    }

    let entries = inputs
        .into_iter()
        .zip(outputs)
        .map(|(input, output)| CallRecord {
            input: to_text(input),
            output: to_text(output),
        })
        .collect();

    Ok(CallLog {
        identity: id.clone(),
        calls,
        entries,
    })
}
