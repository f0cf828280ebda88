//! Synap backend over the StreamableHTTP command protocol

use super::StoreBackend;
use crate::config::BackendConfig;
use crate::error::{Result, TallyError};
use crate::value::Value;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use parking_lot::Mutex;
use reqwest::Client;
use serde_json::{Value as JsonValue, json};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// `list.ltrim` bounds that leave no element in the list
const TRIM_ALL: (i64, i64) = (0, -i64::MAX);

/// Backend talking to a Synap server
///
/// Scalars travel as base64 text inside the JSON envelope so binary values
/// survive the transport. Counters created by `kv.incr` hold plain decimal
/// text on the server and are read back verbatim.
///
/// Synap keeps lists apart from the KV namespace and `kv.flushall` does not
/// touch them, so the backend remembers every list it appended to and trims
/// those on [`StoreBackend::flush_all`].
#[derive(Clone)]
pub struct SynapBackend {
    config: Arc<BackendConfig>,
    http_client: Client,
    command_url: Url,
    lists: Arc<Mutex<BTreeSet<String>>>,
}

impl SynapBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let base_url = Url::parse(&config.url)?;
        let command_url = base_url.join("api/v1/command")?;

        let mut http_client_builder = Client::builder().timeout(config.timeout());

        if let Some(ref token) = config.auth_token {
            let mut headers = reqwest::header::HeaderMap::new();
            let value = reqwest::header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| TallyError::Config(format!("invalid auth token: {}", e)))?;
            headers.insert(reqwest::header::AUTHORIZATION, value);
            http_client_builder = http_client_builder.default_headers(headers);
        }

        let http_client = http_client_builder.build()?;

        info!("Using Synap backend at {}", base_url);

        Ok(Self {
            config: Arc::new(config.clone()),
            http_client,
            command_url,
            lists: Arc::new(Mutex::new(BTreeSet::new())),
        })
    }

    /// Base URL of the Synap server
    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Send a StreamableHTTP command and return its payload
    ///
    /// ```json
    /// {
    ///   "command": "kv.get",
    ///   "request_id": "uuid",
    ///   "payload": { ... }
    /// }
    /// ```
    async fn send_command(&self, command: &str, payload: JsonValue) -> Result<JsonValue> {
        let request_id = uuid::Uuid::new_v4().to_string();
        debug!("{} request_id={}", command, request_id);

        let body = json!({
            "command": command,
            "request_id": request_id,
            "payload": payload,
        });

        let response = self
            .http_client
            .post(self.command_url.clone())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(TallyError::Server(error_text));
        }

        let result: JsonValue = response.json().await?;

        if !result["success"].as_bool().unwrap_or(false) {
            let error_msg = result["error"]
                .as_str()
                .unwrap_or("Unknown error")
                .to_string();
            return Err(TallyError::Server(error_msg));
        }

        Ok(result["payload"].clone())
    }
}

/// Decode the text `kv.get` returns for a stored key
///
/// Values written by [`SynapBackend::set`] come back as a JSON string
/// holding base64; anything else (counters) is taken as raw text.
fn decode_scalar(text: &str) -> Vec<u8> {
    match serde_json::from_str::<String>(text) {
        Ok(inner) => BASE64
            .decode(inner.as_bytes())
            .unwrap_or_else(|_| inner.into_bytes()),
        Err(_) => text.as_bytes().to_vec(),
    }
}

fn json_to_bytes(value: JsonValue) -> Vec<u8> {
    match value {
        JsonValue::String(s) => s.into_bytes(),
        other => other.to_string().into_bytes(),
    }
}

fn is_missing_list(err: &TallyError) -> bool {
    matches!(err, TallyError::Server(msg) if msg.to_lowercase().contains("not found"))
}

#[async_trait]
impl StoreBackend for SynapBackend {
    fn track_list(&self, key: &str) {
        self.lists.lock().insert(key.to_string());
    }

    async fn set(&self, key: &str, value: &Value) -> Result<()> {
        let payload = json!({
            "key": key,
            "value": BASE64.encode(value.to_bytes()),
        });

        self.send_command("kv.set", payload).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let payload = json!({"key": key});
        let response = self.send_command("kv.get", payload).await?;

        // StreamableHTTP returns null for not found
        match response {
            JsonValue::Null => Ok(None),
            JsonValue::String(text) => Ok(Some(decode_scalar(&text))),
            other => Ok(Some(other.to_string().into_bytes())),
        }
    }

    async fn increment(&self, key: &str) -> Result<i64> {
        let payload = json!({"key": key});
        let response = self.send_command("kv.incr", payload).await?;

        response["value"]
            .as_i64()
            .ok_or_else(|| TallyError::InvalidResponse("kv.incr reply has no value".to_string()))
    }

    async fn append_list(&self, key: &str, value: &str) -> Result<usize> {
        self.track_list(key);

        let payload = json!({
            "key": key,
            "values": [value],
        });

        let response = self.send_command("list.rpush", payload).await?;
        Ok(response.get("length").and_then(|v| v.as_u64()).unwrap_or(0) as usize)
    }

    async fn range_list(&self, key: &str, start: i64, stop: i64) -> Result<Vec<Vec<u8>>> {
        let payload = json!({
            "key": key,
            "start": start,
            "stop": stop,
        });

        let response = match self.send_command("list.lrange", payload).await {
            Ok(response) => response,
            Err(err) if is_missing_list(&err) => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };

        let values = match response.get("values") {
            Some(JsonValue::Array(items)) => items.iter().cloned().map(json_to_bytes).collect(),
            _ => Vec::new(),
        };

        Ok(values)
    }

    async fn flush_all(&self) -> Result<()> {
        let response = self.send_command("kv.flushall", json!({})).await?;
        info!(
            "FLUSHALL dropped {} keys",
            response["flushed"].as_u64().unwrap_or(0)
        );

        let lists: Vec<String> = self.lists.lock().iter().cloned().collect();
        for key in lists {
            let payload = json!({
                "key": key,
                "start": TRIM_ALL.0,
                "stop": TRIM_ALL.1,
            });
            match self.send_command("list.ltrim", payload).await {
                Ok(_) => debug!("emptied list {}", key),
                Err(err) if is_missing_list(&err) => {}
                Err(err) => {
                    warn!("failed to empty list {}: {}", key, err);
                    return Err(err);
                }
            }
        }

        Ok(())
    }
}
