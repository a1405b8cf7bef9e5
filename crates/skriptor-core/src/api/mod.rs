//! Wire types and the backend seam.
//!
//! Every endpoint except the language-model health probe answers with an
//! envelope: `{ "success": true, ...payload }` or `{ "success": false, "error": "..." }`.

pub mod http;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TransportError;
use crate::format::ScriptFormat;

pub use http::HttpBackend;

/// Opaque server-issued conversation token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Decoded success/failure wrapper.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope<T> {
    Success(T),
    Failure(String),
}

impl<T: DeserializeOwned> Envelope<T> {
    pub fn from_value(value: Value) -> Result<Self, TransportError> {
        let success = value
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        if !success {
            let message = value
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            return Ok(Envelope::Failure(message));
        }

        serde_json::from_value(value)
            .map(Envelope::Success)
            .map_err(|e| TransportError::new(format!("malformed response: {}", e)))
    }
}

pub type ApiResult<T> = Result<Envelope<T>, TransportError>;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Conversation {
    pub session_id: SessionId,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Reply {
    pub message: String,
    #[serde(default)]
    pub script_generated: bool,
}

/// Opening assistant text of a fresh or reset conversation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Greeting {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReindexReport {
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// Ready-made markup, inserted as-is.
    Html,
    #[serde(other)]
    Text,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Preview {
    pub content_type: ContentKind,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SavedScript {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IndexStats {
    pub document_count: u64,
    #[serde(default)]
    pub location: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelState {
    Available,
    Degraded,
    #[serde(other)]
    Unavailable,
}

/// Health probe answer. Not enveloped; a non-2xx status is a transport failure.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelHealth {
    pub status: ModelState,
    #[serde(default)]
    pub model: Option<String>,
    /// Seconds the probe prompt took to answer.
    #[serde(default)]
    pub response_time: Option<f64>,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UsageStats {
    pub generated_scripts_count: u64,
}

/// Everything the client asks of the generator backend.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn start_conversation(&self) -> ApiResult<Conversation>;

    async fn send_message(&self, session: &SessionId, message: &str) -> ApiResult<Reply>;

    async fn reset_conversation(&self, session: &SessionId) -> ApiResult<Greeting>;

    async fn reindex_documents(&self) -> ApiResult<ReindexReport>;

    async fn preview_script(&self, session: &SessionId, format: ScriptFormat) -> ApiResult<Preview>;

    async fn save_script(&self, session: &SessionId, format: ScriptFormat) -> ApiResult<SavedScript>;

    async fn index_stats(&self) -> ApiResult<IndexStats>;

    async fn model_health(&self) -> Result<ModelHealth, TransportError>;

    async fn usage_stats(&self) -> ApiResult<UsageStats>;

    /// Address of the browsable results view for a saved script.
    fn result_url(&self, session: &SessionId, format: ScriptFormat) -> String;
}
