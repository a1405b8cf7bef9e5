use std::sync::atomic::{AtomicU8, Ordering};

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::{
    ApiResult, Backend, Conversation, Envelope, Greeting, IndexStats, ModelHealth, Preview,
    ReindexReport, Reply, SavedScript, SessionId, UsageStats,
};
use crate::error::TransportError;
use crate::format::ScriptFormat;

const LINK_UNKNOWN: u8 = 0;
const LINK_UP: u8 = 1;
const LINK_DOWN: u8 = 2;

#[derive(Serialize)]
struct SessionRequest<'a> {
    session_id: &'a SessionId,
}

#[derive(Serialize)]
struct MessageRequest<'a> {
    session_id: &'a SessionId,
    message: &'a str,
}

#[derive(Serialize)]
struct ScriptRequest<'a> {
    session_id: &'a SessionId,
    format: ScriptFormat,
}

/// JSON-over-HTTP client for the generator backend.
pub struct HttpBackend {
    client: Client,
    base_url: String,
    link: AtomicU8,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            link: AtomicU8::new(LINK_UNKNOWN),
        }
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> ApiResult<T> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, "POST");

        let response = self.client.post(&url).json(body).send().await;
        let response = self.track(response)?;
        decode_envelope(response).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, "GET");

        let response = self.client.get(&url).send().await;
        let response = self.track(response)?;
        decode_envelope(response).await
    }

    /// Records link transitions; the backend's connect/disconnect lifecycle is only logged.
    fn track(&self, response: reqwest::Result<Response>) -> Result<Response, TransportError> {
        let next = if response.is_ok() { LINK_UP } else { LINK_DOWN };
        let previous = self.link.swap(next, Ordering::Relaxed);

        if previous != next {
            match next {
                LINK_UP => tracing::info!(base_url = %self.base_url, "connected to backend"),
                _ => tracing::warn!(base_url = %self.base_url, "disconnected from backend"),
            }
        }

        Ok(response?)
    }
}

/// The backend answers failures with 4xx/5xx and an envelope body, so the status
/// is only checked when the body is not an envelope.
async fn decode_envelope<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let status = response.status();
    let body: Value = match response.json().await {
        Ok(body) => body,
        Err(_) if !status.is_success() => {
            return Err(TransportError::new(format!("request failed with status {}", status)));
        }
        Err(e) => return Err(e.into()),
    };

    Envelope::from_value(body)
}

#[async_trait]
impl Backend for HttpBackend {
    async fn start_conversation(&self) -> ApiResult<Conversation> {
        self.post("/api/start-conversation", &serde_json::json!({})).await
    }

    async fn send_message(&self, session: &SessionId, message: &str) -> ApiResult<Reply> {
        self.post("/api/send-message", &MessageRequest { session_id: session, message }).await
    }

    async fn reset_conversation(&self, session: &SessionId) -> ApiResult<Greeting> {
        self.post("/api/reset-conversation", &SessionRequest { session_id: session }).await
    }

    async fn reindex_documents(&self) -> ApiResult<ReindexReport> {
        self.post("/api/reindex-documents", &serde_json::json!({})).await
    }

    async fn preview_script(&self, session: &SessionId, format: ScriptFormat) -> ApiResult<Preview> {
        self.post("/api/preview-script", &ScriptRequest { session_id: session, format }).await
    }

    async fn save_script(&self, session: &SessionId, format: ScriptFormat) -> ApiResult<SavedScript> {
        self.post("/api/save-script", &ScriptRequest { session_id: session, format }).await
    }

    async fn index_stats(&self) -> ApiResult<IndexStats> {
        self.get("/api/vectorstore-stats").await
    }

    async fn model_health(&self) -> Result<ModelHealth, TransportError> {
        let url = format!("{}/api/llm-health", self.base_url);
        tracing::debug!(%url, "GET");

        let response = self.client.get(&url).send().await;
        let response = self.track(response)?;

        if !response.status().is_success() {
            return Err(TransportError::new(format!(
                "health check failed with status: {}",
                response.status()
            )));
        }

        Ok(response.json().await?)
    }

    async fn usage_stats(&self) -> ApiResult<UsageStats> {
        self.get("/api/stats").await
    }

    fn result_url(&self, session: &SessionId, format: ScriptFormat) -> String {
        match Url::parse(&self.base_url) {
            Ok(mut url) => {
                if let Ok(mut segments) = url.path_segments_mut() {
                    segments.pop_if_empty().push("result").push(session.as_str());
                }
                url.query_pairs_mut().append_pair("format", format.as_str());
                url.to_string()
            }
            Err(_) => format!("{}/result/{}?format={}", self.base_url, session, format),
        }
    }
}
