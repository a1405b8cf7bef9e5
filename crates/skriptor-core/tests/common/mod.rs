#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use skriptor_core::api::{
    ApiResult, Backend, ContentKind, Conversation, Envelope, Greeting, IndexStats, ModelHealth,
    Preview, ReindexReport, Reply, SavedScript, SessionId, UsageStats,
};
use skriptor_core::{
    ControllerParts, Notifier, RequestGateway, ResultViewer, ScriptFormat, SessionController,
    TextRenderer, TransportError,
};

pub fn ok<T>(payload: T) -> ApiResult<T> {
    Ok(Envelope::Success(payload))
}

pub fn fail<T>(message: &str) -> ApiResult<T> {
    Ok(Envelope::Failure(message.to_string()))
}

pub fn down<T>(message: &str) -> ApiResult<T> {
    Err(TransportError::new(message))
}

pub fn conversation(id: &str, message: &str) -> ApiResult<Conversation> {
    ok(Conversation {
        session_id: SessionId::new(id),
        message: message.to_string(),
    })
}

pub fn reply(message: &str, script_generated: bool) -> ApiResult<Reply> {
    ok(Reply {
        message: message.to_string(),
        script_generated,
    })
}

pub fn greeting(message: &str) -> ApiResult<Greeting> {
    ok(Greeting {
        message: message.to_string(),
    })
}

pub fn preview(kind: ContentKind, content: &str) -> ApiResult<Preview> {
    ok(Preview {
        content_type: kind,
        content: content.to_string(),
    })
}

pub fn usage(count: u64) -> ApiResult<UsageStats> {
    ok(UsageStats {
        generated_scripts_count: count,
    })
}

fn next<T>(queue: &Mutex<VecDeque<ApiResult<T>>>, endpoint: &str) -> ApiResult<T> {
    queue
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(TransportError::new(format!("no scripted response for {}", endpoint))))
}

/// In-memory backend answering from per-endpoint queues and recording every call.
#[derive(Default)]
pub struct ScriptedBackend {
    start: Mutex<VecDeque<ApiResult<Conversation>>>,
    send: Mutex<VecDeque<ApiResult<Reply>>>,
    reset: Mutex<VecDeque<ApiResult<Greeting>>>,
    reindex: Mutex<VecDeque<ApiResult<ReindexReport>>>,
    preview: Mutex<VecDeque<ApiResult<Preview>>>,
    save: Mutex<VecDeque<ApiResult<SavedScript>>>,
    index: Mutex<VecDeque<ApiResult<IndexStats>>>,
    health: Mutex<VecDeque<Result<ModelHealth, TransportError>>>,
    usage: Mutex<VecDeque<ApiResult<UsageStats>>>,
    calls: Mutex<Vec<String>>,
    gates: Mutex<HashMap<&'static str, Arc<Notify>>>,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on_start(&self, response: ApiResult<Conversation>) {
        self.start.lock().unwrap().push_back(response);
    }

    pub fn on_send(&self, response: ApiResult<Reply>) {
        self.send.lock().unwrap().push_back(response);
    }

    pub fn on_reset(&self, response: ApiResult<Greeting>) {
        self.reset.lock().unwrap().push_back(response);
    }

    pub fn on_reindex(&self, response: ApiResult<ReindexReport>) {
        self.reindex.lock().unwrap().push_back(response);
    }

    pub fn on_preview(&self, response: ApiResult<Preview>) {
        self.preview.lock().unwrap().push_back(response);
    }

    pub fn on_save(&self, response: ApiResult<SavedScript>) {
        self.save.lock().unwrap().push_back(response);
    }

    pub fn on_index(&self, response: ApiResult<IndexStats>) {
        self.index.lock().unwrap().push_back(response);
    }

    pub fn on_health(&self, response: Result<ModelHealth, TransportError>) {
        self.health.lock().unwrap().push_back(response);
    }

    pub fn on_usage(&self, response: ApiResult<UsageStats>) {
        self.usage.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, endpoint: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.split(':').next() == Some(endpoint))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    /// Keep the next call to `endpoint` in flight until the returned gate is notified.
    pub fn hold(&self, endpoint: &'static str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().unwrap().insert(endpoint, gate.clone());
        gate
    }

    async fn pass(&self, endpoint: &'static str) {
        let gate = self.gates.lock().unwrap().remove(endpoint);
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn start_conversation(&self) -> ApiResult<Conversation> {
        self.record("start".to_string());
        self.pass("start").await;
        next(&self.start, "start")
    }

    async fn send_message(&self, session: &SessionId, message: &str) -> ApiResult<Reply> {
        self.record(format!("send:{}:{}", session, message));
        next(&self.send, "send")
    }

    async fn reset_conversation(&self, session: &SessionId) -> ApiResult<Greeting> {
        self.record(format!("reset:{}", session));
        self.pass("reset").await;
        next(&self.reset, "reset")
    }

    async fn reindex_documents(&self) -> ApiResult<ReindexReport> {
        self.record("reindex".to_string());
        next(&self.reindex, "reindex")
    }

    async fn preview_script(&self, session: &SessionId, format: ScriptFormat) -> ApiResult<Preview> {
        self.record(format!("preview:{}:{}", session, format));
        next(&self.preview, "preview")
    }

    async fn save_script(&self, session: &SessionId, format: ScriptFormat) -> ApiResult<SavedScript> {
        self.record(format!("save:{}:{}", session, format));
        self.pass("save").await;
        next(&self.save, "save")
    }

    async fn index_stats(&self) -> ApiResult<IndexStats> {
        self.record("index".to_string());
        next(&self.index, "index")
    }

    async fn model_health(&self) -> Result<ModelHealth, TransportError> {
        self.record("health".to_string());
        self.health
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::new("no scripted response for health")))
    }

    async fn usage_stats(&self) -> ApiResult<UsageStats> {
        self.record("usage".to_string());
        next(&self.usage, "usage")
    }

    fn result_url(&self, session: &SessionId, format: ScriptFormat) -> String {
        format!("http://generator.test/result/{}?format={}", session, format)
    }
}

/// Remembers every address it was asked to open.
#[derive(Default)]
pub struct RecordingViewer {
    opened: Mutex<Vec<String>>,
}

impl RecordingViewer {
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

impl ResultViewer for RecordingViewer {
    fn open(&self, url: &str) {
        self.opened.lock().unwrap().push(url.to_string());
    }
}

pub struct Harness {
    pub backend: Arc<ScriptedBackend>,
    pub notifier: Notifier,
    pub viewer: Arc<RecordingViewer>,
    pub controller: SessionController,
}

pub fn harness() -> Harness {
    let backend = ScriptedBackend::new();
    let notifier = Notifier::new();
    let viewer = Arc::new(RecordingViewer::default());
    let gateway = RequestGateway::new(notifier.clone(), Duration::from_secs(5));

    let controller = SessionController::new(ControllerParts {
        backend: backend.clone(),
        gateway,
        renderer: TextRenderer::new(),
        viewer: viewer.clone(),
        format: ScriptFormat::Txt,
        stats_threshold: 5,
    });

    Harness {
        backend,
        notifier,
        viewer,
        controller,
    }
}

/// A harness whose session has been started successfully.
pub async fn started() -> Harness {
    let mut h = harness();
    h.backend.on_start(conversation("s1", "Für welche Organisation erstellen wir den Kurs?"));
    h.backend.on_usage(usage(0));
    assert!(h.controller.start().await);
    h
}

/// A started harness whose script has been generated.
pub async fn with_script() -> Harness {
    let mut h = started().await;
    h.backend.on_send(reply("Hier ist der entworfene E-Learning-Kurs", true));
    h.backend.on_preview(preview(ContentKind::Text, "# Kurs\nModul 1"));
    h.backend.on_usage(usage(1));
    assert!(h.controller.send("Krankenhaus").await);
    assert!(h.controller.session().script_generated());
    h
}
