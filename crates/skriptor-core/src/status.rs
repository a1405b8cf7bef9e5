//! Health badges for the retrieval index and the language-model backend.
//!
//! Each poll fully replaces the previous view. A failed poll (the probe itself
//! did not complete) renders [`StatusView::Failed`], which is distinct from a
//! backend that reports itself unavailable.

use std::time::Duration;

use crate::api::{Backend, Envelope, IndexStats, ModelHealth, ModelState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Checking,
    Available,
    Degraded,
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeTier {
    Neutral,
    Success,
    Warning,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Badge {
    pub tier: BadgeTier,
    pub label: String,
}

impl Badge {
    pub fn new(tier: BadgeTier, label: impl Into<String>) -> Self {
        Self {
            tier,
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HealthStatus {
    pub state: HealthState,
    pub badge: Badge,
    /// Label/value pairs in display order.
    pub details: Vec<(String, String)>,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatusView {
    Checking,
    Report(HealthStatus),
    Failed(String),
}

impl StatusView {
    pub fn badge(&self) -> Badge {
        match self {
            StatusView::Checking => Badge::new(BadgeTier::Neutral, "checking"),
            StatusView::Report(status) => status.badge.clone(),
            StatusView::Failed(_) => Badge::new(BadgeTier::Danger, "error"),
        }
    }

    pub fn state(&self) -> Option<HealthState> {
        match self {
            StatusView::Checking => Some(HealthState::Checking),
            StatusView::Report(status) => Some(status.state),
            StatusView::Failed(_) => None,
        }
    }
}

/// What a poller probes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    RetrievalIndex,
    LanguageModel { expected_model: String },
}

impl Probe {
    pub fn title(&self) -> &'static str {
        match self {
            Probe::RetrievalIndex => "Document index",
            Probe::LanguageModel { .. } => "Language model",
        }
    }

    /// One request/render cycle. Never fails; failures become [`StatusView::Failed`].
    pub async fn fetch(&self, backend: &dyn Backend, deadline: Duration) -> StatusView {
        match self {
            Probe::RetrievalIndex => {
                match tokio::time::timeout(deadline, backend.index_stats()).await {
                    Err(_) => StatusView::Failed(format!("no answer within {}s", deadline.as_secs())),
                    Ok(Err(e)) => StatusView::Failed(e.to_string()),
                    Ok(Ok(Envelope::Failure(message))) => StatusView::Failed(message),
                    Ok(Ok(Envelope::Success(stats))) => StatusView::Report(render_index(&stats)),
                }
            }
            Probe::LanguageModel { expected_model } => {
                match tokio::time::timeout(deadline, backend.model_health()).await {
                    Err(_) => StatusView::Failed(format!("no answer within {}s", deadline.as_secs())),
                    Ok(Err(e)) => StatusView::Failed(e.to_string()),
                    Ok(Ok(health)) => StatusView::Report(render_model(&health, expected_model)),
                }
            }
        }
    }
}

pub fn render_index(stats: &IndexStats) -> HealthStatus {
    let mut details = vec![("Documents".to_string(), stats.document_count.to_string())];
    if !stats.location.is_empty() {
        details.push(("Location".to_string(), stats.location.clone()));
    }

    if stats.document_count > 0 {
        HealthStatus {
            state: HealthState::Available,
            badge: Badge::new(BadgeTier::Success, "documents indexed"),
            details,
            hint: None,
        }
    } else {
        HealthStatus {
            state: HealthState::Degraded,
            badge: Badge::new(BadgeTier::Warning, "empty"),
            details,
            hint: Some("The index is empty. Re-index the documents to enable retrieval.".to_string()),
        }
    }
}

pub fn render_model(health: &ModelHealth, expected_model: &str) -> HealthStatus {
    let model = health
        .model
        .clone()
        .unwrap_or_else(|| expected_model.to_string());

    match health.status {
        ModelState::Available => {
            let mut details = vec![("Model".to_string(), model)];
            if let Some(seconds) = health.response_time {
                details.push(("Response time".to_string(), format!("{:.2}s", seconds)));
            }
            HealthStatus {
                state: HealthState::Available,
                badge: Badge::new(BadgeTier::Success, "available"),
                details,
                hint: None,
            }
        }
        ModelState::Degraded => HealthStatus {
            state: HealthState::Degraded,
            badge: Badge::new(BadgeTier::Warning, "degraded"),
            details: vec![
                ("Model".to_string(), model),
                (
                    "Response".to_string(),
                    health.response.clone().unwrap_or_default(),
                ),
            ],
            hint: None,
        },
        ModelState::Unavailable => {
            let problem = health
                .error
                .clone()
                .unwrap_or_else(|| "The model is not responding.".to_string());
            HealthStatus {
                state: HealthState::Unavailable,
                badge: Badge::new(BadgeTier::Danger, "unavailable"),
                details: vec![("Error".to_string(), problem)],
                hint: Some(format!(
                    "Make sure Ollama is running (ollama serve) and the model is pulled: ollama pull {}",
                    expected_model
                )),
            }
        }
    }
}

/// One health widget. Holds only the latest view.
#[derive(Debug, Clone)]
pub struct StatusPoller {
    probe: Probe,
    view: StatusView,
}

impl StatusPoller {
    pub fn new(probe: Probe) -> Self {
        Self {
            probe,
            view: StatusView::Checking,
        }
    }

    pub fn retrieval_index() -> Self {
        Self::new(Probe::RetrievalIndex)
    }

    pub fn language_model(expected_model: &str) -> Self {
        Self::new(Probe::LanguageModel {
            expected_model: expected_model.to_string(),
        })
    }

    pub fn probe(&self) -> &Probe {
        &self.probe
    }

    pub fn view(&self) -> &StatusView {
        &self.view
    }

    /// Mark the widget as checking, for callers that run [`Probe::fetch`] elsewhere.
    pub fn begin(&mut self) {
        self.view = StatusView::Checking;
    }

    pub fn apply(&mut self, view: StatusView) {
        self.view = view;
    }

    pub async fn poll(&mut self, backend: &dyn Backend, deadline: Duration) -> &StatusView {
        self.begin();
        let view = self.probe.fetch(backend, deadline).await;
        self.apply(view);
        &self.view
    }
}
