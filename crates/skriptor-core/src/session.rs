//! The session lifecycle controller.
//!
//! `Uninitialized -> Active(no script) -> Active(script)`, with `reset` looping
//! back to `Active(no script)` from either active state. The controller owns the
//! session, transcript and dependent widgets, and publishes a snapshot after
//! every state transition.

use std::sync::Arc;

use tokio::sync::watch;

use crate::api::Backend;
use crate::download::{DownloadController, ResultViewer};
use crate::format::ScriptFormat;
use crate::gateway::{Call, RequestGateway};
use crate::preview::{PreviewController, PreviewPane};
use crate::render::TextRenderer;
use crate::state::{Activity, ChatRole, ChatTurn, Controls, Session, SessionPhase, Transcript};
use crate::stats::StatsWidget;
use crate::status::Badge;

/// Everything a front end needs to draw the session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub session: Session,
    pub turns: Vec<ChatTurn>,
    pub controls: Controls,
    pub format: ScriptFormat,
    pub preview: PreviewPane,
    pub generated_count: Option<u64>,
    pub stats_badge: Badge,
}

impl SessionSnapshot {
    pub fn phase(&self) -> SessionPhase {
        self.session.phase()
    }
}

pub struct ControllerParts {
    pub backend: Arc<dyn Backend>,
    pub gateway: RequestGateway,
    pub renderer: TextRenderer,
    pub viewer: Arc<dyn ResultViewer>,
    pub format: ScriptFormat,
    pub stats_threshold: u64,
}

pub struct SessionController {
    backend: Arc<dyn Backend>,
    gateway: RequestGateway,
    renderer: TextRenderer,
    session: Session,
    transcript: Transcript,
    activity: Activity,
    format: ScriptFormat,
    preview: PreviewController,
    downloads: DownloadController,
    stats: StatsWidget,
    updates: watch::Sender<SessionSnapshot>,
}

impl SessionController {
    pub fn new(parts: ControllerParts) -> Self {
        let ControllerParts {
            backend,
            gateway,
            renderer,
            viewer,
            format,
            stats_threshold,
        } = parts;

        let preview = PreviewController::new(Arc::clone(&backend), gateway.clone(), renderer);
        let downloads = DownloadController::new(Arc::clone(&backend), gateway.clone(), viewer);
        let stats = StatsWidget::new(Arc::clone(&backend), gateway.clone(), stats_threshold);

        let initial = SessionSnapshot {
            session: Session::default(),
            turns: Vec::new(),
            controls: Controls::derive(&Session::default(), &Activity::default()),
            format,
            preview: PreviewPane::Placeholder,
            generated_count: None,
            stats_badge: stats.badge(),
        };
        let (updates, _) = watch::channel(initial);

        Self {
            backend,
            gateway,
            renderer,
            session: Session::default(),
            transcript: Transcript::default(),
            activity: Activity::default(),
            format,
            preview,
            downloads,
            stats,
            updates,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.updates.subscribe()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn format(&self) -> ScriptFormat {
        self.format
    }

    pub fn gateway(&self) -> &RequestGateway {
        &self.gateway
    }

    pub fn preview(&self) -> &PreviewPane {
        self.preview.pane()
    }

    pub fn stats(&self) -> &StatsWidget {
        &self.stats
    }

    pub fn controls(&self) -> Controls {
        Controls::derive(&self.session, &self.activity)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session: self.session.clone(),
            turns: self.transcript.turns().to_vec(),
            controls: self.controls(),
            format: self.format,
            preview: self.preview.pane().clone(),
            generated_count: self.stats.count(),
            stats_badge: self.stats.badge(),
        }
    }

    fn publish(&self) {
        self.updates.send_replace(self.snapshot());
    }

    fn push_turn(&mut self, role: ChatRole, text: &str) {
        self.transcript.push(ChatTurn::new(role, text, &self.renderer));
    }

    /// Begin a conversation. Only valid while uninitialized; a failure leaves
    /// the controller uninitialized so the caller may try again.
    pub async fn start(&mut self) -> bool {
        if self.session.is_active() || self.activity.starting {
            tracing::debug!("start ignored: session already active");
            return false;
        }

        self.activity.starting = true;
        self.publish();

        let backend = Arc::clone(&self.backend);
        let gateway = self.gateway.clone();
        let activity = &mut self.activity;
        let outcome = gateway
            .execute_then(
                Call::new("Failed to start the conversation").busy("Initializing..."),
                backend.start_conversation(),
                || activity.starting = false,
            )
            .await;

        let Ok(conversation) = outcome else {
            self.publish();
            return false;
        };

        tracing::info!(session = %conversation.session_id, "conversation started");
        self.session.begin(conversation.session_id);
        self.push_turn(ChatRole::Assistant, &conversation.message);
        self.publish();

        self.stats.refresh().await;
        self.publish();
        true
    }

    /// Send one user message. Blank input is a silent no-op.
    pub async fn send(&mut self, text: &str) -> bool {
        let message = text.trim();
        if message.is_empty() {
            return false;
        }
        let Some(id) = self.session.id().cloned() else {
            tracing::debug!("send ignored: no active session");
            return false;
        };
        if self.activity.sending {
            return false;
        }

        // Shown before the round-trip; kept even if the send fails.
        self.push_turn(ChatRole::User, message);
        self.activity.sending = true;
        self.publish();

        let backend = Arc::clone(&self.backend);
        let gateway = self.gateway.clone();
        let activity = &mut self.activity;
        let outcome = gateway
            .execute_then(
                Call::new("Failed to send the message").busy("Waiting for the assistant..."),
                backend.send_message(&id, message),
                || activity.sending = false,
            )
            .await;

        let reply = match outcome {
            Ok(reply) => reply,
            Err(_) => {
                self.publish();
                return false;
            }
        };

        self.push_turn(ChatRole::Assistant, &reply.message);
        self.publish();

        if reply.script_generated && self.session.mark_script_generated() {
            tracing::info!(session = %id, "script generated");
            self.publish();
            self.refresh_preview().await;
            self.stats.refresh().await;
            self.publish();
        }
        true
    }

    /// Clear the conversation on the same session. A failure changes nothing.
    pub async fn reset(&mut self) -> bool {
        let Some(id) = self.session.id().cloned() else {
            tracing::debug!("reset ignored: no active session");
            return false;
        };
        if self.activity.sending || self.activity.resetting {
            return false;
        }

        self.activity.resetting = true;
        self.publish();

        let backend = Arc::clone(&self.backend);
        let gateway = self.gateway.clone();
        let activity = &mut self.activity;
        let outcome = gateway
            .execute_then(
                Call::new("Failed to reset the conversation").busy("Starting a new conversation..."),
                backend.reset_conversation(&id),
                || activity.resetting = false,
            )
            .await;

        let Ok(greeting) = outcome else {
            self.publish();
            return false;
        };

        tracing::info!(session = %id, "conversation reset");
        self.transcript.clear();
        self.push_turn(ChatRole::Assistant, &greeting.message);
        self.preview.clear();
        self.session.clear_script();
        self.publish();
        true
    }

    /// Rebuild the document index, then start over if a session is active.
    pub async fn reindex(&mut self) -> bool {
        if self.activity.reindexing {
            return false;
        }

        self.activity.reindexing = true;
        self.publish();

        let backend = Arc::clone(&self.backend);
        let gateway = self.gateway.clone();
        let activity = &mut self.activity;
        let outcome = gateway
            .execute_then(
                Call::new("Failed to reindex the documents").busy("Indexing documents..."),
                backend.reindex_documents(),
                || activity.reindexing = false,
            )
            .await;
        self.publish();

        let Ok(report) = outcome else {
            return false;
        };

        self.gateway.notifier().alert(format!("Success: {}", report.message));
        if self.session.is_active() {
            self.reset().await;
        }
        true
    }

    /// Change the output format; refreshes the preview when a script exists.
    pub async fn set_format(&mut self, format: ScriptFormat) {
        if self.format == format {
            return;
        }
        self.format = format;
        self.publish();

        if self.session.script_generated() {
            self.refresh_preview().await;
        }
    }

    pub async fn refresh_preview(&mut self) -> bool {
        let refreshed = self.preview.refresh(&self.session, self.format).await;
        if refreshed {
            self.publish();
        }
        refreshed
    }

    /// Save the script and open its results view. Ignored while a download is running.
    pub async fn download(&mut self) -> bool {
        if self.activity.downloading || !self.session.script_generated() {
            return false;
        }

        self.activity.downloading = true;
        self.publish();

        let opened = self.downloads.download(&self.session, self.format).await;

        self.activity.downloading = false;
        self.publish();
        opened
    }

    pub async fn refresh_stats(&mut self) -> Option<u64> {
        let count = self.stats.refresh().await;
        self.publish();
        count
    }
}
