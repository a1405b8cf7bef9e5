use std::sync::Arc;
use std::time::Duration;

use ratatui::layout::Rect;
use skriptor_core::{
    Backend, Config, ControllerParts, HttpBackend, Notifier, RequestGateway, ScriptFormat,
    SessionController, SessionSnapshot, StatusPoller, StatusView, SystemBrowser, TextRenderer,
};
use tokio::sync::mpsc;

use crate::runtime::{self, Command, SessionHandle};
use crate::tui::AppEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Chat,
    Preview,
}

/// Pending yes/no question shown as a modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirm {
    Reindex,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,
    pub confirm: Option<Confirm>,

    // Message input
    pub input: String,
    pub input_cursor: usize, // cursor position in chars
    awaiting_reply: bool,

    // Scroll state
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_lines: u16,
    pub follow_chat: bool,
    pub preview_scroll: u16,

    // Panel areas for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,
    pub preview_area: Option<Rect>,

    // Animation state
    pub animation_frame: u8,

    // Session and widgets
    pub snapshot: SessionSnapshot,
    pub statuses: Vec<StatusPoller>,
    pub notifier: Notifier,
    session: SessionHandle,
    backend: Arc<dyn Backend>,
    deadline: Duration,
    events: mpsc::UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(config: &Config, events: mpsc::UnboundedSender<AppEvent>) -> Self {
        let backend: Arc<dyn Backend> = Arc::new(HttpBackend::new(&config.base_url));
        let notifier = Notifier::new();
        let deadline = config.request_timeout();
        let gateway = RequestGateway::new(notifier.clone(), deadline);

        let controller = SessionController::new(ControllerParts {
            backend: Arc::clone(&backend),
            gateway,
            renderer: TextRenderer::with_escaping(config.escape_markup),
            viewer: Arc::new(SystemBrowser),
            format: config.default_format,
            stats_threshold: config.stats_threshold,
        });
        let snapshot = controller.snapshot();
        let session = runtime::spawn_session(controller, events.clone());

        Self::with_session(session, snapshot, backend, notifier, config, events)
    }

    pub fn with_session(
        session: SessionHandle,
        snapshot: SessionSnapshot,
        backend: Arc<dyn Backend>,
        notifier: Notifier,
        config: &Config,
        events: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            focus: FocusPane::Chat,
            confirm: None,

            input: String::new(),
            input_cursor: 0,
            awaiting_reply: false,

            chat_scroll: 0,
            chat_height: 0,
            chat_lines: 0,
            follow_chat: true,
            preview_scroll: 0,

            chat_area: None,
            preview_area: None,

            animation_frame: 0,

            snapshot,
            statuses: vec![
                StatusPoller::retrieval_index(),
                StatusPoller::language_model(&config.expected_model),
            ],
            notifier,
            session,
            backend,
            deadline: config.request_timeout(),
            events,
        }
    }

    /// Begin the conversation and the first status polls.
    pub fn launch(&mut self) {
        self.session.dispatch(Command::Start);
        self.refresh_statuses();
    }

    pub fn awaiting_reply(&self) -> bool {
        self.awaiting_reply
    }

    /// Retry a failed start. Only offered while no session exists.
    pub fn start_session(&mut self) {
        if self.snapshot.controls.start && self.session.is_idle() {
            self.session.dispatch(Command::Start);
        }
    }

    /// Pull the latest session snapshot.
    pub fn sync(&mut self) {
        let previous_turns = self.snapshot.turns.len();
        // Read before the snapshot so an idle handle implies a final snapshot.
        let idle = self.session.is_idle();
        self.snapshot = self.session.snapshot();

        if self.snapshot.turns.len() != previous_turns {
            self.follow_chat = true;
        }
        if self.snapshot.turns.len() < previous_turns {
            self.preview_scroll = 0;
        }

        // Give the input back once the reply is in.
        if self.awaiting_reply && idle {
            self.awaiting_reply = false;
            if self.snapshot.controls.input {
                self.input_mode = InputMode::Editing;
            }
        }
    }

    pub fn send_input(&mut self) {
        if !self.snapshot.controls.send || !self.session.is_idle() {
            return;
        }
        let message = self.input.trim().to_string();
        if message.is_empty() {
            return;
        }

        self.input.clear();
        self.input_cursor = 0;
        self.input_mode = InputMode::Normal;
        self.awaiting_reply = true;
        self.follow_chat = true;
        self.session.dispatch(Command::Send(message));
    }

    pub fn reset(&mut self) {
        if self.snapshot.controls.reset && self.session.is_idle() {
            self.session.dispatch(Command::Reset);
        }
    }

    pub fn download(&mut self) {
        if self.snapshot.controls.download && self.session.is_idle() {
            self.session.dispatch(Command::Download);
        }
    }

    pub fn refresh_preview(&mut self) {
        if self.snapshot.controls.preview && self.session.is_idle() {
            self.session.dispatch(Command::RefreshPreview);
        }
    }

    pub fn cycle_format(&mut self) {
        let format = self.snapshot.format.next();
        self.set_format(format);
    }

    pub fn set_format(&mut self, format: ScriptFormat) {
        self.preview_scroll = 0;
        self.session.dispatch(Command::SetFormat(format));

        if let Err(e) = Config::save_default_format(format) {
            tracing::warn!(error = %e, "could not remember the selected format");
        }
    }

    pub fn request_reindex(&mut self) {
        if self.snapshot.controls.reindex && self.session.is_idle() {
            self.confirm = Some(Confirm::Reindex);
        }
    }

    pub fn answer_confirm(&mut self, yes: bool) {
        if let Some(Confirm::Reindex) = self.confirm.take() {
            if yes {
                self.session.dispatch(Command::Reindex);
            }
        }
    }

    pub fn abort(&mut self) {
        self.session.abort();
    }

    pub fn refresh_statuses(&mut self) {
        for (slot, poller) in self.statuses.iter_mut().enumerate() {
            poller.begin();
            runtime::spawn_poll(
                slot,
                poller.probe().clone(),
                Arc::clone(&self.backend),
                self.deadline,
                self.events.clone(),
            );
        }
    }

    pub fn apply_status(&mut self, slot: usize, view: StatusView) {
        if let Some(poller) = self.statuses.get_mut(slot) {
            poller.apply(view);
        }
    }

    pub fn dismiss_alert(&mut self) {
        self.notifier.dismiss_alert();
    }

    pub fn tick_animation(&mut self) {
        self.animation_frame = (self.animation_frame + 1) % 4;
    }

    // Scrolling
    pub fn scroll_up(&mut self, amount: u16) {
        match self.focus {
            FocusPane::Chat => {
                self.follow_chat = false;
                self.chat_scroll = self.chat_scroll.saturating_sub(amount);
            }
            FocusPane::Preview => {
                self.preview_scroll = self.preview_scroll.saturating_sub(amount);
            }
        }
    }

    pub fn scroll_down(&mut self, amount: u16) {
        match self.focus {
            FocusPane::Chat => {
                let max = self.chat_lines.saturating_sub(self.chat_height);
                self.chat_scroll = self.chat_scroll.saturating_add(amount).min(max);
                self.follow_chat = self.chat_scroll >= max;
            }
            FocusPane::Preview => {
                self.preview_scroll = self.preview_scroll.saturating_add(amount);
            }
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            FocusPane::Chat => FocusPane::Preview,
            FocusPane::Preview => FocusPane::Chat,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use skriptor_core::api::{
        ApiResult, ContentKind, Conversation, Envelope, Greeting, IndexStats, ModelHealth,
        ModelState, Preview, ReindexReport, Reply, SavedScript, SessionId, UsageStats,
    };
    use skriptor_core::{ResultViewer, SessionPhase, TransportError};

    use crate::handler::{handle_event, handle_key};

    /// Generator that always answers, counting what it was asked.
    #[derive(Default)]
    struct FakeGenerator {
        failing_starts: AtomicUsize,
        save_delay: Duration,
        starts: AtomicUsize,
        resets: AtomicUsize,
        reindexes: AtomicUsize,
        previews: AtomicUsize,
        saves: AtomicUsize,
        sent: Mutex<Vec<String>>,
    }

    fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    #[async_trait]
    impl Backend for FakeGenerator {
        async fn start_conversation(&self) -> ApiResult<Conversation> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            let failing = self.failing_starts.load(Ordering::SeqCst);
            if failing > 0 {
                self.failing_starts.store(failing - 1, Ordering::SeqCst);
                return Ok(Envelope::Failure("LLM down".to_string()));
            }
            Ok(Envelope::Success(Conversation {
                session_id: SessionId::new("s1"),
                message: "Für welche Organisation ist der Kurs?".to_string(),
            }))
        }

        async fn send_message(&self, _session: &SessionId, message: &str) -> ApiResult<Reply> {
            self.sent.lock().unwrap().push(message.to_string());
            Ok(Envelope::Success(Reply {
                message: "Hier ist der Kurs".to_string(),
                script_generated: true,
            }))
        }

        async fn reset_conversation(&self, _session: &SessionId) -> ApiResult<Greeting> {
            self.resets.fetch_add(1, Ordering::SeqCst);
            Ok(Envelope::Success(Greeting {
                message: "Neues Gespräch".to_string(),
            }))
        }

        async fn reindex_documents(&self) -> ApiResult<ReindexReport> {
            self.reindexes.fetch_add(1, Ordering::SeqCst);
            Ok(Envelope::Success(ReindexReport {
                message: "12 documents indexed".to_string(),
            }))
        }

        async fn preview_script(&self, _session: &SessionId, _format: ScriptFormat) -> ApiResult<Preview> {
            self.previews.fetch_add(1, Ordering::SeqCst);
            Ok(Envelope::Success(Preview {
                content_type: ContentKind::Text,
                content: "# Kurs".to_string(),
            }))
        }

        async fn save_script(&self, _session: &SessionId, _format: ScriptFormat) -> ApiResult<SavedScript> {
            tokio::time::sleep(self.save_delay).await;
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(Envelope::Success(SavedScript::default()))
        }

        async fn index_stats(&self) -> ApiResult<IndexStats> {
            Ok(Envelope::Success(IndexStats {
                document_count: 12,
                location: String::new(),
            }))
        }

        async fn model_health(&self) -> Result<ModelHealth, TransportError> {
            Ok(ModelHealth {
                status: ModelState::Available,
                model: Some("llama3.1".to_string()),
                response_time: Some(0.4),
                response: None,
                error: None,
            })
        }

        async fn usage_stats(&self) -> ApiResult<UsageStats> {
            Ok(Envelope::Success(UsageStats {
                generated_scripts_count: 0,
            }))
        }

        fn result_url(&self, session: &SessionId, format: ScriptFormat) -> String {
            format!("http://generator.test/result/{}?format={}", session, format)
        }
    }

    #[derive(Default)]
    struct CountingViewer {
        opens: AtomicUsize,
    }

    impl ResultViewer for CountingViewer {
        fn open(&self, _url: &str) {
            self.opens.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn app_with(
        backend: Arc<FakeGenerator>,
        viewer: Arc<CountingViewer>,
    ) -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let config = Config::new();
        let notifier = Notifier::new();

        let controller = SessionController::new(ControllerParts {
            backend: backend.clone(),
            gateway: RequestGateway::new(notifier.clone(), config.request_timeout()),
            renderer: TextRenderer::new(),
            viewer,
            format: ScriptFormat::Txt,
            stats_threshold: config.stats_threshold,
        });
        let snapshot = controller.snapshot();
        let session = runtime::spawn_session(controller, tx.clone());

        (App::with_session(session, snapshot, backend, notifier, &config, tx), rx)
    }

    /// Let the session task drain its queue, then pull the final snapshot.
    async fn settle(app: &mut App) {
        for _ in 0..400 {
            tokio::time::sleep(Duration::from_millis(5)).await;
            if app.session.is_idle() {
                break;
            }
        }
        app.sync();
    }

    fn press(app: &mut App, code: KeyCode) {
        handle_key(app, KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    async fn started(backend: Arc<FakeGenerator>, viewer: Arc<CountingViewer>) -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (mut app, events) = app_with(backend, viewer);
        app.launch();
        settle(&mut app).await;
        assert_eq!(app.snapshot.phase(), SessionPhase::Active { has_script: false });
        (app, events)
    }

    #[tokio::test]
    async fn test_failed_start_is_retried_with_n() {
        let backend = Arc::new(FakeGenerator {
            failing_starts: AtomicUsize::new(1),
            ..FakeGenerator::default()
        });
        let (mut app, _events) = app_with(backend.clone(), Arc::default());

        app.launch();
        settle(&mut app).await;
        assert_eq!(app.snapshot.phase(), SessionPhase::Uninitialized);
        assert!(app.notifier.current_alert().unwrap().contains("LLM down"));
        assert!(app.snapshot.controls.start);

        press(&mut app, KeyCode::Enter);
        assert!(app.notifier.current_alert().is_none());

        for code in [KeyCode::Char('i'), KeyCode::Char('r'), KeyCode::Char('d'), KeyCode::Char('p')] {
            press(&mut app, code);
        }
        settle(&mut app).await;
        assert_eq!(count(&backend.starts), 1);

        press(&mut app, KeyCode::Char('n'));
        settle(&mut app).await;
        assert_eq!(count(&backend.starts), 2);
        assert_eq!(app.snapshot.phase(), SessionPhase::Active { has_script: false });
        assert!(!app.snapshot.controls.start);

        press(&mut app, KeyCode::Char('n'));
        settle(&mut app).await;
        assert_eq!(count(&backend.starts), 2);
    }

    #[tokio::test]
    async fn test_send_clears_input_and_returns_focus() {
        let backend = Arc::new(FakeGenerator::default());
        let (mut app, _events) = started(backend.clone(), Arc::default()).await;

        press(&mut app, KeyCode::Char('i'));
        assert_eq!(app.input_mode, InputMode::Editing);
        type_text(&mut app, "Krankenhaus");
        press(&mut app, KeyCode::Enter);

        assert!(app.input.is_empty());
        assert_eq!(app.input_cursor, 0);
        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(app.awaiting_reply());

        settle(&mut app).await;
        assert!(!app.awaiting_reply());
        assert_eq!(app.input_mode, InputMode::Editing);
        assert_eq!(*backend.sent.lock().unwrap(), vec!["Krankenhaus".to_string()]);
        assert_eq!(app.snapshot.turns.len(), 3);
        assert!(app.snapshot.controls.download);
    }

    #[tokio::test]
    async fn test_blank_input_is_not_sent() {
        let backend = Arc::new(FakeGenerator::default());
        let (mut app, _events) = started(backend.clone(), Arc::default()).await;

        press(&mut app, KeyCode::Char('i'));
        type_text(&mut app, "   ");
        press(&mut app, KeyCode::Enter);
        settle(&mut app).await;

        assert!(backend.sent.lock().unwrap().is_empty());
        assert_eq!(app.input, "   ");
        assert_eq!(app.input_mode, InputMode::Editing);
    }

    #[tokio::test]
    async fn test_disabled_actions_are_ignored() {
        let backend = Arc::new(FakeGenerator::default());
        let viewer = Arc::new(CountingViewer::default());
        let (mut app, _events) = started(backend.clone(), viewer.clone()).await;

        // No script yet: reset, download and preview are disabled.
        for code in [KeyCode::Char('r'), KeyCode::Char('d'), KeyCode::Char('p')] {
            press(&mut app, code);
        }
        settle(&mut app).await;

        assert_eq!(count(&backend.resets), 0);
        assert_eq!(count(&backend.saves), 0);
        assert_eq!(count(&backend.previews), 0);
        assert_eq!(count(&viewer.opens), 0);
    }

    #[tokio::test]
    async fn test_typing_is_ignored_while_input_disabled() {
        let (mut app, _events) = app_with(Arc::new(FakeGenerator::default()), Arc::default());
        assert!(!app.snapshot.controls.input);

        app.input_mode = InputMode::Editing;
        type_text(&mut app, "hallo");
        press(&mut app, KeyCode::Backspace);

        assert!(app.input.is_empty());
        assert_eq!(app.input_cursor, 0);
    }

    #[tokio::test]
    async fn test_repeated_download_while_in_flight_runs_once() {
        let backend = Arc::new(FakeGenerator {
            save_delay: Duration::from_millis(200),
            ..FakeGenerator::default()
        });
        let viewer = Arc::new(CountingViewer::default());
        let (mut app, _events) = started(backend.clone(), viewer.clone()).await;

        app.input = "fertig".to_string();
        app.send_input();
        settle(&mut app).await;
        assert!(app.snapshot.controls.download);

        press(&mut app, KeyCode::Char('d'));
        tokio::time::sleep(Duration::from_millis(20)).await;
        app.sync();
        assert!(!app.snapshot.controls.download);
        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('d'));

        settle(&mut app).await;
        assert_eq!(count(&backend.saves), 1);
        assert_eq!(count(&viewer.opens), 1);
        assert!(app.snapshot.controls.download);
    }

    #[tokio::test]
    async fn test_reindex_waits_for_confirmation() {
        let backend = Arc::new(FakeGenerator::default());
        let (mut app, _events) = started(backend.clone(), Arc::default()).await;

        press(&mut app, KeyCode::Char('x'));
        assert_eq!(app.confirm, Some(Confirm::Reindex));
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.confirm, None);
        settle(&mut app).await;
        assert_eq!(count(&backend.reindexes), 0);
        assert_eq!(count(&backend.starts), 1);

        press(&mut app, KeyCode::Char('x'));
        press(&mut app, KeyCode::Char('y'));
        settle(&mut app).await;

        assert_eq!(count(&backend.reindexes), 1);
        assert_eq!(count(&backend.resets), 1);
        assert_eq!(
            app.notifier.current_alert().as_deref(),
            Some("Success: 12 documents indexed")
        );
        assert_eq!(app.snapshot.turns.len(), 1);
    }

    #[tokio::test]
    async fn test_resize_and_tick_keep_session_state() {
        let (mut app, _events) = started(Arc::new(FakeGenerator::default()), Arc::default()).await;
        let before = app.snapshot.clone();

        handle_event(&mut app, AppEvent::Resize).await.unwrap();
        handle_event(&mut app, AppEvent::Tick).await.unwrap();

        assert_eq!(app.snapshot, before);
        assert_eq!(app.animation_frame, 1);
        assert!(!app.should_quit);
    }
}
