//! Background tasks: the session command loop and status polls.
//!
//! The controller lives in one task and handles commands one at a time, so
//! user-facing operations never overlap. Status polls run in their own tasks
//! and may overlap with anything.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use skriptor_core::{Backend, Probe, RequestGateway, ScriptFormat, SessionController, SessionSnapshot};
use tokio::sync::{mpsc, watch};

use crate::tui::AppEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Send(String),
    Reset,
    Reindex,
    SetFormat(ScriptFormat),
    RefreshPreview,
    Download,
}

pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    updates: watch::Receiver<SessionSnapshot>,
    gateway: RequestGateway,
    in_flight: Arc<AtomicUsize>,
}

impl SessionHandle {
    pub fn dispatch(&self, command: Command) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        if self.commands.send(command).is_err() {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            tracing::error!("session task is gone; command dropped");
        }
    }

    /// True once every dispatched command has finished.
    pub fn is_idle(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) == 0
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.updates.borrow().clone()
    }

    /// Cancels in-flight requests without waiting for the command queue.
    pub fn abort(&self) {
        self.gateway.abort();
    }
}

pub fn spawn_session(controller: SessionController, events: mpsc::UnboundedSender<AppEvent>) -> SessionHandle {
    let (commands, mut rx) = mpsc::unbounded_channel();
    let updates = controller.subscribe();
    let gateway = controller.gateway().clone();
    let in_flight = Arc::new(AtomicUsize::new(0));

    // Forward snapshot changes so the UI redraws promptly.
    let mut changes = controller.subscribe();
    let tx_changes = events.clone();
    tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            if tx_changes.send(AppEvent::SessionChanged).is_err() {
                break;
            }
        }
    });

    let pending = Arc::clone(&in_flight);
    tokio::spawn(async move {
        let mut controller = controller;
        while let Some(command) = rx.recv().await {
            tracing::debug!(?command, "session command");
            match command {
                Command::Start => {
                    controller.start().await;
                }
                Command::Send(text) => {
                    controller.send(&text).await;
                }
                Command::Reset => {
                    controller.reset().await;
                }
                Command::Reindex => {
                    if controller.reindex().await {
                        let _ = events.send(AppEvent::Reindexed);
                    }
                }
                Command::SetFormat(format) => controller.set_format(format).await,
                Command::RefreshPreview => {
                    controller.refresh_preview().await;
                }
                Command::Download => {
                    controller.download().await;
                }
            }
            pending.fetch_sub(1, Ordering::SeqCst);
            // Wake the UI even when the command changed nothing.
            let _ = events.send(AppEvent::SessionChanged);
        }
    });

    SessionHandle {
        commands,
        updates,
        gateway,
        in_flight,
    }
}

/// Run one probe in the background and report its view for widget `slot`.
pub fn spawn_poll(
    slot: usize,
    probe: Probe,
    backend: Arc<dyn Backend>,
    deadline: Duration,
    events: mpsc::UnboundedSender<AppEvent>,
) {
    tokio::spawn(async move {
        let view = probe.fetch(backend.as_ref(), deadline).await;
        let _ = events.send(AppEvent::Status(slot, view));
    });
}
