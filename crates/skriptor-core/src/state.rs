//! UI-agnostic session state
//!
//! This module contains data structures that are shared between the
//! controllers and any front end, and don't depend on a UI framework.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::api::SessionId;
use crate::render::TextRenderer;

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One immutable message in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    role: ChatRole,
    raw_text: String,
    markup: String,
    timestamp: DateTime<Local>,
}

impl ChatTurn {
    pub fn new(role: ChatRole, raw_text: &str, renderer: &TextRenderer) -> Self {
        Self {
            role,
            raw_text: raw_text.to_string(),
            markup: renderer.render(raw_text),
            timestamp: Local::now(),
        }
    }

    pub fn role(&self) -> ChatRole {
        self.role
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }
}

/// Ordered conversation history. Only ever appended to or discarded whole.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    turns: Vec<ChatTurn>,
}

impl Transcript {
    pub fn push(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&ChatTurn> {
        self.turns.last()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    id: Option<SessionId>,
    script_generated: bool,
}

impl Session {
    pub fn id(&self) -> Option<&SessionId> {
        self.id.as_ref()
    }

    pub fn script_generated(&self) -> bool {
        self.script_generated
    }

    pub fn is_active(&self) -> bool {
        self.id.is_some()
    }

    pub fn phase(&self) -> SessionPhase {
        match self.id {
            None => SessionPhase::Uninitialized,
            Some(_) => SessionPhase::Active {
                has_script: self.script_generated,
            },
        }
    }

    /// Assigns the id once; later calls are ignored.
    pub(crate) fn begin(&mut self, id: SessionId) -> bool {
        if self.id.is_some() {
            return false;
        }
        self.id = Some(id);
        self.script_generated = false;
        true
    }

    /// One-way flip; returns whether this call performed it.
    pub(crate) fn mark_script_generated(&mut self) -> bool {
        if self.id.is_none() || self.script_generated {
            return false;
        }
        self.script_generated = true;
        true
    }

    pub(crate) fn clear_script(&mut self) {
        self.script_generated = false;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    Active { has_script: bool },
}

/// Operations currently in flight that gate controls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Activity {
    pub starting: bool,
    pub sending: bool,
    pub resetting: bool,
    pub downloading: bool,
    pub reindexing: bool,
}

/// Which controls are usable. Always derived, never stored piecemeal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Controls {
    pub start: bool,
    pub input: bool,
    pub send: bool,
    pub reset: bool,
    pub download: bool,
    pub preview: bool,
    pub reindex: bool,
}

impl Controls {
    pub fn derive(session: &Session, activity: &Activity) -> Self {
        let idle = session.is_active() && !activity.sending && !activity.resetting;
        let has_script = session.is_active() && session.script_generated;

        Self {
            start: !session.is_active() && !activity.starting,
            input: idle,
            send: idle,
            // Reset is only reachable while sending is possible.
            reset: has_script && idle,
            download: has_script && !activity.downloading,
            preview: has_script,
            reindex: !activity.reindexing,
        }
    }
}
