use std::sync::Arc;

use crate::api::{Backend, ContentKind};
use crate::format::ScriptFormat;
use crate::gateway::{Call, RequestGateway};
use crate::render::TextRenderer;
use crate::state::Session;

pub const PREVIEW_PLACEHOLDER: &str =
    "The preview of the generated script will appear here once it has been created.";

#[derive(Debug, Clone, PartialEq)]
pub struct PreviewDocument {
    pub format: ScriptFormat,
    pub content_kind: ContentKind,
    pub body: String,
    /// Display markup: `body` itself for markup content, rendered otherwise.
    pub markup: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum PreviewPane {
    #[default]
    Placeholder,
    Document(PreviewDocument),
}

/// Fetches and holds the preview of the generated script.
pub struct PreviewController {
    backend: Arc<dyn Backend>,
    gateway: RequestGateway,
    renderer: TextRenderer,
    pane: PreviewPane,
}

impl PreviewController {
    pub fn new(backend: Arc<dyn Backend>, gateway: RequestGateway, renderer: TextRenderer) -> Self {
        Self {
            backend,
            gateway,
            renderer,
            pane: PreviewPane::Placeholder,
        }
    }

    pub fn pane(&self) -> &PreviewPane {
        &self.pane
    }

    /// Back to the empty-state placeholder.
    pub fn clear(&mut self) {
        self.pane = PreviewPane::Placeholder;
    }

    /// No-op without a generated script. A failed fetch keeps the current pane.
    pub async fn refresh(&mut self, session: &Session, format: ScriptFormat) -> bool {
        if !session.script_generated() {
            return false;
        }
        let Some(id) = session.id() else {
            return false;
        };

        let outcome = self
            .gateway
            .execute(
                Call::new("Failed to load the preview"),
                self.backend.preview_script(id, format),
            )
            .await;

        let Ok(preview) = outcome else {
            return false;
        };

        let markup = match preview.content_type {
            ContentKind::Html => preview.content.clone(),
            ContentKind::Text => self.renderer.render(&preview.content),
        };
        tracing::debug!(%format, kind = ?preview.content_type, "preview updated");

        self.pane = PreviewPane::Document(PreviewDocument {
            format,
            content_kind: preview.content_type,
            body: preview.content,
            markup,
        });
        true
    }
}
