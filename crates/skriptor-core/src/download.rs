use std::process::{Command, Stdio};
use std::sync::Arc;

use crate::api::Backend;
use crate::format::ScriptFormat;
use crate::gateway::{Call, RequestGateway};
use crate::state::Session;

/// Opens the results view in a new browsing context.
pub trait ResultViewer: Send + Sync {
    fn open(&self, url: &str);
}

/// Hands the address to the platform opener. Fire-and-forget.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

impl ResultViewer for SystemBrowser {
    fn open(&self, url: &str) {
        let mut command = if cfg!(target_os = "macos") {
            Command::new("open")
        } else if cfg!(target_os = "windows") {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", "start", ""]);
            cmd
        } else {
            Command::new("xdg-open")
        };

        let spawned = command
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        if let Err(e) = spawned {
            tracing::warn!(%url, error = %e, "could not open results view");
        }
    }
}

pub struct DownloadController {
    backend: Arc<dyn Backend>,
    gateway: RequestGateway,
    viewer: Arc<dyn ResultViewer>,
}

impl DownloadController {
    pub fn new(backend: Arc<dyn Backend>, gateway: RequestGateway, viewer: Arc<dyn ResultViewer>) -> Self {
        Self {
            backend,
            gateway,
            viewer,
        }
    }

    /// Saves the script server-side and opens its results view.
    /// No-op without a generated script.
    pub async fn download(&self, session: &Session, format: ScriptFormat) -> bool {
        if !session.script_generated() {
            return false;
        }
        let Some(id) = session.id() else {
            return false;
        };

        let outcome = self
            .gateway
            .execute(
                Call::new("Failed to save the script").busy("Preparing download..."),
                self.backend.save_script(id, format),
            )
            .await;

        match outcome {
            Ok(saved) => {
                tracing::info!(
                    filename = saved.filename.as_deref().unwrap_or("-"),
                    download_url = saved.download_url.as_deref().unwrap_or("-"),
                    "script saved"
                );
                self.viewer.open(&self.backend.result_url(id, format));
                true
            }
            Err(_) => false,
        }
    }
}
