pub mod api;
pub mod config;
pub mod download;
pub mod error;
pub mod format;
pub mod gateway;
pub mod notify;
pub mod preview;
pub mod render;
pub mod session;
pub mod state;
pub mod stats;
pub mod status;

// Re-export main types for convenience
pub use api::{Backend, HttpBackend, SessionId};
pub use config::Config;
pub use download::{DownloadController, ResultViewer, SystemBrowser};
pub use error::{GatewayError, TransportError};
pub use format::ScriptFormat;
pub use gateway::{Call, RequestGateway};
pub use notify::Notifier;
pub use preview::{PreviewController, PreviewDocument, PreviewPane};
pub use render::TextRenderer;
pub use session::{ControllerParts, SessionController, SessionSnapshot};
pub use state::{ChatRole, ChatTurn, Controls, Session, SessionPhase};
pub use stats::StatsWidget;
pub use status::{Badge, BadgeTier, HealthState, Probe, StatusPoller, StatusView};
