//! mnav-sync — renders the disclosure page, gates completeness, publishes mNAV, and alerts on failure.

pub mod alert;
pub mod cli;
pub mod config;
pub mod logging;
pub mod pipeline;
pub mod renderer;
pub mod store;

pub use alert::{Alert, AlertDispatcher, AlertError, AlertTransport};
pub use config::SyncConfig;
pub use pipeline::{Orchestrator, PipelineSettings, RunOutcome, RunState};
pub use renderer::{NavigationResult, RenderSession, Renderer};
pub use store::{FirebaseStore, PublishSink, StoreAuth};
