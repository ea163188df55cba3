//! CLI subcommand implementations for the mnav-sync binary.

pub mod doctor;
pub mod inspect_cmd;
pub mod run_cmd;

use std::sync::Arc;

use anyhow::Result;

use crate::alert::AlertDispatcher;
use crate::config::SyncConfig;
use crate::pipeline::{Orchestrator, PipelineSettings};
use crate::renderer::chromium::ChromiumRenderer;
use crate::store::{FirebaseStore, StoreAuth};

/// Wire the production collaborators for a config.
pub fn build_orchestrator(config: &SyncConfig) -> Result<Orchestrator> {
    let renderer = Arc::new(ChromiumRenderer::new(config.user_agent.clone()));
    let store = Arc::new(FirebaseStore::new(&config.database_url, StoreAuth::from_env()?)?);
    let alerts = AlertDispatcher::from_env();
    tracing::debug!(transports = ?alerts.transport_names(), "alert transports configured");

    Ok(Orchestrator::new(
        PipelineSettings::from(config),
        config.fields.clone(),
        renderer,
        store,
        alerts,
    ))
}
