//! One extraction run: render, capture, extract, gate, then publish or alert.
//!
//! The orchestrator absorbs every fault. Whatever happens, a run ends in
//! [`RunState::Done`] with the render session closed and the renderer shut
//! down, and the caller receives a [`RunOutcome`] rather than an error.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use mnav_core::{
    CompletenessGate, ExtractedFields, Extractor, FailureReport, FieldTable, FragmentSequence,
    GateVerdict, RatioSpec, ResultSet,
};

use crate::alert::AlertDispatcher;
use crate::config::SyncConfig;
use crate::renderer::{RenderSession, Renderer};
use crate::store::PublishSink;

/// Pipeline stages, in the order a successful run visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Start,
    Rendering,
    Capturing,
    Extracting,
    Gating,
    Publishing,
    Alerting,
    Done,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunState::Start => "start",
            RunState::Rendering => "rendering",
            RunState::Capturing => "capturing",
            RunState::Extracting => "extracting",
            RunState::Gating => "gating",
            RunState::Publishing => "publishing",
            RunState::Alerting => "alerting",
            RunState::Done => "done",
        };
        f.write_str(name)
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Published(ResultSet),
    Rejected { valid: usize, required: usize },
    RenderFailed(String),
    PublishFailed(String),
}

impl RunOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, RunOutcome::Published(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            RunOutcome::Published(_) => "published",
            RunOutcome::Rejected { .. } => "rejected",
            RunOutcome::RenderFailed(_) => "render_failed",
            RunOutcome::PublishFailed(_) => "publish_failed",
        }
    }
}

/// Fixed parameters of a run.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub target_url: String,
    pub settle: Duration,
    pub navigation_timeout_ms: u64,
    pub selector: String,
    pub store_path: String,
    pub ratio: RatioSpec,
    pub check_file: Option<PathBuf>,
}

impl From<&SyncConfig> for PipelineSettings {
    fn from(config: &SyncConfig) -> Self {
        Self {
            target_url: config.target_url.clone(),
            settle: config.settle_delay(),
            navigation_timeout_ms: config.navigation_timeout_ms,
            selector: config.selector.clone(),
            store_path: config.store_path.clone(),
            ratio: config.ratio.clone(),
            check_file: config.check_file.clone(),
        }
    }
}

/// Drives a single pass over its collaborators, which it owns.
pub struct Orchestrator {
    settings: PipelineSettings,
    extractor: Extractor,
    gate: CompletenessGate,
    renderer: Arc<dyn Renderer>,
    sink: Arc<dyn PublishSink>,
    alerts: AlertDispatcher,
}

impl Orchestrator {
    pub fn new(
        settings: PipelineSettings,
        fields: FieldTable,
        renderer: Arc<dyn Renderer>,
        sink: Arc<dyn PublishSink>,
        alerts: AlertDispatcher,
    ) -> Self {
        let gate = CompletenessGate::for_field_count(fields.len());
        Self {
            settings,
            extractor: Extractor::positional(fields),
            gate,
            renderer,
            sink,
            alerts,
        }
    }

    /// Replace the extractor, e.g. to resolve fields by label instead of position.
    pub fn with_extractor(mut self, extractor: Extractor) -> Self {
        self.gate = CompletenessGate::for_field_count(extractor.table().len());
        self.extractor = extractor;
        self
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run the pipeline once. Never returns an error.
    pub async fn run(&self) -> RunOutcome {
        let mut session = None;
        let outcome = self.drive(&mut session).await;

        self.release(session).await;
        self.enter(RunState::Done);
        tracing::info!(outcome = outcome.label(), "run finished");
        outcome
    }

    /// Render and capture only, releasing the session afterwards.
    pub async fn capture(&self) -> Result<FragmentSequence> {
        let mut session = None;
        let captured = self.render(&mut session).await;
        self.release(session).await;
        captured
    }

    async fn drive(&self, session: &mut Option<Box<dyn RenderSession>>) -> RunOutcome {
        self.enter(RunState::Start);

        let fragments = match self.render(session).await {
            Ok(fragments) => fragments,
            Err(e) => {
                let report = FailureReport::render_fault(format!("{e:#}"));
                self.alert(&report).await;
                return RunOutcome::RenderFailed(report.message);
            }
        };

        self.enter(RunState::Extracting);
        let fields = self.extractor.extract(&fragments);
        drop(fragments);
        self.write_check_file(&fields).await;

        self.enter(RunState::Gating);
        if let GateVerdict::Rejected {
            valid,
            required,
            report,
        } = self.gate.check(&fields)
        {
            self.alert(&report).await;
            return RunOutcome::Rejected { valid, required };
        }

        let result = ResultSet::finalize(fields, &self.settings.ratio, Utc::now());
        tracing::info!(
            ratio_key = result.ratio_key(),
            ratio = result.ratio(),
            timestamp = result.timestamp(),
            "derived ratio"
        );

        self.enter(RunState::Publishing);
        match self
            .sink
            .merge_update(&self.settings.store_path, &result.to_store_map())
            .await
        {
            Ok(()) => {
                tracing::info!(path = %self.settings.store_path, "result set published");
                RunOutcome::Published(result)
            }
            Err(e) => {
                let report = FailureReport::publish_fault(format!("{e:#}"), &result);
                self.alert(&report).await;
                RunOutcome::PublishFailed(report.message)
            }
        }
    }

    async fn render(
        &self,
        session: &mut Option<Box<dyn RenderSession>>,
    ) -> Result<FragmentSequence> {
        self.enter(RunState::Rendering);
        let opened = self
            .renderer
            .open_session()
            .await
            .context("opening render session")?;
        let session = session.insert(opened);

        let nav = session
            .navigate(&self.settings.target_url, self.settings.navigation_timeout_ms)
            .await?;
        tracing::info!(
            url = %nav.final_url,
            load_time_ms = nav.load_time_ms,
            settle_secs = self.settings.settle.as_secs(),
            "page loaded, waiting for client-side render"
        );
        session.settle(self.settings.settle).await;

        self.enter(RunState::Capturing);
        let raw = session
            .capture_fragments(&self.settings.selector)
            .await
            .context("capturing text fragments")?;
        let fragments = FragmentSequence::from_raw(raw);
        tracing::info!(count = fragments.len(), "captured text fragments");
        Ok(fragments)
    }

    async fn release(&self, session: Option<Box<dyn RenderSession>>) {
        if let Some(session) = session {
            if let Err(e) = session.close().await {
                tracing::warn!("failed to close render session: {e:#}");
            }
        }
        if let Err(e) = self.renderer.shutdown().await {
            tracing::warn!("failed to shut down renderer: {e:#}");
        }
    }

    async fn alert(&self, report: &FailureReport) {
        self.enter(RunState::Alerting);
        self.alerts.dispatch(report).await;
    }

    async fn write_check_file(&self, fields: &ExtractedFields) {
        let Some(path) = &self.settings.check_file else {
            return;
        };
        let result = async {
            let json = serde_json::to_string_pretty(&fields.to_json_map())
                .context("serializing extracted fields")?;
            tokio::fs::write(path, json).await?;
            anyhow::Ok(())
        }
        .await;
        match result {
            Ok(()) => tracing::info!(
                path = %path.display(),
                valid = fields.valid_count(),
                total = fields.len(),
                "check file written"
            ),
            Err(e) => tracing::warn!(path = %path.display(), "failed to write check file: {e:#}"),
        }
    }

    fn enter(&self, state: RunState) {
        tracing::debug!(state = %state, "pipeline state");
    }
}
