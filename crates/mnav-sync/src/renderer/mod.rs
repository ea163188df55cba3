//! Renderer abstraction for browser-based page rendering.
//!
//! Defines the `Renderer` and `RenderSession` traits the pipeline drives.
//! The pipeline only needs an ordered list of visible text fragments, so the
//! browser engine (currently Chromium via chromiumoxide) stays behind them.

pub mod chromium;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Element kinds whose visible text is captured, in document order.
pub const DEFAULT_FRAGMENT_SELECTOR: &str = "h1, h2, h3, p, span, div";

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// A browser engine that can open rendering sessions.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Open a new session (tab), launching the engine if needed.
    async fn open_session(&self) -> Result<Box<dyn RenderSession>>;
    /// Shut down the browser engine.
    async fn shutdown(&self) -> Result<()>;
    /// Number of currently open sessions.
    fn active_sessions(&self) -> usize;
}

/// A single browser session (tab) for rendering one page.
#[async_trait]
pub trait RenderSession: Send + Sync {
    /// Navigate to a URL with a timeout.
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult>;

    /// Wait a fixed duration for client-side rendering to finish.
    async fn settle(&self, delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    /// Visible text of every element matching `selector`, in document order.
    ///
    /// Entries may be untrimmed or blank; callers normalize them.
    async fn capture_fragments(&self, selector: &str) -> Result<Vec<String>>;

    /// Close this session.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// A renderer used when Chromium is unavailable.
///
/// Every session request fails, which the pipeline reports as a render fault.
pub struct NoopRenderer;

#[async_trait]
impl Renderer for NoopRenderer {
    async fn open_session(&self) -> Result<Box<dyn RenderSession>> {
        Err(anyhow::anyhow!("Browser not available: no Chromium binary found"))
    }
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
    fn active_sessions(&self) -> usize {
        0
    }
}
