//! Chromium-based renderer using chromiumoxide.

use super::{NavigationResult, RenderSession, Renderer};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Desktop Chrome user-agent sent in place of the headless default.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                                      AppleWebKit/537.36 (KHTML, like Gecko) \
                                      Chrome/120.0.0.0 Safari/537.36";

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. MNAV_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("MNAV_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. System PATH
    for name in ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 3. ~/.mnav-sync/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".mnav-sync/chromium/chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".mnav-sync/chromium/chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
            ]
        } else {
            vec![
                home.join(".mnav-sync/chromium/chrome-linux64/chrome"),
                home.join(".mnav-sync/chromium/chrome"),
            ]
        };
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    // 4. Common macOS location
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Build the capture script for a CSS selector.
///
/// Hidden elements contribute an empty string, which the caller drops, so
/// only text a visitor would see is numbered.
fn capture_script(selector: &str) -> Result<String> {
    let selector_literal =
        serde_json::to_string(selector).context("failed to encode fragment selector")?;
    Ok(format!(
        r#"(() => {{
    const visible = (el) => {{
        if (!(el.offsetWidth || el.offsetHeight || el.getClientRects().length)) return false;
        const style = window.getComputedStyle(el);
        return style.visibility !== 'hidden' && style.display !== 'none';
    }};
    return Array.from(document.querySelectorAll({selector_literal}))
        .map((el) => (visible(el) ? (el.innerText || '') : '').trim())
        .filter((text) => text.length > 0);
}})()"#
    ))
}

struct LaunchedBrowser {
    browser: Browser,
    handler: JoinHandle<()>,
}

/// Chromium-based renderer. The browser is launched on the first session.
pub struct ChromiumRenderer {
    user_agent: String,
    browser: Mutex<Option<LaunchedBrowser>>,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumRenderer {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            browser: Mutex::new(None),
            active_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    async fn launch(&self) -> Result<LaunchedBrowser> {
        let chrome_path = find_chromium()
            .context("Chromium not found. Set MNAV_CHROMIUM_PATH or install google-chrome.")?;
        tracing::debug!(path = %chrome_path.display(), "launching Chromium");

        let config = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg(format!("--user-agent={}", self.user_agent))
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        Ok(LaunchedBrowser { browser, handler })
    }
}

impl Default for ChromiumRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_USER_AGENT)
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn open_session(&self) -> Result<Box<dyn RenderSession>> {
        let mut guard = self.browser.lock().await;
        if guard.is_none() {
            *guard = Some(self.launch().await?);
        }
        let launched = guard
            .as_ref()
            .context("browser handle missing after launch")?;

        let page = launched
            .browser
            .new_page("about:blank")
            .await
            .context("failed to create new page")?;

        self.active_count.fetch_add(1, Ordering::Relaxed);

        Ok(Box::new(ChromiumSession {
            page,
            active_count: Arc::clone(&self.active_count),
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        let Some(mut launched) = self.browser.lock().await.take() else {
            return Ok(());
        };
        if let Err(e) = launched.browser.close().await {
            tracing::warn!("failed to close Chromium cleanly: {e}");
        }
        let _ = launched.browser.wait().await;
        launched.handler.abort();
        Ok(())
    }

    fn active_sessions(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

/// A single Chromium page.
pub struct ChromiumSession {
    page: Page,
    active_count: Arc<AtomicUsize>,
}

#[async_trait]
impl RenderSession for ChromiumSession {
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult> {
        let start = Instant::now();

        let result = tokio::time::timeout(
            std::time::Duration::from_millis(timeout_ms),
            self.page.goto(url),
        )
        .await;

        let load_time_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(_)) => {
                let final_url = self
                    .page
                    .url()
                    .await
                    .unwrap_or_default()
                    .unwrap_or_else(|| url.to_string());

                Ok(NavigationResult {
                    final_url,
                    load_time_ms,
                })
            }
            Ok(Err(e)) => bail!("navigation failed: {e}"),
            Err(_) => bail!("navigation timed out after {timeout_ms}ms"),
        }
    }

    async fn capture_fragments(&self, selector: &str) -> Result<Vec<String>> {
        let script = capture_script(selector)?;
        let result = self
            .page
            .evaluate(script)
            .await
            .context("fragment capture script failed")?;

        result
            .into_value::<Vec<String>>()
            .map_err(|e| anyhow::anyhow!("failed to convert captured fragments: {e:?}"))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.active_count.fetch_sub(1, Ordering::Relaxed);
        let _ = self.page.close().await;
        Ok(())
    }
}
