//! Chromium-based renderer using chromiumoxide.

use super::{NavigationResult, RenderContext, Renderer};
use crate::config::BrowserOptions;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Launch arguments kept from chromiumoxide's defaults. The defaults also
/// carry `--enable-automation`, which is deliberately left out.
const BASE_ARGS: &[&str] = &[
    "--disable-background-networking",
    "--disable-background-timer-throttling",
    "--disable-backgrounding-occluded-windows",
    "--disable-breakpad",
    "--disable-dev-shm-usage",
    "--disable-hang-monitor",
    "--disable-popup-blocking",
    "--disable-prompt-on-repost",
    "--metrics-recording-only",
    "--no-first-run",
    "--password-store=basic",
    "--use-mock-keychain",
];

/// Find the Chromium binary path.
pub fn find_chromium(explicit: Option<&PathBuf>) -> Option<PathBuf> {
    // 1. Explicit path from flags or FEEDHARVEST_CHROMIUM_PATH
    if let Some(path) = explicit {
        if path.exists() {
            return Some(path.clone());
        }
    }

    // 2. ~/.feedharvest/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".feedharvest/chromium/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".feedharvest/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".feedharvest/chromium/chrome-linux64/chrome"),
                home.join(".feedharvest/chromium/chrome"),
            ]
        };
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    // 3. System PATH
    for name in [
        "google-chrome",
        "google-chrome-stable",
        "chromium",
        "chromium-browser",
        "microsoft-edge",
    ] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common macOS locations
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Route loopback traffic around any configured proxy so the DevTools
/// websocket stays local.
pub fn apply_proxy_bypass(hosts: &[String]) {
    if hosts.is_empty() {
        return;
    }
    let joined = hosts.join(",");
    std::env::set_var("NO_PROXY", &joined);
    std::env::set_var("no_proxy", &joined);
}

/// Build the chromiumoxide launch configuration.
fn build_config(options: &BrowserOptions, chrome_path: PathBuf) -> Result<BrowserConfig> {
    let mut builder = BrowserConfig::builder()
        .chrome_executable(chrome_path)
        .disable_default_args()
        .viewport(None)
        .request_timeout(Duration::from_millis(options.request_timeout_ms));

    for arg in BASE_ARGS {
        builder = builder.arg(*arg);
    }

    builder = builder
        .arg("--start-maximized")
        .arg(format!("--user-agent={}", options.user_agent))
        .arg("--disable-blink-features=AutomationControlled")
        .arg("--no-proxy-server");

    if options.headless {
        builder = builder.arg("--headless=new").arg("--disable-gpu");
    } else {
        builder = builder.with_head();
    }

    builder
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))
}

/// Chromium-based renderer.
pub struct ChromiumRenderer {
    browser: Mutex<Browser>,
    handler_task: JoinHandle<()>,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumRenderer {
    /// Launch a Chromium instance configured for feed harvesting.
    pub async fn launch(options: &BrowserOptions) -> Result<Self> {
        let chrome_path = find_chromium(options.chromium_path.as_ref())
            .context("Chromium not found. Set FEEDHARVEST_CHROMIUM_PATH or run `feedharvest doctor`.")?;

        apply_proxy_bypass(&options.no_proxy_hosts);

        tracing::info!("launching browser: {}", chrome_path.display());
        let config = build_config(options, chrome_path)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        // The CDP handler must be polled for the browser to make progress.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!("browser handler event error: {e}");
                }
            }
        });

        Ok(Self {
            browser: Mutex::new(browser),
            handler_task,
            active_count: Arc::new(AtomicUsize::new(0)),
        })
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        let page = self
            .browser
            .lock()
            .await
            .new_page("about:blank")
            .await
            .context("failed to create new page")?;

        self.active_count.fetch_add(1, Ordering::Relaxed);

        Ok(Box::new(ChromiumContext {
            page,
            active_count: Arc::clone(&self.active_count),
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.close().await {
            tracing::warn!("browser close failed: {e}");
        }
        if let Err(e) = browser.wait().await {
            tracing::warn!("waiting for browser exit failed: {e}");
        }
        self.handler_task.abort();
        tracing::info!("browser released");
        Ok(())
    }

    fn active_contexts(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

/// A single Chromium page context.
pub struct ChromiumContext {
    page: Page,
    active_count: Arc<AtomicUsize>,
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult> {
        let start = Instant::now();

        let result = tokio::time::timeout(Duration::from_millis(timeout_ms), self.page.goto(url)).await;

        match result {
            Ok(Ok(_)) => {
                let _ = self.page.wait_for_navigation().await;

                let final_url = self
                    .page
                    .url()
                    .await
                    .unwrap_or_default()
                    .map(|u| u.to_string())
                    .unwrap_or_else(|| url.to_string());

                Ok(NavigationResult {
                    final_url,
                    load_time_ms: start.elapsed().as_millis() as u64,
                })
            }
            Ok(Err(e)) => bail!("navigation failed: {e}"),
            Err(_) => bail!("navigation timed out after {timeout_ms}ms"),
        }
    }

    async fn execute_js(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .context("JS execution failed")?;

        // Scripts returning `undefined` carry no value.
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn type_into(&self, xpath: &str, text: &str, submit: bool) -> Result<()> {
        let element = self
            .page
            .find_xpath(xpath)
            .await
            .with_context(|| format!("element not found: {xpath}"))?;

        element.click().await.context("failed to focus element")?;
        element.type_str(text).await.context("failed to type text")?;
        if submit {
            element.press_key("Enter").await.context("failed to press Enter")?;
        }
        Ok(())
    }

    async fn get_url(&self) -> Result<String> {
        let url = self
            .page
            .url()
            .await
            .context("failed to get URL")?
            .map(|u| u.to_string())
            .unwrap_or_default();
        Ok(url)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.active_count.fetch_sub(1, Ordering::Relaxed);
        let _ = self.page.close().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_args_exclude_automation_switch() {
        assert!(!BASE_ARGS.contains(&"--enable-automation"));
    }

    #[test]
    fn test_find_chromium_prefers_existing_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("chrome");
        std::fs::write(&fake, b"").unwrap();
        assert_eq!(find_chromium(Some(&fake)), Some(fake));
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_chromium_navigate_type_and_execute_js() {
        let options = BrowserOptions {
            headless: true,
            ..BrowserOptions::default()
        };
        let renderer = ChromiumRenderer::launch(&options)
            .await
            .expect("failed to launch renderer");
        let mut ctx = renderer
            .new_context()
            .await
            .expect("failed to create context");

        ctx.navigate("data:text/html,<input name='q'><h1>Hello</h1>", 10000)
            .await
            .expect("navigation failed");

        ctx.type_into("//input[@name='q']", "rust", false)
            .await
            .expect("typing failed");

        let value = ctx
            .execute_js("document.querySelector('input').value")
            .await
            .expect("JS execution failed");
        assert_eq!(value.as_str(), Some("rust"));

        let ua = ctx
            .execute_js("navigator.userAgent")
            .await
            .expect("JS execution failed");
        assert_eq!(ua.as_str(), Some(options.user_agent.as_str()));

        ctx.close().await.expect("close failed");
        assert_eq!(renderer.active_contexts(), 0);

        renderer.shutdown().await.expect("shutdown failed");
    }
}
