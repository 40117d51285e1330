use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::session::{NavigateOptions, RenderError, RenderSession, SessionLauncher};

// keep the embed hosts from spotting the automation, some of them refuse to start the player
const BROWSER_ARGS: [&str; 8] = [
    "--disable-blink-features=AutomationControlled",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--disable-extensions",
    "--disable-background-networking",
    "--mute-audio",
    "--no-first-run",
    "--autoplay-policy=no-user-gesture-required",
];

/// Starts a fresh headless chromium for every rendering attempt.
pub struct ChromiumLauncher {
    executable: Option<PathBuf>,
    user_agent: String,
}

impl ChromiumLauncher {
    pub fn new(executable: Option<PathBuf>, user_agent: impl Into<String>) -> Self {
        Self {
            executable,
            user_agent: user_agent.into(),
        }
    }
}

#[async_trait]
impl SessionLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn RenderSession>, RenderError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .args(BROWSER_ARGS)
            .arg(format!("--user-agent={}", self.user_agent));

        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }

        let config = builder.build().map_err(RenderError::Launch)?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        // the handler has to be polled for the browser to do anything
        let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                if let Err(close_err) = browser.close().await {
                    warn!("failed to close browser after page setup failed: {}", close_err);
                }
                handler_task.abort();
                return Err(RenderError::Launch(format!("failed to open page: {}", e)));
            }
        };

        debug!("headless browser launched");

        Ok(Box::new(ChromiumSession {
            browser,
            page: Some(page),
            handler_task,
            closed: false,
        }))
    }
}

struct ChromiumSession {
    browser: Browser,
    page: Option<Page>,
    handler_task: JoinHandle<()>,
    closed: bool,
}

impl ChromiumSession {
    fn page(&self) -> Result<&Page, RenderError> {
        self.page
            .as_ref()
            .ok_or_else(|| RenderError::Navigation("page already closed".to_string()))
    }
}

#[async_trait]
impl RenderSession for ChromiumSession {
    async fn navigate(&mut self, url: &str, options: NavigateOptions) -> Result<(), RenderError> {
        let page = self.page()?;

        page.goto(url)
            .await
            .map_err(|e| RenderError::Navigation(e.to_string()))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| RenderError::Navigation(e.to_string()))?;

        // cdp has no network idle event to wait on, give the player scripts a moment instead
        tokio::time::sleep(options.quiesce_wait).await;
        Ok(())
    }

    async fn evaluate(&mut self, script: &str) -> Result<Value, RenderError> {
        let result = self
            .page()?
            .evaluate(script)
            .await
            .map_err(|e| RenderError::Evaluation(e.to_string()))?;

        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        if let Some(page) = self.page.take() {
            // the browser close below takes the page down anyway
            if let Err(e) = page.close().await {
                warn!("failed to close page: {}", e);
            }
        }

        let result = async {
            self.browser.close().await.context("failed to close browser")?;
            self.browser
                .wait()
                .await
                .context("failed to wait for browser exit")?;
            anyhow::Ok(())
        }
        .await;

        self.handler_task.abort();
        result
    }
}
