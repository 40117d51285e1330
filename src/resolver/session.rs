use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

lazy_static! {
    // the extension has to end the url, or be followed by its query or fragment
    static ref MEDIA_FILE_URL: Regex = Regex::new(
        r#"(?i)(https?://[^\s"'<>\\]+?\.(?:mp4|m3u8|webm|mkv|mov)(?:[?#][^\s"'<>\\]*)?)(?:["'\s]|$)"#
    )
    .expect("media url regex should compile");
    static ref MEDIA_FILE_ADDRESS: Regex =
        Regex::new(r"(?i)\.(?:mp4|m3u8|webm|mkv|mov)$")
            .expect("media address regex should compile");
}

#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("failed to launch browser session: {0}")]
    Launch(String),
    #[error("navigation did not settle within {0:?}")]
    NavigationTimeout(Duration),
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("script evaluation failed: {0}")]
    Evaluation(String),
}

#[derive(Debug, Clone, Copy)]
pub struct NavigateOptions {
    /// extra time after load for the page's own requests to finish
    pub quiesce_wait: Duration,
    pub timeout: Duration,
}

pub type DynSessionLauncher = Arc<dyn SessionLauncher + Send + Sync>;

#[async_trait]
pub trait SessionLauncher {
    async fn launch(&self) -> Result<Box<dyn RenderSession>, RenderError>;
}

/// A single headless browser instance. `close` must be safe to call more than once.
#[async_trait]
pub trait RenderSession: Send + Sync {
    async fn navigate(&mut self, url: &str, options: NavigateOptions) -> Result<(), RenderError>;
    async fn evaluate(&mut self, script: &str) -> Result<Value, RenderError>;
    async fn close(&mut self) -> anyhow::Result<()>;
}

/// Ways of digging the media url out of a rendered embed page, in the order they're tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    VideoSourceElement,
    VideoElementSource,
    MediaFrame,
    InlineScript,
}

impl ExtractionStrategy {
    pub const PRIORITY: [ExtractionStrategy; 4] = [
        Self::VideoSourceElement,
        Self::VideoElementSource,
        Self::MediaFrame,
        Self::InlineScript,
    ];

    pub fn script(&self) -> &'static str {
        match self {
            Self::VideoSourceElement => {
                r#"(() => { const s = document.querySelector('video source[src]'); return s ? s.src : null; })()"#
            }
            // currentSrc covers players that set the source lazily from js
            Self::VideoElementSource => {
                r#"(() => { const v = document.querySelector('video'); return v ? (v.currentSrc || v.src || null) : null; })()"#
            }
            Self::MediaFrame => {
                r#"Array.from(document.querySelectorAll('iframe[src]')).map(f => f.src)"#
            }
            Self::InlineScript => {
                r#"Array.from(document.querySelectorAll('script:not([src])')).map(s => s.textContent || '')"#
            }
        }
    }

    /// turns whatever the script evaluated to into a media url
    pub fn interpret(&self, value: &Value) -> Option<String> {
        match self {
            Self::VideoSourceElement | Self::VideoElementSource => value
                .as_str()
                .map(str::trim)
                .filter(|src| !src.is_empty() && !src.starts_with("blob:"))
                .map(String::from),
            Self::MediaFrame => strings(value)
                .map(str::trim)
                .find(|src| is_media_address(src))
                .map(String::from),
            Self::InlineScript => strings(value).find_map(first_media_url),
        }
    }
}

fn strings(value: &Value) -> impl Iterator<Item = &str> {
    value
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
}

pub fn is_media_address(address: &str) -> bool {
    url::Url::parse(address)
        .map(|u| matches!(u.scheme(), "http" | "https") && MEDIA_FILE_ADDRESS.is_match(u.path()))
        .unwrap_or(false)
}

/// player configs are usually json, so `https:\/\/` is unescaped before matching
pub fn first_media_url(text: &str) -> Option<String> {
    let text = text.replace("\\/", "/");
    MEDIA_FILE_URL
        .captures(&text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Owns a browser session for the length of one rendering attempt.
///
/// `close` should be awaited on the way out, if the guard is dropped without it (a cancelled
/// future or a panic) the session gets closed on a spawned task instead.
pub struct ScopedSession {
    inner: Option<Box<dyn RenderSession>>,
}

impl ScopedSession {
    pub async fn open(launcher: &(dyn SessionLauncher + Send + Sync)) -> Result<Self, RenderError> {
        let inner = launcher.launch().await?;
        Ok(Self { inner: Some(inner) })
    }

    pub async fn navigate(&mut self, url: &str, options: NavigateOptions) -> Result<(), RenderError> {
        let session = self.session()?;

        match tokio::time::timeout(options.timeout, session.navigate(url, options)).await {
            Ok(result) => result,
            Err(_) => Err(RenderError::NavigationTimeout(options.timeout)),
        }
    }

    pub async fn extract(&mut self, strategy: ExtractionStrategy) -> Result<Option<String>, RenderError> {
        let value = self.session()?.evaluate(strategy.script()).await?;
        Ok(strategy.interpret(&value))
    }

    /// teardown errors only get logged
    pub async fn close(mut self) {
        if let Some(mut session) = self.inner.take() {
            if let Err(e) = session.close().await {
                warn!("failed to close browser session: {}", e);
            } else {
                debug!("browser session closed");
            }
        }
    }

    fn session(&mut self) -> Result<&mut Box<dyn RenderSession>, RenderError> {
        self.inner
            .as_mut()
            .ok_or_else(|| RenderError::Evaluation("browser session already closed".to_string()))
    }
}

impl Drop for ScopedSession {
    fn drop(&mut self) {
        let Some(mut session) = self.inner.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = session.close().await {
                        warn!("failed to close dropped browser session: {}", e);
                    }
                });
            }
            Err(_) => warn!("browser session dropped outside a runtime, it can't be closed"),
        }
    }
}
