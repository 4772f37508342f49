//! Chromium rendering session over the DevTools protocol

use crate::discovery::hints::is_capture_candidate;
use crate::discovery::session::{CapturedResponse, ElementSnapshot, RenderSession};
use crate::discovery::{DiscoveryError, DiscoveryResult};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventResponseReceived, GetResponseBodyParams,
};
use chromiumoxide::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::fmt::Display;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// How often the idle probe is evaluated
const IDLE_POLL: Duration = Duration::from_millis(100);

/// Document state plus the number of resource loads seen so far
///
/// Scripts are kept as plain expressions; chromiumoxide treats anything that
/// looks like a function declaration as a callable instead.
const IDLE_PROBE: &str = "[document.readyState, performance.getEntriesByType('resource').length]";

/// One headless (or headed) Chromium with a single page
///
/// JSON responses on API-looking URLs are captured in the background for the
/// hints file.
pub struct ChromiumSession {
    browser: Option<Browser>,
    page: Option<Page>,
    handler_task: Option<JoinHandle<()>>,
    capture_task: Option<JoinHandle<()>>,
    captures: Arc<Mutex<Vec<CapturedResponse>>>,
}

impl ChromiumSession {
    /// Launches Chromium, opens a blank page and starts response capture
    pub async fn launch(headless: bool, user_agent: &str, request_timeout: Duration) -> DiscoveryResult<Self> {
        let mut builder = BrowserConfig::builder()
            .request_timeout(request_timeout)
            .arg(format!("--user-agent={}", user_agent));
        if !headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(DiscoveryError::Browser)?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(browser_error)?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("Browser handler stopped: {}", e);
                    break;
                }
            }
        });

        let mut session = Self {
            browser: Some(browser),
            page: None,
            handler_task: Some(handler_task),
            capture_task: None,
            captures: Arc::default(),
        };

        if let Err(e) = session.open_page().await {
            if let Err(close_err) = session.close().await {
                tracing::warn!("Cleanup after failed launch: {}", close_err);
            }
            return Err(e);
        }

        tracing::info!("Launched Chromium (headless: {})", headless);
        Ok(session)
    }

    async fn open_page(&mut self) -> DiscoveryResult<()> {
        let browser = self
            .browser
            .as_ref()
            .ok_or_else(|| DiscoveryError::Browser("browser already closed".to_string()))?;

        let page = browser.new_page("about:blank").await.map_err(browser_error)?;
        page.execute(EnableParams::default()).await.map_err(browser_error)?;

        let mut events = page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(browser_error)?;
        let captures = Arc::clone(&self.captures);
        let listener_page = page.clone();

        self.capture_task = Some(tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let url = event.response.url.clone();
                if !is_capture_candidate(&url) {
                    continue;
                }

                let body = if event.response.mime_type.to_lowercase().contains("json") {
                    response_body(&listener_page, &event).await
                } else {
                    None
                };

                captures
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(CapturedResponse { url, body });
            }
        }));

        self.page = Some(page);
        Ok(())
    }

    fn page(&self) -> DiscoveryResult<&Page> {
        self.page
            .as_ref()
            .ok_or_else(|| DiscoveryError::Browser("page already closed".to_string()))
    }
}

async fn evaluate<T: DeserializeOwned>(page: &Page, script: &str) -> DiscoveryResult<T> {
    page.evaluate(script)
        .await
        .map_err(script_error)?
        .into_value()
        .map_err(script_error)
}

async fn response_body(page: &Page, event: &EventResponseReceived) -> Option<String> {
    match page.execute(GetResponseBodyParams::new(event.request_id.clone())).await {
        Ok(response) if !response.result.base64_encoded => Some(response.result.body.clone()),
        Ok(_) => None,
        Err(e) => {
            tracing::trace!("No body for {}: {}", event.response.url, e);
            None
        }
    }
}

fn browser_error(e: impl Display) -> DiscoveryError {
    DiscoveryError::Browser(e.to_string())
}

fn script_error(e: impl Display) -> DiscoveryError {
    DiscoveryError::Script(e.to_string())
}

/// Selector as a JavaScript string literal
fn js_literal(selector: &str) -> DiscoveryResult<String> {
    serde_json::to_string(selector).map_err(script_error)
}

#[async_trait]
impl RenderSession for ChromiumSession {
    async fn goto(&mut self, url: &str) -> DiscoveryResult<()> {
        let page = self.page()?;
        page.goto(url)
            .await
            .map_err(|e| DiscoveryError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn wait_for_idle(&mut self, quiet: Duration, cap: Duration) -> DiscoveryResult<()> {
        let started = Instant::now();
        let mut last_count = None;
        let mut stable_since = started;

        loop {
            let page = self.page()?;
            let (ready_state, count): (String, u64) = evaluate(page, IDLE_PROBE).await?;
            let now = Instant::now();

            if last_count != Some(count) {
                last_count = Some(count);
                stable_since = now;
            }
            if ready_state == "complete" && now.duration_since(stable_since) >= quiet {
                return Ok(());
            }
            if now.duration_since(started) >= cap {
                return Err(DiscoveryError::IdleTimeout(cap));
            }

            tokio::time::sleep(IDLE_POLL).await;
        }
    }

    async fn query_all(&mut self, selector: &str) -> DiscoveryResult<Vec<ElementSnapshot>> {
        let script = format!(
            r#"Array.from(document.querySelectorAll({selector})).map(el => ({{
                text: (el.innerText || el.textContent || '').trim(),
                attributes: Object.fromEntries(Array.from(el.attributes).map(a => [a.name, a.value])),
                enabled: !(el.disabled || el.getAttribute('aria-disabled') === 'true' || el.classList.contains('disabled'))
            }}))"#,
            selector = js_literal(selector)?
        );
        let page = self.page()?;
        evaluate(page, &script).await
    }

    async fn click(&mut self, selector: &str, index: usize) -> DiscoveryResult<()> {
        let script = format!(
            r#"Array.from(document.querySelectorAll({selector})).slice({index}, {index} + 1).map(el => {{
                el.click();
                return true;
            }}).length > 0"#,
            selector = js_literal(selector)?,
            index = index
        );
        let page = self.page()?;
        if evaluate::<bool>(page, &script).await? {
            Ok(())
        } else {
            Err(DiscoveryError::Script(format!("no element {}[{}] to click", selector, index)))
        }
    }

    async fn select_options(&mut self, selector: &str) -> DiscoveryResult<Vec<String>> {
        let script = format!(
            r#"Array.from((document.querySelector({selector}) || {{}}).options || [])
                .map(o => (o.innerText || o.textContent || '').trim())"#,
            selector = js_literal(selector)?
        );
        let page = self.page()?;
        evaluate(page, &script).await
    }

    fn drain_responses(&mut self) -> Vec<CapturedResponse> {
        std::mem::take(&mut *self.captures.lock().unwrap_or_else(PoisonError::into_inner))
    }

    async fn close(&mut self) -> DiscoveryResult<()> {
        let mut first_error = None;

        if let Some(task) = self.capture_task.take() {
            task.abort();
        }

        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                tracing::warn!("Failed to close page: {}", e);
                first_error.get_or_insert(browser_error(e));
            }
        }

        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                tracing::warn!("Failed to close browser: {}", e);
                first_error.get_or_insert(browser_error(e));
            }
            if let Err(e) = browser.wait().await {
                tracing::warn!("Browser process did not exit cleanly: {}", e);
                first_error.get_or_insert(browser_error(e));
            }
        }

        if let Some(task) = self.handler_task.take() {
            task.abort();
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                tracing::debug!("Chromium session closed");
                Ok(())
            }
        }
    }
}
