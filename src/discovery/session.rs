//! Rendering session seam

use crate::discovery::DiscoveryResult;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// What the agent needs to know about one matched element
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ElementSnapshot {
    /// Rendered text, trimmed
    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub attributes: HashMap<String, String>,

    /// False for disabled controls (`disabled`, `aria-disabled="true"`, `.disabled`)
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl Default for ElementSnapshot {
    fn default() -> Self {
        Self {
            text: String::new(),
            attributes: HashMap::new(),
            enabled: true,
        }
    }
}

impl ElementSnapshot {
    /// Snapshot with text and a single `href`
    pub fn link(text: &str, href: &str) -> Self {
        Self {
            text: text.to_string(),
            attributes: HashMap::from([("href".to_string(), href.to_string())]),
            enabled: true,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// A response observed while rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedResponse {
    pub url: String,
    /// Raw body, only kept for JSON content types
    pub body: Option<String>,
}

/// A live page in a rendering browser
///
/// One session drives one page; navigations are never issued concurrently.
#[async_trait]
pub trait RenderSession: Send {
    /// Navigates the page to `url`
    async fn goto(&mut self, url: &str) -> DiscoveryResult<()>;

    /// Waits until no new network activity was seen for `quiet`, failing after `cap`
    async fn wait_for_idle(&mut self, quiet: Duration, cap: Duration) -> DiscoveryResult<()>;

    /// Snapshots every element matching the CSS `selector`, in document order
    async fn query_all(&mut self, selector: &str) -> DiscoveryResult<Vec<ElementSnapshot>>;

    /// Clicks the `index`-th element matching `selector`
    async fn click(&mut self, selector: &str, index: usize) -> DiscoveryResult<()>;

    /// Option labels of the first `<select>` matching `selector`
    async fn select_options(&mut self, selector: &str) -> DiscoveryResult<Vec<String>>;

    /// Takes every response captured since the last call
    fn drain_responses(&mut self) -> Vec<CapturedResponse>;

    /// Releases page, browser and background tasks
    async fn close(&mut self) -> DiscoveryResult<()>;
}
