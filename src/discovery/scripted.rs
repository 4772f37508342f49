//! In-memory rendering session
//!
//! Replays canned pages instead of driving a browser. Used to exercise the
//! discovery agent and the coordinator without Chromium.

use crate::discovery::session::{CapturedResponse, ElementSnapshot, RenderSession};
use crate::discovery::{DiscoveryError, DiscoveryResult};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// One rendered state of a page
#[derive(Debug, Clone, Default)]
pub struct ScriptedPage {
    elements: HashMap<String, Vec<ElementSnapshot>>,
    options: HashMap<String, Vec<String>>,
    responses: Vec<CapturedResponse>,
    repeating: bool,
}

impl ScriptedPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Elements returned when `css` is queried verbatim
    pub fn with_elements(mut self, css: &str, elements: Vec<ElementSnapshot>) -> Self {
        self.elements.insert(css.to_string(), elements);
        self
    }

    /// Option labels of the select matched by `css`
    pub fn with_options(mut self, css: &str, labels: Vec<&str>) -> Self {
        self.options
            .insert(css.to_string(), labels.into_iter().map(str::to_string).collect());
        self
    }

    /// A response observed when this page is shown
    pub fn with_response(mut self, url: &str, body: Option<&str>) -> Self {
        self.responses.push(CapturedResponse {
            url: url.to_string(),
            body: body.map(str::to_string),
        });
        self
    }

    /// Clicking on the last page of the URL shows it again
    pub fn repeating(mut self) -> Self {
        self.repeating = true;
        self
    }
}

/// What happened during a scripted session, readable after the session moved
#[derive(Debug, Clone, Default)]
pub struct SessionJournal {
    inner: Arc<Mutex<JournalState>>,
}

#[derive(Debug, Default)]
struct JournalState {
    visits: Vec<String>,
    clicks: usize,
    closed: bool,
}

impl SessionJournal {
    fn update(&self, apply: impl FnOnce(&mut JournalState)) {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        apply(&mut state);
    }

    fn read<T>(&self, view: impl FnOnce(&JournalState) -> T) -> T {
        let state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        view(&state)
    }

    /// Every URL passed to `goto`, in order
    pub fn visits(&self) -> Vec<String> {
        self.read(|state| state.visits.clone())
    }

    pub fn clicks(&self) -> usize {
        self.read(|state| state.clicks)
    }

    pub fn closed(&self) -> bool {
        self.read(|state| state.closed)
    }
}

/// A [`RenderSession`] backed by [`ScriptedPage`]s keyed by URL
///
/// Registering several pages for one URL makes it paginated: `goto` shows the
/// first, each click advances to the next. Unknown URLs render as empty pages.
#[derive(Debug, Default)]
pub struct ScriptedSession {
    pages: HashMap<String, Vec<ScriptedPage>>,
    failing: HashSet<String>,
    current: Option<(String, usize)>,
    pending: Vec<CapturedResponse>,
    journal: SessionJournal,
}

impl ScriptedSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a page state for `url`
    pub fn page(mut self, url: &str, page: ScriptedPage) -> Self {
        self.pages.entry(url.to_string()).or_default().push(page);
        self
    }

    /// Navigation to `url` fails
    pub fn failing(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    pub fn journal(&self) -> SessionJournal {
        self.journal.clone()
    }

    fn current_page(&self) -> Option<&ScriptedPage> {
        let (url, index) = self.current.as_ref()?;
        self.pages.get(url)?.get(*index)
    }

    fn show(&mut self, url: String, index: usize) {
        if let Some(page) = self.pages.get(&url).and_then(|pages| pages.get(index)) {
            self.pending.extend(page.responses.iter().cloned());
        }
        self.current = Some((url, index));
    }
}

#[async_trait]
impl RenderSession for ScriptedSession {
    async fn goto(&mut self, url: &str) -> DiscoveryResult<()> {
        self.journal.update(|state| state.visits.push(url.to_string()));
        if self.failing.contains(url) {
            return Err(DiscoveryError::Navigation {
                url: url.to_string(),
                message: "scripted failure".to_string(),
            });
        }
        self.show(url.to_string(), 0);
        Ok(())
    }

    async fn wait_for_idle(&mut self, _quiet: Duration, _cap: Duration) -> DiscoveryResult<()> {
        Ok(())
    }

    async fn query_all(&mut self, selector: &str) -> DiscoveryResult<Vec<ElementSnapshot>> {
        Ok(self
            .current_page()
            .and_then(|page| page.elements.get(selector))
            .cloned()
            .unwrap_or_default())
    }

    async fn click(&mut self, selector: &str, index: usize) -> DiscoveryResult<()> {
        let exists = self
            .current_page()
            .and_then(|page| page.elements.get(selector))
            .is_some_and(|elements| index < elements.len());
        if !exists {
            return Err(DiscoveryError::Script(format!("no element {}[{}]", selector, index)));
        }
        self.journal.update(|state| state.clicks += 1);

        let Some((url, position)) = self.current.clone() else {
            return Ok(());
        };
        let count = self.pages.get(&url).map_or(0, Vec::len);
        let repeating = self.current_page().is_some_and(|page| page.repeating);
        if position + 1 < count {
            self.show(url, position + 1);
        } else if repeating {
            self.show(url, position);
        }
        Ok(())
    }

    async fn select_options(&mut self, selector: &str) -> DiscoveryResult<Vec<String>> {
        Ok(self
            .current_page()
            .and_then(|page| page.options.get(selector))
            .cloned()
            .unwrap_or_default())
    }

    fn drain_responses(&mut self) -> Vec<CapturedResponse> {
        std::mem::take(&mut self.pending)
    }

    async fn close(&mut self) -> DiscoveryResult<()> {
        self.current = None;
        self.journal.update(|state| state.closed = true);
        Ok(())
    }
}
