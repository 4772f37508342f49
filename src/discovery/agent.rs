//! Discovery agent
//!
//! Owns the rendering session for the whole run and turns the portal's
//! JavaScript-rendered navigation into plain data: sub-departments, scheme
//! handles and geography option lists.

use crate::discovery::selectors::{SelectorChain, SelectorSet};
use crate::discovery::session::{CapturedResponse, ElementSnapshot, RenderSession};
use crate::discovery::DiscoveryResult;
use crate::model::{SchemeHandle, SubDepartment, UNKNOWN_DEPARTMENT, UNKNOWN_SUB_DEPARTMENT};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use url::Url;

/// Attribute naming the parent department on a sub-department link
const DEPARTMENT_ATTRIBUTE: &str = "data-department";

/// Network-idle heuristic parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdlePolicy {
    /// No new network activity for this long counts as idle
    pub quiet: Duration,
    /// Give up waiting after this long
    pub cap: Duration,
}

impl Default for IdlePolicy {
    fn default() -> Self {
        Self {
            quiet: Duration::from_millis(500),
            cap: Duration::from_secs(30),
        }
    }
}

/// An element that passed a selector candidate, with what is needed to click it again
#[derive(Debug, Clone)]
struct Matched {
    css: String,
    index: usize,
    element: ElementSnapshot,
}

pub struct DiscoveryAgent<S: RenderSession> {
    session: S,
    base_url: Url,
    selectors: SelectorSet,
    idle: IdlePolicy,
    max_pages: u32,
    captures: Vec<CapturedResponse>,
}

impl<S: RenderSession> DiscoveryAgent<S> {
    pub fn new(session: S, base_url: Url) -> Self {
        Self {
            session,
            base_url,
            selectors: SelectorSet::default(),
            idle: IdlePolicy::default(),
            max_pages: 200,
            captures: Vec::new(),
        }
    }

    pub fn with_selectors(mut self, selectors: SelectorSet) -> Self {
        self.selectors = selectors;
        self
    }

    pub fn with_idle_policy(mut self, idle: IdlePolicy) -> Self {
        self.idle = idle;
        self
    }

    /// Safety ceiling on listing pages visited per sub-department
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Navigates to the landing page and waits for it to settle
    pub async fn open_home(&mut self) -> DiscoveryResult<()> {
        let home = self.base_url.to_string();
        self.navigate(&home).await
    }

    /// Lists `(department, sub-department, url)` entries on the current page
    ///
    /// Entries are unique by the full tuple; the first occurrence is kept.
    pub async fn discover_sub_departments(&mut self) -> DiscoveryResult<Vec<SubDepartment>> {
        self.settle().await?;

        let chain = self.selectors.sub_departments.clone();
        let mut seen = HashSet::new();
        let mut found = Vec::new();

        for matched in self.first_match(&chain).await {
            let Some(url) = matched
                .element
                .attr("href")
                .and_then(|href| resolve_link(&self.base_url, href))
            else {
                continue;
            };

            let entry = SubDepartment {
                department: non_empty_or(matched.element.attr(DEPARTMENT_ATTRIBUTE), UNKNOWN_DEPARTMENT),
                name: non_empty_or(Some(matched.element.text.as_str()), UNKNOWN_SUB_DEPARTMENT),
                url,
            };
            if seen.insert(entry.clone()) {
                found.push(entry);
            }
        }

        tracing::info!("Discovered {} sub-departments", found.len());
        Ok(found)
    }

    /// Walks a sub-department listing through every page and collects scheme links
    ///
    /// Pagination follows an enabled "next" control until it disappears, is
    /// disabled, or the page ceiling is reached.
    pub async fn discover_schemes(&mut self, sub_department_url: &str) -> DiscoveryResult<Vec<SchemeHandle>> {
        self.navigate(sub_department_url).await?;

        let scheme_chain = self.selectors.schemes.clone();
        let next_chain = self.selectors.next_page.clone();
        let mut handles = Vec::new();
        let mut page = 1;

        loop {
            for (position, matched) in self.first_match(&scheme_chain).await.into_iter().enumerate() {
                let Some(detail_url) = matched
                    .element
                    .attr("href")
                    .and_then(|href| resolve_link(&self.base_url, href))
                else {
                    continue;
                };
                let name = match matched.element.text.trim() {
                    "" => format!("Scheme-{}", position + 1),
                    text => text.to_string(),
                };
                handles.push(SchemeHandle { name, detail_url });
            }

            if page >= self.max_pages {
                tracing::warn!(
                    "Stopped paginating {} after {} pages (ceiling reached)",
                    sub_department_url,
                    page
                );
                break;
            }

            match self.first_match(&next_chain).await.into_iter().next() {
                Some(next) if next.element.enabled => {
                    self.session.click(&next.css, next.index).await?;
                    self.settle().await?;
                    page += 1;
                }
                _ => break,
            }
        }

        let handles = dedupe_handles(handles);
        tracing::debug!(
            "Found {} schemes across {} pages at {}",
            handles.len(),
            page,
            sub_department_url
        );
        Ok(handles)
    }

    /// Reads the district and taluka option labels of a scheme detail page
    ///
    /// Placeholder options (anything containing "select") are dropped. Either
    /// list may be empty.
    pub async fn extract_dropdown_values(&mut self, scheme_url: &str) -> DiscoveryResult<(Vec<String>, Vec<String>)> {
        self.navigate(scheme_url).await?;

        let district_chain = self.selectors.district_select.clone();
        let taluka_chain = self.selectors.taluka_select.clone();
        let districts = self.first_options(&district_chain).await;
        let talukas = self.first_options(&taluka_chain).await;

        Ok((districts, talukas))
    }

    /// Takes every response captured so far
    pub fn take_captures(&mut self) -> Vec<CapturedResponse> {
        self.collect_captures();
        std::mem::take(&mut self.captures)
    }

    /// Closes the rendering session
    pub async fn shutdown(mut self) -> DiscoveryResult<()> {
        self.session.close().await
    }

    async fn navigate(&mut self, url: &str) -> DiscoveryResult<()> {
        self.session.goto(url).await?;
        self.settle().await
    }

    async fn settle(&mut self) -> DiscoveryResult<()> {
        let result = self.session.wait_for_idle(self.idle.quiet, self.idle.cap).await;
        self.collect_captures();
        result
    }

    fn collect_captures(&mut self) {
        let drained = self.session.drain_responses();
        self.captures.extend(drained);
    }

    /// Elements of the first candidate that yields anything
    async fn first_match(&mut self, chain: &SelectorChain) -> Vec<Matched> {
        for candidate in chain.candidates() {
            let elements = match self.session.query_all(&candidate.css).await {
                Ok(elements) => elements,
                Err(e) => {
                    tracing::debug!("Selector {} failed: {}", candidate.css, e);
                    continue;
                }
            };

            let matched: Vec<Matched> = elements
                .into_iter()
                .enumerate()
                .filter(|(_, element)| candidate.accepts(element))
                .map(|(index, element)| Matched {
                    css: candidate.css.clone(),
                    index,
                    element,
                })
                .collect();

            if !matched.is_empty() {
                return matched;
            }
        }
        Vec::new()
    }

    async fn first_options(&mut self, chain: &SelectorChain) -> Vec<String> {
        for candidate in chain.candidates() {
            let labels = match self.session.select_options(&candidate.css).await {
                Ok(labels) => labels,
                Err(e) => {
                    tracing::debug!("Option lookup {} failed: {}", candidate.css, e);
                    continue;
                }
            };

            let labels: Vec<String> = labels
                .into_iter()
                .map(|label| label.trim().to_string())
                .filter(|label| !label.is_empty() && !label.to_lowercase().contains("select"))
                .collect();

            if !labels.is_empty() {
                return labels;
            }
        }
        Vec::new()
    }
}

/// Resolves an `href` against `base`, keeping only http(s) targets
///
/// Returns None for empty, fragment-only, `javascript:`, `mailto:`, `tel:` and
/// `data:` links.
pub fn resolve_link(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let absolute = base.join(href).ok()?;
    match absolute.scheme() {
        "http" | "https" => Some(absolute.to_string()),
        _ => None,
    }
}

fn non_empty_or(value: Option<&str>, placeholder: &str) -> String {
    match value.map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => placeholder.to_string(),
    }
}

/// Unique by `(name, url)`: first position, last value
fn dedupe_handles(handles: Vec<SchemeHandle>) -> Vec<SchemeHandle> {
    let mut positions: HashMap<(String, String), usize> = HashMap::new();
    let mut unique: Vec<SchemeHandle> = Vec::new();

    for handle in handles {
        let key = (handle.name.clone(), handle.detail_url.clone());
        match positions.get(&key) {
            Some(&position) => unique[position] = handle,
            None => {
                positions.insert(key, unique.len());
                unique.push(handle);
            }
        }
    }
    unique
}
