//! Selector candidate chains
//!
//! Markup on the portal varies between sections, so every lookup is an
//! ordered list of candidates. The first candidate that yields at least one
//! element wins; results are never merged across candidates.

use crate::discovery::session::ElementSnapshot;

/// A CSS selector, optionally narrowed by a case-insensitive text match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorCandidate {
    pub css: String,
    pub text: Option<String>,
}

impl SelectorCandidate {
    pub fn css(css: &str) -> Self {
        Self {
            css: css.to_string(),
            text: None,
        }
    }

    pub fn with_text(css: &str, text: &str) -> Self {
        Self {
            css: css.to_string(),
            text: Some(text.to_string()),
        }
    }

    /// Whether a snapshot produced by `css` also passes the text filter
    pub fn accepts(&self, element: &ElementSnapshot) -> bool {
        match &self.text {
            Some(text) => element.text.to_lowercase().contains(&text.to_lowercase()),
            None => true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorChain {
    candidates: Vec<SelectorCandidate>,
}

impl SelectorChain {
    pub fn new(candidates: Vec<SelectorCandidate>) -> Self {
        Self { candidates }
    }

    /// Chain of plain CSS selectors
    pub fn of(selectors: &[&str]) -> Self {
        Self::new(selectors.iter().map(|css| SelectorCandidate::css(css)).collect())
    }

    pub fn candidates(&self) -> &[SelectorCandidate] {
        &self.candidates
    }
}

/// Every selector chain the discovery agent uses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorSet {
    pub sub_departments: SelectorChain,
    pub schemes: SelectorChain,
    pub next_page: SelectorChain,
    pub district_select: SelectorChain,
    pub taluka_select: SelectorChain,
}

impl Default for SelectorSet {
    fn default() -> Self {
        Self {
            sub_departments: SelectorChain::new(vec![
                SelectorCandidate::css("a[href*='subdepartment']"),
                SelectorCandidate::css(".sub-department a"),
                SelectorCandidate::css("a[href*='sub-department']"),
                SelectorCandidate::with_text("a", "Sub Department"),
            ]),
            schemes: SelectorChain::of(&["a[href*='scheme'], .scheme-card a, .scheme-list a"]),
            next_page: SelectorChain::new(vec![
                SelectorCandidate::css("button.next, a.next, li.next a, [aria-label='Next']"),
                SelectorCandidate::with_text("button, a", "Next"),
            ]),
            district_select: SelectorChain::of(&["select[name*='district']", "select#district"]),
            taluka_select: SelectorChain::of(&[
                "select[name*='taluka']",
                "select[name*='taluk']",
                "select#taluka",
            ]),
        }
    }
}
