//! Page-driven discovery
//!
//! The portal renders its navigation with JavaScript, so structure is read
//! from a live rendering session rather than from fetched HTML:
//! - [`RenderSession`]: the browser seam (chromiumoxide in production)
//! - [`DiscoveryAgent`]: sub-departments, paginated scheme lists, dropdowns
//! - [`SelectorChain`]: ordered selector candidates, first non-empty wins
//! - API hints: responses observed while rendering, exported for diagnosis

mod agent;
mod chromium;
mod hints;
#[cfg(any(test, feature = "testing"))]
mod scripted;
mod selectors;
mod session;

pub use agent::{resolve_link, DiscoveryAgent, IdlePolicy};
pub use chromium::ChromiumSession;
pub use hints::{format_hints, is_capture_candidate, write_hints};
#[cfg(any(test, feature = "testing"))]
pub use scripted::{ScriptedPage, ScriptedSession, SessionJournal};
pub use selectors::{SelectorCandidate, SelectorChain, SelectorSet};
pub use session::{CapturedResponse, ElementSnapshot, RenderSession};

use thiserror::Error;

/// Errors raised by the rendering session
///
/// A selector that matches nothing is not an error; it yields an empty list.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Page did not go idle within {0:?}")]
    IdleTimeout(std::time::Duration),

    #[error("Script evaluation failed: {0}")]
    Script(String),
}

/// Result type for discovery operations
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;
