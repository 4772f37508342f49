//! User-agent pool
//!
//! One identifier is picked per run. A custom newline-separated file replaces
//! the built-in pool when it exists and has at least one non-blank line.

use rand::seq::IndexedRandom;
use std::path::Path;

/// Built-in pool of realistic browser identifiers
pub const DEFAULT_USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:124.0) Gecko/20100101 Firefox/124.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_3_1) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
];

#[derive(Debug, Clone)]
pub struct UserAgentPool {
    pool: Vec<String>,
}

impl UserAgentPool {
    pub fn load(path: Option<&Path>) -> Self {
        let custom = path.and_then(|path| match std::fs::read_to_string(path) {
            Ok(content) => Some(
                content
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(String::from)
                    .collect::<Vec<_>>(),
            ),
            Err(e) => {
                tracing::debug!("No custom user-agent pool at {}: {}", path.display(), e);
                None
            }
        });

        match custom {
            Some(pool) if !pool.is_empty() => Self { pool },
            _ => Self::default(),
        }
    }

    pub fn pick(&self) -> String {
        self.pool
            .choose(&mut rand::rng())
            .cloned()
            .unwrap_or_else(|| DEFAULT_USER_AGENTS[0].to_string())
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }
}

impl Default for UserAgentPool {
    fn default() -> Self {
        Self {
            pool: DEFAULT_USER_AGENTS.iter().map(|ua| ua.to_string()).collect(),
        }
    }
}
