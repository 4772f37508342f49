//! Configuration module for Mahiti-Harvest
//!
//! Settings are resolved from built-in defaults, an optional TOML file and
//! environment overrides, then validated. The CLI applies its flags on top.
//!
//! # Example
//!
//! ```no_run
//! use mahiti_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Some(Path::new("harvest.toml"))).unwrap();
//! println!("Writing to {}", config.output_dir.display());
//! ```

mod parser;
mod types;
mod user_agents;
mod validation;

pub use types::{Config, OutputFormat, DEFAULT_BASE_URL};
pub use user_agents::{UserAgentPool, DEFAULT_USER_AGENTS};
pub use validation::validate;

pub use parser::{apply_env_overrides, compute_config_hash, load_config, write_run_snapshot};
