//! Data model shared by discovery, extraction and persistence
//!
//! - [`SchemeRecord`]: the canonical persisted unit
//! - [`SchemeHandle`] / [`SubDepartment`]: transient discovery artifacts
//! - [`DedupeKey`] and [`resume_key`]: the intra-run and cross-run identities

mod handle;
mod record;

pub use handle::{resume_key, SchemeHandle, SubDepartment};
pub use record::{dedupe_links, DedupeKey, SchemeRecord};

/// Placeholder used when the source omits the department name
pub const UNKNOWN_DEPARTMENT: &str = "Unknown Department";

/// Placeholder used when the source omits the sub-department name
pub const UNKNOWN_SUB_DEPARTMENT: &str = "Unknown";

/// Placeholder used when the source omits the scheme name
pub const UNKNOWN_SCHEME: &str = "Unknown Scheme";
