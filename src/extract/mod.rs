//! Record extraction
//!
//! Two pure construction paths turn a fetched scheme detail into a
//! [`SchemeRecord`](crate::model::SchemeRecord):
//! - [`from_payload`] maps a structured API object by known key aliases
//! - [`from_markup`] scrapes label-adjacent text out of the rendered HTML
//!
//! The coordinator picks the path; nothing here touches the network or disk.

mod markup;
mod payload;

pub use markup::{from_markup, label_text, MARKUP_LABELS};
pub use payload::{from_json_value, from_payload};
