//! HTML fallback extraction
//!
//! The detail pages have no stable structure, so each field is located by its
//! visible label: the first text node containing the label (case-insensitive),
//! then all text of that node's parent element, minus the label itself.
//! Any text node counts, so a `<title>` mentioning a label shadows the body.

use crate::model::SchemeRecord;
use scraper::{ElementRef, Html, Selector};

/// Labels searched for, in field order
pub const MARKUP_LABELS: [&str; 5] = [
    "Description",
    "Eligibility",
    "Documents",
    "Benefits",
    "Application Mode",
];

/// Builds a record from a scheme detail page
///
/// Official links are every `href` in the document, unscoped. Navigation
/// chrome ends up in the list too.
pub fn from_markup(html: &str, department: &str, sub_department: &str, scheme_name: &str) -> SchemeRecord {
    let document = Html::parse_document(html);

    let mut record = SchemeRecord::new(department, sub_department, scheme_name);
    record.scheme_description = label_text(&document, "Description");
    record.eligibility_criteria = label_text(&document, "Eligibility");
    record.required_documents = label_text(&document, "Documents");
    record.benefits = label_text(&document, "Benefits");
    record.application_mode = label_text(&document, "Application Mode");
    record.set_official_links(anchor_hrefs(&document));

    record
}

/// Text next to `label`, or an empty string when the label is absent
pub fn label_text(document: &Html, label: &str) -> String {
    let needle = label.to_ascii_lowercase();

    for node in document.tree.root().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        if !text.trim().to_ascii_lowercase().contains(&needle) {
            continue;
        }

        let Some(parent) = node.parent().and_then(ElementRef::wrap) else {
            continue;
        };

        let joined = parent
            .text()
            .map(str::trim)
            .filter(|piece| !piece.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        return strip_label(&joined, &needle);
    }

    String::new()
}

/// Removes every case-insensitive occurrence of `needle`, then the separators around it
fn strip_label(text: &str, needle: &str) -> String {
    // ASCII lowercasing keeps byte offsets aligned with `text`
    let lowered = text.to_ascii_lowercase();
    let mut stripped = String::with_capacity(text.len());
    let mut cursor = 0;

    while let Some(found) = lowered[cursor..].find(needle) {
        let start = cursor + found;
        stripped.push_str(&text[cursor..start]);
        cursor = start + needle.len();
    }
    stripped.push_str(&text[cursor..]);

    stripped
        .trim_start_matches(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
        .trim_end_matches(|c: char| c.is_whitespace() || c == ':')
        .to_string()
}

fn anchor_hrefs(document: &Html) -> Vec<String> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|anchor| anchor.value().attr("href"))
        .map(str::to_string)
        .collect()
}
