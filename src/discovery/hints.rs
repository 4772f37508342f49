//! API hints captured during rendering
//!
//! Purely diagnostic: they show which backend endpoints the portal calls, and
//! never feed the extraction pipeline.

use crate::discovery::session::CapturedResponse;
use serde_json::{json, Value};
use std::path::Path;

/// Longest raw (non-JSON) sample kept per hint, in characters
pub const RAW_SAMPLE_CHARS: usize = 500;

/// Whether a response address is worth recording
pub fn is_capture_candidate(url: &str) -> bool {
    let lowered = url.to_lowercase();
    lowered.contains("/api") || lowered.contains("scheme") || lowered.contains("department")
}

/// Formats captures as JSON lines `{url, sample}`
///
/// `sample` is the parsed body when it decodes as JSON, otherwise its first
/// 500 characters; it is omitted when no body was kept.
pub fn format_hints(captures: &[CapturedResponse]) -> Vec<String> {
    captures
        .iter()
        .map(|capture| {
            let mut entry = json!({ "url": capture.url });
            if let Some(body) = capture.body.as_deref().filter(|b| !b.is_empty()) {
                let sample = serde_json::from_str::<Value>(body)
                    .unwrap_or_else(|_| Value::String(body.chars().take(RAW_SAMPLE_CHARS).collect()));
                entry["sample"] = sample;
            }
            entry.to_string()
        })
        .collect()
}

/// Writes `api_hints.jsonl`
pub fn write_hints(path: &Path, captures: &[CapturedResponse]) -> std::io::Result<()> {
    let lines = format_hints(captures);
    std::fs::write(path, lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_candidates() {
        assert!(is_capture_candidate("https://portal.test/API/v1/list"));
        assert!(is_capture_candidate("https://portal.test/getSchemeDetails?id=4"));
        assert!(is_capture_candidate("https://portal.test/Department/12"));
        assert!(!is_capture_candidate("https://portal.test/static/app.js"));
    }

    #[test]
    fn test_json_and_raw_samples() {
        let long_body = "x".repeat(800);
        let captures = vec![
            CapturedResponse {
                url: "https://portal.test/api/schemes".to_string(),
                body: Some(r#"{"items": [1, 2]}"#.to_string()),
            },
            CapturedResponse {
                url: "https://portal.test/api/broken".to_string(),
                body: Some(long_body),
            },
            CapturedResponse {
                url: "https://portal.test/scheme/list".to_string(),
                body: None,
            },
        ];

        let lines: Vec<Value> = format_hints(&captures)
            .iter()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(lines[0]["sample"]["items"][1], 2);
        assert_eq!(lines[1]["sample"].as_str().unwrap().len(), RAW_SAMPLE_CHARS);
        assert_eq!(lines[2]["url"], "https://portal.test/scheme/list");
        assert!(lines[2].get("sample").is_none());
    }
}
