use crate::model::SchemeRecord;
use serde_json::{Map, Value};

/// Maps a structured API object onto a record
///
/// Each field takes the first alias holding a non-empty value; anything
/// missing becomes an empty string.
pub fn from_payload(payload: &Map<String, Value>, department: &str, sub_department: &str) -> SchemeRecord {
    let field = |aliases: &[&str]| -> String {
        aliases
            .iter()
            .filter_map(|alias| payload.get(*alias))
            .find_map(scalar_text)
            .unwrap_or_default()
    };

    let mut record = SchemeRecord::new(department, sub_department, &field(&["schemeName", "name"]));
    record.scheme_description = field(&["description"]);
    record.eligibility_criteria = field(&["eligibility", "eligibilityCriteria"]);
    record.required_documents = field(&["documents", "requiredDocuments"]);
    record.benefits = field(&["benefits"]);
    record.district = field(&["district"]);
    record.taluka = field(&["taluka", "taluk"]);
    record.application_mode = field(&["applicationMode"]);

    if let Some(Value::Array(links)) = payload.get("officialLinks") {
        record.set_official_links(links.iter().filter_map(scalar_text));
    }

    record
}

/// Accepts an object, or a non-empty array whose first element is an object
///
/// Returns `None` for any other shape so the caller can fall back to markup.
pub fn from_json_value(value: &Value, department: &str, sub_department: &str) -> Option<SchemeRecord> {
    match value {
        Value::Object(map) => Some(from_payload(map, department, sub_department)),
        Value::Array(items) => match items.first() {
            Some(Value::Object(map)) => Some(from_payload(map, department, sub_department)),
            _ => None,
        },
        _ => None,
    }
}

/// Text for "truthy" scalar values; null, false, 0, "" and empty containers are absent
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        Value::Array(items) if items.is_empty() => None,
        Value::Object(map) if map.is_empty() => None,
        other => Some(other.to_string()),
    }
}
