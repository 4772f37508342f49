use super::{UNKNOWN_DEPARTMENT, UNKNOWN_SCHEME, UNKNOWN_SUB_DEPARTMENT};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A normalized scheme record
///
/// One base record is built per scheme (from the structured payload or from
/// markup) and then cloned once per district×taluka variant. A record with an
/// empty `district` is geography-independent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemeRecord {
    pub department_name: String,
    pub sub_department_name: String,
    pub scheme_name: String,
    #[serde(default)]
    pub scheme_description: String,
    #[serde(default)]
    pub eligibility_criteria: String,
    #[serde(default)]
    pub required_documents: String,
    #[serde(default)]
    pub benefits: String,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub taluka: String,
    #[serde(default)]
    pub application_mode: String,
    #[serde(default)]
    pub official_links: Vec<String>,
}

/// Case-insensitive identity used to suppress duplicate writes within a run
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupeKey {
    department: String,
    sub_department: String,
    scheme: String,
    district: String,
    taluka: String,
}

impl SchemeRecord {
    /// Creates an empty record, substituting placeholders for blank names
    pub fn new(department: &str, sub_department: &str, scheme_name: &str) -> Self {
        Self {
            department_name: or_placeholder(department, UNKNOWN_DEPARTMENT),
            sub_department_name: or_placeholder(sub_department, UNKNOWN_SUB_DEPARTMENT),
            scheme_name: or_placeholder(scheme_name, UNKNOWN_SCHEME),
            scheme_description: String::new(),
            eligibility_criteria: String::new(),
            required_documents: String::new(),
            benefits: String::new(),
            district: String::new(),
            taluka: String::new(),
            application_mode: String::new(),
            official_links: Vec::new(),
        }
    }

    /// Replaces the official links, dropping blanks and repeats
    pub fn set_official_links<I, S>(&mut self, links: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.official_links = dedupe_links(links);
    }

    /// Clones the record into a district/taluka variant
    pub fn with_geography(&self, district: &str, taluka: &str) -> Self {
        Self {
            district: district.to_string(),
            taluka: taluka.to_string(),
            ..self.clone()
        }
    }

    pub fn dedupe_key(&self) -> DedupeKey {
        DedupeKey {
            department: self.department_name.to_lowercase(),
            sub_department: self.sub_department_name.to_lowercase(),
            scheme: self.scheme_name.to_lowercase(),
            district: self.district.to_lowercase(),
            taluka: self.taluka.to_lowercase(),
        }
    }
}

fn or_placeholder(value: &str, placeholder: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        placeholder.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Removes empty and repeated links while keeping first-seen order
pub fn dedupe_links<I, S>(links: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    links
        .into_iter()
        .map(Into::into)
        .filter(|link| !link.is_empty() && seen.insert(link.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_for_blank_names() {
        let record = SchemeRecord::new("", "  ", "");
        assert_eq!(record.department_name, UNKNOWN_DEPARTMENT);
        assert_eq!(record.sub_department_name, UNKNOWN_SUB_DEPARTMENT);
        assert_eq!(record.scheme_name, UNKNOWN_SCHEME);
    }

    #[test]
    fn test_links_keep_first_seen_order() {
        let mut record = SchemeRecord::new("Agriculture", "Insurance", "Crop Insurance");
        record.set_official_links(["b", "a", "", "b", "c", "a"]);
        assert_eq!(record.official_links, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_with_geography_leaves_base_untouched() {
        let base = SchemeRecord::new("Agriculture", "Insurance", "Crop Insurance");
        let variant = base.with_geography("Bellary", "Hospet");
        assert_eq!(variant.district, "Bellary");
        assert_eq!(variant.taluka, "Hospet");
        assert!(base.district.is_empty());
        assert_eq!(variant.scheme_name, base.scheme_name);
    }

    #[test]
    fn test_dedupe_key_ignores_case() {
        let a = SchemeRecord::new("Agriculture", "Insurance", "Crop Insurance")
            .with_geography("Bellary", "");
        let b = SchemeRecord::new("AGRICULTURE", "insurance", "crop insurance")
            .with_geography("BELLARY", "");
        assert_eq!(a.dedupe_key(), b.dedupe_key());

        let c = a.with_geography("Bellary", "Hospet");
        assert_ne!(a.dedupe_key(), c.dedupe_key());
    }
}
