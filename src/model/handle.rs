use serde::{Deserialize, Serialize};

/// A sub-department entry found on the portal's landing page
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubDepartment {
    pub department: String,
    pub name: String,
    pub url: String,
}

/// A scheme link found on a (possibly paginated) sub-department listing
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemeHandle {
    pub name: String,
    pub detail_url: String,
}

/// Builds the composite resume key `department|sub_department|detail_url`
pub fn resume_key(department: &str, sub_department: &str, detail_url: &str) -> String {
    format!("{}|{}|{}", department, sub_department, detail_url)
}
