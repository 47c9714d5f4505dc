use serde::{Deserialize, Serialize};

use super::severity::Severity;

pub const DESCRIPTION_LIMIT: usize = 300;
pub const ELLIPSIS: &str = "...";
pub const MAX_REFERENCES: usize = 3;
pub const MAX_FIXED_VERSIONS: usize = 5;
pub const MAX_AFFECTED_PACKAGES: usize = 5;
pub const MAX_BULK_AFFECTED_PACKAGES: usize = 3;

/// One merged entry of the `cves` array returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CveRecord {
    pub id: String,
    pub description: String,
    pub severity: Severity,
    pub score: Option<f64>,
    pub published_date: String,
    pub last_modified_date: String,
    pub references: Vec<String>,
    pub fixed_versions: Vec<String>,
    pub affected_packages: Vec<String>,
}

/// Fix data recovered from an advisory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Remediation {
    pub fixed_versions: Vec<String>,
    /// `ecosystem/name`
    pub affected_packages: Vec<String>,
}

impl Remediation {
    pub fn is_empty(&self) -> bool {
        self.fixed_versions.is_empty() && self.affected_packages.is_empty()
    }
}

/// An advisory returned by a package query, keyed by its own identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageAdvisory {
    pub id: String,
    pub remediation: Remediation,
}

/// Cuts `description` to [`DESCRIPTION_LIMIT`] characters, marking the cut with [`ELLIPSIS`].
pub fn truncate_description(description: &str) -> String {
    match description.char_indices().nth(DESCRIPTION_LIMIT) {
        Some((cut, _)) => format!("{}{}", &description[..cut], ELLIPSIS),
        None => description.to_string(),
    }
}

/// Appends `value` unless it is already present or the list is full.
pub(crate) fn push_unique(list: &mut Vec<String>, value: &str, cap: usize) {
    if list.len() < cap && !list.iter().any(|existing| existing == value) {
        list.push(value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_long_description() {
        let long = "a".repeat(450);
        let truncated = truncate_description(&long);
        assert_eq!(truncated.len(), DESCRIPTION_LIMIT + ELLIPSIS.len());
        assert_eq!(&truncated[..DESCRIPTION_LIMIT], &long[..DESCRIPTION_LIMIT]);
        assert!(truncated.ends_with("..."));
    }

    #[test]
    fn test_truncate_keeps_short_description() {
        let exact = "b".repeat(DESCRIPTION_LIMIT);
        assert_eq!(truncate_description(&exact), exact);
        assert_eq!(truncate_description("short"), "short");
        assert_eq!(truncate_description(""), "");
    }

    #[test]
    fn test_truncate_counts_characters() {
        let text = "é".repeat(301);
        let truncated = truncate_description(&text);
        assert_eq!(truncated.chars().count(), DESCRIPTION_LIMIT + 3);
    }

    #[test]
    fn test_push_unique_dedupes_and_caps() {
        let mut list = Vec::new();
        push_unique(&mut list, "1.0.1", 2);
        push_unique(&mut list, "1.0.1", 2);
        push_unique(&mut list, "1.0.2", 2);
        push_unique(&mut list, "1.0.3", 2);
        assert_eq!(list, vec!["1.0.1", "1.0.2"]);
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let record = CveRecord {
            id: "CVE-2024-0001".to_string(),
            description: "desc".to_string(),
            severity: Severity::High,
            score: Some(7.5),
            published_date: "2024-01-01T00:00:00.000".to_string(),
            last_modified_date: "2024-01-02T00:00:00.000".to_string(),
            references: vec![],
            fixed_versions: vec!["1.2.3".to_string()],
            affected_packages: vec!["npm/lodash".to_string()],
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["publishedDate"], "2024-01-01T00:00:00.000");
        assert_eq!(json["fixedVersions"][0], "1.2.3");
        assert_eq!(json["affectedPackages"][0], "npm/lodash");
        assert_eq!(json["severity"], "HIGH");
    }
}
