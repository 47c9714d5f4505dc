use crate::enrich::CveLookup;
use crate::types::CveRecord;
use serde::{Deserialize, Serialize};

pub const RATE_LIMITED_MESSAGE: &str = "Rate limited. Please try again later.";
pub const FETCH_FAILED_MESSAGE: &str = "Failed to fetch CVE data";

/// Body of every `/api/cve/{keyword}` response, success or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CveResponse {
    pub cves: Vec<CveRecord>,
    pub total: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CveResponse {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            cves: Vec::new(),
            total: 0,
            cached: None,
            error: Some(message.into()),
        }
    }
}

impl From<CveLookup> for CveResponse {
    fn from(lookup: CveLookup) -> Self {
        Self {
            cves: lookup.cves,
            total: lookup.total,
            cached: Some(lookup.cached),
            error: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub cached_keywords: usize,
}
