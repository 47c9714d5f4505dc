use crate::error::{ByocError, Result};
use crate::types::{PackageAdvisory, Remediation, Severity};
use async_trait::async_trait;

/// Outcome of a best-effort advisory call.
///
/// `NotFound` and `Failed` are served identically to API callers, but the
/// distinction is kept so failures can be logged.
#[derive(Debug)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
    Failed(ByocError),
}

impl<T: Default> Lookup<T> {
    pub fn into_data(self) -> T {
        match self {
            Lookup::Found(data) => data,
            Lookup::NotFound | Lookup::Failed(_) => T::default(),
        }
    }
}

impl<T> Lookup<T> {
    pub fn is_failed(&self) -> bool {
        matches!(self, Lookup::Failed(_))
    }
}

/// Score reported by the primary source, tagged by CVSS schema.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CvssScore {
    /// CVSS v3.x: severity lives next to the score inside `cvssData`.
    V3 { base_score: f64, severity: Severity },
    /// CVSS v2: severity is reported beside `cvssData`, and may be missing.
    V2 { base_score: f64, severity: Severity },
}

impl CvssScore {
    pub fn base_score(&self) -> f64 {
        match self {
            CvssScore::V3 { base_score, .. } | CvssScore::V2 { base_score, .. } => *base_score,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            CvssScore::V3 { severity, .. } | CvssScore::V2 { severity, .. } => *severity,
        }
    }
}

/// A primary-source record before enrichment.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryRecord {
    pub id: String,
    /// First English description, or empty.
    pub description: String,
    pub published: String,
    pub last_modified: String,
    pub score: Option<CvssScore>,
    pub references: Vec<String>,
}

/// Records sorted newest first, plus the upstream's own total.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrimarySearch {
    pub records: Vec<PrimaryRecord>,
    pub total: u64,
}

#[async_trait]
pub trait PrimarySource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Keyword search. 403/429 surface as [`ByocError::RateLimited`].
    async fn search(&self, keyword: &str) -> Result<PrimarySearch>;
}

#[async_trait]
pub trait AdvisorySource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn advisory(&self, id: &str) -> Lookup<Remediation>;

    async fn query_package(&self, name: &str, ecosystem: &str) -> Lookup<Vec<PackageAdvisory>>;
}
