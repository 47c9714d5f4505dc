use crate::config::{HttpConfig, OsvConfig};
use crate::error::{ByocError, Result};
use crate::http::HttpClient;
use crate::source::{AdvisorySource, Lookup};
use crate::types::record::push_unique;
use crate::types::{
    PackageAdvisory, Remediation, MAX_AFFECTED_PACKAGES, MAX_BULK_AFFECTED_PACKAGES,
    MAX_FIXED_VERSIONS,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Advisories a package query may contribute to one response.
pub const MAX_PACKAGE_ADVISORIES: usize = 10;

const GIT_RANGE: &str = "GIT";

#[derive(Debug, Clone)]
pub struct OsvClient {
    client: HttpClient,
    base_url: String,
}

impl OsvClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::from_config(
            &OsvConfig {
                base_url: base_url.to_string(),
                ..OsvConfig::default()
            },
            &HttpConfig::default(),
        )
    }

    pub fn from_config(config: &OsvConfig, http: &HttpConfig) -> Result<Self> {
        Ok(Self {
            client: HttpClient::from_config("OSV", http)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn get_vuln(&self, id: &str) -> Result<OsvVulnerability> {
        self.client
            .get_json(&format!("{}/vulns/{}", self.base_url, id))
            .await
    }

    pub async fn query(&self, query: &OsvQuery) -> Result<Vec<OsvVulnerability>> {
        let response: OsvQueryResponse = self
            .client
            .post_json(&format!("{}/query", self.base_url), query)
            .await?;
        Ok(response.vulns.unwrap_or_default())
    }
}

#[async_trait]
impl AdvisorySource for OsvClient {
    fn name(&self) -> &'static str {
        "OSV"
    }

    async fn advisory(&self, id: &str) -> Lookup<Remediation> {
        match self.get_vuln(id).await {
            Ok(vuln) => {
                let remediation = vuln.remediation(MAX_AFFECTED_PACKAGES);
                if remediation.is_empty() {
                    Lookup::NotFound
                } else {
                    Lookup::Found(remediation)
                }
            }
            Err(ByocError::UpstreamStatus { status: 404, .. }) => Lookup::NotFound,
            Err(e) => Lookup::Failed(e),
        }
    }

    async fn query_package(&self, name: &str, ecosystem: &str) -> Lookup<Vec<PackageAdvisory>> {
        let query = OsvQuery {
            package: OsvPackage {
                name: name.to_string(),
                ecosystem: ecosystem.to_string(),
            },
        };

        match self.query(&query).await {
            Ok(vulns) => {
                let advisories = package_advisories(vulns);
                if advisories.is_empty() {
                    Lookup::NotFound
                } else {
                    Lookup::Found(advisories)
                }
            }
            Err(e) => Lookup::Failed(e),
        }
    }
}

/// Keeps CVE and GHSA advisories, at most [`MAX_PACKAGE_ADVISORIES`] of them.
pub fn package_advisories(vulns: Vec<OsvVulnerability>) -> Vec<PackageAdvisory> {
    vulns
        .into_iter()
        .filter(|v| is_tracked_id(&v.id))
        .take(MAX_PACKAGE_ADVISORIES)
        .map(|v| PackageAdvisory {
            remediation: v.remediation(MAX_BULK_AFFECTED_PACKAGES),
            id: v.id,
        })
        .collect()
}

pub fn is_tracked_id(id: &str) -> bool {
    id.starts_with("CVE-") || id.starts_with("GHSA-")
}

/// Release identifiers contain a dot; bare commit hashes and tags do not.
pub fn is_version_like(value: &str) -> bool {
    value.contains('.')
}

#[derive(Serialize, Debug, Clone)]
pub struct OsvQuery {
    pub package: OsvPackage,
}

#[derive(Serialize, Debug, Clone, Deserialize)]
pub struct OsvPackage {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub ecosystem: String,
}

#[derive(Debug, Deserialize)]
struct OsvQueryResponse {
    vulns: Option<Vec<OsvVulnerability>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsvVulnerability {
    pub id: String,
    #[serde(default)]
    pub affected: Vec<OsvAffected>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsvAffected {
    #[serde(default)]
    pub package: Option<OsvPackage>,
    #[serde(default)]
    pub ranges: Vec<OsvRange>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsvRange {
    #[serde(default)]
    pub r#type: String,
    #[serde(default)]
    pub events: Vec<OsvEvent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsvEvent {
    #[serde(default)]
    pub introduced: Option<String>,
    #[serde(default)]
    pub fixed: Option<String>,
}

impl OsvVulnerability {
    /// Collects `ecosystem/name` packages and version-like fixed events,
    /// skipping GIT ranges.
    pub fn remediation(&self, package_cap: usize) -> Remediation {
        let mut remediation = Remediation::default();

        for affected in &self.affected {
            if let Some(package) = affected.package.as_ref().filter(|p| !p.name.is_empty()) {
                let qualified = format!("{}/{}", package.ecosystem, package.name);
                push_unique(&mut remediation.affected_packages, &qualified, package_cap);
            }

            for range in affected.ranges.iter().filter(|r| r.r#type != GIT_RANGE) {
                for fixed in range.events.iter().filter_map(|e| e.fixed.as_deref()) {
                    if is_version_like(fixed) {
                        push_unique(&mut remediation.fixed_versions, fixed, MAX_FIXED_VERSIONS);
                    }
                }
            }
        }

        remediation
    }
}
