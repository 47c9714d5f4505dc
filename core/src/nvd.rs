//! Keyword search against the NVD CVE API 2.0.
//! https://nvd.nist.gov/developers/vulnerabilities

use crate::config::{HttpConfig, NvdConfig};
use crate::error::{ByocError, Result};
use crate::http::HttpClient;
use crate::source::{CvssScore, PrimaryRecord, PrimarySearch, PrimarySource};
use crate::types::{Severity, MAX_REFERENCES};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::cmp::Reverse;

#[derive(Debug, Clone)]
pub struct NvdClient {
    client: HttpClient,
    base_url: String,
    api_key: Option<String>,
    results_per_page: u32,
}

impl NvdClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::from_config(
            &NvdConfig {
                base_url: base_url.to_string(),
                ..NvdConfig::default()
            },
            &HttpConfig::default(),
        )
    }

    pub fn from_config(config: &NvdConfig, http: &HttpConfig) -> Result<Self> {
        Ok(Self {
            client: HttpClient::from_config("NVD", http)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            results_per_page: config.results_per_page,
        })
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub async fn search_keyword(&self, keyword: &str) -> Result<PrimarySearch> {
        let per_page = self.results_per_page.to_string();
        let query = [
            ("keywordSearch", keyword),
            ("resultsPerPage", per_page.as_str()),
            ("noRejected", ""),
        ];
        let headers: Vec<(&'static str, String)> = self
            .api_key
            .iter()
            .map(|key| ("apikey", key.clone()))
            .collect();

        let response: NvdResponse = self
            .client
            .get_json_with_query(&self.base_url, &query, &headers)
            .await
            .map_err(|e| match e.status() {
                Some(status @ (403 | 429)) => ByocError::RateLimited { status },
                _ => e,
            })?;

        let records = sort_newest_first(
            response
                .vulnerabilities
                .into_iter()
                .map(|v| v.cve.into_record())
                .collect(),
        );

        Ok(PrimarySearch {
            records,
            total: response.total_results,
        })
    }
}

#[async_trait]
impl PrimarySource for NvdClient {
    fn name(&self) -> &'static str {
        "NVD"
    }

    async fn search(&self, keyword: &str) -> Result<PrimarySearch> {
        self.search_keyword(keyword).await
    }
}

/// Orders records by publication date, most recent first. Records whose date
/// cannot be parsed sort last; ties keep upstream order.
pub fn sort_newest_first(mut records: Vec<PrimaryRecord>) -> Vec<PrimaryRecord> {
    records.sort_by_key(|r| Reverse(parse_timestamp(&r.published)));
    records
}

/// NVD timestamps carry no zone (`2018-01-18T23:29:00.213`); RFC 3339 and bare
/// dates are accepted too.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Picks the score to report: CVSS v3.1, then v3.0, then v2.
pub fn select_score(metrics: &NvdMetrics) -> Option<CvssScore> {
    let v3 = metrics
        .cvss_metric_v31
        .first()
        .or_else(|| metrics.cvss_metric_v30.first());

    if let Some(metric) = v3 {
        return Some(CvssScore::V3 {
            base_score: metric.cvss_data.base_score,
            severity: metric
                .cvss_data
                .base_severity
                .as_deref()
                .map(Severity::from_label)
                .unwrap_or_default(),
        });
    }

    metrics.cvss_metric_v2.first().map(|metric| CvssScore::V2 {
        base_score: metric.cvss_data.base_score,
        severity: metric
            .base_severity
            .as_deref()
            .map(Severity::from_label)
            .unwrap_or_default(),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NvdResponse {
    #[serde(default)]
    pub vulnerabilities: Vec<NvdVulnerability>,
    #[serde(default)]
    pub total_results: u64,
}

#[derive(Debug, Deserialize)]
pub struct NvdVulnerability {
    pub cve: NvdCve,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NvdCve {
    pub id: String,
    #[serde(default)]
    pub descriptions: Vec<NvdDescription>,
    #[serde(default)]
    pub published: String,
    #[serde(default)]
    pub last_modified: String,
    #[serde(default)]
    pub metrics: Option<NvdMetrics>,
    #[serde(default)]
    pub references: Vec<NvdReference>,
}

impl NvdCve {
    fn into_record(self) -> PrimaryRecord {
        let description = self
            .descriptions
            .into_iter()
            .find(|d| d.lang == "en")
            .map(|d| d.value)
            .unwrap_or_default();

        PrimaryRecord {
            score: self.metrics.as_ref().and_then(select_score),
            references: self
                .references
                .into_iter()
                .take(MAX_REFERENCES)
                .map(|r| r.url)
                .collect(),
            id: self.id,
            description,
            published: self.published,
            last_modified: self.last_modified,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NvdDescription {
    pub lang: String,
    pub value: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NvdMetrics {
    #[serde(default, rename = "cvssMetricV31")]
    pub cvss_metric_v31: Vec<CvssV3Metric>,
    #[serde(default, rename = "cvssMetricV30")]
    pub cvss_metric_v30: Vec<CvssV3Metric>,
    #[serde(default, rename = "cvssMetricV2")]
    pub cvss_metric_v2: Vec<CvssV2Metric>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CvssV3Metric {
    pub cvss_data: CvssV3Data,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CvssV3Data {
    pub base_score: f64,
    #[serde(default)]
    pub base_severity: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CvssV2Metric {
    pub cvss_data: CvssV2Data,
    #[serde(default)]
    pub base_severity: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CvssV2Data {
    pub base_score: f64,
}

#[derive(Debug, Deserialize)]
pub struct NvdReference {
    pub url: String,
}
