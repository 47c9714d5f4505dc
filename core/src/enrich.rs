//! Merges NVD keyword results with OSV fix data and caches the outcome per keyword.

use crate::cache::ResponseCache;
use crate::config::Config;
use crate::error::{ByocError, Result};
use crate::nvd::NvdClient;
use crate::osv::OsvClient;
use crate::source::{AdvisorySource, Lookup, PrimaryRecord, PrimarySource};
use crate::types::{
    truncate_description, CveRecord, Ecosystem, PackageAdvisory, Remediation, Severity,
    MAX_AFFECTED_PACKAGES, MAX_FIXED_VERSIONS, MAX_REFERENCES,
};
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CveLookup {
    pub cves: Vec<CveRecord>,
    pub total: u64,
    pub cached: bool,
}

#[derive(Clone)]
pub struct CveService {
    primary: Arc<dyn PrimarySource>,
    advisories: Arc<dyn AdvisorySource>,
    cache: ResponseCache,
    ecosystem: String,
}

impl CveService {
    pub fn new(
        primary: Arc<dyn PrimarySource>,
        advisories: Arc<dyn AdvisorySource>,
        cache: ResponseCache,
    ) -> Self {
        Self {
            primary,
            advisories,
            cache,
            ecosystem: Ecosystem::Npm.osv_name().to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let nvd = NvdClient::from_config(&config.nvd, &config.http)?;
        let osv = OsvClient::from_config(&config.osv, &config.http)?;
        let cache =
            ResponseCache::in_memory().with_ttl(Duration::from_secs(config.cache.ttl_seconds));

        Ok(Self::new(Arc::new(nvd), Arc::new(osv), cache)
            .with_ecosystem(&config.osv.default_ecosystem))
    }

    /// Ecosystem assumed when the keyword is tried as a package name.
    pub fn with_ecosystem(mut self, ecosystem: &str) -> Self {
        self.ecosystem = Ecosystem::resolve_osv_name(ecosystem);
        self
    }

    pub fn ecosystem(&self) -> &str {
        &self.ecosystem
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Serves `keyword` from the cache while fresh, otherwise fetches, enriches
    /// and overwrites the cache entry.
    ///
    /// Concurrent misses for the same keyword each run the full fetch; the last
    /// write wins.
    pub async fn lookup(&self, keyword: &str) -> Result<CveLookup> {
        if keyword.trim().is_empty() {
            return Err(ByocError::InvalidKeyword);
        }

        if let Some(entry) = self.cache.fresh(keyword) {
            tracing::debug!(keyword, age = ?entry.age(), "serving cached CVE lookup");
            return Ok(CveLookup {
                cves: entry.cves,
                total: entry.total,
                cached: true,
            });
        }

        let (cves, total) = self.fetch(keyword).await?;
        self.cache.store(keyword, cves.clone(), total);

        Ok(CveLookup {
            cves,
            total,
            cached: false,
        })
    }

    /// Runs the upstream pipeline without touching the cache.
    pub async fn fetch(&self, keyword: &str) -> Result<(Vec<CveRecord>, u64)> {
        let (search, bulk) = tokio::join!(
            self.primary.search(keyword),
            self.advisories.query_package(keyword, &self.ecosystem),
        );

        let search = search?;
        let bulk = self.collapse("package query", keyword, bulk);

        tracing::debug!(
            keyword,
            records = search.records.len(),
            bulk_advisories = bulk.len(),
            "fetched upstream results"
        );

        let cves = self.enrich(search.records, bulk).await;
        Ok((cves, search.total))
    }

    /// Attaches fix data to each record, keeping the input order. Records not
    /// covered by a non-empty bulk entry get one advisory lookup each, run
    /// concurrently.
    pub async fn enrich(
        &self,
        records: Vec<PrimaryRecord>,
        bulk: Vec<PackageAdvisory>,
    ) -> Vec<CveRecord> {
        let by_id: HashMap<String, Remediation> = bulk
            .into_iter()
            .map(|advisory| (advisory.id, advisory.remediation))
            .collect();

        let mut resolved: Vec<Option<Remediation>> = records
            .iter()
            .map(|record| by_id.get(&record.id).filter(|r| !r.is_empty()).cloned())
            .collect();

        let pending: Vec<usize> = resolved
            .iter()
            .enumerate()
            .filter(|(_, remediation)| remediation.is_none())
            .map(|(index, _)| index)
            .collect();

        let fetched = join_all(pending.iter().map(|&index| {
            let id = records[index].id.as_str();
            async move {
                tracing::debug!(id, "bulk query had no fix data, looking up advisory");
                self.collapse("advisory", id, self.advisories.advisory(id).await)
            }
        }))
        .await;

        for (index, remediation) in pending.into_iter().zip(fetched) {
            resolved[index] = Some(remediation);
        }

        records
            .into_iter()
            .zip(resolved)
            .map(|(record, remediation)| merge_record(record, remediation.unwrap_or_default()))
            .collect()
    }

    fn collapse<T: Default>(&self, what: &str, subject: &str, lookup: Lookup<T>) -> T {
        if let Lookup::Failed(ref e) = lookup {
            tracing::warn!(
                source = self.advisories.name(),
                subject,
                error = %e,
                "{} failed, continuing without fix data",
                what
            );
        }
        lookup.into_data()
    }
}

impl std::fmt::Debug for CveService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CveService")
            .field("primary", &self.primary.name())
            .field("advisories", &self.advisories.name())
            .field("ecosystem", &self.ecosystem)
            .field("cache", &self.cache)
            .finish()
    }
}

/// Builds the output record, enforcing description and list bounds.
pub fn merge_record(record: PrimaryRecord, remediation: Remediation) -> CveRecord {
    let (score, severity) = match record.score {
        Some(score) => (Some(score.base_score()), score.severity()),
        None => (None, Severity::Unknown),
    };

    let Remediation {
        mut fixed_versions,
        mut affected_packages,
    } = remediation;
    fixed_versions.truncate(MAX_FIXED_VERSIONS);
    affected_packages.truncate(MAX_AFFECTED_PACKAGES);

    let mut references = record.references;
    references.truncate(MAX_REFERENCES);

    CveRecord {
        description: truncate_description(&record.description),
        id: record.id,
        severity,
        score,
        published_date: record.published,
        last_modified_date: record.last_modified,
        references,
        fixed_versions,
        affected_packages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{CvssScore, PrimarySearch};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn primary_record(id: &str, published: &str) -> PrimaryRecord {
        PrimaryRecord {
            id: id.to_string(),
            description: format!("{} description", id),
            published: published.to_string(),
            last_modified: published.to_string(),
            score: Some(CvssScore::V3 {
                base_score: 7.5,
                severity: Severity::High,
            }),
            references: vec!["https://nvd.example/ref".to_string()],
        }
    }

    fn remediation(fixed: &[&str], packages: &[&str]) -> Remediation {
        Remediation {
            fixed_versions: fixed.iter().map(|s| s.to_string()).collect(),
            affected_packages: packages.iter().map(|s| s.to_string()).collect(),
        }
    }

    struct FakePrimary {
        result: Mutex<Option<Result<PrimarySearch>>>,
        records: Vec<PrimaryRecord>,
        calls: AtomicUsize,
    }

    impl FakePrimary {
        fn with_records(records: Vec<PrimaryRecord>) -> Self {
            Self {
                result: Mutex::new(None),
                records,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(error: ByocError) -> Self {
            Self {
                result: Mutex::new(Some(Err(error))),
                records: vec![],
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PrimarySource for FakePrimary {
        fn name(&self) -> &'static str {
            "fake-primary"
        }

        async fn search(&self, _keyword: &str) -> Result<PrimarySearch> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(result) = self.result.lock().unwrap().take() {
                return result;
            }
            Ok(PrimarySearch {
                records: self.records.clone(),
                total: 100,
            })
        }
    }

    #[derive(Default)]
    struct FakeAdvisories {
        bulk: Vec<PackageAdvisory>,
        by_id: HashMap<String, Remediation>,
        fail_ids: Vec<String>,
        advisory_calls: Mutex<Vec<String>>,
        package_calls: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl AdvisorySource for FakeAdvisories {
        fn name(&self) -> &'static str {
            "fake-advisories"
        }

        async fn advisory(&self, id: &str) -> Lookup<Remediation> {
            self.advisory_calls.lock().unwrap().push(id.to_string());
            // Later ids finish first, so completion order differs from input order.
            let delay = 30u64.saturating_sub(self.advisory_calls.lock().unwrap().len() as u64 * 10);
            tokio::time::sleep(Duration::from_millis(delay)).await;

            if self.fail_ids.iter().any(|f| f == id) {
                return Lookup::Failed(ByocError::UpstreamStatus {
                    source_name: "OSV".to_string(),
                    url: format!("http://osv.test/vulns/{}", id),
                    status: 500,
                });
            }
            match self.by_id.get(id) {
                Some(r) => Lookup::Found(r.clone()),
                None => Lookup::NotFound,
            }
        }

        async fn query_package(&self, name: &str, ecosystem: &str) -> Lookup<Vec<PackageAdvisory>> {
            self.package_calls
                .lock()
                .unwrap()
                .push((name.to_string(), ecosystem.to_string()));
            if self.bulk.is_empty() {
                Lookup::NotFound
            } else {
                Lookup::Found(self.bulk.clone())
            }
        }
    }

    fn service(primary: FakePrimary, advisories: FakeAdvisories) -> (CveService, Arc<FakePrimary>, Arc<FakeAdvisories>) {
        let primary = Arc::new(primary);
        let advisories = Arc::new(advisories);
        let service = CveService::new(
            primary.clone(),
            advisories.clone(),
            ResponseCache::in_memory(),
        );
        (service, primary, advisories)
    }

    #[tokio::test]
    async fn test_bulk_hit_skips_advisory_lookup() {
        let advisories = FakeAdvisories {
            bulk: vec![PackageAdvisory {
                id: "CVE-2021-23337".to_string(),
                remediation: remediation(&["4.17.21"], &["npm/lodash"]),
            }],
            ..Default::default()
        };
        let primary = FakePrimary::with_records(vec![primary_record("CVE-2021-23337", "2021-02-15")]);
        let (service, _, advisories) = service(primary, advisories);

        let result = service.lookup("lodash").await.unwrap();

        assert_eq!(result.cves[0].fixed_versions, vec!["4.17.21"]);
        assert_eq!(result.cves[0].affected_packages, vec!["npm/lodash"]);
        assert!(advisories.advisory_calls.lock().unwrap().is_empty());
        assert_eq!(
            advisories.package_calls.lock().unwrap().as_slice(),
            &[("lodash".to_string(), "npm".to_string())]
        );
    }

    #[tokio::test]
    async fn test_fallback_invoked_once_per_unmatched_record() {
        let mut by_id = HashMap::new();
        by_id.insert("CVE-2023-2".to_string(), remediation(&["2.0.1"], &["PyPI/flask"]));
        let advisories = FakeAdvisories {
            bulk: vec![
                PackageAdvisory {
                    id: "CVE-2023-1".to_string(),
                    remediation: remediation(&["1.0.1"], &[]),
                },
                // Empty bulk entries do not count as a match.
                PackageAdvisory {
                    id: "CVE-2023-2".to_string(),
                    remediation: Remediation::default(),
                },
            ],
            by_id,
            fail_ids: vec!["CVE-2023-3".to_string()],
            ..Default::default()
        };
        let primary = FakePrimary::with_records(vec![
            primary_record("CVE-2023-1", "2023-03-01"),
            primary_record("CVE-2023-2", "2023-02-01"),
            primary_record("CVE-2023-3", "2023-01-01"),
        ]);
        let (service, _, advisories) = service(primary, advisories);

        let result = service.lookup("flask").await.unwrap();

        let mut calls = advisories.advisory_calls.lock().unwrap().clone();
        calls.sort();
        assert_eq!(calls, vec!["CVE-2023-2", "CVE-2023-3"]);

        assert_eq!(result.cves[0].fixed_versions, vec!["1.0.1"]);
        assert_eq!(result.cves[1].fixed_versions, vec!["2.0.1"]);
        assert!(result.cves[2].fixed_versions.is_empty());
        assert!(result.cves[2].affected_packages.is_empty());
    }

    #[tokio::test]
    async fn test_keyword_not_a_package_degrades_to_fallback() {
        let primary = FakePrimary::with_records(vec![
            primary_record("CVE-2024-10", "2024-05-01"),
            primary_record("CVE-2024-11", "2024-04-01"),
        ]);
        let (service, _, advisories) = service(primary, FakeAdvisories::default());

        let result = service.lookup("apache http server").await.unwrap();

        assert_eq!(result.cves.len(), 2);
        assert_eq!(advisories.advisory_calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_output_order_follows_primary_order() {
        let ids = ["CVE-1", "CVE-2", "CVE-3", "CVE-4"];
        let primary = FakePrimary::with_records(
            ids.iter().map(|id| primary_record(id, "2024-01-01")).collect(),
        );
        let (service, _, _) = service(primary, FakeAdvisories::default());

        let result = service.lookup("ordering").await.unwrap();
        let out: Vec<&str> = result.cves.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(out, ids);
    }

    #[tokio::test]
    async fn test_second_lookup_is_cached() {
        let primary = FakePrimary::with_records(vec![primary_record("CVE-2022-5", "2022-05-05")]);
        let (service, primary, _) = service(primary, FakeAdvisories::default());

        let first = service.lookup("express").await.unwrap();
        let second = service.lookup("express").await.unwrap();

        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(first.cves, second.cves);
        assert_eq!(first.total, second.total);
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_refetches() {
        let primary = Arc::new(FakePrimary::with_records(vec![primary_record("CVE-2022-6", "2022-06-06")]));
        let service = CveService::new(
            primary.clone(),
            Arc::new(FakeAdvisories::default()),
            ResponseCache::in_memory().with_ttl(Duration::ZERO),
        );

        assert!(!service.lookup("django").await.unwrap().cached);
        assert!(!service.lookup("django").await.unwrap().cached);
        assert_eq!(primary.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_rate_limit_is_not_cached() {
        let primary = FakePrimary::failing(ByocError::RateLimited { status: 429 });
        let (service, _, _) = service(primary, FakeAdvisories::default());

        let err = service.lookup("openssl").await.unwrap_err();
        assert!(err.is_rate_limited());
        assert!(service.cache().is_empty());
    }

    #[tokio::test]
    async fn test_blank_keyword_rejected() {
        let (service, primary, _) = service(FakePrimary::with_records(vec![]), FakeAdvisories::default());
        assert!(matches!(
            service.lookup("   ").await,
            Err(ByocError::InvalidKeyword)
        ));
        assert_eq!(primary.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_merge_record_bounds() {
        let mut record = primary_record("CVE-2020-9", "2020-09-09");
        record.description = "x".repeat(500);
        record.references = (0..6).map(|i| format!("https://ref/{}", i)).collect();
        record.score = None;

        let many: Vec<String> = (0..9).map(|i| format!("{}.0", i)).collect();
        let merged = merge_record(
            record,
            Remediation {
                fixed_versions: many.clone(),
                affected_packages: many,
            },
        );

        assert_eq!(merged.description.len(), 303);
        assert!(merged.description.ends_with("..."));
        assert_eq!(merged.references.len(), MAX_REFERENCES);
        assert_eq!(merged.fixed_versions.len(), MAX_FIXED_VERSIONS);
        assert_eq!(merged.affected_packages.len(), MAX_AFFECTED_PACKAGES);
        assert_eq!(merged.severity, Severity::Unknown);
        assert_eq!(merged.score, None);
    }

    #[test]
    fn test_merge_record_uses_score() {
        let merged = merge_record(primary_record("CVE-2020-10", "2020-10-10"), Remediation::default());
        assert_eq!(merged.score, Some(7.5));
        assert_eq!(merged.severity, Severity::High);
        assert_eq!(merged.description, "CVE-2020-10 description");
    }

    #[test]
    fn test_with_ecosystem_resolves_osv_name() {
        let (service, _, _) = service(FakePrimary::with_records(vec![]), FakeAdvisories::default());
        assert_eq!(service.ecosystem(), "npm");
        assert_eq!(service.with_ecosystem("pypi").ecosystem(), "PyPI");
    }
}
