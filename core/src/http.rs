use crate::config::HttpConfig;
use crate::error::{ByocError, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "byoc.sh/1.0";
const MAX_BACKOFF_SECS: u64 = 30;

/// Thin JSON client shared by the upstream adapters.
///
/// Every request carries the same user agent. Non-success statuses surface as
/// [`ByocError::UpstreamStatus`] so callers can tell rate limiting apart from
/// other failures.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    source_name: String,
    retries: u32,
}

impl HttpClient {
    pub fn new(source_name: &str) -> Result<Self> {
        Self::from_config(source_name, &HttpConfig::default())
    }

    /// A `timeout_seconds` of zero leaves requests unbounded.
    pub fn from_config(source_name: &str, config: &HttpConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if config.timeout_seconds > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_seconds));
        }

        let client = builder
            .build()
            .map_err(|e| ByocError::Http {
                url: String::new(),
                source: e,
            })?;

        Ok(Self {
            client,
            source_name: source_name.to_string(),
            retries: config.retries,
        })
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    async fn execute<T, F>(&self, url: &str, build: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            match build().send().await {
                Ok(response) if response.status().is_success() => {
                    let body = response.bytes().await.map_err(|e| ByocError::Http {
                        url: url.to_string(),
                        source: e,
                    })?;
                    return serde_json::from_slice(&body).map_err(|e| ByocError::Decode {
                        url: url.to_string(),
                        source: e,
                    });
                }
                Ok(response) => {
                    let status = response.status();
                    if status.is_server_error() && attempt < self.retries {
                        tracing::debug!(url, status = status.as_u16(), attempt, "retrying request");
                    } else {
                        return Err(ByocError::UpstreamStatus {
                            source_name: self.source_name.clone(),
                            url: url.to_string(),
                            status: status.as_u16(),
                        });
                    }
                }
                Err(e) if attempt < self.retries => {
                    tracing::debug!(url, error = %e, attempt, "retrying request");
                }
                Err(e) => {
                    return Err(ByocError::Http {
                        url: url.to_string(),
                        source: e,
                    });
                }
            }

            tokio::time::sleep(backoff_delay(attempt)).await;
            attempt += 1;
        }
    }

    pub async fn get_json<T>(&self, url: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.execute(url, || self.client.get(url)).await
    }

    pub async fn get_json_with_query<T>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        headers: &[(&'static str, String)],
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            let value = HeaderValue::from_str(value).map_err(|_| ByocError::Config {
                message: format!("invalid value for the '{}' header", name),
            })?;
            header_map.insert(HeaderName::from_static(name), value);
        }

        let url = build_url(url, query)?;
        self.execute(url.as_str(), || {
            self.client.get(url.clone()).headers(header_map.clone())
        })
        .await
    }

    pub async fn post_json<T, B>(&self, url: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        self.execute(url, || self.client.post(url).json(body)).await
    }
}

/// Appends query pairs to a URL. A pair with an empty value is written as a
/// bare flag (`?noRejected`), which is what NVD expects.
pub fn build_url(base: &str, query: &[(&str, &str)]) -> Result<Url> {
    let mut url = Url::parse(base).map_err(|e| ByocError::Config {
        message: format!("invalid URL '{}': {}", base, e),
    })?;

    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query {
            if value.is_empty() {
                pairs.append_key_only(key);
            } else {
                pairs.append_pair(key, value);
            }
        }
    }

    Ok(url)
}

/// Exponential backoff between retries, capped so large retry counts stay bounded.
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(2u64.saturating_pow(attempt).min(MAX_BACKOFF_SECS))
}
