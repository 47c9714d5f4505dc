//! byoc core library
//!
//! Keyword CVE lookups against NVD, enriched with fix data from OSV and
//! cached per keyword.

pub mod api;
pub mod cache;
pub mod config;
pub mod enrich;
pub mod error;
pub mod http;
pub mod logging;
pub mod nvd;
pub mod osv;
pub mod source;
pub mod types;

pub use types::*;
pub use error::{ByocError, Result};
pub use source::{AdvisorySource, CvssScore, Lookup, PrimaryRecord, PrimarySearch, PrimarySource};
pub use http::HttpClient;
pub use cache::{CacheEntry, CacheStore, MemoryCacheStore, ResponseCache};
pub use self::config::{CacheConfig, Config, HttpConfig, LoggingConfig, NvdConfig, OsvConfig, ServerConfig};
pub use enrich::{CveLookup, CveService};
pub use nvd::NvdClient;
pub use osv::OsvClient;
pub use logging::init_tracing;
