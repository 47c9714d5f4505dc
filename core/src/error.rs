use thiserror::Error;

#[derive(Debug, Error)]
pub enum ByocError {
    #[error("Rate limited by vulnerability database (HTTP {status})")]
    RateLimited { status: u16 },

    #[error("{source_name} returned HTTP {status} for {url}")]
    UpstreamStatus {
        source_name: String,
        url: String,
        status: u16,
    },

    #[error("HTTP error for '{url}': {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid JSON returned by '{url}': {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Keyword must not be empty")]
    InvalidKeyword,

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl ByocError {
    /// 403 and 429 from the primary source are a soft failure.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ByocError::RateLimited { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ByocError::RateLimited { status } | ByocError::UpstreamStatus { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

impl From<config::ConfigError> for ByocError {
    fn from(e: config::ConfigError) -> Self {
        ByocError::Config {
            message: e.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ByocError>;
