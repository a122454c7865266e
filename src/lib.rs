//! Form-Scout: a cascading document discovery engine
//!
//! This crate locates downloadable application forms (PDFs) on municipal
//! websites. Given a domain root and a document profile it runs a cascade of
//! discovery phases (sitemap, seed pages, site search, best-first crawl) and
//! produces a relevance-ranked list of candidate documents, then downloads
//! and validates the strongest ones.

pub mod config;
pub mod discovery;
pub mod download;
pub mod profile;
pub mod report;
pub mod url;

use thiserror::Error;

/// Main error type for Form-Scout operations
#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("HTTP status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Parse error for {url}: {message}")]
    Parse { url: String, message: String },

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Downloaded file failed validation: {path}: {reason}")]
    InvalidDocument { path: String, reason: String },

    #[error("Report serialization error: {0}")]
    Report(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Form-Scout operations
pub type Result<T> = std::result::Result<T, ScoutError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

impl ScoutError {
    /// Classifies a reqwest failure into the transport/status split used by
    /// the discovery phases.
    pub fn from_request(url: &str, err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            ScoutError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            ScoutError::Transport {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }
}

// Re-export commonly used types
pub use config::Config;
pub use discovery::{CandidateDocument, CrawlBudget, CrawlSession, DiscoveryOutcome};
pub use profile::DocumentProfile;
pub use url::{extract_host, normalize_url};
