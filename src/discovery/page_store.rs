//! Session-scoped page fetching and caching
//!
//! The store owns the HTTP client, the politeness delay, and a cache of
//! parsed pages keyed by normalized URL. Failures are cached too: a URL that
//! 404ed in the sitemap phase will not be re-requested by the crawl phase.
//! One store serves exactly one discovery session and is dropped with it.

use crate::config::UserAgentConfig;
use crate::discovery::extractor::{parse_page, ParsedPage};
use crate::url::normalize_url;
use crate::{Result, ScoutError};
use encoding_rs::{Encoding, UTF_8};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
enum CacheEntry {
    Page(Arc<ParsedPage>),
    Failure(FetchFailure),
}

/// Cached form of a fetch error, keeping its class for replay
#[derive(Debug, Clone)]
enum FetchFailure {
    Transport(String),
    HttpStatus(u16),
    Parse(String),
}

impl FetchFailure {
    fn from_error(err: &ScoutError) -> Self {
        match err {
            ScoutError::HttpStatus { status, .. } => FetchFailure::HttpStatus(*status),
            ScoutError::Parse { message, .. } => FetchFailure::Parse(message.clone()),
            other => FetchFailure::Transport(other.to_string()),
        }
    }

    fn replay(&self, url: &url::Url) -> ScoutError {
        match self {
            FetchFailure::Transport(message) => ScoutError::Transport {
                url: url.to_string(),
                message: message.clone(),
            },
            FetchFailure::HttpStatus(status) => ScoutError::HttpStatus {
                url: url.to_string(),
                status: *status,
            },
            FetchFailure::Parse(message) => ScoutError::Parse {
                url: url.to_string(),
                message: message.clone(),
            },
        }
    }
}

/// Builds the HTTP client used by one discovery session
///
/// The User-Agent identifies the crawler and its operator:
/// `CrawlerName/Version (+ContactURL; ContactEmail)`.
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout_secs: u64,
) -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches, decodes, parses, and caches pages for one session
pub struct PageStore {
    client: Client,
    politeness_delay: Duration,
    last_request: Option<Instant>,
    cache: HashMap<String, CacheEntry>,
    network_fetches: u32,
}

impl PageStore {
    pub fn new(client: Client, politeness_delay_ms: u64) -> Self {
        PageStore {
            client,
            politeness_delay: Duration::from_millis(politeness_delay_ms),
            last_request: None,
            cache: HashMap::new(),
            network_fetches: 0,
        }
    }

    /// Number of network requests made so far this session
    ///
    /// Cache hits do not count; this is what the page budget is checked
    /// against.
    pub fn network_fetches(&self) -> u32 {
        self.network_fetches
    }

    /// Fetches and parses a page, consulting the session cache first
    ///
    /// A previous failure for the same URL is replayed without a request.
    pub async fn fetch_page(&mut self, url: &url::Url) -> Result<Arc<ParsedPage>> {
        let key = normalize_url(url.as_str())
            .map(|u| u.to_string())
            .unwrap_or_else(|_| url.to_string());

        if let Some(entry) = self.cache.get(&key) {
            return match entry {
                CacheEntry::Page(page) => Ok(Arc::clone(page)),
                CacheEntry::Failure(failure) => Err(failure.replay(url)),
            };
        }

        let outcome = self.fetch_html(url).await;

        match outcome {
            Ok(body) => {
                let page = Arc::new(parse_page(&body, url));
                self.cache.insert(key, CacheEntry::Page(Arc::clone(&page)));
                Ok(page)
            }
            Err(err) => {
                self.cache
                    .insert(key, CacheEntry::Failure(FetchFailure::from_error(&err)));
                Err(err)
            }
        }
    }

    /// Fetches a URL and returns its decoded body without parsing or caching
    ///
    /// Used for sitemap XML and robots.txt, which are requested at most once
    /// per session.
    pub async fn fetch_text(&mut self, url: &url::Url) -> Result<String> {
        self.throttle().await;
        self.network_fetches += 1;

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| ScoutError::from_request(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScoutError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = header_value(&response, "content-type");
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ScoutError::from_request(url.as_str(), e))?;

        Ok(decode_body(&bytes, content_type.as_deref()))
    }

    async fn fetch_html(&mut self, url: &url::Url) -> Result<String> {
        self.throttle().await;
        self.network_fetches += 1;
        tracing::debug!(url = %url, "fetching page");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| ScoutError::from_request(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScoutError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = header_value(&response, "content-type");
        if let Some(ct) = &content_type {
            if !ct.contains("text/html") && !ct.contains("application/xhtml") {
                return Err(ScoutError::Parse {
                    url: url.to_string(),
                    message: format!("expected HTML, got {}", ct),
                });
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ScoutError::from_request(url.as_str(), e))?;

        Ok(decode_body(&bytes, content_type.as_deref()))
    }

    /// Enforces the fixed inter-request delay
    async fn throttle(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.politeness_delay {
                tokio::time::sleep(self.politeness_delay - elapsed).await;
            }
        }
        self.last_request = Some(Instant::now());
    }
}

fn header_value(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_lowercase())
}

/// Decodes a response body, honoring declared or sniffed charsets
///
/// Order of preference: charset from the Content-Type header, then a
/// `charset=` declaration in the first kilobyte of the body (meta tags),
/// then UTF-8. Older municipal CMSes still serve Shift_JIS and EUC-JP.
fn decode_body(bytes: &[u8], content_type: Option<&str>) -> String {
    let encoding = content_type
        .and_then(charset_from_header)
        .or_else(|| sniff_meta_charset(bytes))
        .unwrap_or(UTF_8);

    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

fn charset_from_header(content_type: &str) -> Option<&'static Encoding> {
    let charset = content_type.split("charset=").nth(1)?;
    let label = charset.split(';').next()?.trim().trim_matches('"');
    Encoding::for_label(label.as_bytes())
}

fn sniff_meta_charset(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = &bytes[..bytes.len().min(1024)];
    let head = String::from_utf8_lossy(head).to_lowercase();

    let idx = head.find("charset=")?;
    let rest = &head[idx + "charset=".len()..];
    let label: String = rest
        .trim_start_matches(['"', '\''])
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();

    Encoding::for_label(label.as_bytes())
}
