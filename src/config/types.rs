use serde::Deserialize;

/// Main configuration structure for Form-Scout
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub search: Option<SearchConfig>,
    #[serde(default)]
    pub municipality: Vec<MunicipalityEntry>,
    #[serde(default)]
    pub profile: Vec<ProfileEntry>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum pages fetched per discovery session
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u32,

    /// Maximum link depth from the session's entry page
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: u32,

    /// Candidate score at which a discovery phase short-circuits the cascade
    #[serde(rename = "strong-score-threshold", default = "default_strong_score")]
    pub strong_score_threshold: u8,

    /// Fixed delay between consecutive requests to a site (milliseconds)
    #[serde(rename = "politeness-delay-ms", default = "default_politeness_delay")]
    pub politeness_delay_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_timeout")]
    pub request_timeout_secs: u64,

    /// Number of municipalities processed concurrently
    #[serde(rename = "concurrent-sessions", default = "default_concurrent_sessions")]
    pub concurrent_sessions: u32,
}

fn default_max_pages() -> u32 {
    50
}

fn default_max_depth() -> u32 {
    4
}

fn default_strong_score() -> u8 {
    60
}

fn default_politeness_delay() -> u64 {
    1000
}

fn default_timeout() -> u64 {
    30
}

fn default_concurrent_sessions() -> u32 {
    1
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Builds the User-Agent header value sent with every request
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory downloaded documents are written to
    #[serde(rename = "downloads-dir")]
    pub downloads_dir: String,

    /// Directory per-run JSON reports are written to
    #[serde(rename = "reports-dir")]
    pub reports_dir: String,
}

/// Site search probe configuration
///
/// When absent, the search phase reports itself unavailable and the cascade
/// moves on.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Search endpoint template; `{query}` is replaced with the encoded query
    pub endpoint: String,

    /// Maximum result links taken from one result page
    #[serde(rename = "result-limit", default = "default_result_limit")]
    pub result_limit: u32,
}

fn default_result_limit() -> u32 {
    10
}

/// One municipality to scout
#[derive(Debug, Clone, Deserialize)]
pub struct MunicipalityEntry {
    /// Stable key used in filenames and reports (e.g. "koto-ku")
    pub key: String,

    /// Japanese display name
    #[serde(rename = "name-ja")]
    pub name_ja: String,

    /// Romanized display name
    #[serde(rename = "name-en")]
    pub name_en: String,

    /// Domain root the discovery session starts from
    pub domain: String,
}

/// One document profile (a kind of form to look for)
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileEntry {
    /// Stable key used in filenames and reports (e.g. "resident-move")
    pub key: String,

    /// Human-readable label for logs and reports
    pub label: String,

    /// Identifier handed to an external schema-aware validator, if any
    #[serde(rename = "form-schema-id", default)]
    pub form_schema_id: Option<String>,

    /// Terms whose presence in link text or context scores a candidate up
    #[serde(rename = "positive-terms")]
    pub positive_terms: Vec<String>,

    /// Terms whose presence scores a candidate down
    #[serde(rename = "negative-terms", default)]
    pub negative_terms: Vec<String>,

    /// URL path fragments that mark form-hosting sections
    #[serde(rename = "path-segments", default)]
    pub path_segments: Vec<String>,

    /// URL path fragments that mark sections to steer away from
    #[serde(rename = "negative-path-segments", default)]
    pub negative_path_segments: Vec<String>,

    /// Anchor-text keywords that make a navigation link worth following
    #[serde(rename = "nav-keywords", default)]
    pub nav_keywords: Vec<String>,

    /// Site-relative paths tried as entry points before crawling
    #[serde(rename = "seed-paths", default)]
    pub seed_paths: Vec<String>,

    /// Query submitted to the site search probe
    #[serde(rename = "search-query", default)]
    pub search_query: Option<String>,
}
