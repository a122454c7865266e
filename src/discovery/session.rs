//! Crawl sessions and candidate accumulation
//!
//! A session is scoped to one (domain root, profile) discovery run. Its
//! visited set and candidate list are never shared across sessions, so a
//! stale cache from one municipality can never leak into another.

use crate::config::CrawlerConfig;
use serde::Serialize;
use std::collections::HashSet;
use url::Url;

/// One candidate document surfaced by discovery
#[derive(Debug, Clone, Serialize)]
pub struct CandidateDocument {
    /// Absolute URL of the document
    pub url: String,

    /// Text of the anchor that linked to it
    #[serde(rename = "linkText")]
    pub link_text: String,

    /// Text surrounding the anchor on the linking page
    #[serde(rename = "surroundingContext")]
    pub surrounding_context: String,

    /// Relevance score, clamped to [0, 100]
    pub score: u8,

    /// Page the document link was found on
    #[serde(rename = "foundOnPageURL")]
    pub found_on_page_url: String,
}

/// Resource limits for one discovery session
#[derive(Debug, Clone, Copy)]
pub struct CrawlBudget {
    /// Maximum pages fetched over the whole session
    pub max_pages: u32,

    /// Maximum link depth from a phase's entry page
    pub max_depth: u32,

    /// Candidate score at which the cascade stops early
    pub strong_score_threshold: u8,
}

impl CrawlBudget {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        CrawlBudget {
            max_pages: config.max_pages,
            max_depth: config.max_depth,
            strong_score_threshold: config.strong_score_threshold,
        }
    }

    /// Budget for the bounded crawl under one responsive seed page.
    ///
    /// Several seeds share the session budget, so each sub-crawl gets a
    /// quarter of the page allowance (with a floor) at the full depth.
    pub fn seed_subcrawl(&self) -> CrawlBudget {
        CrawlBudget {
            max_pages: (self.max_pages / 4).max(8),
            ..*self
        }
    }
}

/// The discovery phases, in cascade order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryPhase {
    Sitemap,
    Seeds,
    Search,
    Crawl,
}

impl std::fmt::Display for DiscoveryPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DiscoveryPhase::Sitemap => "sitemap",
            DiscoveryPhase::Seeds => "seeds",
            DiscoveryPhase::Search => "search",
            DiscoveryPhase::Crawl => "crawl",
        };
        f.write_str(name)
    }
}

/// State accumulated over one discovery session
#[derive(Debug)]
pub struct CrawlSession {
    /// Domain root the session started from
    pub root: Url,

    /// Normalized URLs of pages already processed this session
    visited: HashSet<String>,

    /// Candidates in first-seen order
    candidates: Vec<CandidateDocument>,

    /// Document URLs already recorded, for first-seen deduplication
    candidate_urls: HashSet<String>,

    /// Non-fatal errors encountered during the session
    pub errors: Vec<String>,
}

impl CrawlSession {
    pub fn new(root: Url) -> Self {
        CrawlSession {
            root,
            visited: HashSet::new(),
            candidates: Vec::new(),
            candidate_urls: HashSet::new(),
            errors: Vec::new(),
        }
    }

    /// Marks a page visited; returns false if it already was
    pub fn mark_visited(&mut self, normalized_url: &str) -> bool {
        self.visited.insert(normalized_url.to_string())
    }

    pub fn is_visited(&self, normalized_url: &str) -> bool {
        self.visited.contains(normalized_url)
    }

    /// Records a candidate unless its URL was already seen.
    ///
    /// The first sighting wins: its score, link text, and source page are
    /// kept even if a later page links to the same document with different
    /// text.
    pub fn add_candidate(&mut self, candidate: CandidateDocument) -> bool {
        if !self.candidate_urls.insert(candidate.url.clone()) {
            return false;
        }
        tracing::debug!(
            url = %candidate.url,
            score = candidate.score,
            "recorded candidate"
        );
        self.candidates.push(candidate);
        true
    }

    /// Records a non-fatal error
    pub fn record_error(&mut self, context: &str, message: impl std::fmt::Display) {
        self.errors.push(format!("{}: {}", context, message));
    }

    /// Returns true when any candidate meets the early-stop threshold
    pub fn has_strong_candidate(&self, threshold: u8) -> bool {
        self.candidates.iter().any(|c| c.score >= threshold)
    }

    pub fn candidates(&self) -> &[CandidateDocument] {
        &self.candidates
    }

    /// Candidates sorted by score descending; ties keep first-seen order
    pub fn ranked_candidates(&self) -> Vec<CandidateDocument> {
        let mut ranked = self.candidates.clone();
        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        ranked
    }
}
