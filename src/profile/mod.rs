//! Document profiles
//!
//! A profile describes one kind of form to look for: the terms that identify
//! it, the URL sections that tend to host it, and the entry points worth
//! trying before a full crawl. Profiles come from configuration; this module
//! turns the raw entries into the runtime form the discovery stages consume.

use crate::config::ProfileEntry;

/// Anchor-text keywords that mark a page region as a download area,
/// independent of which form is being sought.
pub const DOWNLOAD_CONTEXT_KEYWORDS: &[&str] = &[
    "ダウンロード",
    "申請書",
    "様式",
    "届出書",
    "届け出",
    "PDF",
    "書式",
    "用紙",
];

/// Runtime form of a configured document profile
///
/// `cross_negative_terms` holds the positive terms of every sibling profile
/// that this profile does not itself claim. A candidate matching those is
/// probably the sibling's form, so it is scored down.
#[derive(Debug, Clone)]
pub struct DocumentProfile {
    pub key: String,
    pub label: String,
    pub form_schema_id: Option<String>,
    pub positive_terms: Vec<String>,
    pub negative_terms: Vec<String>,
    pub cross_negative_terms: Vec<String>,
    pub path_segments: Vec<String>,
    pub negative_path_segments: Vec<String>,
    pub nav_keywords: Vec<String>,
    pub seed_paths: Vec<String>,
    pub search_query: Option<String>,
}

impl DocumentProfile {
    /// Builds a runtime profile from its config entry and the full set of
    /// configured profiles (for cross-profile negatives).
    pub fn from_config(entry: &ProfileEntry, all: &[ProfileEntry]) -> Self {
        let cross_negative_terms = all
            .iter()
            .filter(|other| other.key != entry.key)
            .flat_map(|other| other.positive_terms.iter())
            .filter(|term| {
                !entry.positive_terms.contains(term) && !entry.negative_terms.contains(term)
            })
            .cloned()
            .collect::<Vec<_>>();

        DocumentProfile {
            key: entry.key.clone(),
            label: entry.label.clone(),
            form_schema_id: entry.form_schema_id.clone(),
            positive_terms: entry.positive_terms.clone(),
            negative_terms: entry.negative_terms.clone(),
            cross_negative_terms: dedup(cross_negative_terms),
            path_segments: entry.path_segments.clone(),
            negative_path_segments: entry.negative_path_segments.clone(),
            nav_keywords: entry.nav_keywords.clone(),
            seed_paths: entry.seed_paths.clone(),
            search_query: entry.search_query.clone(),
        }
    }

    /// Builds every configured profile at once
    pub fn build_all(entries: &[ProfileEntry]) -> Vec<DocumentProfile> {
        entries
            .iter()
            .map(|entry| DocumentProfile::from_config(entry, entries))
            .collect()
    }
}

fn dedup(mut terms: Vec<String>) -> Vec<String> {
    terms.sort();
    terms.dedup();
    terms
}
