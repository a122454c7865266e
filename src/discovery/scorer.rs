//! Relevance scoring
//!
//! Scoring is additive over independent signal families, so a candidate that
//! only matches a generic download keyword cannot outrank one that matches
//! the profile's own terms. Candidate scores are clamped to [0, 100];
//! navigation scores are unclamped and only order the crawl frontier.

use crate::discovery::Anchor;
use crate::profile::{DocumentProfile, DOWNLOAD_CONTEXT_KEYWORDS};
use url::Url;

/// Weight of one positive profile term found in the link text or context
const POSITIVE_TERM_WEIGHT: i32 = 30;

/// Weight of one profile path segment found in the document URL path
const PATH_SEGMENT_WEIGHT: i32 = 5;

/// Weight of one generic download keyword found in the link text or context
const DOWNLOAD_KEYWORD_WEIGHT: i32 = 10;

/// Penalty for one negative profile term
const NEGATIVE_TERM_PENALTY: i32 = -20;

/// Penalty for one negative path segment in the document URL path
const NEGATIVE_PATH_PENALTY: i32 = -10;

/// Penalty for one sibling profile's term
const CROSS_PROFILE_PENALTY: i32 = -20;

/// Weight of one navigation keyword in a link's text
const NAV_KEYWORD_WEIGHT: i32 = 10;

/// Scores a document link against a profile, clamped to [0, 100]
pub fn score_candidate(profile: &DocumentProfile, anchor: &Anchor) -> u8 {
    let haystack = text_haystack(&anchor.text, &anchor.context);
    let path = anchor.url.path().to_lowercase();

    let mut score = 0i32;

    score += POSITIVE_TERM_WEIGHT * count_matches(&haystack, &profile.positive_terms);
    score += PATH_SEGMENT_WEIGHT * count_path_matches(&path, &profile.path_segments);
    score += DOWNLOAD_KEYWORD_WEIGHT * count_keyword_matches(&haystack, DOWNLOAD_CONTEXT_KEYWORDS);
    score += NEGATIVE_TERM_PENALTY * count_matches(&haystack, &profile.negative_terms);
    score += NEGATIVE_PATH_PENALTY * count_path_matches(&path, &profile.negative_path_segments);
    score += CROSS_PROFILE_PENALTY * count_matches(&haystack, &profile.cross_negative_terms);

    score.clamp(0, 100) as u8
}

/// Scores a navigation link for frontier ordering; unclamped
pub fn navigation_score(profile: &DocumentProfile, text: &str, url: &Url) -> i32 {
    let haystack = text_haystack(text, "");
    let path = url.path().to_lowercase();

    let mut score = 0i32;

    score += NAV_KEYWORD_WEIGHT * count_matches(&haystack, &profile.nav_keywords);
    score += PATH_SEGMENT_WEIGHT * count_path_matches(&path, &profile.path_segments);
    score += NEGATIVE_TERM_PENALTY * count_matches(&haystack, &profile.negative_terms);
    score += NEGATIVE_PATH_PENALTY * count_path_matches(&path, &profile.negative_path_segments);

    score
}

/// True when the link text or context contains any positive profile term.
///
/// Used downstream to keep generic "download page" hits out of the final
/// selection regardless of their score.
pub fn matches_positive_term(profile: &DocumentProfile, text: &str, context: &str) -> bool {
    let haystack = text_haystack(text, context);
    profile
        .positive_terms
        .iter()
        .any(|term| haystack.contains(&term.to_lowercase()))
}

fn text_haystack(text: &str, context: &str) -> String {
    format!("{} {}", text, context).to_lowercase()
}

fn count_matches(haystack: &str, terms: &[String]) -> i32 {
    terms
        .iter()
        .filter(|term| haystack.contains(&term.to_lowercase()))
        .count() as i32
}

fn count_keyword_matches(haystack: &str, keywords: &[&str]) -> i32 {
    keywords
        .iter()
        .filter(|kw| haystack.contains(&kw.to_lowercase()))
        .count() as i32
}

fn count_path_matches(path: &str, segments: &[String]) -> i32 {
    segments
        .iter()
        .filter(|segment| path.contains(&segment.to_lowercase()))
        .count() as i32
}
