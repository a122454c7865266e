//! Seed URL generation
//!
//! Municipal sites are templated enough that a handful of conventional
//! section paths ("/kurashi/todokede/", "/tetsuzuki/") hit a real page far
//! more often than not. The profile carries those paths; this module joins
//! them onto a domain root.

use crate::url::normalize_url;
use crate::profile::DocumentProfile;
use std::collections::HashSet;
use url::Url;

/// Joins the profile's seed paths onto the domain root
///
/// Paths that fail to resolve are skipped. The result preserves the
/// profile's path order and drops duplicates after normalization.
pub fn generate_seeds(root: &Url, profile: &DocumentProfile) -> Vec<Url> {
    let mut seen = HashSet::new();
    let mut seeds = Vec::new();

    for path in &profile.seed_paths {
        let joined = match root.join(path) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!(path, error = %e, "skipping unjoinable seed path");
                continue;
            }
        };

        let key = normalize_url(joined.as_str())
            .map(|u| u.to_string())
            .unwrap_or_else(|_| joined.to_string());

        if seen.insert(key) {
            seeds.push(joined);
        }
    }

    seeds
}
