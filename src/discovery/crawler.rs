//! Best-first crawling
//!
//! The frontier is a max-heap keyed by navigation score, so the crawl spends
//! its page budget on the most promising sections first. Equal-priority
//! links are processed in insertion order.

use crate::discovery::page_store::PageStore;
use crate::discovery::scorer::{navigation_score, score_candidate};
use crate::discovery::session::{CandidateDocument, CrawlBudget, CrawlSession};
use crate::profile::DocumentProfile;
use crate::url::normalize_url;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use tokio_util::sync::CancellationToken;
use url::Url;

/// A link queued for crawling with priority information
#[derive(Debug, Clone)]
pub struct QueuedLink {
    /// The link to fetch
    pub url: Url,

    /// Navigation relevance; higher is fetched first
    pub priority: i32,

    /// Link depth from the crawl's entry page
    pub depth: u32,

    /// Insertion sequence, for FIFO ordering among equal priorities
    seq: u64,
}

impl Ord for QueuedLink {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: higher priority first, then earlier insertion
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueuedLink {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueuedLink {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for QueuedLink {}

/// Best-first crawler over one session's page store
pub struct PriorityCrawler {
    budget: CrawlBudget,
    cancel: CancellationToken,
}

impl PriorityCrawler {
    pub fn new(budget: CrawlBudget, cancel: CancellationToken) -> Self {
        PriorityCrawler { budget, cancel }
    }

    /// Crawls from the given entry pages until the budget runs out, the
    /// frontier empties, a strong candidate appears, or cancellation.
    ///
    /// Document links on every processed page are scored and recorded on the
    /// session. Navigation links with positive relevance are enqueued while
    /// depth allows.
    pub async fn run(
        &self,
        store: &mut PageStore,
        session: &mut CrawlSession,
        profile: &DocumentProfile,
        entry_pages: &[Url],
    ) {
        let mut frontier: BinaryHeap<QueuedLink> = BinaryHeap::new();
        let mut seq = 0u64;

        for url in entry_pages {
            frontier.push(QueuedLink {
                url: url.clone(),
                priority: navigation_score(profile, "", url),
                depth: 0,
                seq,
            });
            seq += 1;
        }

        while let Some(link) = frontier.pop() {
            if self.cancel.is_cancelled() {
                tracing::info!("crawl cancelled");
                break;
            }

            if store.network_fetches() >= self.budget.max_pages {
                tracing::debug!(
                    fetched = store.network_fetches(),
                    "page budget exhausted, stopping crawl"
                );
                break;
            }

            let key = normalize_url(link.url.as_str())
                .map(|u| u.to_string())
                .unwrap_or_else(|_| link.url.to_string());

            if !session.mark_visited(&key) {
                continue;
            }

            let page = match store.fetch_page(&link.url).await {
                Ok(page) => page,
                Err(e) => {
                    session.record_error("crawl", &e);
                    continue;
                }
            };

            for doc in page.document_links() {
                let score = score_candidate(profile, doc);
                session.add_candidate(CandidateDocument {
                    url: doc.url.to_string(),
                    link_text: doc.text.clone(),
                    surrounding_context: doc.context.clone(),
                    score,
                    found_on_page_url: page.url.to_string(),
                });
            }

            if session.has_strong_candidate(self.budget.strong_score_threshold) {
                tracing::info!(page = %page.url, "strong candidate found, stopping crawl");
                break;
            }

            if link.depth < self.budget.max_depth {
                for nav in page.navigation_links() {
                    let nav_key = normalize_url(nav.url.as_str())
                        .map(|u| u.to_string())
                        .unwrap_or_else(|_| nav.url.to_string());

                    if session.is_visited(&nav_key) {
                        continue;
                    }

                    let priority = navigation_score(profile, &nav.text, &nav.url);
                    if priority > 0 {
                        frontier.push(QueuedLink {
                            url: nav.url.clone(),
                            priority,
                            depth: link.depth + 1,
                            seq,
                        });
                        seq += 1;
                    }
                }
            }
        }
    }
}
