//! Discovery orchestration
//!
//! Runs the phase cascade for one (domain root, profile) pair and owns the
//! cross-phase rules: the shared page budget, the strong-candidate
//! short-circuit, and the session that accumulates candidates and errors.

use crate::discovery::crawler::PriorityCrawler;
use crate::discovery::page_store::PageStore;
use crate::discovery::scorer::{navigation_score, score_candidate};
use crate::discovery::search::SearchProbe;
use crate::discovery::seeds::generate_seeds;
use crate::discovery::session::{
    CandidateDocument, CrawlBudget, CrawlSession, DiscoveryPhase,
};
use crate::discovery::sitemap::read_sitemap;
use crate::discovery::ParsedPage;
use crate::profile::DocumentProfile;
use crate::url::normalize_url;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Navigation links followed from one search result page
const SEARCH_NAV_FOLLOWS: usize = 3;

/// Result of one discovery session
#[derive(Debug)]
pub struct DiscoveryOutcome {
    /// Candidates ranked by score descending; ties keep first-seen order
    pub candidates: Vec<CandidateDocument>,

    /// Phases that actually ran, in order
    pub phases_run: Vec<DiscoveryPhase>,

    /// Network requests spent
    pub pages_fetched: u32,

    /// Non-fatal errors encountered along the way
    pub errors: Vec<String>,
}

/// Runs the discovery cascade
pub struct DiscoveryOrchestrator {
    budget: CrawlBudget,
    search: Option<Box<dyn SearchProbe>>,
    cancel: CancellationToken,
}

impl DiscoveryOrchestrator {
    pub fn new(
        budget: CrawlBudget,
        search: Option<Box<dyn SearchProbe>>,
        cancel: CancellationToken,
    ) -> Self {
        DiscoveryOrchestrator {
            budget,
            search,
            cancel,
        }
    }

    /// Discovers candidate documents for one profile on one site
    ///
    /// Never returns an error: every failure inside a phase is recorded on
    /// the outcome and the cascade moves on or stops early.
    pub async fn discover(
        &self,
        store: &mut PageStore,
        root: &Url,
        profile: &DocumentProfile,
    ) -> DiscoveryOutcome {
        let mut session = CrawlSession::new(root.clone());
        let mut phases_run = Vec::new();

        tracing::info!(root = %root, profile = %profile.key, "starting discovery session");

        for phase in [
            DiscoveryPhase::Sitemap,
            DiscoveryPhase::Seeds,
            DiscoveryPhase::Search,
            DiscoveryPhase::Crawl,
        ] {
            if self.cancel.is_cancelled() || self.budget_spent(store) {
                break;
            }

            phases_run.push(phase);
            match phase {
                DiscoveryPhase::Sitemap => self.run_sitemap(store, &mut session, profile).await,
                DiscoveryPhase::Seeds => self.run_seeds(store, &mut session, profile).await,
                DiscoveryPhase::Search => self.run_search(store, &mut session, profile).await,
                DiscoveryPhase::Crawl => self.run_crawl(store, &mut session, profile).await,
            }

            if session.has_strong_candidate(self.budget.strong_score_threshold) {
                tracing::info!(%phase, "phase produced a strong candidate, stopping cascade");
                break;
            }
        }

        let outcome = DiscoveryOutcome {
            candidates: session.ranked_candidates(),
            phases_run,
            pages_fetched: store.network_fetches(),
            errors: session.errors.clone(),
        };

        tracing::info!(
            candidates = outcome.candidates.len(),
            pages = outcome.pages_fetched,
            phases = outcome.phases_run.len(),
            "discovery session finished"
        );

        outcome
    }

    fn budget_spent(&self, store: &PageStore) -> bool {
        store.network_fetches() >= self.budget.max_pages
    }

    async fn run_sitemap(
        &self,
        store: &mut PageStore,
        session: &mut CrawlSession,
        profile: &DocumentProfile,
    ) {
        let root = session.root.clone();
        let pages = match read_sitemap(store, &root, profile, self.budget.max_pages).await {
            Ok(pages) => pages,
            Err(e) => {
                session.record_error("sitemap", &e);
                return;
            }
        };

        for url in pages {
            if self.budget_spent(store)
                || session.has_strong_candidate(self.budget.strong_score_threshold)
            {
                break;
            }
            self.harvest(store, session, profile, &url).await;
        }
    }

    async fn run_seeds(
        &self,
        store: &mut PageStore,
        session: &mut CrawlSession,
        profile: &DocumentProfile,
    ) {
        let root = session.root.clone();
        let seeds = generate_seeds(&root, profile);

        for seed in seeds {
            if self.budget_spent(store)
                || session.has_strong_candidate(self.budget.strong_score_threshold)
            {
                break;
            }

            // Each responsive seed gets a bounded crawl of its own section,
            // capped by both its slice and the session ceiling.
            let slice = self.budget.seed_subcrawl();
            let sub_budget = CrawlBudget {
                max_pages: (store.network_fetches() + slice.max_pages).min(self.budget.max_pages),
                ..slice
            };

            let crawler = PriorityCrawler::new(sub_budget, self.cancel.clone());
            crawler.run(store, session, profile, &[seed]).await;
        }
    }

    async fn run_search(
        &self,
        store: &mut PageStore,
        session: &mut CrawlSession,
        profile: &DocumentProfile,
    ) {
        let probe = match &self.search {
            Some(probe) => probe,
            None => {
                session.record_error("search", "capability unavailable: no endpoint configured");
                return;
            }
        };

        let query = match &profile.search_query {
            Some(query) => query.clone(),
            None => {
                session.record_error(
                    "search",
                    format!("profile '{}' has no search query", profile.key),
                );
                return;
            }
        };

        let root = session.root.clone();
        let hits = match probe.search(store, &root, &query).await {
            Ok(hits) => hits,
            Err(e) => {
                session.record_error("search", &e);
                return;
            }
        };

        for hit in hits {
            if self.budget_spent(store)
                || session.has_strong_candidate(self.budget.strong_score_threshold)
            {
                break;
            }

            let page = match self.harvest(store, session, profile, &hit.url).await {
                Some(page) => page,
                None => continue,
            };

            // Result pages are often hubs; peek one level below the best
            // few navigation links.
            let mut followups: Vec<_> = page
                .navigation_links()
                .map(|a| (navigation_score(profile, &a.text, &a.url), a.url.clone()))
                .filter(|(score, _)| *score > 0)
                .collect();
            followups.sort_by(|a, b| b.0.cmp(&a.0));

            for (_, url) in followups.into_iter().take(SEARCH_NAV_FOLLOWS) {
                if self.budget_spent(store)
                    || session.has_strong_candidate(self.budget.strong_score_threshold)
                {
                    break;
                }
                self.harvest(store, session, profile, &url).await;
            }
        }
    }

    async fn run_crawl(
        &self,
        store: &mut PageStore,
        session: &mut CrawlSession,
        profile: &DocumentProfile,
    ) {
        let root = session.root.clone();
        let crawler = PriorityCrawler::new(self.budget, self.cancel.clone());
        crawler.run(store, session, profile, &[root]).await;
    }

    /// Fetches one page and records its document links as candidates
    ///
    /// Skips pages the session has already processed. Fetch failures are
    /// recorded and swallowed.
    async fn harvest(
        &self,
        store: &mut PageStore,
        session: &mut CrawlSession,
        profile: &DocumentProfile,
        url: &Url,
    ) -> Option<Arc<ParsedPage>> {
        let key = normalize_url(url.as_str())
            .map(|u| u.to_string())
            .unwrap_or_else(|_| url.to_string());

        if !session.mark_visited(&key) {
            return None;
        }

        let page = match store.fetch_page(url).await {
            Ok(page) => page,
            Err(e) => {
                session.record_error("fetch", &e);
                return None;
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

        Some(page)
    }
}
