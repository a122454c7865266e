//! Site search probing
//!
//! Many municipal CMSes expose a plain GET search endpoint. The probe is a
//! trait so tests and alternative integrations can stand in for the HTTP
//! implementation; discovery treats an unavailable probe as a phase to skip,
//! never a failure.

use crate::discovery::page_store::PageStore;
use crate::url::is_same_host;
use crate::Result;
use async_trait::async_trait;
use url::Url;

/// One link taken from a search result page
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub url: Url,
    pub title: String,
}

/// A site search capability
#[async_trait]
pub trait SearchProbe: Send + Sync {
    /// Submits a query and returns result page links, best first
    async fn search(
        &self,
        store: &mut PageStore,
        root: &Url,
        query: &str,
    ) -> Result<Vec<SearchHit>>;
}

/// Probes a GET endpoint template like `/search?q={query}`
pub struct EndpointSearchProbe {
    endpoint: String,
    result_limit: usize,
}

impl EndpointSearchProbe {
    pub fn new(endpoint: String, result_limit: u32) -> Self {
        EndpointSearchProbe {
            endpoint,
            result_limit: result_limit as usize,
        }
    }

    fn build_query_url(&self, root: &Url, query: &str) -> Result<Url> {
        let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
        let filled = self.endpoint.replace("{query}", &encoded);

        let url = if filled.starts_with('/') {
            root.join(&filled)?
        } else {
            Url::parse(&filled)?
        };

        Ok(url)
    }
}

#[async_trait]
impl SearchProbe for EndpointSearchProbe {
    async fn search(
        &self,
        store: &mut PageStore,
        root: &Url,
        query: &str,
    ) -> Result<Vec<SearchHit>> {
        let query_url = self.build_query_url(root, query)?;
        tracing::debug!(url = %query_url, "probing site search");

        let page = store.fetch_page(&query_url).await?;

        let mut hits = Vec::new();
        let mut seen = std::collections::HashSet::new();

        // Only results on the scouted site count; an external engine's result
        // page is full of its own links.
        for anchor in page
            .anchors
            .iter()
            .filter(|a| a.is_navigation() && is_same_host(&a.url, root))
        {
            // Skip the endpoint's own pagination links
            if anchor.url.path() == query_url.path() {
                continue;
            }

            if !seen.insert(anchor.url.to_string()) {
                continue;
            }

            hits.push(SearchHit {
                url: anchor.url.clone(),
                title: anchor.text.clone(),
            });

            if hits.len() >= self.result_limit {
                break;
            }
        }

        Ok(hits)
    }
}
