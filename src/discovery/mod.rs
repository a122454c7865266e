//! Document discovery engine
//!
//! Discovery turns a (domain root, document profile) pair into a ranked list
//! of candidate documents. It runs a cascade of phases, cheapest first:
//!
//! 1. Sitemap: read sitemap.xml and fetch the pages whose paths look like
//!    form-hosting sections.
//! 2. Seeds: try the profile's conventional section paths directly, with a
//!    bounded crawl below each one that responds.
//! 3. Search: submit the profile's query to the site's search endpoint and
//!    inspect the result pages.
//! 4. Crawl: best-first crawl of the whole site from the domain root.
//!
//! A phase that surfaces a sufficiently strong candidate short-circuits the
//! rest of the cascade. Fetch failures are local: they are recorded on the
//! session and the phase moves on.

mod crawler;
mod extractor;
mod orchestrator;
mod page_store;
mod scorer;
mod search;
mod seeds;
mod session;
mod sitemap;

pub use crawler::{PriorityCrawler, QueuedLink};
pub use extractor::{parse_page, Anchor, ParsedPage};
pub use orchestrator::{DiscoveryOrchestrator, DiscoveryOutcome};
pub use page_store::{build_http_client, PageStore};
pub use scorer::{matches_positive_term, navigation_score, score_candidate};
pub use search::{EndpointSearchProbe, SearchHit, SearchProbe};
pub use seeds::generate_seeds;
pub use session::{CandidateDocument, CrawlBudget, CrawlSession, DiscoveryPhase};
pub use sitemap::read_sitemap;
