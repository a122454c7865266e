//! Sitemap reading
//!
//! The cheapest discovery phase: pull the site's sitemap and keep the URLs
//! whose paths look like form-hosting sections. Sitemap XML is simple enough
//! that the lenient HTML parser handles it; no separate XML dependency is
//! carried for it.

use crate::discovery::page_store::PageStore;
use crate::profile::DocumentProfile;
use crate::url::is_same_host;
use crate::{Result, ScoutError};
use scraper::{Html, Selector};
use url::Url;

/// Child sitemaps followed from a sitemap index
const MAX_CHILD_SITEMAPS: usize = 5;

/// Cap on URLs returned from one sitemap read
const MAX_MATCHES: usize = 50;

/// Reads the site's sitemap and returns profile-relevant page URLs
///
/// Tries `/sitemap.xml` first, then falls back to `Sitemap:` lines in
/// `/robots.txt`. A sitemap index is followed at most [`MAX_CHILD_SITEMAPS`]
/// deep, and every request is checked against `max_pages` so the session
/// budget holds even here. Only same-host URLs whose path contains one of
/// the profile's path segments are returned; a profile with no path
/// segments gets nothing from this phase rather than the whole site.
pub async fn read_sitemap(
    store: &mut PageStore,
    root: &Url,
    profile: &DocumentProfile,
    max_pages: u32,
) -> Result<Vec<Url>> {
    if profile.path_segments.is_empty() || store.network_fetches() >= max_pages {
        return Ok(Vec::new());
    }

    let sitemap_url = root.join("/sitemap.xml")?;

    let body = match store.fetch_text(&sitemap_url).await {
        Ok(body) => body,
        Err(first_err) => {
            tracing::debug!(error = %first_err, "no /sitemap.xml, checking robots.txt");
            match sitemap_from_robots(store, root, max_pages).await? {
                Some(body) => body,
                None => return Err(first_err),
            }
        }
    };

    let mut locs = parse_locs(&body, "sitemapindex sitemap loc");

    let page_locs = if locs.is_empty() {
        parse_locs(&body, "urlset url loc")
    } else {
        locs.truncate(MAX_CHILD_SITEMAPS);
        let mut pages = Vec::new();
        for child in locs {
            if store.network_fetches() >= max_pages {
                break;
            }
            let child_url = match Url::parse(&child) {
                Ok(u) => u,
                Err(_) => continue,
            };
            match store.fetch_text(&child_url).await {
                Ok(child_body) => pages.extend(parse_locs(&child_body, "urlset url loc")),
                Err(e) => {
                    tracing::debug!(url = %child_url, error = %e, "child sitemap unavailable");
                }
            }
        }
        pages
    };

    let mut matches = Vec::new();
    for loc in page_locs {
        let url = match Url::parse(loc.trim()) {
            Ok(u) => u,
            Err(_) => continue,
        };

        if !is_same_host(&url, root) {
            continue;
        }

        let path = url.path().to_lowercase();
        if profile
            .path_segments
            .iter()
            .any(|seg| path.contains(&seg.to_lowercase()))
        {
            matches.push(url);
            if matches.len() >= MAX_MATCHES {
                break;
            }
        }
    }

    tracing::info!(count = matches.len(), "sitemap yielded relevant pages");
    Ok(matches)
}

/// Follows the first `Sitemap:` directive in robots.txt, if any
async fn sitemap_from_robots(
    store: &mut PageStore,
    root: &Url,
    max_pages: u32,
) -> Result<Option<String>> {
    if store.network_fetches() >= max_pages {
        return Ok(None);
    }
    let robots_url = root.join("/robots.txt")?;

    let robots = match store.fetch_text(&robots_url).await {
        Ok(body) => body,
        Err(_) => return Ok(None),
    };

    for line in robots.lines() {
        let line = line.trim();
        if let Some(rest) = line
            .strip_prefix("Sitemap:")
            .or_else(|| line.strip_prefix("sitemap:"))
        {
            let url = Url::parse(rest.trim()).map_err(|e| ScoutError::Parse {
                url: robots_url.to_string(),
                message: format!("bad Sitemap directive: {}", e),
            })?;
            if store.network_fetches() >= max_pages {
                return Ok(None);
            }
            return store.fetch_text(&url).await.map(Some);
        }
    }

    Ok(None)
}

/// Pulls `<loc>` text out of sitemap markup with the given selector
fn parse_locs(body: &str, selector: &str) -> Vec<String> {
    let document = Html::parse_document(body);
    let selector = match Selector::parse(selector) {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    document
        .select(&selector)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|loc| !loc.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_urlset_locs() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://city.example.jp/kurashi/todokede/</loc></url>
  <url><loc>https://city.example.jp/kankou/</loc></url>
</urlset>"#;

        let locs = parse_locs(xml, "urlset url loc");
        assert_eq!(locs.len(), 2);
        assert_eq!(locs[0], "https://city.example.jp/kurashi/todokede/");
    }

    #[test]
    fn test_parse_sitemapindex_locs() {
        let xml = r#"<sitemapindex>
  <sitemap><loc>https://city.example.jp/sitemap-1.xml</loc></sitemap>
  <sitemap><loc>https://city.example.jp/sitemap-2.xml</loc></sitemap>
</sitemapindex>"#;

        let locs = parse_locs(xml, "sitemapindex sitemap loc");
        assert_eq!(locs.len(), 2);
    }

    #[test]
    fn test_parse_locs_empty_on_plain_html() {
        let html = "<html><body><p>not a sitemap</p></body></html>";
        assert!(parse_locs(html, "urlset url loc").is_empty());
    }

    // Fetch paths (index fan-out, robots.txt fallback, host filtering) are
    // covered by the wiremock integration tests.
}
