//! End-to-end discovery tests against a mock municipal site

use form_scout::config::UserAgentConfig;
use form_scout::discovery::{
    build_http_client, CrawlBudget, DiscoveryOrchestrator, DiscoveryPhase, EndpointSearchProbe,
    PageStore, SearchProbe,
};
use form_scout::profile::DocumentProfile;
use form_scout::ScoutError;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "FormScoutTest".to_string(),
        crawler_version: "0.0".to_string(),
        contact_url: "https://example.com/about-scout".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

fn test_profile() -> DocumentProfile {
    DocumentProfile {
        key: "resident-move".to_string(),
        label: "Resident move notification".to_string(),
        form_schema_id: None,
        positive_terms: vec!["住民異動届".to_string(), "転入届".to_string()],
        negative_terms: vec!["記入例".to_string()],
        cross_negative_terms: vec![],
        path_segments: vec!["todokede".to_string(), "tetsuzuki".to_string()],
        negative_path_segments: vec![],
        nav_keywords: vec!["届出".to_string(), "手続き".to_string()],
        seed_paths: vec![],
        search_query: None,
    }
}

fn test_store() -> PageStore {
    let client = build_http_client(&test_user_agent(), 5).unwrap();
    // No politeness delay in tests
    PageStore::new(client, 0)
}

fn test_budget(max_pages: u32, threshold: u8) -> CrawlBudget {
    CrawlBudget {
        max_pages,
        max_depth: 4,
        strong_score_threshold: threshold,
    }
}

fn orchestrator(
    budget: CrawlBudget,
    search: Option<Box<dyn SearchProbe>>,
) -> DiscoveryOrchestrator {
    DiscoveryOrchestrator::new(budget, search, CancellationToken::new())
}

// set_body_raw keeps the given mime; set_body_string would pin text/plain
async fn mount_html(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

async fn mount_xml(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_string(), "application/xml"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_sitemap_phase_short_circuits_cascade() {
    let server = MockServer::start().await;
    let root = Url::parse(&server.uri()).unwrap();

    let sitemap = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
        <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
            <url><loc>{0}/kankou/index.html</loc></url>
            <url><loc>{0}/kurashi/todokede/index.html</loc></url>
        </urlset>"#,
        server.uri()
    );
    mount_xml(&server, "/sitemap.xml", &sitemap).await;

    mount_html(
        &server,
        "/kurashi/todokede/index.html",
        r#"<html><body>
            <ul><li><a href="/kurashi/todokede/ido.pdf">住民異動届</a> 様式ダウンロード</li></ul>
        </body></html>"#,
    )
    .await;

    let mut store = test_store();
    let profile = test_profile();

    // Candidate scores 55: positive term 30, two download keywords 20,
    // one path segment 5.
    let outcome = orchestrator(test_budget(20, 50), None)
        .discover(&mut store, &root, &profile)
        .await;

    assert_eq!(outcome.phases_run, vec![DiscoveryPhase::Sitemap]);
    assert_eq!(outcome.candidates.len(), 1);
    assert!(outcome.candidates[0].url.ends_with("/kurashi/todokede/ido.pdf"));
    assert_eq!(outcome.candidates[0].score, 55);
    assert_eq!(outcome.candidates[0].link_text, "住民異動届");

    // One fetch for the sitemap, one for the matching page; the tourism
    // page is filtered out by path.
    assert_eq!(outcome.pages_fetched, 2);
}

#[tokio::test]
async fn test_seed_phase_crawls_below_responsive_seed() {
    let server = MockServer::start().await;
    let root = Url::parse(&server.uri()).unwrap();

    // No sitemap and no robots.txt; those two misses still spend budget.
    mount_html(
        &server,
        "/kurashi/todokede/",
        r#"<html><body>
            <nav><a href="/kurashi/todokede/tennyu.html">転入の手続き</a></nav>
        </body></html>"#,
    )
    .await;
    mount_html(
        &server,
        "/kurashi/todokede/tennyu.html",
        r#"<html><body>
            <p><a href="/kurashi/todokede/tennyu.pdf">転入届</a> の様式(PDF)をダウンロード</p>
        </body></html>"#,
    )
    .await;

    let mut store = test_store();
    let mut profile = test_profile();
    profile.seed_paths = vec!["/kurashi/todokede/".to_string()];

    let outcome = orchestrator(test_budget(20, 60), None)
        .discover(&mut store, &root, &profile)
        .await;

    assert_eq!(
        outcome.phases_run,
        vec![DiscoveryPhase::Sitemap, DiscoveryPhase::Seeds]
    );
    assert_eq!(outcome.candidates.len(), 1);
    assert!(outcome.candidates[0].url.ends_with("/kurashi/todokede/tennyu.pdf"));
    assert!(outcome.candidates[0].score >= 60);
    assert!(outcome.errors.iter().any(|e| e.starts_with("sitemap:")));

    // sitemap.xml miss, robots.txt miss, seed page, tennyu page
    assert_eq!(outcome.pages_fetched, 4);
}

#[tokio::test]
async fn test_search_phase_follows_result_pages() {
    let server = MockServer::start().await;
    let root = Url::parse(&server.uri()).unwrap();

    mount_html(
        &server,
        "/search",
        r#"<html><body>
            <ol><li><a href="/kurashi/todokede/idou.html">住民異動届について</a></li></ol>
        </body></html>"#,
    )
    .await;
    mount_html(
        &server,
        "/kurashi/todokede/idou.html",
        r#"<html><body>
            <p><a href="/kurashi/todokede/idou.pdf">住民異動届</a> の様式(PDF)をダウンロード</p>
        </body></html>"#,
    )
    .await;

    let mut store = test_store();
    let mut profile = test_profile();
    profile.search_query = Some("住民異動届 様式".to_string());

    let probe = EndpointSearchProbe::new("/search?q={query}".to_string(), 10);
    let outcome = orchestrator(test_budget(20, 60), Some(Box::new(probe)))
        .discover(&mut store, &root, &profile)
        .await;

    assert_eq!(
        outcome.phases_run,
        vec![
            DiscoveryPhase::Sitemap,
            DiscoveryPhase::Seeds,
            DiscoveryPhase::Search,
        ]
    );
    assert_eq!(outcome.candidates.len(), 1);
    assert!(outcome.candidates[0].url.ends_with("/kurashi/todokede/idou.pdf"));
    assert!(outcome.candidates[0].score >= 60);
}

#[tokio::test]
async fn test_search_hits_come_only_from_the_scouted_site() {
    let site = MockServer::start().await;
    let engine = MockServer::start().await;
    let root = Url::parse(&site.uri()).unwrap();

    // An external engine's result page links to its own pages too
    mount_html(
        &engine,
        "/find",
        &format!(
            r#"<html><body>
                <a href="/internal/help.html">ヘルプ</a>
                <a href="{}/kurashi/todokede/idou.html">住民異動届について</a>
                <a href="https://ads.example.net/click">広告</a>
            </body></html>"#,
            site.uri()
        ),
    )
    .await;

    let mut store = test_store();
    let probe = EndpointSearchProbe::new(format!("{}/find?q={{query}}", engine.uri()), 10);

    let hits = probe.search(&mut store, &root, "住民異動届").await.unwrap();

    assert_eq!(hits.len(), 1);
    assert!(hits[0].url.as_str().ends_with("/kurashi/todokede/idou.html"));
    assert_eq!(hits[0].url.port(), root.port());
}

#[tokio::test]
async fn test_crawl_phase_is_the_last_resort() {
    let server = MockServer::start().await;
    let root = Url::parse(&server.uri()).unwrap();

    mount_html(
        &server,
        "/",
        r#"<html><body>
            <nav>
                <a href="/kankou/">観光案内</a>
                <a href="/tetsuzuki/hikkoshi.html">引越しの手続き</a>
            </nav>
        </body></html>"#,
    )
    .await;
    mount_html(
        &server,
        "/tetsuzuki/hikkoshi.html",
        r#"<html><body>
            <p><a href="/tetsuzuki/idou.pdf">住民異動届</a> の様式(PDF)をダウンロード</p>
        </body></html>"#,
    )
    .await;

    let mut store = test_store();
    let profile = test_profile();

    let outcome = orchestrator(test_budget(20, 60), None)
        .discover(&mut store, &root, &profile)
        .await;

    assert_eq!(
        outcome.phases_run,
        vec![
            DiscoveryPhase::Sitemap,
            DiscoveryPhase::Seeds,
            DiscoveryPhase::Search,
            DiscoveryPhase::Crawl,
        ]
    );
    assert_eq!(outcome.candidates.len(), 1);
    assert!(outcome.candidates[0].url.ends_with("/tetsuzuki/idou.pdf"));

    // Two sitemap misses, the root, and the one positively scored section.
    // The zero-scored tourism link is never enqueued.
    assert_eq!(outcome.pages_fetched, 4);
}

#[tokio::test]
async fn test_page_budget_bounds_every_phase() {
    let server = MockServer::start().await;
    let root = Url::parse(&server.uri()).unwrap();

    let mut links = String::new();
    for i in 0..10 {
        links.push_str(&format!(
            r#"<a href="/tetsuzuki/page{}.html">手続き {}</a>"#,
            i, i
        ));
    }
    mount_html(&server, "/", &format!("<html><body>{}</body></html>", links)).await;
    for i in 0..10 {
        mount_html(
            &server,
            &format!("/tetsuzuki/page{}.html", i),
            "<html><body><p>手続きの案内</p></body></html>",
        )
        .await;
    }

    let mut store = test_store();
    let profile = test_profile();

    let outcome = orchestrator(test_budget(3, 60), None)
        .discover(&mut store, &root, &profile)
        .await;

    assert!(outcome.candidates.is_empty());
    assert_eq!(outcome.pages_fetched, 3);
    assert_eq!(outcome.phases_run.len(), 4);
    assert!(outcome
        .errors
        .iter()
        .any(|e| e.contains("capability unavailable")));
}

#[tokio::test]
async fn test_depth_limit_bounds_the_crawl() {
    let server = MockServer::start().await;
    let root = Url::parse(&server.uri()).unwrap();

    // A chain of relevant links one hop longer than the depth allows
    mount_html(
        &server,
        "/",
        r#"<html><body><a href="/tetsuzuki/step1.html">手続き</a></body></html>"#,
    )
    .await;
    mount_html(
        &server,
        "/tetsuzuki/step1.html",
        r#"<html><body><a href="/tetsuzuki/step2.html">届出の手続き</a></body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/tetsuzuki/step2.html"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"<html><body><p><a href="/tetsuzuki/idou.pdf">住民異動届</a></p></body></html>"#,
            "text/html",
        ))
        .expect(0)
        .mount(&server)
        .await;

    let mut store = test_store();
    let profile = test_profile();

    let budget = CrawlBudget {
        max_pages: 20,
        max_depth: 1,
        strong_score_threshold: 60,
    };
    let outcome = orchestrator(budget, None)
        .discover(&mut store, &root, &profile)
        .await;

    // The document two hops down is never reached
    assert!(outcome.candidates.is_empty());

    // Two sitemap misses, the root, and step1; step2 sits beyond max_depth
    assert_eq!(outcome.pages_fetched, 4);
}

#[tokio::test]
async fn test_first_sighting_of_a_document_wins() {
    let server = MockServer::start().await;
    let root = Url::parse(&server.uri()).unwrap();

    let sitemap = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
        <urlset>
            <url><loc>{0}/kurashi/todokede/a.html</loc></url>
            <url><loc>{0}/kurashi/todokede/b.html</loc></url>
        </urlset>"#,
        server.uri()
    );
    mount_xml(&server, "/sitemap.xml", &sitemap).await;

    mount_html(
        &server,
        "/kurashi/todokede/a.html",
        r#"<html><body><p><a href="/kurashi/todokede/ido.pdf">住民異動届</a></p></body></html>"#,
    )
    .await;
    mount_html(
        &server,
        "/kurashi/todokede/b.html",
        r#"<html><body><p><a href="/kurashi/todokede/ido.pdf">様式ダウンロード</a></p></body></html>"#,
    )
    .await;

    let mut store = test_store();
    let profile = test_profile();

    let outcome = orchestrator(test_budget(20, 90), None)
        .discover(&mut store, &root, &profile)
        .await;

    assert_eq!(outcome.candidates.len(), 1);
    assert_eq!(outcome.candidates[0].link_text, "住民異動届");
    assert!(outcome.candidates[0]
        .found_on_page_url
        .ends_with("/kurashi/todokede/a.html"));
}

#[tokio::test]
async fn test_page_cache_prevents_refetch() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/kurashi/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<html><body><p>くらしの情報</p></body></html>", "text/html"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut store = test_store();
    let url = Url::parse(&format!("{}/kurashi/", server.uri())).unwrap();

    let first = store.fetch_page(&url).await.unwrap();
    let second = store.fetch_page(&url).await.unwrap();

    assert_eq!(first.url, second.url);
    assert_eq!(store.network_fetches(), 1);
}

#[tokio::test]
async fn test_fetch_failures_are_cached_too() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing.html"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let mut store = test_store();
    let url = Url::parse(&format!("{}/missing.html", server.uri())).unwrap();

    let first = store.fetch_page(&url).await.unwrap_err();
    let replayed = store.fetch_page(&url).await.unwrap_err();

    // The replay keeps the error class, not just the message
    assert!(matches!(first, ScoutError::HttpStatus { status: 404, .. }));
    assert!(matches!(replayed, ScoutError::HttpStatus { status: 404, .. }));
    assert_eq!(store.network_fetches(), 1);
}

#[tokio::test]
async fn test_sitemap_index_is_followed() {
    let server = MockServer::start().await;
    let root = Url::parse(&server.uri()).unwrap();

    let index = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
        <sitemapindex>
            <sitemap><loc>{0}/sitemap-kurashi.xml</loc></sitemap>
        </sitemapindex>"#,
        server.uri()
    );
    let child = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
        <urlset>
            <url><loc>{0}/kurashi/todokede/index.html</loc></url>
        </urlset>"#,
        server.uri()
    );
    mount_xml(&server, "/sitemap.xml", &index).await;
    mount_xml(&server, "/sitemap-kurashi.xml", &child).await;

    mount_html(
        &server,
        "/kurashi/todokede/index.html",
        r#"<html><body>
            <p><a href="/kurashi/todokede/ido.pdf">住民異動届</a> の様式(PDF)をダウンロード</p>
        </body></html>"#,
    )
    .await;

    let mut store = test_store();
    let profile = test_profile();

    let outcome = orchestrator(test_budget(20, 60), None)
        .discover(&mut store, &root, &profile)
        .await;

    assert_eq!(outcome.phases_run, vec![DiscoveryPhase::Sitemap]);
    assert_eq!(outcome.candidates.len(), 1);
    assert!(outcome.candidates[0].url.ends_with("/kurashi/todokede/ido.pdf"));
}

#[tokio::test]
async fn test_robots_sitemap_fallback() {
    let server = MockServer::start().await;
    let root = Url::parse(&server.uri()).unwrap();

    // /sitemap.xml is missing; robots.txt points at the real one
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            format!(
                "User-agent: *\nDisallow: /admin/\nSitemap: {}/sitemap-main.xml\n",
                server.uri()
            ),
            "text/plain",
        ))
        .mount(&server)
        .await;

    let sitemap = format!(
        r#"<urlset><url><loc>{0}/kurashi/todokede/index.html</loc></url></urlset>"#,
        server.uri()
    );
    mount_xml(&server, "/sitemap-main.xml", &sitemap).await;

    mount_html(
        &server,
        "/kurashi/todokede/index.html",
        r#"<html><body>
            <p><a href="/kurashi/todokede/ido.pdf">住民異動届</a> の様式(PDF)をダウンロード</p>
        </body></html>"#,
    )
    .await;

    let mut store = test_store();
    let profile = test_profile();

    let outcome = orchestrator(test_budget(20, 60), None)
        .discover(&mut store, &root, &profile)
        .await;

    assert_eq!(outcome.phases_run, vec![DiscoveryPhase::Sitemap]);
    assert_eq!(outcome.candidates.len(), 1);
}
