//! HTML parsing and link extraction
//!
//! Pages are parsed once into an owned [`ParsedPage`] of anchors. The raw
//! scraper document is `!Send` and never crosses an await point, so all the
//! text a later stage could want (anchor text, surrounding context) is pulled
//! out here at parse time.

use crate::url::is_same_host;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Extensions that mark a link as a document rather than a page
const DOCUMENT_EXTENSIONS: &[&str] = &[".pdf"];

/// Extensions never followed as navigation
const BINARY_EXTENSIONS: &[&str] = &[".pdf", ".xlsx", ".xls", ".doc", ".docx", ".zip"];

/// Cap on the surrounding-context text kept per anchor
const MAX_CONTEXT_CHARS: usize = 240;

/// One anchor pulled out of a page
#[derive(Debug, Clone)]
pub struct Anchor {
    /// Resolved absolute URL
    pub url: Url,

    /// The anchor's own text
    pub text: String,

    /// Text of the anchor's parent block, as surrounding context
    pub context: String,
}

impl Anchor {
    /// True when the link points at a downloadable document
    pub fn is_document(&self) -> bool {
        let path = self.url.path().to_lowercase();
        DOCUMENT_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
    }

    /// True when the link is followable page navigation
    pub fn is_navigation(&self) -> bool {
        let path = self.url.path().to_lowercase();
        !BINARY_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
    }
}

/// Owned extraction of one fetched page
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// URL the page was fetched from
    pub url: Url,

    /// Page title, if present
    pub title: Option<String>,

    /// Every usable anchor on the page, in document order
    pub anchors: Vec<Anchor>,
}

impl ParsedPage {
    /// Anchors that point at downloadable documents
    pub fn document_links(&self) -> impl Iterator<Item = &Anchor> {
        self.anchors.iter().filter(|a| a.is_document())
    }

    /// Anchors worth considering as navigation: same-host page links
    pub fn navigation_links(&self) -> impl Iterator<Item = &Anchor> {
        self.anchors
            .iter()
            .filter(|a| a.is_navigation() && is_same_host(&a.url, &self.url))
    }
}

/// Parses HTML into an owned [`ParsedPage`]
///
/// # Link Extraction Rules
///
/// **Include:** `<a href="...">` tags anywhere in the document.
///
/// **Exclude:** `javascript:`, `mailto:`, `tel:` and `data:` links,
/// fragment-only links, and anything that fails to resolve against the base
/// URL. Document links may point off-host (municipalities park PDFs on CDN
/// hosts); navigation links are filtered to the page's host by
/// [`ParsedPage::navigation_links`].
pub fn parse_page(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    let title = extract_title(&document);
    let mut anchors = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            let href = match element.value().attr("href") {
                Some(h) => h,
                None => continue,
            };

            let url = match resolve_link(href, base_url) {
                Some(u) => u,
                None => continue,
            };

            let text = collapse_whitespace(&element.text().collect::<String>());
            let context = extract_context(element);

            anchors.push(Anchor { url, text, context });
        }
    }

    ParsedPage {
        url: base_url.clone(),
        title,
        anchors,
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

/// Takes the text of the anchor's nearest block-level ancestor as context
///
/// Falls back to the direct parent when no block ancestor exists. The result
/// is capped so a table-of-contents page cannot hand every anchor the whole
/// page as context.
fn extract_context(element: ElementRef<'_>) -> String {
    const BLOCK_TAGS: &[&str] = &[
        "p", "li", "td", "th", "dd", "dt", "div", "section", "article",
    ];

    let mut node = element.parent();
    let mut fallback = None;

    while let Some(parent) = node {
        if let Some(parent_el) = ElementRef::wrap(parent) {
            if fallback.is_none() {
                fallback = Some(parent_el);
            }
            if BLOCK_TAGS.contains(&parent_el.value().name()) {
                return truncate_chars(
                    &collapse_whitespace(&parent_el.text().collect::<String>()),
                    MAX_CONTEXT_CHARS,
                );
            }
        }
        node = parent.parent();
    }

    fallback
        .map(|el| {
            truncate_chars(
                &collapse_whitespace(&el.text().collect::<String>()),
                MAX_CONTEXT_CHARS,
            )
        })
        .unwrap_or_default()
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only links
/// - invalid or non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    if href.starts_with('#') {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) => {
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                Some(absolute_url)
            } else {
                None
            }
        }
        Err(_) => None,
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        text.chars().take(max).collect()
    }
}
