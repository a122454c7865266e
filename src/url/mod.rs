//! URL handling module for Form-Scout
//!
//! This module provides URL normalization, host extraction, and the small
//! helpers the discovery and download stages share.

mod host;
mod normalize;

pub use host::{extract_host, is_same_host};
pub use normalize::normalize_url;

use url::Url;

/// Derives a local filename from the last path segment of a document URL
///
/// Municipal sites frequently serve PDFs from extensionless CMS paths, so a
/// `.pdf` suffix is appended when the segment carries no extension. A URL
/// whose path ends in `/` (no usable segment) falls back to `document.pdf`.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use form_scout::url::filename_from_url;
///
/// let url = Url::parse("https://city.example.jp/forms/idoutodoke.pdf").unwrap();
/// assert_eq!(filename_from_url(&url), "idoutodoke.pdf");
///
/// let url = Url::parse("https://city.example.jp/material/files/8841").unwrap();
/// assert_eq!(filename_from_url(&url), "8841.pdf");
/// ```
pub fn filename_from_url(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .unwrap_or("");

    if segment.is_empty() {
        return "document.pdf".to_string();
    }

    let name = segment.to_string();
    if name.rsplit('.').next().map(|ext| ext.len()) == Some(name.len()) {
        // No dot at all in the segment
        format!("{}.pdf", name)
    } else {
        name
    }
}
