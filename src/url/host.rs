use url::Url;

/// Extracts the host from a URL
///
/// This function retrieves the host portion of a URL and converts it to
/// lowercase. If the URL has no host (which shouldn't happen for valid
/// HTTP(S) URLs), it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use form_scout::url::extract_host;
///
/// let url = Url::parse("https://www.city.koto.lg.jp/kurashi/").unwrap();
/// assert_eq!(extract_host(&url), Some("www.city.koto.lg.jp".to_string()));
///
/// let url = Url::parse("https://CITY.EXAMPLE.JP/path").unwrap();
/// assert_eq!(extract_host(&url), Some("city.example.jp".to_string()));
/// ```
pub fn extract_host(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns true when two URLs point at the same site
///
/// A leading `www.` is ignored on either side: municipal sites link between
/// the bare and `www.` forms of their own host interchangeably, and a crawl
/// session must treat both as in scope. Ports count: a different port is a
/// different site, while an explicit scheme default matches its absence.
pub fn is_same_host(a: &Url, b: &Url) -> bool {
    if a.port_or_known_default() != b.port_or_known_default() {
        return false;
    }
    match (extract_host(a), extract_host(b)) {
        (Some(ha), Some(hb)) => strip_www(&ha) == strip_www(&hb),
        _ => false,
    }
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}
