use crate::UrlError;
use url::Url;

/// List of tracking query parameters to remove during normalization
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
];

/// Normalizes a URL into the canonical form used for session deduplication
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Validate the scheme (HTTP and HTTPS only)
/// 3. Lowercase the host
/// 4. Normalize path:
///    - Remove dot segments (. and ..)
///    - Collapse duplicate slashes
///    - Remove trailing slash (except for root /)
/// 5. Remove fragment (everything after #)
/// 6. Remove tracking query parameters
/// 7. Sort remaining query parameters alphabetically
/// 8. Remove empty query string (trailing ?)
///
/// Scheme is preserved as given. CMS query parameters like `page_id` are
/// significant on municipal sites and survive normalization.
///
/// # Examples
///
/// ```
/// use form_scout::url::normalize_url;
///
/// let url = normalize_url("https://CITY.EXAMPLE.JP/kurashi//todokede/?utm_source=mail").unwrap();
/// assert_eq!(url.as_str(), "https://city.example.jp/kurashi/todokede");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    match url.host_str() {
        Some(host) => {
            let lowered = host.to_lowercase();
            if lowered != host {
                url.set_host(Some(&lowered))
                    .map_err(|e| UrlError::Parse(format!("Failed to set host: {}", e)))?;
            }
        }
        None => return Err(UrlError::MissingHost),
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query().is_some() {
        let filtered_params = filter_and_sort_query_params(&url);

        if filtered_params.is_empty() {
            url.set_query(None);
        } else {
            let query_string = filtered_params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("&");
            url.set_query(Some(&query_string));
        }
    }

    Ok(url)
}

/// Normalizes a URL path by removing dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let mut normalized_segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            // Skip empty segments (from duplicate slashes) and current directory markers
            "" | "." => continue,
            // Parent directory pops the last segment if possible
            ".." => {
                if !normalized_segments.is_empty() {
                    normalized_segments.pop();
                }
            }
            _ => normalized_segments.push(segment),
        }
    }

    if normalized_segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", normalized_segments.join("/"))
}

/// Filters out tracking parameters and sorts remaining query parameters
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort_by(|a, b| a.0.cmp(&b.0));

    params
}

/// Checks if a query parameter is a tracking parameter
fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_preserved() {
        let result = normalize_url("http://city.example.jp/page").unwrap();
        assert_eq!(result.as_str(), "http://city.example.jp/page");
    }

    #[test]
    fn test_lowercase_host() {
        let result = normalize_url("https://CITY.EXAMPLE.JP/Kurashi").unwrap();
        assert_eq!(result.as_str(), "https://city.example.jp/Kurashi");
    }

    #[test]
    fn test_remove_trailing_slash() {
        let result = normalize_url("https://city.example.jp/kurashi/todokede/").unwrap();
        assert_eq!(result.as_str(), "https://city.example.jp/kurashi/todokede");
    }

    #[test]
    fn test_keep_root_slash() {
        let result = normalize_url("https://city.example.jp/").unwrap();
        assert_eq!(result.as_str(), "https://city.example.jp/");
    }

    #[test]
    fn test_remove_fragment() {
        let result = normalize_url("https://city.example.jp/tetsuzuki#forms").unwrap();
        assert_eq!(result.as_str(), "https://city.example.jp/tetsuzuki");
    }

    #[test]
    fn test_remove_tracking_params() {
        let result = normalize_url("https://city.example.jp/page?utm_source=mail").unwrap();
        assert_eq!(result.as_str(), "https://city.example.jp/page");
    }

    #[test]
    fn test_cms_params_survive() {
        let result = normalize_url("https://city.example.jp/soshiki/detail.html?lif_id=482").unwrap();
        assert_eq!(
            result.as_str(),
            "https://city.example.jp/soshiki/detail.html?lif_id=482"
        );
    }

    #[test]
    fn test_sort_query_params() {
        let result = normalize_url("https://city.example.jp/page?b=2&a=1").unwrap();
        assert_eq!(result.as_str(), "https://city.example.jp/page?a=1&b=2");
    }

    #[test]
    fn test_normalize_path_with_dots() {
        let result = normalize_url("https://city.example.jp/a/../b/./c").unwrap();
        assert_eq!(result.as_str(), "https://city.example.jp/b/c");
    }

    #[test]
    fn test_multiple_slashes() {
        let result = normalize_url("https://city.example.jp///kurashi//todokede").unwrap();
        assert_eq!(result.as_str(), "https://city.example.jp/kurashi/todokede");
    }

    #[test]
    fn test_invalid_scheme() {
        let result = normalize_url("ftp://city.example.jp/file.pdf");
        assert!(matches!(result.unwrap_err(), UrlError::InvalidScheme(_)));
    }

    #[test]
    fn test_malformed_url() {
        assert!(normalize_url("not a url").is_err());
    }

    #[test]
    fn test_empty_path_becomes_root() {
        let result = normalize_url("https://city.example.jp").unwrap();
        assert_eq!(result.as_str(), "https://city.example.jp/");
    }

    #[test]
    fn test_custom_utm_param() {
        let result = normalize_url("https://city.example.jp/page?utm_custom=value").unwrap();
        assert_eq!(result.as_str(), "https://city.example.jp/page");
    }
}
