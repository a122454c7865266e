use crate::config::types::{
    Config, CrawlerConfig, MunicipalityEntry, OutputConfig, ProfileEntry, SearchConfig,
    UserAgentConfig,
};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    if let Some(search) = &config.search {
        validate_search_config(search)?;
    }
    validate_municipalities(&config.municipality)?;
    validate_profiles(&config.profile)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 || config.max_pages > 10_000 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be between 1 and 10000, got {}",
            config.max_pages
        )));
    }

    if config.max_depth > 10 {
        return Err(ConfigError::Validation(format!(
            "max_depth must be <= 10, got {}",
            config.max_depth
        )));
    }

    if config.strong_score_threshold < 1 || config.strong_score_threshold > 100 {
        return Err(ConfigError::Validation(format!(
            "strong_score_threshold must be between 1 and 100, got {}",
            config.strong_score_threshold
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    if config.concurrent_sessions < 1 || config.concurrent_sessions > 16 {
        return Err(ConfigError::Validation(format!(
            "concurrent_sessions must be between 1 and 16, got {}",
            config.concurrent_sessions
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.downloads_dir.is_empty() {
        return Err(ConfigError::Validation(
            "downloads_dir cannot be empty".to_string(),
        ));
    }

    if config.reports_dir.is_empty() {
        return Err(ConfigError::Validation(
            "reports_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates search probe configuration
fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    if !config.endpoint.contains("{query}") {
        return Err(ConfigError::Validation(format!(
            "search endpoint must contain a {{query}} placeholder, got '{}'",
            config.endpoint
        )));
    }

    // The endpoint may be site-relative ("/search?q={query}") or absolute.
    if !config.endpoint.starts_with('/') {
        Url::parse(&config.endpoint.replace("{query}", "probe"))
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid search endpoint: {}", e)))?;
    }

    if config.result_limit < 1 || config.result_limit > 50 {
        return Err(ConfigError::Validation(format!(
            "result_limit must be between 1 and 50, got {}",
            config.result_limit
        )));
    }

    Ok(())
}

/// Validates municipality entries
fn validate_municipalities(entries: &[MunicipalityEntry]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for entry in entries {
        if entry.key.is_empty() {
            return Err(ConfigError::Validation(
                "municipality key cannot be empty".to_string(),
            ));
        }

        if !seen.insert(entry.key.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate municipality key '{}'",
                entry.key
            )));
        }

        let url = Url::parse(&entry.domain).map_err(|e| {
            ConfigError::InvalidUrl(format!(
                "Invalid domain for municipality '{}': {}",
                entry.key, e
            ))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Municipality '{}' domain must use HTTP(S), got '{}'",
                entry.key,
                url.scheme()
            )));
        }
    }

    Ok(())
}

/// Validates profile entries
fn validate_profiles(entries: &[ProfileEntry]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for entry in entries {
        if entry.key.is_empty() {
            return Err(ConfigError::Validation(
                "profile key cannot be empty".to_string(),
            ));
        }

        if !seen.insert(entry.key.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate profile key '{}'",
                entry.key
            )));
        }

        if entry.positive_terms.is_empty() {
            return Err(ConfigError::Validation(format!(
                "Profile '{}' must have at least one positive term",
                entry.key
            )));
        }

        for path in &entry.seed_paths {
            if !path.starts_with('/') {
                return Err(ConfigError::Validation(format!(
                    "Profile '{}' seed path '{}' must be site-relative (start with '/')",
                    entry.key, path
                )));
            }
        }
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
