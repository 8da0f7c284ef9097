use crate::config::types::{
    BrowserConfig, Config, FetcherConfig, NavigatorConfig, OutputConfig, PackageConfig,
    PacingConfig, SiteConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_browser_config(&config.browser)?;
    validate_navigator_config(&config.navigator)?;
    validate_package_config(&config.package)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_pacing_config(&config.pacing)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates site locations
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    validate_http_url("start-url", &config.start_url)?;
    validate_http_url("base-url", &config.base_url)?;
    validate_http_url("package-index-url", &config.package_index_url)?;

    for (key, prefix) in [
        ("card-link-prefix", &config.card_link_prefix),
        ("package-link-prefix", &config.package_link_prefix),
    ] {
        if !prefix.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "{} must be an absolute path starting with '/', got '{}'",
                key, prefix
            )));
        }
        if prefix.contains(['\'', '"', '\\']) {
            return Err(ConfigError::Validation(format!(
                "{} must not contain quotes or backslashes, got '{}'",
                key, prefix
            )));
        }
    }

    Ok(())
}

/// Validates rendering session settings
fn validate_browser_config(config: &BrowserConfig) -> Result<(), ConfigError> {
    if config.page_load_timeout == 0 {
        return Err(ConfigError::Validation(
            "page-load-timeout must be > 0 seconds".to_string(),
        ));
    }

    if config.explicit_wait == 0 {
        return Err(ConfigError::Validation(
            "explicit-wait must be > 0 seconds".to_string(),
        ));
    }

    if config.window_width == 0 || config.window_height == 0 {
        return Err(ConfigError::Validation(format!(
            "window size must be non-zero, got {}x{}",
            config.window_width, config.window_height
        )));
    }

    if config.user_agents.is_empty() {
        return Err(ConfigError::Validation(
            "user-agents must contain at least one entry".to_string(),
        ));
    }

    if config.user_agents.iter().any(|ua| ua.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "user-agents cannot contain blank entries".to_string(),
        ));
    }

    Ok(())
}

/// Validates list navigation settings
fn validate_navigator_config(config: &NavigatorConfig) -> Result<(), ConfigError> {
    validate_scroll("navigator", config.max_scroll_rounds, config.stable_rounds)?;

    if config.max_pages == Some(0) {
        return Err(ConfigError::Validation(
            "navigator max-pages must be >= 1 when set".to_string(),
        ));
    }

    if config.max_consecutive_stalls < 1 {
        return Err(ConfigError::Validation(
            "max-consecutive-stalls must be >= 1".to_string(),
        ));
    }

    if config.advance_attempts < 1 {
        return Err(ConfigError::Validation(
            "advance-attempts must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates package crawl settings
fn validate_package_config(config: &PackageConfig) -> Result<(), ConfigError> {
    validate_scroll("package", config.max_scroll_rounds, config.stable_rounds)?;

    if config.load_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "package load-attempts must be >= 1, got {}",
            config.load_attempts
        )));
    }

    Ok(())
}

/// Validates detail fetch settings
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.request_timeout == 0 {
        return Err(ConfigError::Validation(
            "request-timeout must be > 0 seconds".to_string(),
        ));
    }

    if config.http_attempts < 1 || config.browser_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "http-attempts and browser-attempts must be >= 1, got {} and {}",
            config.http_attempts, config.browser_attempts
        )));
    }

    if config.batch_size < 1 {
        return Err(ConfigError::Validation(
            "batch-size must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates courtesy delay settings
fn validate_pacing_config(config: &PacingConfig) -> Result<(), ConfigError> {
    if !config.jitter_scale.is_finite() || config.jitter_scale < 0.0 {
        return Err(ConfigError::Validation(format!(
            "jitter-scale must be a finite value >= 0, got {}",
            config.jitter_scale
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    for (key, path) in [
        ("work-dir", &config.work_dir),
        ("list-csv", &config.list_csv),
        ("full-csv", &config.full_csv),
        ("state-file", &config.state_file),
        ("zero-packages-file", &config.zero_packages_file),
        ("progress-file", &config.progress_file),
    ] {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", key)));
        }
    }

    Ok(())
}

fn validate_scroll(section: &str, max_rounds: u32, stable_rounds: u32) -> Result<(), ConfigError> {
    if max_rounds < 1 {
        return Err(ConfigError::Validation(format!(
            "{} max-scroll-rounds must be >= 1",
            section
        )));
    }

    if stable_rounds < 1 || stable_rounds > max_rounds {
        return Err(ConfigError::Validation(format!(
            "{} stable-rounds must be between 1 and max-scroll-rounds ({}), got {}",
            section, max_rounds, stable_rounds
        )));
    }

    Ok(())
}

fn validate_http_url(key: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", key, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must use http or https",
            key, value
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_http_url() {
        assert!(validate_http_url("start-url", "https://example.com/search").is_ok());
        assert!(validate_http_url("start-url", "http://127.0.0.1:8080/").is_ok());

        assert!(validate_http_url("start-url", "").is_err());
        assert!(validate_http_url("start-url", "ftp://example.com/").is_err());
        assert!(validate_http_url("start-url", "not a url").is_err());
    }

    #[test]
    fn test_validate_scroll() {
        assert!(validate_scroll("navigator", 20, 1).is_ok());
        assert!(validate_scroll("package", 150, 3).is_ok());

        assert!(validate_scroll("navigator", 0, 1).is_err());
        assert!(validate_scroll("navigator", 5, 0).is_err());
        assert!(validate_scroll("navigator", 5, 6).is_err());
    }

    #[test]
    fn test_validate_link_prefix() {
        let mut config = Config::default();
        config.site.card_link_prefix = "Cards/".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_validate_pacing() {
        let mut config = Config::default();
        config.pacing.jitter_scale = 0.0;
        assert!(validate(&config).is_ok());

        config.pacing.jitter_scale = -1.0;
        assert!(validate(&config).is_err());

        config.pacing.jitter_scale = f64::NAN;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_user_agents() {
        let mut config = Config::default();
        config.browser.user_agents.clear();
        assert!(validate(&config).is_err());

        config.browser.user_agents = vec!["  ".to_string()];
        assert!(validate(&config).is_err());
    }
}
