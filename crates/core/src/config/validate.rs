use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Credentials are present
/// - Numeric limits are usable
/// - Thresholds are ratios
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.discogs.api_key.trim().is_empty() {
        return Err(invalid("discogs.api_key cannot be empty"));
    }
    if config.discogs.per_page == 0 || config.discogs.per_page > 100 {
        return Err(invalid("discogs.per_page must be between 1 and 100"));
    }
    if config.discogs.format_preference.is_empty() {
        return Err(invalid("discogs.format_preference cannot be empty"));
    }

    if config.tracker.username.trim().is_empty() || config.tracker.password.is_empty() {
        return Err(invalid("tracker.username and tracker.password are required"));
    }
    if config.tracker.max_login_attempts == 0 {
        return Err(invalid("tracker.max_login_attempts cannot be 0"));
    }
    if config.discogs.timeout_secs == 0 || config.tracker.timeout_secs == 0 {
        return Err(invalid("timeout_secs cannot be 0"));
    }

    if config.matcher.max_results == 0 {
        return Err(invalid("matcher.max_results cannot be 0"));
    }
    if config.matcher.over_fetch_factor == 0 {
        return Err(invalid("matcher.over_fetch_factor cannot be 0"));
    }
    if !(0.0..=1.0).contains(&config.matcher.threshold) {
        return Err(invalid("matcher.threshold must be between 0 and 1"));
    }
    if !(0.0..=1.0).contains(&config.selection.keyword_ratio_threshold) {
        return Err(invalid("selection.keyword_ratio_threshold must be between 0 and 1"));
    }

    Ok(())
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::ValidationError(message.to_string())
}
