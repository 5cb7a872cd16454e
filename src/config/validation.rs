//! Configuration validation.
//!
//! Serde handles syntax; this pass checks value ranges and cross-field
//! constraints. Every problem is reported, not just the first one.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::AppConfig;

/// A single semantic problem in a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),

    #[error("database.url must not be empty")]
    EmptyDatabaseUrl,

    #[error("database.max_connections must be greater than zero")]
    ZeroConnections,

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroRequestTimeout,

    #[error("rate_limit.{0} must be greater than zero")]
    RateLimitZero(&'static str),

    #[error("rate_limit.path_prefix `{0}` must start with '/'")]
    RateLimitPrefix(String),

    #[error("access_window.start and access_window.end must differ")]
    EmptyAccessWindow,

    #[error("access_window.utc_offset_minutes {0} is outside -1439..=1439")]
    UtcOffset(i32),

    #[error("request_log.path must not be empty")]
    EmptyRequestLogPath,

    #[error("roles.allowed_roles must not be empty while the role check is enabled")]
    NoAllowedRoles,

    #[error("observability.metrics_address `{0}` is not a socket address")]
    MetricsAddress(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if config.database.url.trim().is_empty() {
        errors.push(ValidationError::EmptyDatabaseUrl);
    }
    if config.database.max_connections == 0 {
        errors.push(ValidationError::ZeroConnections);
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    let rate = &config.rate_limit;
    if rate.enabled {
        if rate.max_requests == 0 {
            errors.push(ValidationError::RateLimitZero("max_requests"));
        }
        if rate.window_secs == 0 {
            errors.push(ValidationError::RateLimitZero("window_secs"));
        }
        if !rate.path_prefix.starts_with('/') {
            errors.push(ValidationError::RateLimitPrefix(rate.path_prefix.clone()));
        }
    }

    let window = &config.access_window;
    if window.enabled && window.start == window.end {
        errors.push(ValidationError::EmptyAccessWindow);
    }
    if !(-1439..=1439).contains(&window.utc_offset_minutes) {
        errors.push(ValidationError::UtcOffset(window.utc_offset_minutes));
    }

    if config.request_log.enabled && config.request_log.path.trim().is_empty() {
        errors.push(ValidationError::EmptyRequestLogPath);
    }

    if config.roles.enabled && config.roles.allowed_roles.is_empty() {
        errors.push(ValidationError::NoAllowedRoles);
    }

    let observability = &config.observability;
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::MetricsAddress(observability.metrics_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(validate_config(&AppConfig::default()), Ok(()));
    }

    #[test]
    fn test_reports_every_problem() {
        let mut config = AppConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.rate_limit.max_requests = 0;
        config.rate_limit.path_prefix = "api/messages".into();
        config.access_window.enabled = true;
        config.access_window.end = config.access_window.start;
        config.roles.allowed_roles.clear();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::BindAddress("not-an-address".into()),
                ValidationError::RateLimitZero("max_requests"),
                ValidationError::RateLimitPrefix("api/messages".into()),
                ValidationError::EmptyAccessWindow,
                ValidationError::NoAllowedRoles,
            ]
        );
    }

    #[test]
    fn test_disabled_sections_are_not_checked() {
        let mut config = AppConfig::default();
        config.rate_limit.enabled = false;
        config.rate_limit.window_secs = 0;
        config.request_log.enabled = false;
        config.request_log.path.clear();

        assert!(validate_config(&config).is_ok());
    }
}
