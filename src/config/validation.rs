//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (TTL > 0, addresses parse)
//! - Check URLs use a scheme the forwarder can speak
//! - Detect login paths shadowed by higher-priority static rules
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    match Url::parse(&config.upstream.origin) {
        Ok(url) => {
            if !matches!(url.scheme(), "http" | "https") {
                errors.push(ValidationError::new(
                    "upstream.origin",
                    format!("unsupported scheme '{}'", url.scheme()),
                ));
            }
            if url.path() != "/" || url.query().is_some() {
                errors.push(ValidationError::new(
                    "upstream.origin",
                    "must be a bare origin without path or query",
                ));
            }
        }
        Err(e) => errors.push(ValidationError::new(
            "upstream.origin",
            format!("invalid URL: {}", e),
        )),
    }

    match Url::parse(&config.bundle.source_url) {
        Ok(url) if !matches!(url.scheme(), "http" | "https") => {
            errors.push(ValidationError::new(
                "bundle.source_url",
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }
        Ok(_) => {}
        Err(e) => errors.push(ValidationError::new(
            "bundle.source_url",
            format!("invalid URL: {}", e),
        )),
    }

    if config.bundle.ttl_secs == 0 {
        errors.push(ValidationError::new("bundle.ttl_secs", "must be greater than 0"));
    }

    if !config.routing.join_path.starts_with('/') {
        errors.push(ValidationError::new("routing.join_path", "must start with '/'"));
    }

    for prefix in &config.routing.static_prefixes {
        if !prefix.starts_with('/') {
            errors.push(ValidationError::new(
                "routing.static_prefixes",
                format!("'{}' must start with '/'", prefix),
            ));
        }
    }

    if config.login.enabled {
        let paths = [
            ("login.page_path", &config.login.page_path),
            ("login.submit_path", &config.login.submit_path),
        ];
        for (field, path) in paths {
            if !path.starts_with('/') {
                errors.push(ValidationError::new(field, "must start with '/'"));
                continue;
            }
            let shadowed = config
                .routing
                .static_prefixes
                .iter()
                .any(|prefix| path.starts_with(prefix.as_str()))
                || has_extension(path, &config.routing.static_extensions)
                || has_extension(path, &config.routing.asset_extensions);
            if shadowed {
                errors.push(ValidationError::new(
                    field,
                    format!("'{}' would be claimed by a static or asset rule", path),
                ));
            }
        }
        if config.login.page_path == config.login.submit_path {
            errors.push(ValidationError::new(
                "login.submit_path",
                "must differ from login.page_path",
            ));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn has_extension(path: &str, extensions: &[String]) -> bool {
    extensions
        .iter()
        .any(|ext| path.strip_suffix(ext.as_str()).is_some_and(|rest| rest.ends_with('.')))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(validate_config(&ProxyConfig::default()), Ok(()));
    }

    #[test]
    fn reports_every_error() {
        let mut config = ProxyConfig::default();
        config.upstream.origin = "not a url".to_string();
        config.bundle.ttl_secs = 0;
        config.routing.join_path = "join".to_string();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec!["upstream.origin", "bundle.ttl_secs", "routing.join_path"]
        );
    }

    #[test]
    fn origin_with_path_rejected() {
        let mut config = ProxyConfig::default();
        config.upstream.origin = "https://www.gimkit.com/join".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn login_path_under_api_prefix_rejected() {
        let mut config = ProxyConfig::default();
        config.login.submit_path = "/api/bridge".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "login.submit_path");
    }

    #[test]
    fn login_paths_ignored_when_disabled() {
        let mut config = ProxyConfig::default();
        config.login.enabled = false;
        config.login.page_path = "/api/login.json".to_string();
        assert_eq!(validate_config(&config), Ok(()));
    }
}
