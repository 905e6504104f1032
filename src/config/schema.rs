//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The single origin every request is forwarded to.
    pub upstream: UpstreamConfig,

    /// Remote script bundle injected into the join page.
    pub bundle: BundleConfig,

    /// Classification rules.
    pub routing: RoutingConfig,

    /// HTML rewrite anchors.
    pub rewrite: RewriteConfig,

    /// Optional behaviours toggled per deployment.
    pub features: FeatureConfig,

    /// Login bridge settings.
    pub login: LoginConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8787").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8787".to_string(),
        }
    }
}

/// Upstream origin configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Scheme and authority of the proxied site, without a trailing path.
    pub origin: String,

    /// Honour `HTTP_PROXY`/`HTTPS_PROXY`/`NO_PROXY` for outbound calls.
    pub system_proxy: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            origin: "https://www.gimkit.com".to_string(),
            system_proxy: true,
        }
    }
}

/// Bundle cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BundleConfig {
    /// Absolute URL the bundle is fetched from.
    pub source_url: String,

    /// Freshness window in seconds.
    pub ttl_secs: u64,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            source_url:
                "https://raw.githubusercontent.com/TheLazySquid/GimkitCheat/main/build/bundle.js"
                    .to_string(),
            ttl_secs: 300,
        }
    }
}

/// Route classification configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Path whose HTML gets the bundle injected.
    pub join_path: String,

    /// Binary asset extensions (without the dot), relayed with minimal headers.
    pub asset_extensions: Vec<String>,

    /// Script/style/data extensions (without the dot), relayed with full headers.
    pub static_extensions: Vec<String>,

    /// Path prefixes reserved for static bundles and API calls.
    pub static_prefixes: Vec<String>,

    /// Answer `/` with a redirect to the join path.
    pub redirect_root_to_join: bool,

    /// Forward paths no other rule claims. When off they get a 404.
    pub proxy_unmatched: bool,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        let assets = [
            "png", "jpg", "jpeg", "svg", "webm", "ico", "gif", "ttf", "otf", "atlas", "woff",
            "woff2", "mp3", "mp4", "m4a",
        ];
        Self {
            join_path: "/join".to_string(),
            asset_extensions: assets.iter().map(|s| s.to_string()).collect(),
            static_extensions: ["js", "css", "json"].iter().map(|s| s.to_string()).collect(),
            static_prefixes: vec!["/pages/".to_string(), "/api/".to_string()],
            redirect_root_to_join: false,
            proxy_unmatched: true,
        }
    }
}

/// HTML rewrite configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// `property` attribute of the meta tag naming the asset origin.
    pub asset_meta_property: String,

    /// Value the upstream writes into that meta tag.
    /// Empty means "the upstream origin".
    pub asset_meta_content: String,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            asset_meta_property: "cdn-map-assets-url".to_string(),
            asset_meta_content: String::new(),
        }
    }
}

/// Behaviour toggles.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Forward WebSocket upgrades untouched.
    pub websocket_passthrough: bool,

    /// Strip framing restrictions from every response.
    pub frame_embedding: bool,

    /// Synthesize `sec-fetch-*` headers on static/API calls.
    pub browser_fingerprint: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            websocket_passthrough: true,
            frame_embedding: false,
            browser_fingerprint: false,
        }
    }
}

/// Login bridge configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoginConfig {
    /// Serve the login bridge.
    pub enabled: bool,

    /// Path serving the login form.
    pub page_path: String,

    /// Path accepting the JSON submission.
    pub submit_path: String,

    /// Upstream path answering whether an email has an account.
    pub email_check_path: String,

    /// Upstream path accepting credentials.
    pub credentials_path: String,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            page_path: "/proxy-login".to_string(),
            submit_path: "/proxy-login/submit".to_string(),
            email_check_path: "/api/users/register/email-info".to_string(),
            credentials_path: "/api/login".to_string(),
        }
    }
}

/// Timeout configuration for outbound calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { connect_secs: 10 }
    }
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum login submission body size in bytes.
    /// Forwarded bodies are streamed and never capped.
    pub max_body_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

impl ProxyConfig {
    /// Value the upstream writes into the asset meta tag.
    pub fn asset_meta_content(&self) -> &str {
        if self.rewrite.asset_meta_content.is_empty() {
            self.upstream.origin.trim_end_matches('/')
        } else {
            &self.rewrite.asset_meta_content
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config: ProxyConfig = toml::from_str("").unwrap();
        assert_eq!(config.upstream.origin, "https://www.gimkit.com");
        assert!(config.upstream.system_proxy);
        assert_eq!(config.bundle.ttl_secs, 300);
        assert_eq!(config.routing.join_path, "/join");
        assert!(config.features.websocket_passthrough);
        assert!(!config.features.frame_embedding);
        assert!(config.login.enabled);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [upstream]
            origin = "http://127.0.0.1:9000"

            [features]
            frame_embedding = true
            "#,
        )
        .unwrap();
        assert_eq!(config.upstream.origin, "http://127.0.0.1:9000");
        assert!(config.features.frame_embedding);
        assert!(config.features.websocket_passthrough);
        assert_eq!(config.routing.static_prefixes, vec!["/pages/", "/api/"]);
    }

    #[test]
    fn system_proxy_can_be_disabled() {
        let config: ProxyConfig =
            toml::from_str("[upstream]\nsystem_proxy = false").unwrap();
        assert!(!config.upstream.system_proxy);
        assert_eq!(config.upstream.origin, "https://www.gimkit.com");
    }

    #[test]
    fn meta_content_defaults_to_origin() {
        let mut config = ProxyConfig::default();
        assert_eq!(config.asset_meta_content(), "https://www.gimkit.com");

        config.rewrite.asset_meta_content = "https://cdn.example".to_string();
        assert_eq!(config.asset_meta_content(), "https://cdn.example");
    }
}
