//! Edge proxy for the Gimkit web game.
//!
//! Forwards traffic to the upstream origin with spoofed `origin`/`referer`
//! headers, injects a cached script bundle into the join page and bridges
//! the site's email/password login.

pub mod bundle;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod login;
pub mod observability;
pub mod routing;
pub mod transform;
pub mod upstream;

pub use config::schema::ProxyConfig;
pub use error::ProxyError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
