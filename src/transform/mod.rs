//! Request and response transformation.
//!
//! # Data Flow
//! ```text
//! Outbound (every forwarded call):
//!     inbound headers
//!     → headers.rs (drop hop-by-hop, overwrite origin/referer,
//!       optional fetch-metadata)
//!     → upstream
//!
//! Inbound:
//!     upstream headers
//!     → headers.rs (relay per route policy, optional framing permissions)
//!     → html.rs (join page only: inline bundle, patch asset meta tag)
//!     → client
//! ```

pub mod headers;
pub mod html;

pub use headers::{RelayPolicy, SpoofedOrigin};
pub use html::HtmlRewriter;
