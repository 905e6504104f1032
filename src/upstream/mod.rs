//! Upstream forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! inbound request parts + streamed body
//!     → Upstream::build_request (target URL, filtered + spoofed headers)
//!     → Upstream::send (reqwest, redirects never followed)
//!     → reqwest::Response handed back to the route handler
//! ```
//!
//! # Design Decisions
//! - One shared client; connection pooling is reqwest's
//! - Redirects are relayed to the browser, never followed here
//! - Single attempt: a transport failure is the handler's error

pub mod forwarder;

pub use forwarder::{build_client, client_builder, OutboundRequest, Upstream};
