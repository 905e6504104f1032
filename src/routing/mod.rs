//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path, upgrade header)
//!     → router.rs (ordered route lookup)
//!     → matcher.rs (evaluate match conditions)
//!     → Return: matched Route (kind + relay policy) or NoMatch
//!
//! Route Compilation (at startup):
//!     ProxyConfig
//!     → websocket, asset, static, login, join, redirect, passthrough
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (suffix and prefix matching only)
//! - Deterministic: same input always matches same route
//! - First match wins (fixed priority order)

pub mod matcher;
pub mod router;

pub use router::{Route, RouteKind, Router};
