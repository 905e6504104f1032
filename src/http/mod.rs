//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, panic safety net)
//!     → routing (classify into a route kind)
//!     → per-kind handler:
//!         websocket.rs  (upgrade relay)
//!         request.rs    (buffer body) → upstream → response.rs (stream / rewrite)
//!         login bridge  (form page, JSON submission)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod websocket;

pub use request::{MakeRequestUuid, RequestIdExt, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
