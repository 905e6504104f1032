//! Login bridge.
//!
//! # Data Flow
//! ```text
//! GET  <page_path>    → static form (login.html)
//! POST <submit_path>  {email, password}
//!     → upstream email check   (missing account / no password → 200 {error})
//!     → upstream credentials   (message / no user → 200 {error})
//!     → 200 {success: true} + upstream set-cookie
//! ```
//!
//! # Design Decisions
//! - Only a wrong method (405) or unparsable body (400) is an HTTP error;
//!   credential problems are 200 with an `error` field so the form can show
//!   them inline
//! - Unreadable upstream answers to the email check are internal errors

pub mod bridge;

pub use bridge::{LoginBridge, LoginSubmission};
