//! Script bundle cache.
//!
//! # Data Flow
//! ```text
//! join page handler
//!     → BundleCache::get
//!         fresh entry?  → return cached text
//!         otherwise     → GET bundle source → replace entry → return text
//! ```
//!
//! # Design Decisions
//! - One entry for the process lifetime, replaced wholesale (ArcSwapOption)
//! - No lock held across the fetch: concurrent requests that observe a stale
//!   entry may each refetch; all of them store equivalent text
//! - Failures are never cached and stale text is never served

pub mod cache;

pub use cache::{BundleCache, BundleEntry, BundleError};
