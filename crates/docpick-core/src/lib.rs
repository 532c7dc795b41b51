//! # docpick-core
//!
//! Core types, traits, and abstractions for the docpick document picker.
//!
//! This crate provides the canonical `Document` record shared by both
//! document sources, the `FilterState` that drives catalog reloads, and the
//! `DocumentBackend` trait the catalog engine fetches through.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Both sources failed, nothing to show |
//! | WARN  | Source degraded, fallback applied, record dropped at the boundary |
//! | INFO  | Session lifecycle (open, confirm, cancel) |
//! | DEBUG | Decision points (stale discard, skipped secondary, reconcile) |
//! | TRACE | Per-record iteration |

pub mod defaults;
pub mod error;
pub mod filter;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use filter::FilterState;
pub use models::*;
pub use traits::*;
