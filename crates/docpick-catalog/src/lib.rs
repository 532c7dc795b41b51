//! # docpick-catalog
//!
//! Catalog aggregation and selection engine behind the document picker.
//!
//! This crate provides:
//! - `CatalogFetcher`: per-source fetches with time budgets, tagged by
//!   generation and yielded in arrival order
//! - `ReconciliationMerger`: a commutative, idempotent merge of partial
//!   source results into one deduplicated catalog
//! - `SelectionController`: the bounded selection state machine, including
//!   reconciliation of caller-supplied ids
//! - `PreviewCache`: last-write-wins preview of the focused document
//! - `PickerSession`: the reducer that wires them together for one dialog
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use docpick_catalog::{PickerSession, SessionConfig};
//! use docpick_client::HttpDocumentBackend;
//!
//! #[tokio::main]
//! async fn main() -> docpick_core::Result<()> {
//!     let backend = Arc::new(HttpDocumentBackend::from_env()?);
//!     let mut session = PickerSession::open(backend, SessionConfig::multiple(3))?;
//!     session.refresh().await?;
//!     if let Some(first) = session.catalog().first().map(|d| d.id.clone()) {
//!         session.toggle(&first)?;
//!     }
//!     let confirmed = session.confirm()?;
//!     println!("{:?}", confirmed.ids());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod fetcher;
pub mod merger;
pub mod preview;
pub mod selection;
pub mod session;

pub use config::{SelectionMode, SessionConfig};
pub use fetcher::{CatalogFetcher, FetchRound};
pub use merger::{
    ApplyOutcome, CatalogStatus, ReconciliationMerger, SourceOutcome, SourceResult, UploadFeed,
};
pub use preview::{Preview, PreviewCache};
pub use selection::{
    CardinalityViolation, ConfirmedSelection, SelectionController, SelectionState, ToggleOutcome,
};
pub use session::{FetchTicket, PickerSession, SelectionSink};
