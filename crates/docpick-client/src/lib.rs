//! # docpick-client
//!
//! HTTP access to the primary document-metadata service and the legacy
//! uploads index.
//!
//! This crate provides:
//! - `HttpDocumentBackend`, a `reqwest` implementation of `DocumentBackend`
//! - Boundary schema validation that turns service payloads into canonical
//!   `Document` records and reports the rest as `ParseFailure`
//! - `ClientConfig` with environment loading and validation
//!
//! # Example
//!
//! ```rust,no_run
//! use docpick_client::{ClientConfig, HttpDocumentBackend};
//! use docpick_core::{DocumentBackend, FilterState};
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = HttpDocumentBackend::new(ClientConfig::from_env()).unwrap();
//!     let page = backend.list_documents(&FilterState::new().with_query("invoice")).await.unwrap();
//!     println!("{} documents", page.documents.len());
//! }
//! ```

pub mod config;
pub mod http;
pub mod wire;

pub use config::ClientConfig;
pub use http::HttpDocumentBackend;
