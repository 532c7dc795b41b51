//! Core traits for docpick abstractions.
//!
//! `DocumentBackend` is the seam between the catalog engine and whatever
//! transport reaches the document services, so the engine can be driven by
//! the HTTP client in production and by scripted mocks in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;
use crate::filter::FilterState;
use crate::models::{Dataset, Document, Tag};

/// A record that failed boundary validation and was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseFailure {
    /// Record id, when the payload got far enough to carry one.
    pub id: Option<String>,
    pub reason: String,
}

impl ParseFailure {
    pub fn new(id: Option<String>, reason: impl Into<String>) -> Self {
        Self {
            id,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "record {}: {}", id, self.reason),
            None => write!(f, "record without id: {}", self.reason),
        }
    }
}

/// One source's answer: validated documents plus what was dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentPage {
    pub documents: Vec<Document>,
    /// Total reported by the source (may exceed `documents.len()`).
    pub total: usize,
    pub dropped: Vec<ParseFailure>,
}

impl DocumentPage {
    /// Page whose total equals its length.
    pub fn from_documents(documents: Vec<Document>) -> Self {
        let total = documents.len();
        Self {
            documents,
            total,
            dropped: Vec::new(),
        }
    }
}

/// Access to the primary document service and the legacy uploads index.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Query the primary source with search, dataset and tag filters applied.
    async fn list_documents(&self, filter: &FilterState) -> Result<DocumentPage>;

    /// Read the uploads index, normalized to canonical documents.
    ///
    /// Returns `Error::NotFound` when the index is absent.
    async fn list_uploads(&self) -> Result<DocumentPage>;

    /// Fetch one document including its full content.
    async fn fetch_document(&self, id: &str) -> Result<Document>;

    /// List datasets for the filter bar.
    async fn list_datasets(&self) -> Result<Vec<Dataset>>;

    /// List tags for the filter bar.
    async fn list_tags(&self) -> Result<Vec<Tag>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_failure_display() {
        let with_id = ParseFailure::new(Some("d1".into()), "missing name");
        assert_eq!(with_id.to_string(), "record d1: missing name");
        let without = ParseFailure::new(None, "not an object");
        assert_eq!(without.to_string(), "record without id: not an object");
    }

    #[test]
    fn test_page_from_documents_total() {
        let page = DocumentPage::from_documents(Vec::new());
        assert_eq!(page.total, 0);
        assert!(page.dropped.is_empty());
    }
}
