//! Catalog filter state.
//!
//! `FilterState` is plain data. It never touches the selection; the session
//! turns every setter call into a new fetch generation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::models::Document;

/// Search text, dataset and tag filters applied to the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub query: String,
    pub dataset_id: Option<String>,
    pub tag_ids: BTreeSet<String>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style query.
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.set_query(query);
        self
    }

    /// Builder-style dataset filter.
    pub fn with_dataset(mut self, dataset_id: impl Into<String>) -> Self {
        self.set_dataset(Some(dataset_id.into()));
        self
    }

    /// Builder-style tag filter.
    pub fn with_tag(mut self, tag_id: impl Into<String>) -> Self {
        self.tag_ids.insert(tag_id.into());
        self
    }

    /// Replace the search text. Returns whether the value changed.
    pub fn set_query(&mut self, query: impl Into<String>) -> bool {
        let query = query.into();
        if self.query == query {
            return false;
        }
        self.query = query;
        true
    }

    /// Replace the dataset filter; empty ids clear it.
    pub fn set_dataset(&mut self, dataset_id: Option<String>) -> bool {
        let dataset_id = dataset_id.filter(|id| !id.trim().is_empty());
        if self.dataset_id == dataset_id {
            return false;
        }
        self.dataset_id = dataset_id;
        true
    }

    /// Add the tag if absent, remove it if present.
    pub fn toggle_tag(&mut self, tag_id: impl Into<String>) {
        let tag_id = tag_id.into();
        if !self.tag_ids.remove(&tag_id) {
            self.tag_ids.insert(tag_id);
        }
    }

    /// Replace the whole tag set.
    pub fn set_tags<I, S>(&mut self, tag_ids: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tag_ids: BTreeSet<String> = tag_ids
            .into_iter()
            .map(Into::into)
            .filter(|id| !id.trim().is_empty())
            .collect();
        if self.tag_ids == tag_ids {
            return false;
        }
        self.tag_ids = tag_ids;
        true
    }

    /// Reset every filter.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// True when no filter is active.
    pub fn is_empty(&self) -> bool {
        self.query.trim().is_empty() && self.dataset_id.is_none() && self.tag_ids.is_empty()
    }

    /// Whether the given document passes this filter when evaluated locally.
    ///
    /// Used for sources that cannot filter server-side (the uploads index).
    /// Query matching is a case-insensitive substring test on the name.
    pub fn matches(&self, doc: &Document) -> bool {
        let query = self.query.trim();
        if !query.is_empty() && !doc.name.to_lowercase().contains(&query.to_lowercase()) {
            return false;
        }

        if let Some(dataset_id) = &self.dataset_id {
            if doc.metadata.dataset_id.as_deref() != Some(dataset_id.as_str()) {
                return false;
            }
        }

        self.tag_ids.iter().all(|tag| doc.has_tag(tag))
    }

    /// Query string pairs for the primary documents endpoint.
    ///
    /// Empty filters are omitted; tags travel as one comma-separated value.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        let query = self.query.trim();
        if !query.is_empty() {
            params.push(("query", query.to_string()));
        }
        if let Some(dataset_id) = &self.dataset_id {
            params.push(("dataset_id", dataset_id.clone()));
        }
        if !self.tag_ids.is_empty() {
            let joined = self
                .tag_ids
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(",");
            params.push(("tag_ids", joined));
        }
        params
    }
}
