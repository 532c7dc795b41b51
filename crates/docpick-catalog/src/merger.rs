//! Reconciliation of the primary and uploads sources into one catalog.
//!
//! The merger keeps one slot per source holding that source's last
//! known-good records. The catalog is always recomputed from the two slots
//! and the active filter, never patched in place, which makes `apply`
//! commutative and idempotent with respect to arrival order:
//!
//! 1. Primary records first, in source order, deduplicated by id. Records
//!    retained from a round under a different filter are re-checked locally.
//! 2. Upload-origin records then come from one [`UploadFeed`]:
//!    - `Primary` when the current primary answer already carries
//!      upload-origin records (the index is skipped entirely), or when the
//!      index answered 404 or failed with nothing retained. The primary
//!      result's own upload-origin records were merged in step 1, so the
//!      feed adds nothing further; an empty fallback is only logged.
//!    - `Index` otherwise: upload records not already present are appended
//!      after the filter is applied locally (the index cannot filter
//!      server-side).
//!
//! A failing source keeps its slot; it degrades the catalog, never empties it.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, error, trace, warn};

use docpick_core::{Document, DocumentPage, FilterState, SourceKind};

/// What a single source fetch produced.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceOutcome {
    Loaded(DocumentPage),
    /// HTTP 404: the source has nothing, which is not an error.
    NotFound,
    /// Transport, timeout, status or envelope failure.
    Failed(String),
}

/// A source outcome tagged with the fetch generation it answers.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceResult {
    pub generation: u64,
    pub source: SourceKind,
    pub outcome: SourceOutcome,
}

/// Whether `apply` used or discarded a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// Answer to an older (or unknown) generation.
    Stale,
}

/// Where the catalog's upload-origin records come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadFeed {
    /// The dedicated uploads index, fresh or retained.
    Index,
    /// Upload-origin records inside the primary result.
    Primary,
}

/// Load state shown alongside the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CatalogStatus {
    /// At least one source has not answered for the current generation.
    Loading,
    /// Every needed source answered and the catalog has entries.
    Ready,
    /// Every needed source answered and nothing matched.
    NoDocuments,
    /// One source failed; the catalog shows what the other supplied.
    Partial { failed: Vec<SourceKind> },
    /// Both sources failed.
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
enum SlotState {
    Pending,
    Loaded,
    NotFound,
    Failed(String),
}

#[derive(Debug, Clone)]
struct Slot {
    known_good: Vec<Document>,
    /// Filter in force when `known_good` was loaded.
    loaded_under: Option<FilterState>,
    state: SlotState,
    dropped: usize,
}

impl Slot {
    fn new() -> Self {
        Self {
            known_good: Vec::new(),
            loaded_under: None,
            state: SlotState::Pending,
            dropped: 0,
        }
    }

    fn failure(&self) -> Option<&str> {
        match &self.state {
            SlotState::Failed(msg) => Some(msg),
            _ => None,
        }
    }
}

/// Merges partial source results into a deduplicated catalog.
#[derive(Debug, Clone)]
pub struct ReconciliationMerger {
    generation: u64,
    filter: FilterState,
    primary: Slot,
    uploads: Slot,
    catalog: Vec<Document>,
}

impl Default for ReconciliationMerger {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconciliationMerger {
    pub fn new() -> Self {
        Self {
            generation: 0,
            filter: FilterState::default(),
            primary: Slot::new(),
            uploads: Slot::new(),
            catalog: Vec::new(),
        }
    }

    /// Start a new fetch generation under `filter`.
    ///
    /// Both slots go back to pending but keep their records, so the catalog
    /// stays populated while the new round is in flight. Generations that do
    /// not move forward are ignored.
    pub fn begin(&mut self, generation: u64, filter: FilterState) -> bool {
        if generation <= self.generation {
            debug!(
                generation,
                current = self.generation,
                "Ignoring non-increasing generation"
            );
            return false;
        }
        self.generation = generation;
        self.filter = filter;
        self.primary.state = SlotState::Pending;
        self.uploads.state = SlotState::Pending;
        self.rebuild();
        true
    }

    /// Fold one source result into the catalog.
    pub fn apply(&mut self, result: SourceResult) -> ApplyOutcome {
        if result.generation != self.generation {
            debug!(
                source = %result.source,
                generation = result.generation,
                current = self.generation,
                "Discarding stale source result"
            );
            return ApplyOutcome::Stale;
        }

        let source = result.source;
        let slot = match source {
            SourceKind::Primary => &mut self.primary,
            SourceKind::Uploads => &mut self.uploads,
        };

        match result.outcome {
            SourceOutcome::Loaded(page) => {
                slot.dropped = page.dropped.len();
                slot.known_good = dedup_within(source, page.documents);
                slot.loaded_under = Some(self.filter.clone());
                slot.state = SlotState::Loaded;
            }
            SourceOutcome::NotFound => match source {
                // An absent uploads index has zero records.
                SourceKind::Uploads => {
                    slot.known_good.clear();
                    slot.loaded_under = None;
                    slot.dropped = 0;
                    slot.state = SlotState::NotFound;
                }
                SourceKind::Primary => {
                    warn!(source = %source, "Primary source answered 404, keeping previous records");
                    slot.state = SlotState::Failed("documents endpoint not found".to_string());
                }
            },
            SourceOutcome::Failed(msg) => {
                warn!(
                    source = %source,
                    error = %msg,
                    retained = slot.known_good.len(),
                    "Source failed, keeping previous records"
                );
                slot.state = SlotState::Failed(msg);
            }
        }

        self.rebuild();
        if source == SourceKind::Uploads
            && self.upload_feed() == UploadFeed::Primary
            && !self.primary.known_good.iter().any(Document::is_upload)
        {
            debug!("Uploads index unavailable and primary result has no upload records");
        }
        if self.status() == CatalogStatus::Failed {
            error!(
                generation = self.generation,
                catalog_size = self.catalog.len(),
                "Both document sources failed"
            );
        }
        ApplyOutcome::Applied
    }

    fn rebuild(&mut self) {
        self.catalog = self.merged();
    }

    fn merged(&self) -> Vec<Document> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut catalog: Vec<Document> = Vec::new();

        let primary_stale = self.primary.loaded_under.as_ref() != Some(&self.filter);
        for doc in &self.primary.known_good {
            if primary_stale && !self.filter.matches(doc) {
                trace!(document_id = %doc.id, "Retained primary record filtered out locally");
                continue;
            }
            if seen.insert(doc.id.as_str()) {
                catalog.push(doc.clone());
            }
        }

        match self.upload_feed() {
            UploadFeed::Primary => {
                trace!("Upload records taken from the primary result");
            }
            UploadFeed::Index => {
                for doc in &self.uploads.known_good {
                    if !self.filter.matches(doc) {
                        trace!(document_id = %doc.id, "Upload record filtered out locally");
                        continue;
                    }
                    if seen.insert(doc.id.as_str()) {
                        catalog.push(doc.clone());
                    } else {
                        trace!(document_id = %doc.id, "Primary record takes precedence");
                    }
                }
            }
        }

        catalog
    }

    /// Which feed supplies upload-origin records.
    ///
    /// The index is skipped only when the primary source answered for the
    /// current generation with upload-origin records of its own. An index
    /// that answered 404, or failed with nothing retained, falls back to the
    /// primary result.
    pub fn upload_feed(&self) -> UploadFeed {
        if self.primary_embeds_uploads() {
            return UploadFeed::Primary;
        }
        match self.uploads.state {
            SlotState::NotFound => UploadFeed::Primary,
            SlotState::Failed(_) if self.uploads.known_good.is_empty() => UploadFeed::Primary,
            _ => UploadFeed::Index,
        }
    }

    fn primary_embeds_uploads(&self) -> bool {
        self.primary.state == SlotState::Loaded
            && self.primary.known_good.iter().any(Document::is_upload)
    }

    /// The merged catalog.
    pub fn catalog(&self) -> &[Document] {
        &self.catalog
    }

    /// Look up a catalog entry by id.
    pub fn get(&self, id: &str) -> Option<&Document> {
        self.catalog.iter().find(|d| d.id == id)
    }

    /// Generation the merger currently accepts.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Filter of the current generation.
    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    /// Records dropped by boundary validation in the latest loads.
    pub fn dropped_count(&self) -> usize {
        self.primary.dropped + self.uploads.dropped
    }

    /// Current load state.
    pub fn status(&self) -> CatalogStatus {
        let uploads_needed = !self.primary_embeds_uploads();

        if self.primary.state == SlotState::Pending
            || (uploads_needed && self.uploads.state == SlotState::Pending)
        {
            return CatalogStatus::Loading;
        }

        let mut failed = Vec::new();
        if self.primary.failure().is_some() {
            failed.push(SourceKind::Primary);
        }
        if uploads_needed && self.uploads.failure().is_some() {
            failed.push(SourceKind::Uploads);
        }

        match failed.len() {
            0 if self.catalog.is_empty() => CatalogStatus::NoDocuments,
            0 => CatalogStatus::Ready,
            2 => CatalogStatus::Failed,
            _ => CatalogStatus::Partial { failed },
        }
    }

    /// Non-blocking message to show above the catalog, if any.
    pub fn banner(&self) -> Option<String> {
        match self.status() {
            CatalogStatus::Failed => {
                Some("Failed to load documents. Retry to try again.".to_string())
            }
            CatalogStatus::Partial { failed } => {
                let detail = failed
                    .iter()
                    .map(|source| {
                        let slot = match source {
                            SourceKind::Primary => &self.primary,
                            SourceKind::Uploads => &self.uploads,
                        };
                        format!("{} ({})", source, slot.failure().unwrap_or("unavailable"))
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                Some(format!("Some documents could not be loaded: {}", detail))
            }
            _ => None,
        }
    }
}

/// Keep the first record per id within one source.
fn dedup_within(source: SourceKind, documents: Vec<Document>) -> Vec<Document> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(documents.len());
    for doc in documents {
        if seen.insert(doc.id.clone()) {
            unique.push(doc);
        } else {
            warn!(source = %source, document_id = %doc.id, "Duplicate id within source, keeping first");
        }
    }
    unique
}
