//! Selection state machine.
//!
//! `Idle` (nothing selected) moves to `Selected` in single mode or
//! `SelectedMultiple` in multiple mode through `toggle`, and back through
//! `toggle` on an already-selected id. The selection never exceeds its
//! capacity: 1 in single mode, `max_selections` in multiple mode.
//!
//! Caller-supplied ids start out pending. `reconcile` admits each one the
//! first time a merged catalog contains it, while there is room; an id that
//! arrives when the selection is already full is dropped. Once selected, a
//! seeded id is an ordinary pick: later catalogs never remove it, whether or
//! not the active filter still matches it.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

use docpick_core::{Document, Error, Result};

use crate::config::{SelectionMode, SessionConfig};

/// Toggle refused because the selection is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardinalityViolation {
    pub max: usize,
}

impl fmt::Display for CardinalityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.max == 1 {
            write!(f, "You can select at most 1 document")
        } else {
            write!(f, "You can select at most {} documents", self.max)
        }
    }
}

/// Result of a toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added,
    Removed,
    /// Single mode: the previous pick (by id) was replaced.
    Replaced { previous: String },
    /// Selection unchanged; show the violation as a warning.
    Rejected(CardinalityViolation),
}

impl ToggleOutcome {
    /// Whether the selection changed.
    pub fn changed(&self) -> bool {
        !matches!(self, Self::Rejected(_))
    }
}

/// Borrowed view of the state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionState<'a> {
    Idle,
    Selected(&'a Document),
    SelectedMultiple(&'a [Document]),
}

/// Selection handed to the caller on confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfirmedSelection {
    Single(Document),
    Multiple(Vec<Document>),
}

impl ConfirmedSelection {
    /// Confirmed documents in selection order.
    pub fn documents(&self) -> Vec<&Document> {
        match self {
            Self::Single(doc) => vec![doc],
            Self::Multiple(docs) => docs.iter().collect(),
        }
    }

    /// Confirmed ids in selection order.
    pub fn ids(&self) -> Vec<&str> {
        self.documents().into_iter().map(|d| d.id.as_str()).collect()
    }
}

/// Owns the selection for one picker session.
#[derive(Debug, Clone)]
pub struct SelectionController {
    mode: SelectionMode,
    capacity: usize,
    /// Caller-supplied ids the user has not overridden.
    pending: Vec<String>,
    selected: Vec<Document>,
}

impl SelectionController {
    /// Empty selection with the given mode and bound.
    pub fn new(mode: SelectionMode, max_selections: usize) -> Result<Self> {
        let capacity = match mode {
            SelectionMode::Single => 1,
            SelectionMode::Multiple => max_selections,
        };
        if capacity == 0 {
            return Err(Error::InvalidInput(
                "max_selections must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            mode,
            capacity,
            pending: Vec::new(),
            selected: Vec::new(),
        })
    }

    /// Controller configured from a session config, seeded with its
    /// external ids.
    pub fn from_config(config: &SessionConfig) -> Result<Self> {
        Ok(Self::new(config.mode, config.max_selections)?.with_external_ids(&config.external_ids))
    }

    /// Seed with caller-supplied ids (deduplicated, order kept).
    pub fn with_external_ids<S: AsRef<str>>(mut self, ids: &[S]) -> Self {
        let mut seen = HashSet::new();
        self.pending = ids
            .iter()
            .map(|id| id.as_ref().to_string())
            .filter(|id| !id.is_empty() && seen.insert(id.clone()))
            .collect();
        self
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Selected documents in selection order.
    pub fn selected(&self) -> &[Document] {
        &self.selected
    }

    /// Caller-supplied ids not yet overridden by the user.
    pub fn pending_ids(&self) -> &[String] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.iter().any(|d| d.id == id)
    }

    pub fn state(&self) -> SelectionState<'_> {
        match (self.mode, self.selected.as_slice()) {
            (_, []) => SelectionState::Idle,
            (SelectionMode::Single, [doc, ..]) => SelectionState::Selected(doc),
            (SelectionMode::Multiple, docs) => SelectionState::SelectedMultiple(docs),
        }
    }

    /// Add or remove `doc`.
    ///
    /// Removing is always legal. In single mode adding replaces the current
    /// pick; in multiple mode adding to a full selection is rejected without
    /// changing state.
    pub fn toggle(&mut self, doc: &Document) -> ToggleOutcome {
        if let Some(pos) = self.selected.iter().position(|d| d.id == doc.id) {
            self.selected.remove(pos);
            self.pending.retain(|id| id != &doc.id);
            return ToggleOutcome::Removed;
        }

        match self.mode {
            SelectionMode::Single => {
                // An explicit pick overrides whatever the caller seeded.
                self.pending.clear();
                let previous = self.selected.pop();
                self.selected.push(doc.clone());
                match previous {
                    Some(prev) => ToggleOutcome::Replaced { previous: prev.id },
                    None => ToggleOutcome::Added,
                }
            }
            SelectionMode::Multiple => {
                if self.selected.len() >= self.capacity {
                    debug!(
                        document_id = %doc.id,
                        max = self.capacity,
                        "Selection full, rejecting toggle"
                    );
                    return ToggleOutcome::Rejected(CardinalityViolation { max: self.capacity });
                }
                self.pending.retain(|id| id != &doc.id);
                self.selected.push(doc.clone());
                ToggleOutcome::Added
            }
        }
    }

    /// Fold a freshly merged catalog into the selection.
    ///
    /// Nothing already selected is removed. Selected records the catalog
    /// still carries are refreshed to its version; the rest keep their last
    /// known record. Pending ids present in `catalog` are then admitted in
    /// catalog order until the selection is full, and leave the pending list
    /// either way. Returns whether the selection changed.
    pub fn reconcile(&mut self, catalog: &[Document]) -> bool {
        let mut next: Vec<Document> = self
            .selected
            .iter()
            .map(|doc| catalog.iter().find(|d| d.id == doc.id).unwrap_or(doc).clone())
            .collect();

        let pending: HashSet<&str> = self.pending.iter().map(String::as_str).collect();
        let mut resolved: HashSet<String> = HashSet::new();
        for doc in catalog.iter().filter(|d| pending.contains(d.id.as_str())) {
            resolved.insert(doc.id.clone());
            if next.iter().any(|d| d.id == doc.id) {
                continue;
            }
            if next.len() >= self.capacity {
                debug!(
                    document_id = %doc.id,
                    max = self.capacity,
                    "Selection full, dropping external id"
                );
                continue;
            }
            next.push(doc.clone());
        }
        self.pending.retain(|id| !resolved.contains(id));

        let changed = next != self.selected;
        if changed {
            debug!(
                selection_size = next.len(),
                pending = self.pending.len(),
                catalog_size = catalog.len(),
                "Selection reconciled"
            );
        }
        self.selected = next;
        changed
    }

    /// Whether `confirm` would succeed.
    pub fn can_confirm(&self) -> bool {
        !self.selected.is_empty()
    }

    /// The current selection by value.
    pub fn confirm(&self) -> Result<ConfirmedSelection> {
        match (self.mode, self.selected.first()) {
            (_, None) => Err(Error::EmptySelection),
            (SelectionMode::Single, Some(doc)) => Ok(ConfirmedSelection::Single(doc.clone())),
            (SelectionMode::Multiple, Some(_)) => {
                Ok(ConfirmedSelection::Multiple(self.selected.clone()))
            }
        }
    }

    /// Drop the selection and every pending id.
    pub fn clear(&mut self) {
        self.selected.clear();
        self.pending.clear();
    }
}
