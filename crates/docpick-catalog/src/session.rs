//! One picker dialog session.
//!
//! `PickerSession` is the reducer that ties the pieces together: filter
//! changes open a new fetch generation, source results flow through the
//! merger, and every applied result re-reconciles the selection. All state
//! transitions are synchronous; the only suspension points are the backend
//! calls made by `refresh`, `retry`, `load_reference_data` and `preview`.

use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use docpick_core::{Document, DocumentBackend, Error, FilterState, ReferenceData, Result};

use crate::config::{SelectionMode, SessionConfig};
use crate::fetcher::CatalogFetcher;
use crate::merger::{ApplyOutcome, CatalogStatus, ReconciliationMerger, SourceResult};
use crate::preview::{Preview, PreviewCache};
use crate::selection::{ConfirmedSelection, SelectionController, SelectionState, ToggleOutcome};

/// Receives the session's output.
pub trait SelectionSink: Send {
    /// Called once with the confirmed selection.
    fn on_confirm(&mut self, selection: ConfirmedSelection);

    /// Called when the upload collaborator reports a failure.
    fn on_upload_error(&mut self, _message: &str) {}
}

/// Identifies the fetch generation a filter change opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub generation: u64,
    pub filter: FilterState,
}

pub struct PickerSession {
    id: Uuid,
    config: SessionConfig,
    fetcher: CatalogFetcher,
    filter: FilterState,
    generation: u64,
    merger: ReconciliationMerger,
    selection: SelectionController,
    preview: PreviewCache,
    reference: ReferenceData,
    sink: Option<Box<dyn SelectionSink>>,
    closed: bool,
}

impl PickerSession {
    /// Open a session with an empty filter at generation 1.
    ///
    /// Nothing is fetched yet; call `refresh` to run the first round.
    pub fn open(backend: Arc<dyn DocumentBackend>, config: SessionConfig) -> Result<Self> {
        config.validate()?;
        let selection = SelectionController::from_config(&config)?;
        let fetcher = CatalogFetcher::new(backend, config.source_timeout());
        let preview = PreviewCache::new(config.preview_chars);

        let mut merger = ReconciliationMerger::new();
        let filter = FilterState::default();
        merger.begin(1, filter.clone());

        let id = Uuid::now_v7();
        info!(
            subsystem = "catalog",
            component = "session",
            session_id = %id,
            mode = %config.mode,
            capacity = config.capacity(),
            external_ids = config.external_ids.len(),
            "Picker session opened"
        );

        Ok(Self {
            id,
            config,
            fetcher,
            filter,
            generation: 1,
            merger,
            selection,
            preview,
            reference: ReferenceData::default(),
            sink: None,
            closed: false,
        })
    }

    /// Attach the receiver for confirmations and upload errors.
    pub fn with_sink(mut self, sink: Box<dyn SelectionSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // -- filters ---------------------------------------------------------

    pub fn set_query(&mut self, query: impl Into<String>) -> Result<FetchTicket> {
        self.ensure_open()?;
        let changed = self.filter.set_query(query);
        Ok(self.ticket_if(changed))
    }

    pub fn set_dataset(&mut self, dataset_id: Option<String>) -> Result<FetchTicket> {
        self.ensure_open()?;
        let changed = self.filter.set_dataset(dataset_id);
        Ok(self.ticket_if(changed))
    }

    pub fn toggle_tag(&mut self, tag_id: impl Into<String>) -> Result<FetchTicket> {
        self.ensure_open()?;
        self.filter.toggle_tag(tag_id);
        Ok(self.ticket_if(true))
    }

    pub fn set_tags<I, S>(&mut self, tag_ids: I) -> Result<FetchTicket>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ensure_open()?;
        let changed = self.filter.set_tags(tag_ids);
        Ok(self.ticket_if(changed))
    }

    pub fn clear_filters(&mut self) -> Result<FetchTicket> {
        self.ensure_open()?;
        let changed = self.filter != FilterState::default();
        self.filter.clear();
        Ok(self.ticket_if(changed))
    }

    /// Open a new generation when the filter moved, else hand back the
    /// current one.
    fn ticket_if(&mut self, changed: bool) -> FetchTicket {
        if changed {
            self.advance();
        }
        FetchTicket {
            generation: self.generation,
            filter: self.filter.clone(),
        }
    }

    fn advance(&mut self) {
        self.generation += 1;
        self.merger.begin(self.generation, self.filter.clone());
        debug!(
            session_id = %self.id,
            generation = self.generation,
            query = %self.filter.query,
            dataset_id = ?self.filter.dataset_id,
            tag_count = self.filter.tag_ids.len(),
            "Filter changed, new fetch generation"
        );
    }

    // -- fetching --------------------------------------------------------

    /// Run a fetch round for the current generation.
    ///
    /// Results are applied as they arrive, so a fast source shows up before
    /// a slow one answers.
    #[instrument(skip(self), fields(subsystem = "catalog", component = "session", op = "refresh", session_id = %self.id, generation = self.generation))]
    pub async fn refresh(&mut self) -> Result<CatalogStatus> {
        self.ensure_open()?;
        let mut round = self.fetcher.round(self.generation, self.filter.clone());
        while let Some(result) = round.next().await {
            self.apply(result);
        }
        let status = self.status();
        info!(
            catalog_size = self.merger.catalog().len(),
            selection_size = self.selection.len(),
            dropped = self.merger.dropped_count(),
            ?status,
            "Fetch round complete"
        );
        Ok(status)
    }

    /// Re-issue the current filter under a new generation.
    pub async fn retry(&mut self) -> Result<CatalogStatus> {
        self.ensure_open()?;
        self.advance();
        self.refresh().await
    }

    /// Load datasets and tags. Lists that fail stay empty.
    #[instrument(skip(self), fields(subsystem = "catalog", component = "session", op = "load_reference_data", session_id = %self.id))]
    pub async fn load_reference_data(&mut self) -> Result<&ReferenceData> {
        self.ensure_open()?;
        let (reference, errors) = self.fetcher.fetch_reference().await;
        if !errors.is_empty() {
            debug!(failed_lists = errors.len(), "Reference data partially loaded");
        }
        self.reference = reference;
        Ok(&self.reference)
    }

    /// Feed one source result through the merger and reconcile the
    /// selection against the resulting catalog.
    pub fn apply(&mut self, result: SourceResult) -> ApplyOutcome {
        let outcome = self.merger.apply(result);
        if outcome == ApplyOutcome::Applied {
            self.selection.reconcile(self.merger.catalog());
        }
        outcome
    }

    // -- selection -------------------------------------------------------

    /// Toggle the document `id`.
    ///
    /// The id must be in the catalog or already selected. In single mode
    /// with confirm-on-select, a pick confirms the session immediately.
    pub fn toggle(&mut self, id: &str) -> Result<ToggleOutcome> {
        self.ensure_open()?;
        let doc = self
            .merger
            .get(id)
            .or_else(|| self.selection.selected().iter().find(|d| d.id == id))
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("document {}", id)))?;

        let outcome = self.selection.toggle(&doc);
        match &outcome {
            ToggleOutcome::Rejected(violation) => {
                warn!(
                    session_id = %self.id,
                    document_id = %id,
                    max = violation.max,
                    "Selection limit reached"
                );
            }
            ToggleOutcome::Added | ToggleOutcome::Replaced { .. }
                if self.config.mode == SelectionMode::Single && self.config.confirm_on_select =>
            {
                self.confirm()?;
            }
            _ => {
                debug!(
                    session_id = %self.id,
                    document_id = %id,
                    ?outcome,
                    selection_size = self.selection.len(),
                    "Selection toggled"
                );
            }
        }
        Ok(outcome)
    }

    /// Hand the selection to the sink and close the session.
    pub fn confirm(&mut self) -> Result<ConfirmedSelection> {
        self.ensure_open()?;
        let confirmed = self.selection.confirm()?;
        if let Some(sink) = self.sink.as_mut() {
            sink.on_confirm(confirmed.clone());
        }
        self.closed = true;
        self.preview.clear();
        info!(
            session_id = %self.id,
            selection_size = confirmed.documents().len(),
            "Selection confirmed"
        );
        Ok(confirmed)
    }

    /// Close without confirming; the selection is discarded.
    pub fn cancel(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.selection.clear();
        self.preview.clear();
        info!(session_id = %self.id, "Picker session cancelled");
    }

    // -- preview ---------------------------------------------------------

    /// Preview document `id`, fetching its content if the catalog record
    /// has none. Returns `None` when the document has no content at all.
    #[instrument(skip(self), fields(subsystem = "catalog", component = "session", op = "preview", session_id = %self.id))]
    pub async fn preview(&mut self, id: &str) -> Result<Option<Preview>> {
        self.ensure_open()?;
        if let Some(cached) = self.preview.focus(id) {
            return Ok(Some(cached.clone()));
        }

        let content = match self.merger.get(id).and_then(|d| d.content.clone()) {
            Some(content) => content,
            None => match self.fetcher.fetch_content(id).await {
                Ok(Document {
                    content: Some(content),
                    ..
                }) => content,
                Ok(_) => {
                    debug!("Document has no content to preview");
                    return Ok(None);
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load preview content");
                    return Err(e);
                }
            },
        };

        if self.preview.store(id, &content) {
            Ok(self.preview.current().cloned())
        } else {
            Ok(None)
        }
    }

    // -- upload collaborator ---------------------------------------------

    /// Forward an upload failure to the sink.
    pub fn report_upload_error(&mut self, message: &str) {
        warn!(session_id = %self.id, error = %message, "Upload failed");
        if let Some(sink) = self.sink.as_mut() {
            sink.on_upload_error(message);
        }
    }

    // -- views -----------------------------------------------------------

    pub fn status(&self) -> CatalogStatus {
        self.merger.status()
    }

    /// Inline error text for partial or total failure.
    pub fn banner(&self) -> Option<String> {
        self.merger.banner()
    }

    pub fn catalog(&self) -> &[Document] {
        self.merger.catalog()
    }

    pub fn selection(&self) -> SelectionState<'_> {
        self.selection.state()
    }

    pub fn selected(&self) -> &[Document] {
        self.selection.selected()
    }

    pub fn can_confirm(&self) -> bool {
        !self.closed && self.selection.can_confirm()
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn dropped_count(&self) -> usize {
        self.merger.dropped_count()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(Error::SessionClosed)
        } else {
            Ok(())
        }
    }
}
