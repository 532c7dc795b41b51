//! Source fetching with per-source time budgets.
//!
//! Each fetch is independent: a slow or failing source never holds back the
//! other, and every answer is tagged with the generation it was issued for
//! so the merger can discard it if the filters moved on in the meantime.

use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::FutureExt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

use docpick_core::{
    Document, DocumentBackend, Error, FilterState, ReferenceData, Result, SourceKind,
};

use crate::merger::{SourceOutcome, SourceResult};

/// A fetch round in flight; yields results in arrival order.
pub type FetchRound = FuturesUnordered<BoxFuture<'static, SourceResult>>;

/// Issues source requests against a `DocumentBackend`.
#[derive(Clone)]
pub struct CatalogFetcher {
    backend: Arc<dyn DocumentBackend>,
    timeout: Duration,
}

impl CatalogFetcher {
    pub fn new(backend: Arc<dyn DocumentBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Query the primary source under `filter`.
    #[instrument(skip(self, filter), fields(subsystem = "catalog", component = "fetcher", op = "fetch_primary"))]
    pub async fn fetch_primary(&self, generation: u64, filter: FilterState) -> SourceResult {
        let start = Instant::now();
        let result = tokio::time::timeout(self.timeout, self.backend.list_documents(&filter)).await;
        let outcome = self.outcome(SourceKind::Primary, result);
        debug!(
            duration_ms = start.elapsed().as_millis() as u64,
            "Primary source answered"
        );
        SourceResult {
            generation,
            source: SourceKind::Primary,
            outcome,
        }
    }

    /// Read the uploads index.
    #[instrument(skip(self), fields(subsystem = "catalog", component = "fetcher", op = "fetch_uploads"))]
    pub async fn fetch_uploads(&self, generation: u64) -> SourceResult {
        let start = Instant::now();
        let result = tokio::time::timeout(self.timeout, self.backend.list_uploads()).await;
        let outcome = self.outcome(SourceKind::Uploads, result);
        debug!(
            duration_ms = start.elapsed().as_millis() as u64,
            "Uploads source answered"
        );
        SourceResult {
            generation,
            source: SourceKind::Uploads,
            outcome,
        }
    }

    /// Start both source fetches for one generation.
    pub fn round(&self, generation: u64, filter: FilterState) -> FetchRound {
        let round = FetchRound::new();

        let primary = self.clone();
        round.push(async move { primary.fetch_primary(generation, filter).await }.boxed());

        let uploads = self.clone();
        round.push(async move { uploads.fetch_uploads(generation).await }.boxed());

        round
    }

    /// Load datasets and tags for the filter bar.
    ///
    /// A list that fails comes back empty; the errors are returned so the
    /// caller can decide whether to surface them.
    #[instrument(skip(self), fields(subsystem = "catalog", component = "fetcher", op = "fetch_reference"))]
    pub async fn fetch_reference(&self) -> (ReferenceData, Vec<Error>) {
        let (datasets, tags) = tokio::join!(
            tokio::time::timeout(self.timeout, self.backend.list_datasets()),
            tokio::time::timeout(self.timeout, self.backend.list_tags()),
        );

        let mut errors = Vec::new();
        let datasets = match flatten(datasets, self.timeout) {
            Ok(datasets) => datasets,
            Err(e) => {
                warn!(error = %e, "Failed to load datasets");
                errors.push(e);
                Vec::new()
            }
        };
        let tags = match flatten(tags, self.timeout) {
            Ok(tags) => tags,
            Err(e) => {
                warn!(error = %e, "Failed to load tags");
                errors.push(e);
                Vec::new()
            }
        };

        debug!(
            dataset_count = datasets.len(),
            tag_count = tags.len(),
            "Reference data loaded"
        );
        (ReferenceData { datasets, tags }, errors)
    }

    /// Fetch one document with its content.
    #[instrument(skip(self), fields(subsystem = "catalog", component = "fetcher", op = "fetch_content"))]
    pub async fn fetch_content(&self, id: &str) -> Result<Document> {
        flatten(
            tokio::time::timeout(self.timeout, self.backend.fetch_document(id)).await,
            self.timeout,
        )
    }

    fn outcome(
        &self,
        source: SourceKind,
        result: std::result::Result<Result<docpick_core::DocumentPage>, tokio::time::error::Elapsed>,
    ) -> SourceOutcome {
        match result {
            Ok(Ok(page)) => {
                debug!(
                    %source,
                    result_count = page.documents.len(),
                    dropped = page.dropped.len(),
                    "Source loaded"
                );
                SourceOutcome::Loaded(page)
            }
            Ok(Err(e)) if e.is_not_found() => {
                debug!(%source, "Source returned 404");
                SourceOutcome::NotFound
            }
            Ok(Err(e)) => {
                warn!(%source, error = %e, transient = e.is_transient(), "Source fetch failed");
                SourceOutcome::Failed(e.to_string())
            }
            Err(_) => {
                let e = Error::Timeout(self.timeout.as_secs());
                warn!(%source, error = %e, "Source fetch timed out");
                SourceOutcome::Failed(e.to_string())
            }
        }
    }
}

fn flatten<T>(
    result: std::result::Result<Result<T>, tokio::time::error::Elapsed>,
    timeout: Duration,
) -> Result<T> {
    result.map_err(|_| Error::Timeout(timeout.as_secs()))?
}
