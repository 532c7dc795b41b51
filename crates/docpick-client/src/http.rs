//! HTTP implementation of [`DocumentBackend`].

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::Value as JsonValue;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use docpick_core::{
    defaults, Dataset, Document, DocumentBackend, DocumentPage, Error, FilterState, Result, Tag,
};

use crate::config::ClientConfig;
use crate::wire;

/// Requests slower than this are logged as slow.
const SLOW_REQUEST_MS: u64 = 3000;

/// Document service client over HTTP.
pub struct HttpDocumentBackend {
    client: Client,
    config: ClientConfig,
}

impl HttpDocumentBackend {
    /// Create a new backend with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            base_url = %config.base_url,
            timeout_secs = config.timeout_secs,
            "Initializing document backend"
        );

        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env())
    }

    /// The active configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn parse_endpoint(&self, path: &str) -> Result<Url> {
        Url::parse(&self.config.endpoint(path))
            .map_err(|e| Error::Config(format!("Invalid endpoint for {}: {}", path, e)))
    }

    /// URL of one document, with `id` percent-encoded as a single segment.
    fn document_url(&self, id: &str) -> Result<Url> {
        if id.is_empty() {
            return Err(Error::InvalidInput("document id must not be empty".to_string()));
        }
        let mut url = self.parse_endpoint(defaults::DOCUMENTS_PATH)?;
        url.path_segments_mut()
            .map_err(|_| {
                Error::Config(format!(
                    "Base URL cannot carry a path: {}",
                    self.config.base_url
                ))
            })?
            .pop_if_empty()
            .push(id);
        Ok(url)
    }

    /// GET a JSON body, mapping 404 and other failures onto `Error`.
    async fn get_json(&self, path: &str, query: &[(&'static str, String)]) -> Result<JsonValue> {
        let url = self.parse_endpoint(path)?;
        self.get_json_at(url, path, query).await
    }

    async fn get_json_at(
        &self,
        url: Url,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<JsonValue> {
        let start = Instant::now();

        let mut request = self.client.get(url).query(query);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(self.config.timeout_secs)
            } else {
                Error::Request(format!("GET {} failed: {}", path, e))
            }
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(path.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Http {
                status: status.as_u16(),
                body,
            });
        }

        let body: JsonValue = response
            .json()
            .await
            .map_err(|e| Error::Serialization(format!("Failed to parse {}: {}", path, e)))?;

        let elapsed = start.elapsed().as_millis() as u64;
        debug!(path, duration_ms = elapsed, "Request complete");
        if elapsed > SLOW_REQUEST_MS {
            warn!(path, duration_ms = elapsed, slow = true, "Slow request");
        }
        Ok(body)
    }
}

#[async_trait]
impl DocumentBackend for HttpDocumentBackend {
    #[instrument(skip(self, filter), fields(subsystem = "client", component = "http_backend", op = "list_documents", query = %filter.query))]
    async fn list_documents(&self, filter: &FilterState) -> Result<DocumentPage> {
        let body = self
            .get_json(defaults::DOCUMENTS_PATH, &filter.query_params())
            .await?;
        let page = wire::parse_document_list(body)?;
        debug!(
            result_count = page.documents.len(),
            dropped_count = page.dropped.len(),
            "Primary documents loaded"
        );
        Ok(page)
    }

    #[instrument(skip(self), fields(subsystem = "client", component = "http_backend", op = "list_uploads"))]
    async fn list_uploads(&self) -> Result<DocumentPage> {
        let body = self.get_json(defaults::UPLOADS_PATH, &[]).await?;
        let page = wire::parse_uploads_index(body)?;
        debug!(
            result_count = page.documents.len(),
            dropped_count = page.dropped.len(),
            "Uploads index loaded"
        );
        Ok(page)
    }

    #[instrument(skip(self), fields(subsystem = "client", component = "http_backend", op = "fetch_document"))]
    async fn fetch_document(&self, id: &str) -> Result<Document> {
        let url = self.document_url(id)?;
        let path = url.path().to_string();
        let body = self.get_json_at(url, &path, &[]).await?;
        wire::parse_single_document(body)
    }

    #[instrument(skip(self), fields(subsystem = "client", component = "http_backend", op = "list_datasets"))]
    async fn list_datasets(&self) -> Result<Vec<Dataset>> {
        let body = self.get_json(defaults::DATASETS_PATH, &[]).await?;
        wire::parse_datasets(body)
    }

    #[instrument(skip(self), fields(subsystem = "client", component = "http_backend", op = "list_tags"))]
    async fn list_tags(&self) -> Result<Vec<Tag>> {
        let body = self.get_json(defaults::TAGS_PATH, &[]).await?;
        wire::parse_tags(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_invalid_config() {
        let result = HttpDocumentBackend::new(ClientConfig::new("not-a-url"));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_new_keeps_config() {
        let backend = HttpDocumentBackend::new(ClientConfig::new("http://localhost:9")).unwrap();
        assert_eq!(backend.config().base_url, "http://localhost:9");
    }

    #[test]
    fn test_document_url_encodes_id_as_one_segment() {
        let backend = HttpDocumentBackend::new(ClientConfig::new("http://localhost:9/api/")).unwrap();
        let url = backend.document_url("uploads/a?b#c").unwrap();
        assert_eq!(url.path(), "/api/documents/uploads%2Fa%3Fb%23c");
        assert!(url.query().is_none());
        assert!(url.fragment().is_none());

        assert!(matches!(backend.document_url(""), Err(Error::InvalidInput(_))));
    }
}
