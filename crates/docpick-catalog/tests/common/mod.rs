//! Scripted `DocumentBackend` and fixtures shared by the session tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use docpick_catalog::{ConfirmedSelection, SelectionSink};
use docpick_core::{
    Dataset, Document, DocumentBackend, DocumentMetadata, DocumentPage, DocumentSource, Error,
    FilterState, Result, Tag,
};

/// What a scripted source answers.
#[derive(Debug, Clone)]
pub enum Script {
    Documents(Vec<Document>),
    NotFound,
    Fail(String),
}

#[derive(Debug)]
struct MockState {
    primary: Script,
    uploads: Script,
    primary_delay: Duration,
    uploads_delay: Duration,
    contents: HashMap<String, Document>,
    datasets: Option<Vec<Dataset>>,
    tags: Option<Vec<Tag>>,
    calls: Vec<String>,
}

/// In-memory backend; clones share state so a test can re-script sources
/// after handing the backend to a session.
#[derive(Debug, Clone)]
pub struct MockDocumentBackend {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockDocumentBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDocumentBackend {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                primary: Script::Documents(Vec::new()),
                uploads: Script::NotFound,
                primary_delay: Duration::ZERO,
                uploads_delay: Duration::ZERO,
                contents: HashMap::new(),
                datasets: Some(Vec::new()),
                tags: Some(Vec::new()),
                calls: Vec::new(),
            })),
        }
    }

    pub fn with_primary(self, script: Script) -> Self {
        self.set_primary(script);
        self
    }

    pub fn with_uploads(self, script: Script) -> Self {
        self.set_uploads(script);
        self
    }

    pub fn with_primary_delay(self, delay: Duration) -> Self {
        self.state.lock().unwrap().primary_delay = delay;
        self
    }

    pub fn with_uploads_delay(self, delay: Duration) -> Self {
        self.state.lock().unwrap().uploads_delay = delay;
        self
    }

    pub fn with_content(self, doc: Document) -> Self {
        self.state
            .lock()
            .unwrap()
            .contents
            .insert(doc.id.clone(), doc);
        self
    }

    pub fn with_datasets(self, datasets: Option<Vec<Dataset>>) -> Self {
        self.state.lock().unwrap().datasets = datasets;
        self
    }

    pub fn with_tags(self, tags: Option<Vec<Tag>>) -> Self {
        self.state.lock().unwrap().tags = tags;
        self
    }

    pub fn set_primary(&self, script: Script) {
        self.state.lock().unwrap().primary = script;
    }

    pub fn set_uploads(&self, script: Script) {
        self.state.lock().unwrap().uploads = script;
    }

    /// Calls received so far, e.g. `"list_documents"` or `"fetch_document:a"`.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }
}

fn answer(script: Script, path: &str, filter: Option<&FilterState>) -> Result<DocumentPage> {
    match script {
        Script::Documents(docs) => {
            let docs = match filter {
                Some(filter) => docs.into_iter().filter(|d| filter.matches(d)).collect(),
                None => docs,
            };
            Ok(DocumentPage::from_documents(docs))
        }
        Script::NotFound => Err(Error::NotFound(path.to_string())),
        Script::Fail(msg) => Err(Error::Request(msg)),
    }
}

#[async_trait]
impl DocumentBackend for MockDocumentBackend {
    async fn list_documents(&self, filter: &FilterState) -> Result<DocumentPage> {
        self.record("list_documents".to_string());
        let (script, delay) = {
            let state = self.state.lock().unwrap();
            (state.primary.clone(), state.primary_delay)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        answer(script, "/documents", Some(filter))
    }

    async fn list_uploads(&self) -> Result<DocumentPage> {
        self.record("list_uploads".to_string());
        let (script, delay) = {
            let state = self.state.lock().unwrap();
            (state.uploads.clone(), state.uploads_delay)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        answer(script, "/documents/uploads/", None)
    }

    async fn fetch_document(&self, id: &str) -> Result<Document> {
        self.record(format!("fetch_document:{}", id));
        self.state
            .lock()
            .unwrap()
            .contents
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("/documents/{}", id)))
    }

    async fn list_datasets(&self) -> Result<Vec<Dataset>> {
        self.record("list_datasets".to_string());
        self.state
            .lock()
            .unwrap()
            .datasets
            .clone()
            .ok_or_else(|| Error::Request("datasets unavailable".to_string()))
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        self.record("list_tags".to_string());
        self.state
            .lock()
            .unwrap()
            .tags
            .clone()
            .ok_or_else(|| Error::Request("tags unavailable".to_string()))
    }
}

/// Sink that records everything the session hands out.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub confirmed: Arc<Mutex<Vec<ConfirmedSelection>>>,
    pub upload_errors: Arc<Mutex<Vec<String>>>,
}

impl SelectionSink for RecordingSink {
    fn on_confirm(&mut self, selection: ConfirmedSelection) {
        self.confirmed.lock().unwrap().push(selection);
    }

    fn on_upload_error(&mut self, message: &str) {
        self.upload_errors.lock().unwrap().push(message.to_string());
    }
}

fn document(id: &str, name: &str, source: DocumentSource) -> Document {
    Document {
        id: id.to_string(),
        name: name.to_string(),
        content: None,
        metadata: DocumentMetadata {
            source,
            doc_type: name.rsplit('.').next().unwrap_or("unknown").to_string(),
            size: 128,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
            dataset_id: None,
            tag_ids: None,
            chunk_count: None,
        },
    }
}

/// Primary-origin document.
pub fn api_doc(id: &str, name: &str) -> Document {
    document(id, name, DocumentSource::Api)
}

/// Upload-origin document.
pub fn upload_doc(id: &str, name: &str) -> Document {
    let mut doc = document(id, name, DocumentSource::Upload);
    doc.metadata.chunk_count = Some(1);
    doc
}

pub fn ids(docs: &[Document]) -> Vec<&str> {
    docs.iter().map(|d| d.id.as_str()).collect()
}
