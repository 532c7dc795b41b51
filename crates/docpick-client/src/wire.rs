//! Boundary schema validation for service payloads.
//!
//! Every record is decoded individually. A record that does not validate
//! becomes a [`ParseFailure`] and is dropped with a diagnostic; it never
//! reaches the merge. Envelope-level problems (no `documents` field at all)
//! are errors, since they mean the source returned no data.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{trace, warn};

use docpick_core::{
    defaults, Dataset, Document, DocumentMetadata, DocumentPage, DocumentSource, Error,
    ParseFailure, Result, Tag,
};

// =============================================================================
// PRIMARY SOURCE
// =============================================================================

/// Metadata block as the primary service emits it. Every field is optional
/// because older records predate most of them.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawMetadata {
    source: Option<String>,
    #[serde(rename = "type")]
    doc_type: Option<String>,
    size: Option<u64>,
    created_at: Option<String>,
    dataset_id: Option<String>,
    tag_ids: Option<Vec<String>>,
    chunk_count: Option<u32>,
}

/// Document record from `GET /documents`. Accepts both the canonical shape
/// (`name` + nested metadata) and the older flat shape (`title`,
/// `file_type`, `file_size`, top-level `created_at`).
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawDocument {
    id: Option<String>,
    name: Option<String>,
    title: Option<String>,
    file_name: Option<String>,
    content: Option<String>,
    file_type: Option<String>,
    file_size: Option<u64>,
    created_at: Option<String>,
    dataset_id: Option<String>,
    tag_ids: Option<Vec<String>>,
    metadata: Option<RawMetadata>,
}

impl RawDocument {
    fn validate(self) -> std::result::Result<Document, ParseFailure> {
        let id = match non_empty(self.id) {
            Some(id) => id,
            None => return Err(ParseFailure::new(None, "missing id")),
        };

        let name = non_empty(self.name)
            .or_else(|| non_empty(self.title))
            .or_else(|| non_empty(self.file_name.clone()));
        let Some(name) = name else {
            return Err(ParseFailure::new(Some(id), "missing name"));
        };

        let meta = self.metadata.unwrap_or_default();

        let created_raw = meta.created_at.or(self.created_at);
        let Some(created_raw) = created_raw else {
            return Err(ParseFailure::new(Some(id), "missing created_at"));
        };
        let Some(created_at) = parse_timestamp(&created_raw) else {
            return Err(ParseFailure::new(
                Some(id),
                format!("unparseable created_at: {}", created_raw),
            ));
        };

        // Unknown or absent source strings mean the record is the primary
        // service's own; only an explicit "upload" marks upload origin.
        let source = meta
            .source
            .as_deref()
            .and_then(|s| s.parse::<DocumentSource>().ok())
            .unwrap_or(DocumentSource::Api);

        let doc_type = non_empty(meta.doc_type)
            .or_else(|| non_empty(self.file_type))
            .or_else(|| extension_of(self.file_name.as_deref().unwrap_or(&name)))
            .unwrap_or_else(|| defaults::UNKNOWN_DOCUMENT_TYPE.to_string());

        let size = meta
            .size
            .or(self.file_size)
            .or_else(|| self.content.as_ref().map(|c| c.len() as u64))
            .unwrap_or(0);

        Ok(Document {
            id,
            name,
            content: self.content,
            metadata: DocumentMetadata {
                source,
                doc_type,
                size,
                created_at,
                dataset_id: non_empty(meta.dataset_id).or_else(|| non_empty(self.dataset_id)),
                tag_ids: meta.tag_ids.or(self.tag_ids),
                chunk_count: meta.chunk_count,
            },
        })
    }
}

/// Decode one primary-source record.
pub fn parse_document(value: JsonValue) -> std::result::Result<Document, ParseFailure> {
    let id_hint = id_hint(&value);
    let raw: RawDocument = serde_json::from_value(value)
        .map_err(|e| ParseFailure::new(id_hint, format!("schema mismatch: {}", e)))?;
    raw.validate()
}

/// Decode the `{ documents: [...], total }` envelope.
pub fn parse_document_list(body: JsonValue) -> Result<DocumentPage> {
    let total_hint = body
        .get("total")
        .or_else(|| body.get("count"))
        .and_then(JsonValue::as_u64);

    let records = match body {
        JsonValue::Object(mut map) => match map.remove("documents") {
            Some(JsonValue::Array(records)) => records,
            Some(_) => {
                return Err(Error::Parse("documents is not an array".to_string()));
            }
            None => return Err(Error::Parse("response has no documents".to_string())),
        },
        _ => return Err(Error::Parse("response is not an object".to_string())),
    };

    let mut page = DocumentPage::default();
    for record in records {
        match parse_document(record) {
            Ok(doc) => {
                trace!(document_id = %doc.id, "Accepted primary record");
                page.documents.push(doc);
            }
            Err(failure) => {
                warn!(source = "primary", %failure, "Dropping unparseable record");
                page.dropped.push(failure);
            }
        }
    }
    page.total = total_hint
        .map(|t| t as usize)
        .unwrap_or(page.documents.len());
    Ok(page)
}

/// Decode `GET /documents/{id}`, wrapped in `{ document }` or bare.
pub fn parse_single_document(body: JsonValue) -> Result<Document> {
    let record = match body {
        JsonValue::Object(mut map) if map.contains_key("document") => map
            .remove("document")
            .ok_or_else(|| Error::Internal("document key vanished".to_string()))?,
        other => other,
    };
    parse_document(record).map_err(|failure| Error::Parse(failure.to_string()))
}

// =============================================================================
// UPLOADS INDEX
// =============================================================================

/// Uploads index entry: `{ filename, size, timestamp, chunk_count }`.
#[derive(Debug, Deserialize)]
struct RawUpload {
    filename: String,
    #[serde(default)]
    size: Option<u64>,
    timestamp: i64,
    #[serde(default)]
    chunk_count: Option<u32>,
}

fn normalize_upload(id: String, value: JsonValue) -> std::result::Result<Document, ParseFailure> {
    let raw: RawUpload = serde_json::from_value(value)
        .map_err(|e| ParseFailure::new(Some(id.clone()), format!("schema mismatch: {}", e)))?;

    if id.trim().is_empty() {
        return Err(ParseFailure::new(None, "empty upload id"));
    }
    if raw.filename.trim().is_empty() {
        return Err(ParseFailure::new(Some(id), "empty filename"));
    }
    let Some(created_at) = DateTime::<Utc>::from_timestamp(raw.timestamp, 0) else {
        return Err(ParseFailure::new(
            Some(id),
            format!("timestamp out of range: {}", raw.timestamp),
        ));
    };

    Ok(Document {
        id,
        metadata: DocumentMetadata {
            source: DocumentSource::Upload,
            doc_type: extension_of(&raw.filename)
                .unwrap_or_else(|| defaults::UNKNOWN_DOCUMENT_TYPE.to_string()),
            size: raw.size.unwrap_or(0),
            created_at,
            dataset_id: None,
            tag_ids: None,
            chunk_count: raw.chunk_count,
        },
        name: raw.filename,
        content: None,
    })
}

/// Decode `{ documents: { id: {...} } }` from the uploads index.
///
/// Output order is newest first, ties broken by id, so the result does not
/// depend on JSON map ordering.
pub fn parse_uploads_index(body: JsonValue) -> Result<DocumentPage> {
    let entries = match body {
        JsonValue::Object(mut map) => match map.remove("documents") {
            Some(JsonValue::Object(entries)) => entries,
            Some(JsonValue::Null) | None => {
                return Err(Error::Parse("uploads index has no documents".to_string()));
            }
            Some(_) => return Err(Error::Parse("uploads documents is not a map".to_string())),
        },
        _ => return Err(Error::Parse("uploads index is not an object".to_string())),
    };

    let mut page = DocumentPage::default();
    for (id, value) in entries {
        match normalize_upload(id, value) {
            Ok(doc) => page.documents.push(doc),
            Err(failure) => {
                warn!(source = "uploads", %failure, "Dropping unparseable upload entry");
                page.dropped.push(failure);
            }
        }
    }

    page.documents.sort_by(|a, b| {
        b.metadata
            .created_at
            .cmp(&a.metadata.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    page.total = page.documents.len();
    Ok(page)
}

// =============================================================================
// REFERENCE DATA
// =============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum DatasetList {
    Bare(Vec<Dataset>),
    Wrapped { datasets: Vec<Dataset> },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TagList {
    Bare(Vec<Tag>),
    Wrapped { tags: Vec<Tag> },
}

/// Decode `GET /datasets`, bare array or `{ datasets, total }`.
pub fn parse_datasets(body: JsonValue) -> Result<Vec<Dataset>> {
    match serde_json::from_value::<DatasetList>(body)
        .map_err(|e| Error::Parse(format!("datasets: {}", e)))?
    {
        DatasetList::Bare(list) | DatasetList::Wrapped { datasets: list } => Ok(list),
    }
}

/// Decode `GET /tags`, bare array or `{ tags, total }`.
pub fn parse_tags(body: JsonValue) -> Result<Vec<Tag>> {
    match serde_json::from_value::<TagList>(body)
        .map_err(|e| Error::Parse(format!("tags: {}", e)))?
    {
        TagList::Bare(list) | TagList::Wrapped { tags: list } => Ok(list),
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn id_hint(value: &JsonValue) -> Option<String> {
    match value.get("id") {
        Some(JsonValue::String(s)) => Some(s.clone()),
        Some(JsonValue::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Lowercased file extension, if the name has one.
fn extension_of(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.contains('/') {
        return None;
    }
    Some(ext.to_lowercase())
}

/// Parse RFC 3339, or naive ISO 8601 (taken as UTC).
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone};
    use serde_json::json;

    #[test]
    fn test_parse_canonical_record() {
        let doc = parse_document(json!({
            "id": "doc1",
            "name": "Report.PDF",
            "metadata": {
                "source": "api",
                "type": "pdf",
                "size": 2048,
                "created_at": "2024-03-01T10:00:00Z",
                "dataset_id": "ds1",
                "tag_ids": ["t1"],
                "chunk_count": 4
            }
        }))
        .unwrap();
        assert_eq!(doc.id, "doc1");
        assert_eq!(doc.metadata.source, DocumentSource::Api);
        assert_eq!(doc.metadata.size, 2048);
        assert_eq!(doc.metadata.dataset_id.as_deref(), Some("ds1"));
        assert_eq!(doc.metadata.chunk_count, Some(4));
    }

    #[test]
    fn test_parse_flat_legacy_record() {
        let doc = parse_document(json!({
            "id": "doc2",
            "title": "Minutes",
            "content": "hello world",
            "file_name": "minutes.DOCX",
            "created_at": "2024-03-01T10:00:00.123456",
            "tag_ids": ["a", "b"]
        }))
        .unwrap();
        assert_eq!(doc.name, "Minutes");
        assert_eq!(doc.metadata.doc_type, "docx");
        assert_eq!(doc.metadata.size, 11);
        assert_eq!(doc.metadata.created_at.year(), 2024);
        assert!(doc.has_tag("b"));
        assert_eq!(doc.content.as_deref(), Some("hello world"));
    }

    #[test]
    fn test_unknown_source_is_primary() {
        let doc = parse_document(json!({
            "id": "d", "name": "n", "created_at": "2024-01-01T00:00:00Z",
            "metadata": { "source": "https://example.org/page" }
        }))
        .unwrap();
        assert_eq!(doc.metadata.source, DocumentSource::Api);
        assert_eq!(doc.metadata.doc_type, "unknown");
    }

    #[test]
    fn test_embedded_upload_source_preserved() {
        let doc = parse_document(json!({
            "id": "u1", "name": "scan.png", "created_at": "2024-01-01T00:00:00Z",
            "metadata": { "source": "upload" }
        }))
        .unwrap();
        assert!(doc.is_upload());
        assert_eq!(doc.metadata.doc_type, "png");
    }

    #[test]
    fn test_missing_fields_become_parse_failures() {
        let no_id = parse_document(json!({"name": "x", "created_at": "2024-01-01T00:00:00Z"}));
        assert_eq!(no_id.unwrap_err().reason, "missing id");

        let no_name = parse_document(json!({"id": "d", "created_at": "2024-01-01T00:00:00Z"}));
        assert_eq!(no_name.unwrap_err().id.as_deref(), Some("d"));

        let bad_date = parse_document(json!({"id": "d", "name": "x", "created_at": "yesterday"}));
        assert!(bad_date.unwrap_err().reason.contains("unparseable"));

        let wrong_type = parse_document(json!({"id": 7, "name": "x"}));
        let failure = wrong_type.unwrap_err();
        assert_eq!(failure.id.as_deref(), Some("7"));
        assert!(failure.reason.starts_with("schema mismatch"));
    }

    #[test]
    fn test_document_list_drops_bad_records() {
        let page = parse_document_list(json!({
            "documents": [
                {"id": "a", "name": "A", "created_at": "2024-01-01T00:00:00Z"},
                {"id": "b"},
                "garbage"
            ],
            "total": 3
        }))
        .unwrap();
        assert_eq!(page.documents.len(), 1);
        assert_eq!(page.dropped.len(), 2);
        assert_eq!(page.total, 3);
    }

    #[test]
    fn test_document_list_without_documents_is_error() {
        assert!(matches!(
            parse_document_list(json!({"total": 0})),
            Err(Error::Parse(_))
        ));
        assert!(parse_document_list(json!([])).is_err());
        assert!(parse_document_list(json!({"documents": {}})).is_err());
    }

    #[test]
    fn test_empty_document_list_is_ok() {
        let page = parse_document_list(json!({"documents": [], "total": 0})).unwrap();
        assert!(page.documents.is_empty());
    }

    #[test]
    fn test_single_document_wrapped_and_bare() {
        let body = json!({"id": "d", "name": "x", "created_at": "2024-01-01T00:00:00Z", "content": "full"});
        let bare = parse_single_document(body.clone()).unwrap();
        let wrapped = parse_single_document(json!({ "document": body })).unwrap();
        assert_eq!(bare, wrapped);
        assert!(parse_single_document(json!({"document": {"id": "d"}})).is_err());
    }

    #[test]
    fn test_uploads_index_normalized_and_sorted() {
        let page = parse_uploads_index(json!({
            "documents": {
                "old": {"filename": "old.txt", "size": 5, "timestamp": 1_600_000_000, "chunk_count": 1},
                "new": {"filename": "new.pdf", "size": 9, "timestamp": 1_700_000_000, "chunk_count": 3},
                "tie-b": {"filename": "b.md", "timestamp": 1_650_000_000},
                "tie-a": {"filename": "a.md", "timestamp": 1_650_000_000}
            }
        }))
        .unwrap();
        let ids: Vec<_> = page.documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "tie-a", "tie-b", "old"]);

        let newest = &page.documents[0];
        assert!(newest.is_upload());
        assert_eq!(newest.metadata.doc_type, "pdf");
        assert_eq!(newest.metadata.chunk_count, Some(3));
        assert_eq!(
            newest.metadata.created_at,
            Utc.timestamp_opt(1_700_000_000, 0).unwrap()
        );
        assert_eq!(page.documents[1].metadata.size, 0);
    }

    #[test]
    fn test_uploads_index_drops_bad_entries() {
        let page = parse_uploads_index(json!({
            "documents": {
                "ok": {"filename": "ok.txt", "timestamp": 1},
                "no-ts": {"filename": "x.txt"},
                "blank": {"filename": "  ", "timestamp": 1}
            }
        }))
        .unwrap();
        assert_eq!(page.documents.len(), 1);
        assert_eq!(page.dropped.len(), 2);
    }

    #[test]
    fn test_uploads_index_without_documents_is_error() {
        assert!(parse_uploads_index(json!({})).is_err());
        assert!(parse_uploads_index(json!({"documents": []})).is_err());
        let empty = parse_uploads_index(json!({"documents": {}})).unwrap();
        assert!(empty.documents.is_empty());
    }

    #[test]
    fn test_reference_lists_accept_both_shapes() {
        let bare = parse_datasets(json!([{"id": "d1", "name": "One"}])).unwrap();
        let wrapped =
            parse_datasets(json!({"datasets": [{"id": "d1", "name": "One"}], "total": 1})).unwrap();
        assert_eq!(bare, wrapped);

        let tags = parse_tags(json!({"tags": [{"id": "t", "name": "T", "color": "#000"}], "count": 1}))
            .unwrap();
        assert_eq!(tags[0].color, "#000");
        assert!(parse_tags(json!({"nope": true})).is_err());
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("a.PDF").as_deref(), Some("pdf"));
        assert_eq!(extension_of("archive.tar.gz").as_deref(), Some("gz"));
        assert_eq!(extension_of(".bashrc"), None);
        assert_eq!(extension_of("README"), None);
    }

    #[test]
    fn test_parse_timestamp_variants() {
        assert!(parse_timestamp("2024-01-01T00:00:00+02:00").is_some());
        assert!(parse_timestamp("2024-01-01T00:00:00").is_some());
        assert!(parse_timestamp("2024-01-01 00:00:00.5").is_some());
        assert!(parse_timestamp("01/01/2024").is_none());
    }
}
