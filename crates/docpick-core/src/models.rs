//! Canonical data model shared by the client and the catalog engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::defaults;
use crate::error::Error;

// =============================================================================
// DOCUMENT
// =============================================================================

/// Origin of a document record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DocumentSource {
    /// Indexed by the primary document-metadata service.
    #[default]
    Api,
    /// Present in the legacy file-upload index.
    Upload,
}

impl fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api => write!(f, "api"),
            Self::Upload => write!(f, "upload"),
        }
    }
}

impl FromStr for DocumentSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "api" => Ok(Self::Api),
            "upload" | "uploads" => Ok(Self::Upload),
            _ => Err(Error::Parse(format!("unknown document source: {}", s))),
        }
    }
}

/// Metadata carried by every catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub source: DocumentSource,
    #[serde(rename = "type")]
    pub doc_type: String,
    /// Size in bytes.
    pub size: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_count: Option<u32>,
}

/// A document as shown in the picker.
///
/// Records are immutable once created: a later fetch returning the same `id`
/// replaces the whole record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Deduplication key across both sources.
    pub id: String,
    pub name: String,
    /// Full text, absent until lazily fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub metadata: DocumentMetadata,
}

impl Document {
    /// Whether the record originates from the uploads index.
    pub fn is_upload(&self) -> bool {
        self.metadata.source == DocumentSource::Upload
    }

    /// Whether the record carries the given tag.
    pub fn has_tag(&self, tag_id: &str) -> bool {
        self.metadata
            .tag_ids
            .as_ref()
            .is_some_and(|tags| tags.iter().any(|t| t == tag_id))
    }
}

/// Which backend a fetch targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Primary,
    Uploads,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Uploads => write!(f, "uploads"),
        }
    }
}

// =============================================================================
// REFERENCE DATA
// =============================================================================

/// A dataset the primary service can filter by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Number of documents in this dataset (computed server-side)
    #[serde(default)]
    pub document_count: i64,
}

/// A tag the primary service can filter by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
    #[serde(default = "default_tag_color")]
    pub color: String,
}

fn default_tag_color() -> String {
    defaults::TAG_COLOR.to_string()
}

/// Datasets and tags loaded alongside the catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceData {
    pub datasets: Vec<Dataset>,
    pub tags: Vec<Tag>,
}

impl ReferenceData {
    /// Look up a dataset name for display.
    pub fn dataset_name(&self, id: &str) -> Option<&str> {
        self.datasets
            .iter()
            .find(|d| d.id == id)
            .map(|d| d.name.as_str())
    }

    /// Look up a tag for display.
    pub fn tag(&self, id: &str) -> Option<&Tag> {
        self.tags.iter().find(|t| t.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(source: DocumentSource) -> Document {
        Document {
            id: "doc1".to_string(),
            name: "report.pdf".to_string(),
            content: None,
            metadata: DocumentMetadata {
                source,
                doc_type: "pdf".to_string(),
                size: 1024,
                created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
                dataset_id: None,
                tag_ids: Some(vec!["t1".to_string()]),
                chunk_count: None,
            },
        }
    }

    #[test]
    fn test_source_serializes_lowercase() {
        let json = serde_json::to_string(&DocumentSource::Upload).unwrap();
        assert_eq!(json, "\"upload\"");
        let parsed: DocumentSource = serde_json::from_str("\"api\"").unwrap();
        assert_eq!(parsed, DocumentSource::Api);
    }

    #[test]
    fn test_source_from_str() {
        assert_eq!(
            "Upload".parse::<DocumentSource>().unwrap(),
            DocumentSource::Upload
        );
        assert!("ftp".parse::<DocumentSource>().is_err());
    }

    #[test]
    fn test_metadata_type_field_name() {
        let doc = sample(DocumentSource::Api);
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["metadata"]["type"], "pdf");
        assert_eq!(value["metadata"]["source"], "api");
        assert!(value.get("content").is_none());
        assert!(value["metadata"].get("dataset_id").is_none());
    }

    #[test]
    fn test_is_upload_and_has_tag() {
        let doc = sample(DocumentSource::Upload);
        assert!(doc.is_upload());
        assert!(doc.has_tag("t1"));
        assert!(!doc.has_tag("t2"));
        assert!(!sample(DocumentSource::Api).is_upload());
    }

    #[test]
    fn test_tag_color_defaults() {
        let tag: Tag = serde_json::from_str(r#"{"id":"t1","name":"Legal"}"#).unwrap();
        assert_eq!(tag.color, "#3b82f6");
    }

    #[test]
    fn test_reference_lookups() {
        let refs = ReferenceData {
            datasets: vec![Dataset {
                id: "ds1".into(),
                name: "Contracts".into(),
                description: None,
                document_count: 3,
            }],
            tags: vec![Tag {
                id: "t1".into(),
                name: "Legal".into(),
                color: "#ff0000".into(),
            }],
        };
        assert_eq!(refs.dataset_name("ds1"), Some("Contracts"));
        assert_eq!(refs.dataset_name("missing"), None);
        assert_eq!(refs.tag("t1").map(|t| t.name.as_str()), Some("Legal"));
    }
}
