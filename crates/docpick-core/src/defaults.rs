//! Centralized default constants for docpick.
//!
//! **This module is the single source of truth** for shared default values.
//! Client, catalog and the `docpick` binary reference these constants instead
//! of defining their own magic numbers.

// =============================================================================
// TRANSPORT
// =============================================================================

/// Default base URL of the document service (includes the API prefix).
pub const API_BASE_URL: &str = "http://127.0.0.1:8000/api";

/// Per-source time budget in seconds. Applies independently to the primary
/// documents query, the uploads index, datasets and tags.
pub const SOURCE_TIMEOUT_SECS: u64 = 10;

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("docpick/", env!("CARGO_PKG_VERSION"));

// =============================================================================
// ENDPOINTS
// =============================================================================

/// Primary document listing/search endpoint.
pub const DOCUMENTS_PATH: &str = "/documents";

/// Legacy uploads index. May 404 when no index exists.
pub const UPLOADS_PATH: &str = "/documents/uploads/";

/// Dataset reference list.
pub const DATASETS_PATH: &str = "/datasets";

/// Tag reference list.
pub const TAGS_PATH: &str = "/tags";

// =============================================================================
// SELECTION
// =============================================================================

/// Default upper bound for multiple-selection mode.
pub const MAX_SELECTIONS: usize = 5;

// =============================================================================
// PREVIEW
// =============================================================================

/// Characters of content retained for a hover preview.
pub const PREVIEW_CHARS: usize = 400;

/// Marker appended to truncated previews.
pub const PREVIEW_ELLIPSIS: &str = "...";

// =============================================================================
// NORMALIZATION
// =============================================================================

/// Document type used when neither metadata nor file extension says otherwise.
pub const UNKNOWN_DOCUMENT_TYPE: &str = "unknown";

/// Default tag color, matching the document service.
pub const TAG_COLOR: &str = "#3b82f6";
