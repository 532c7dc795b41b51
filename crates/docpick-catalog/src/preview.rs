//! Session-scoped preview of the focused document.
//!
//! Holds at most one preview, keyed by whichever document has focus. Content
//! arriving for a document that lost focus is dropped. Nothing is persisted.

use serde::Serialize;

use docpick_core::defaults;

/// Truncated content ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preview {
    pub document_id: String,
    pub text: String,
    /// Whether `text` was cut short.
    pub truncated: bool,
}

#[derive(Debug, Clone)]
pub struct PreviewCache {
    max_chars: usize,
    focused: Option<String>,
    current: Option<Preview>,
}

impl PreviewCache {
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars,
            focused: None,
            current: None,
        }
    }

    /// Move focus to `id`. Returns the cached preview if it is already
    /// materialized for that document.
    pub fn focus(&mut self, id: &str) -> Option<&Preview> {
        if self.focused.as_deref() != Some(id) {
            self.focused = Some(id.to_string());
        }
        self.current.as_ref().filter(|p| p.document_id == id)
    }

    /// Drop focus; the last preview stays readable until replaced.
    pub fn blur(&mut self) {
        self.focused = None;
    }

    pub fn focused(&self) -> Option<&str> {
        self.focused.as_deref()
    }

    /// Store content for `id` if it still has focus.
    pub fn store(&mut self, id: &str, content: &str) -> bool {
        if self.focused.as_deref() != Some(id) {
            return false;
        }
        let (text, truncated) = truncate(content, self.max_chars);
        self.current = Some(Preview {
            document_id: id.to_string(),
            text,
            truncated,
        });
        true
    }

    pub fn current(&self) -> Option<&Preview> {
        self.current.as_ref()
    }

    pub fn clear(&mut self) {
        self.focused = None;
        self.current = None;
    }
}

/// First `max_chars` characters of `content`, with an ellipsis when cut.
pub fn truncate(content: &str, max_chars: usize) -> (String, bool) {
    match content.char_indices().nth(max_chars) {
        None => (content.to_string(), false),
        Some((byte_idx, _)) => {
            let mut text = content[..byte_idx].trim_end().to_string();
            text.push_str(defaults::PREVIEW_ELLIPSIS);
            (text, true)
        }
    }
}
