//! Picker session configuration.
//!
//! Passed explicitly into `PickerSession` and `SelectionController`; nothing
//! in the engine reads ambient state. Environment overrides:
//! - `DOCPICK_SELECTION_MODE`: "single" or "multiple" (default: multiple)
//! - `DOCPICK_MAX_SELECTIONS`: bound for multiple mode (default: 5)
//! - `DOCPICK_PREVIEW_CHARS`: preview length (default: 400)
//! - `DOCPICK_SOURCE_TIMEOUT_SECS`: per-source fetch budget (default: 10)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use docpick_core::{defaults, Error, Result};

/// Cardinality of the picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// At most one document; toggling another replaces it.
    Single,
    /// Up to `max_selections` documents.
    #[default]
    Multiple,
}

impl FromStr for SelectionMode {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" => Ok(Self::Single),
            "multiple" | "multi" => Ok(Self::Multiple),
            _ => Err(Error::Config(format!("invalid selection mode: {}", s))),
        }
    }
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => write!(f, "single"),
            Self::Multiple => write!(f, "multiple"),
        }
    }
}

/// Settings for one picker dialog session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub mode: SelectionMode,
    /// Upper bound in multiple mode; ignored in single mode.
    pub max_selections: usize,
    /// Ids the caller already considers selected.
    #[serde(default)]
    pub external_ids: Vec<String>,
    /// Single mode only: confirm as soon as a document is chosen.
    #[serde(default)]
    pub confirm_on_select: bool,
    pub preview_chars: usize,
    pub source_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: SelectionMode::Multiple,
            max_selections: defaults::MAX_SELECTIONS,
            external_ids: Vec::new(),
            confirm_on_select: false,
            preview_chars: defaults::PREVIEW_CHARS,
            source_timeout_secs: defaults::SOURCE_TIMEOUT_SECS,
        }
    }
}

impl SessionConfig {
    /// Single-pick configuration.
    pub fn single() -> Self {
        Self {
            mode: SelectionMode::Single,
            max_selections: 1,
            ..Self::default()
        }
    }

    /// Bounded multi-pick configuration.
    pub fn multiple(max_selections: usize) -> Self {
        Self {
            mode: SelectionMode::Multiple,
            max_selections,
            ..Self::default()
        }
    }

    /// Create from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(mode) = std::env::var("DOCPICK_SELECTION_MODE") {
            config.mode = mode.parse()?;
        }
        if let Some(max) = env_parse::<usize>("DOCPICK_MAX_SELECTIONS") {
            config.max_selections = max;
        }
        if let Some(chars) = env_parse::<usize>("DOCPICK_PREVIEW_CHARS") {
            config.preview_chars = chars;
        }
        if let Some(secs) = env_parse::<u64>("DOCPICK_SOURCE_TIMEOUT_SECS") {
            config.source_timeout_secs = secs;
        }
        Ok(config)
    }

    /// Seed the selection with caller-supplied ids.
    pub fn with_external_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.external_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Enable confirm-on-select for single mode.
    pub fn with_confirm_on_select(mut self, enabled: bool) -> Self {
        self.confirm_on_select = enabled;
        self
    }

    /// Maximum selection size for the configured mode.
    pub fn capacity(&self) -> usize {
        match self.mode {
            SelectionMode::Single => 1,
            SelectionMode::Multiple => self.max_selections,
        }
    }

    /// Per-source fetch budget.
    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_secs)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.mode == SelectionMode::Multiple && self.max_selections == 0 {
            return Err(Error::Config(
                "max_selections must be at least 1 in multiple mode".to_string(),
            ));
        }
        if self.preview_chars == 0 {
            return Err(Error::Config("preview_chars must be greater than zero".to_string()));
        }
        if self.source_timeout_secs == 0 {
            return Err(Error::Config(
                "source_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.confirm_on_select && self.mode == SelectionMode::Multiple {
            return Err(Error::Config(
                "confirm_on_select only applies to single mode".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.mode, SelectionMode::Multiple);
        assert_eq!(config.max_selections, 5);
        assert_eq!(config.preview_chars, 400);
        assert_eq!(config.source_timeout(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_capacity_by_mode() {
        assert_eq!(SessionConfig::single().capacity(), 1);
        assert_eq!(SessionConfig::multiple(3).capacity(), 3);
        let mut single = SessionConfig::multiple(7);
        single.mode = SelectionMode::Single;
        assert_eq!(single.capacity(), 1);
    }

    #[test]
    fn test_validate_rejects_zero_max_in_multiple() {
        assert!(SessionConfig::multiple(0).validate().is_err());
        let mut single = SessionConfig::single();
        single.max_selections = 0;
        assert!(single.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_confirm_on_select_for_multiple() {
        let config = SessionConfig::multiple(2).with_confirm_on_select(true);
        assert!(config.validate().is_err());
        assert!(SessionConfig::single()
            .with_confirm_on_select(true)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_mode_parse_and_display() {
        assert_eq!("SINGLE".parse::<SelectionMode>().unwrap(), SelectionMode::Single);
        assert_eq!("multi".parse::<SelectionMode>().unwrap(), SelectionMode::Multiple);
        assert!("many".parse::<SelectionMode>().is_err());
        assert_eq!(SelectionMode::Multiple.to_string(), "multiple");
    }

    #[test]
    fn test_external_ids_builder() {
        let config = SessionConfig::multiple(2).with_external_ids(["a", "b"]);
        assert_eq!(config.external_ids, vec!["a".to_string(), "b".to_string()]);
    }
}
