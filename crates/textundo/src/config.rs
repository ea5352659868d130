#![forbid(unsafe_code)]

//! History configuration.
//!
//! [`HistoryConfig`] is a small `Copy` value owned by the
//! [`CommandService`](crate::CommandService). Hosts change it through
//! [`ConfigUpdate`], a partial update where only the `Some` fields apply.
//!
//! # Loading
//!
//! With the `config-files` feature, both types load from TOML or JSON:
//!
//! ```toml
//! # textundo.toml
//! max_history_size = 250
//! auto_save_interval_ms = 30000
//! enable_memory_optimization = false
//! ```
//!
//! ```rust,ignore
//! let config = HistoryConfig::from_toml_file("textundo.toml")?;
//! let update = ConfigUpdate::from_json_str(r#"{ "max_history_size": 10 }"#)?;
//! ```

#[cfg(feature = "config-files")]
use std::path::Path;
use std::time::Duration;

#[cfg(feature = "config-files")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "config-files")]
use thiserror::Error;

/// Configuration for the command history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "config-files", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-files", serde(default))]
pub struct HistoryConfig {
    /// Maximum number of commands kept in history. Default: 100.
    pub max_history_size: usize,
    /// Auto-save period for the host, in milliseconds (0 = disabled). Default: 0.
    pub auto_save_interval_ms: u64,
    /// Release spare history capacity after truncation, eviction and clear.
    /// Default: true.
    pub enable_memory_optimization: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_history_size: 100,
            auto_save_interval_ms: 0,
            enable_memory_optimization: true,
        }
    }
}

impl HistoryConfig {
    /// Create a configuration with a custom history bound.
    #[must_use]
    pub fn new(max_history_size: usize) -> Self {
        Self {
            max_history_size,
            ..Self::default()
        }
    }

    /// Create unlimited configuration (for testing).
    #[must_use]
    pub fn unlimited() -> Self {
        Self::new(usize::MAX)
    }

    /// Auto-save period, or `None` when disabled.
    #[must_use]
    pub fn auto_save_interval(&self) -> Option<Duration> {
        (self.auto_save_interval_ms > 0).then(|| Duration::from_millis(self.auto_save_interval_ms))
    }

    /// Merge the `Some` fields of `update` into this configuration.
    pub fn apply(&mut self, update: &ConfigUpdate) {
        if let Some(max) = update.max_history_size {
            self.max_history_size = max;
        }
        if let Some(interval) = update.auto_save_interval_ms {
            self.auto_save_interval_ms = interval;
        }
        if let Some(enabled) = update.enable_memory_optimization {
            self.enable_memory_optimization = enabled;
        }
    }

    /// Validate all parameters are within acceptable ranges.
    ///
    /// Returns a list of validation errors. An empty list means the config
    /// is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.max_history_size == 0 {
            errors.push("max_history_size must be > 0".into());
        }
        errors
    }

    /// Load from a TOML string.
    #[cfg(feature = "config-files")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validated()
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config-files")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config-files")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validated()
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "config-files")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    #[cfg(feature = "config-files")]
    fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

/// Partial configuration update. `None` fields leave the current value alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "config-files", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-files", serde(default))]
pub struct ConfigUpdate {
    pub max_history_size: Option<usize>,
    pub auto_save_interval_ms: Option<u64>,
    pub enable_memory_optimization: Option<bool>,
}

impl ConfigUpdate {
    /// An update that changes nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the history bound.
    #[must_use]
    pub fn max_history_size(mut self, max: usize) -> Self {
        self.max_history_size = Some(max);
        self
    }

    /// Set the auto-save period in milliseconds.
    #[must_use]
    pub fn auto_save_interval_ms(mut self, interval: u64) -> Self {
        self.auto_save_interval_ms = Some(interval);
        self
    }

    /// Toggle memory optimization.
    #[must_use]
    pub fn enable_memory_optimization(mut self, enabled: bool) -> Self {
        self.enable_memory_optimization = Some(enabled);
        self
    }

    /// Whether no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.max_history_size.is_none()
            && self.auto_save_interval_ms.is_none()
            && self.enable_memory_optimization.is_none()
    }

    /// Load from a TOML string.
    #[cfg(feature = "config-files")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config-files")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }
}

/// Errors that can occur when loading a configuration.
#[cfg(feature = "config-files")]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error reading a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parse error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    /// JSON parse error.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    /// Validation errors.
    #[error("validation errors: {}", .0.join("; "))]
    Validation(Vec<String>),
}

// ============================================================================
// Tests
// ============================================================================
