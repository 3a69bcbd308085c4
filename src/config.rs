//! Executor configuration
//!
//! Sizes the page store and the external sort. Configured externally (JSON file or
//! code), immutable once a `BufferManager` has been built from it.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::{log_event_with_fields, Event, Logger, Severity};

/// Smallest page the store accepts; a page must hold at least a few narrow records
pub const MIN_PAGE_SIZE: usize = 64;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Page store and sort sizing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecConfig {
    /// Bytes per page (default: 4096)
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Pages the buffer pool is sized for (default: 64)
    #[serde(default = "default_buffer_pages")]
    pub buffer_pages: usize,

    /// Input pages sorted in memory per run. `None` means half the buffer pool.
    #[serde(default)]
    pub sort_run_pages: Option<usize>,

    /// Minimum log severity (default: "INFO")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_page_size() -> usize {
    4096
}

fn default_buffer_pages() -> usize {
    64
}

fn default_log_level() -> String {
    "INFO".to_string()
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            buffer_pages: default_buffer_pages(),
            sort_run_pages: None,
            log_level: default_log_level(),
        }
    }
}

impl ExecConfig {
    /// Create a config with the given page geometry
    pub fn with_pages(page_size: usize, buffer_pages: usize) -> Self {
        Self {
            page_size,
            buffer_pages,
            ..Self::default()
        }
    }

    /// Load and validate a config from a JSON file
    pub fn from_json_file(path: &Path) -> ConfigResult<Self> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: ExecConfig = serde_json::from_str(&text)?;
        config.validate()?;

        let page_size = config.page_size.to_string();
        let buffer_pages = config.buffer_pages.to_string();
        log_event_with_fields(
            Event::ConfigLoaded,
            &[
                ("path", &path.display().to_string()),
                ("page_size", &page_size),
                ("buffer_pages", &buffer_pages),
            ],
        );
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// - page_size >= MIN_PAGE_SIZE
    /// - buffer_pages >= 2
    /// - sort_run_pages >= 1 when set
    /// - log_level names a known severity
    pub fn validate(&self) -> ConfigResult<()> {
        if self.page_size < MIN_PAGE_SIZE {
            return Err(ConfigError::Invalid(format!(
                "page_size {} is below minimum {}",
                self.page_size, MIN_PAGE_SIZE
            )));
        }
        if self.buffer_pages < 2 {
            return Err(ConfigError::Invalid(format!(
                "buffer_pages must be at least 2, got {}",
                self.buffer_pages
            )));
        }
        if self.sort_run_pages == Some(0) {
            return Err(ConfigError::Invalid("sort_run_pages must be at least 1".into()));
        }
        self.log_severity()?;
        Ok(())
    }

    /// Input pages per sorted run
    pub fn run_pages(&self) -> usize {
        self.sort_run_pages
            .unwrap_or(self.buffer_pages / 2)
            .max(1)
    }

    /// Parsed `log_level`
    pub fn log_severity(&self) -> ConfigResult<Severity> {
        Severity::from_name(&self.log_level)
            .ok_or_else(|| ConfigError::Invalid(format!("unknown log_level '{}'", self.log_level)))
    }

    /// Installs `log_level` as the process-wide logger threshold
    pub fn apply_log_level(&self) -> ConfigResult<()> {
        Logger::set_min_severity(self.log_severity()?);
        Ok(())
    }
}
