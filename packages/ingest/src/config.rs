//! Batch configuration.
//!
//! Defaults come from [`IngestConfig::default`], environment variables
//! override them ([`IngestConfig::from_env`]), and CLI flags override both.

use std::path::PathBuf;
use std::time::Duration;

use incident_digest_pdf::ParserStrategy;
use strum_macros::{AsRefStr, Display, EnumString};

use crate::IngestError;

/// Overrides the store directory.
pub const DATA_DIR_VAR: &str = "INCIDENT_DIGEST_DATA_DIR";
/// Overrides the number of documents processed concurrently.
pub const CONCURRENCY_VAR: &str = "INCIDENT_DIGEST_CONCURRENCY";
/// Sets a per-request fetch timeout in seconds.
pub const FETCH_TIMEOUT_VAR: &str = "INCIDENT_DIGEST_FETCH_TIMEOUT_SECS";

/// Default number of documents fetched and parsed at once.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// What to do when a document cannot be fetched or extracted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum FailurePolicy {
    /// Record the failure in the batch report and keep going.
    #[default]
    Continue,
    /// Stop the batch at the first failure. Documents merged before the
    /// failure stay merged.
    Abort,
}

/// Settings for one ingestion batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    /// Directory holding the store files.
    pub data_dir: PathBuf,
    /// Selects an alternate store file (`incidents_<run_id>.duckdb`).
    pub run_id: Option<String>,
    /// Empty the store before ingesting.
    pub reset: bool,
    /// Documents fetched and parsed at once.
    pub concurrency: usize,
    /// Per-request fetch timeout. `None` waits indefinitely.
    pub fetch_timeout: Option<Duration>,
    /// Failure handling.
    pub failure_policy: FailurePolicy,
    /// Line parsing strategy.
    pub parser: ParserStrategy,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            data_dir: incident_digest_database::paths::data_dir(),
            run_id: None,
            reset: true,
            concurrency: DEFAULT_CONCURRENCY,
            fetch_timeout: None,
            failure_policy: FailurePolicy::default(),
            parser: ParserStrategy::default(),
        }
    }
}

impl IngestConfig {
    /// Builds a configuration from defaults plus environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Config`] if a variable holds an invalid
    /// value.
    pub fn from_env() -> Result<Self, IngestError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`Self::from_env`], reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Config`] if a variable holds an invalid
    /// value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, IngestError> {
        let mut config = Self::default();

        if let Some(dir) = lookup(DATA_DIR_VAR).filter(|v| !v.trim().is_empty()) {
            config.data_dir = PathBuf::from(dir);
        }

        if let Some(value) = lookup(CONCURRENCY_VAR) {
            config.concurrency = parse_positive(CONCURRENCY_VAR, &value)?;
        }

        if let Some(value) = lookup(FETCH_TIMEOUT_VAR) {
            let secs = parse_positive(FETCH_TIMEOUT_VAR, &value)?;
            config.fetch_timeout = Some(Duration::from_secs(secs as u64));
        }

        Ok(config)
    }

    /// Path of the store file this batch writes to.
    #[must_use]
    pub fn store_path(&self) -> PathBuf {
        incident_digest_database::paths::store_path(&self.data_dir, self.run_id.as_deref())
    }
}

fn parse_positive(key: &str, value: &str) -> Result<usize, IngestError> {
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(IngestError::Config {
            message: format!("{key} must be a positive integer, got {value:?}"),
        }),
    }
}
