#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Batch ingestion of incident summary documents.
//!
//! A batch is a list of [`DocumentSource`]s. Each document is fetched,
//! extracted, and parsed independently (several at a time), then merged
//! into the [`IncidentStore`] by a single writer in input order. Once every
//! document has been merged, the nature aggregate is read back with
//! [`aggregate`].
//!
//! Failed documents are reported per document in a [`BatchReport`]; with
//! [`FailurePolicy::Abort`] the first failure ends the batch instead.

pub mod config;
pub mod report;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt as _};
use incident_digest_database::{DbError, IncidentStore};
use incident_digest_incident_models::NatureCount;
use incident_digest_pdf::{
    AcceptedFormats, ExtractError, FetchError, Fetcher, HttpFetcher, LineParser, ParsedDocument,
};

pub use config::{FailurePolicy, IngestConfig};
pub use report::{BatchReport, DocumentOutcome, DocumentStatus};

/// Errors that end a batch.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The store could not be opened, written, or queried.
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// The HTTP client could not be built.
    #[error("Fetcher error: {0}")]
    Fetcher(#[from] FetchError),

    /// A document failed under [`FailurePolicy::Abort`].
    #[error("Failed to ingest {document}: {error}")]
    Document {
        /// URL, path, or upload name of the document.
        document: String,
        /// What went wrong.
        #[source]
        error: DocumentError,
    },

    /// The batch finished but the store holds no incidents.
    #[error("No incidents found")]
    EmptyResult,

    /// Invalid configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },
}

/// Why a single document contributed nothing.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// The document could not be retrieved.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The document could not be turned into text.
    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// The extraction task panicked or was cancelled.
    #[error("Extraction task failed: {0}")]
    Task(String),
}

/// Where a document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    /// Downloaded with the batch's [`Fetcher`].
    Url(String),
    /// Read from the local filesystem.
    File(PathBuf),
    /// Bytes already in memory, e.g. from an upload form.
    Upload {
        /// Display name (usually the uploaded file name).
        name: String,
        /// Raw document bytes.
        bytes: Vec<u8>,
    },
}

impl DocumentSource {
    /// Splits whitespace-separated URL input (a form field or a CLI value)
    /// into URL sources.
    #[must_use]
    pub fn urls(input: &str) -> Vec<Self> {
        input
            .split_whitespace()
            .map(|url| Self::Url(url.to_owned()))
            .collect()
    }

    /// Formats this source may be in. Remote documents must be PDFs, so an
    /// HTML error page served in place of a summary fails instead of
    /// parsing to nothing; local files may also be layout text dumps.
    /// `text_uploads` extends layout text to uploads.
    #[must_use]
    pub const fn accepted_formats(&self, text_uploads: bool) -> AcceptedFormats {
        match self {
            Self::File(_) => AcceptedFormats::PdfOrLayoutText,
            Self::Upload { .. } if text_uploads => AcceptedFormats::PdfOrLayoutText,
            Self::Url(_) | Self::Upload { .. } => AcceptedFormats::PdfOnly,
        }
    }

    /// Human-readable label for logs and reports.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::File(path) => path.display().to_string(),
            Self::Upload { name, .. } => name.clone(),
        }
    }
}

/// Aggregate and per-document report of a completed batch.
#[derive(Debug)]
pub struct BatchOutcome {
    /// Per-document results.
    pub report: BatchReport,
    /// Nature counts over the whole store, ascending by nature.
    pub counts: Vec<NatureCount>,
}

/// Fetches, parses, and merges documents into a store.
pub struct Pipeline {
    fetcher: Arc<dyn Fetcher>,
    parser: Arc<dyn LineParser>,
    concurrency: usize,
    failure_policy: FailurePolicy,
    text_uploads: bool,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("parser", &self.parser.name())
            .field("concurrency", &self.concurrency)
            .field("failure_policy", &self.failure_policy)
            .field("text_uploads", &self.text_uploads)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Creates a pipeline using `fetcher` for URL sources and the parser,
    /// concurrency, and failure policy from `config`.
    #[must_use]
    pub fn new(fetcher: Arc<dyn Fetcher>, config: &IngestConfig) -> Self {
        Self {
            fetcher,
            parser: Arc::new(config.parser),
            concurrency: config.concurrency.max(1),
            failure_policy: config.failure_policy,
            text_uploads: false,
        }
    }

    /// Creates a pipeline with an [`HttpFetcher`] configured from
    /// `config`.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Fetcher`] if the HTTP client cannot be built.
    pub fn http(config: &IngestConfig) -> Result<Self, IngestError> {
        let fetcher = HttpFetcher::builder()
            .timeout(config.fetch_timeout)
            .build()?;
        Ok(Self::new(Arc::new(fetcher), config))
    }

    /// Replaces the line parser, e.g. for a department whose summaries use
    /// a different layout.
    #[must_use]
    pub fn with_parser(mut self, parser: Arc<dyn LineParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Accepts layout text dumps as uploads in addition to PDFs.
    #[must_use]
    pub fn with_text_uploads(mut self, allow: bool) -> Self {
        self.text_uploads = allow;
        self
    }

    /// Processes every document and merges the records into `store`.
    ///
    /// Documents are loaded concurrently but merged strictly in input
    /// order, so when two documents share an incident number the earlier
    /// document's record is the one kept. Returns only after the last merge
    /// has completed.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Database`] if a merge fails, or
    /// [`IngestError::Document`] for the first failed document under
    /// [`FailurePolicy::Abort`]. Documents merged before the error stay in
    /// the store.
    pub async fn run(
        &self,
        store: &mut IncidentStore,
        sources: Vec<DocumentSource>,
    ) -> Result<BatchReport, IngestError> {
        let start = Instant::now();
        let total = sources.len();
        let mut report = BatchReport::default();

        log::info!(
            "Ingesting {total} document(s) with {} strategy (concurrency={})",
            self.parser.name(),
            self.concurrency
        );

        let mut loaded = stream::iter(sources.into_iter().map(|source| {
            let fetcher = Arc::clone(&self.fetcher);
            let parser = Arc::clone(&self.parser);
            let accepted = source.accepted_formats(self.text_uploads);
            async move {
                let label = source.label();
                let result = load_document(fetcher.as_ref(), parser, source, accepted).await;
                (label, result)
            }
        }))
        .buffered(self.concurrency);

        let mut index = 0usize;
        while let Some((label, result)) = loaded.next().await {
            index += 1;
            match result {
                Ok(parsed) => {
                    // The only writer: merges run on this task, one document
                    // at a time. Each is a short blocking DuckDB transaction.
                    let upsert = store.upsert_all(&parsed.records)?;
                    log::info!(
                        "[{index}/{total}] {label}: parsed {}/{} lines, inserted {} ({} duplicates)",
                        parsed.stats.parsed,
                        parsed.stats.lines,
                        upsert.inserted,
                        upsert.duplicates,
                    );
                    report.push(
                        label,
                        DocumentStatus::Ingested {
                            stats: parsed.stats,
                            upsert,
                        },
                    );
                }
                Err(error) => {
                    log::warn!("[{index}/{total}] {label}: {error}");
                    match self.failure_policy {
                        FailurePolicy::Abort => {
                            return Err(IngestError::Document {
                                document: label,
                                error,
                            });
                        }
                        FailurePolicy::Continue => {
                            report.push(label, DocumentStatus::Failed(error));
                        }
                    }
                }
            }
        }

        let (stats, upsert) = report.totals();
        log::info!(
            "Batch complete: {} inserted from {} parsed lines ({} rejected, {} duplicates), {} failed document(s), took {:.1}s",
            upsert.inserted,
            stats.parsed,
            stats.rejected,
            upsert.duplicates,
            report.failures().count(),
            start.elapsed().as_secs_f64()
        );

        Ok(report)
    }
}

async fn load_document(
    fetcher: &dyn Fetcher,
    parser: Arc<dyn LineParser>,
    source: DocumentSource,
    accepted: AcceptedFormats,
) -> Result<ParsedDocument, DocumentError> {
    let bytes = match source {
        DocumentSource::Url(url) => fetcher.fetch(&url).await?,
        DocumentSource::File(path) => {
            tokio::fs::read(&path)
                .await
                .map_err(|source| FetchError::Io {
                    path: path.display().to_string(),
                    source,
                })?
        }
        DocumentSource::Upload { bytes, .. } => bytes,
    };

    let parsed = tokio::task::spawn_blocking(move || {
        incident_digest_pdf::parse_document(&bytes, parser.as_ref(), accepted)
    })
    .await
    .map_err(|e| DocumentError::Task(e.to_string()))??;

    Ok(parsed)
}

/// Reads the nature aggregate from `store`, ascending by nature.
///
/// Identical store contents always produce identical output.
///
/// # Errors
///
/// Returns [`IngestError::Database`] if the query fails.
pub fn aggregate(store: &IncidentStore) -> Result<Vec<NatureCount>, IngestError> {
    Ok(store.query_nature_counts()?)
}

/// Passes `counts` through, or returns [`IngestError::EmptyResult`] when
/// there is nothing to show.
///
/// # Errors
///
/// Returns [`IngestError::EmptyResult`] if `counts` is empty.
pub fn require_incidents(counts: Vec<NatureCount>) -> Result<Vec<NatureCount>, IngestError> {
    if counts.is_empty() {
        Err(IngestError::EmptyResult)
    } else {
        Ok(counts)
    }
}

/// Runs a complete batch against `store`: optional reset, ingestion, and
/// the final aggregate query.
///
/// # Errors
///
/// See [`Pipeline::run`]; also returns [`IngestError::Database`] if the
/// reset or aggregate query fails.
pub async fn process_batch(
    store: &mut IncidentStore,
    pipeline: &Pipeline,
    sources: Vec<DocumentSource>,
    reset: bool,
) -> Result<BatchOutcome, IngestError> {
    if reset {
        store.reset()?;
    }

    let report = pipeline.run(store, sources).await?;
    let counts = aggregate(store)?;

    Ok(BatchOutcome { report, counts })
}
