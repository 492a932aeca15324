#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident summary document handling: download, layout extraction, and
//! row parsing.
//!
//! Police departments publish daily incident summaries as PDFs whose
//! columns are separated by runs of whitespace rather than explicit
//! delimiters. This crate turns those documents into
//! [`IncidentRecord`]s in three steps:
//!
//! 1. [`download`] fetches the raw bytes (the [`Fetcher`] trait, with an
//!    HTTP implementation).
//! 2. [`layout`] extracts per-page text while keeping the horizontal
//!    whitespace the row parser depends on.
//! 3. [`text_table`] turns each line into a record using a swappable
//!    [`LineParser`] strategy.
//!
//! [`parse_document`] chains steps 2 and 3 for callers that already hold
//! the bytes.

pub mod download;
pub mod layout;
mod pdf_text;
pub mod text_table;

use incident_digest_incident_models::{IncidentRecord, ParseStats};

pub use download::{Fetcher, HttpFetcher};
pub use layout::AcceptedFormats;
pub use text_table::{ColumnPositions, LineParser, ParserStrategy, WhitespaceRuns};

/// Errors raised while retrieving a document.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The HTTP request failed (DNS, connection, TLS, or non-success
    /// status).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The HTTP client could not be configured.
    #[error("Invalid client configuration: {0}")]
    Client(String),

    /// A local document could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Path of the document.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors raised while turning document bytes into text.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The PDF could not be parsed.
    #[error("PDF extraction error: {0}")]
    Pdf(String),

    /// A PDF was required but the document lacks the PDF signature.
    #[error("Document is not a PDF (starts with {preview:?})")]
    NotPdf {
        /// Leading bytes of the document, lossily decoded.
        preview: String,
    },

    /// Layout text that is not valid UTF-8.
    #[error("Document is not valid UTF-8 text: {0}")]
    Encoding(#[from] std::str::Utf8Error),
}

/// Records recovered from one document, with the line counters collected
/// along the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDocument {
    /// Records in document order. May contain repeated incident numbers;
    /// the store resolves those.
    pub records: Vec<IncidentRecord>,
    /// Line counters.
    pub stats: ParseStats,
}

/// Extracts text from `bytes` and parses every line with `parser`.
///
/// # Errors
///
/// Returns [`ExtractError`] if the document is not in one of the
/// `accepted` formats or cannot be turned into text. Lines that do not
/// parse are counted, never reported as errors.
pub fn parse_document(
    bytes: &[u8],
    parser: &dyn LineParser,
    accepted: AcceptedFormats,
) -> Result<ParsedDocument, ExtractError> {
    let pages = layout::extract_pages(bytes, accepted)?;

    let mut parsed = ParsedDocument::default();
    for page in &pages {
        let (records, stats) = text_table::parse_page(page, parser);
        parsed.records.extend(records);
        parsed.stats.absorb(stats);
    }

    log::debug!(
        "Parsed {} pages with {} strategy: {} records, {} rejected lines",
        pages.len(),
        parser.name(),
        parsed.stats.parsed,
        parsed.stats.rejected,
    );

    Ok(parsed)
}
