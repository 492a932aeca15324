//! Per-document batch results.

use incident_digest_database::UpsertSummary;
use incident_digest_incident_models::ParseStats;

use crate::DocumentError;

/// What happened to one document.
#[derive(Debug)]
pub enum DocumentStatus {
    /// The document was parsed and its records merged into the store.
    Ingested {
        /// Line counters from parsing.
        stats: ParseStats,
        /// Merge counters from the store.
        upsert: UpsertSummary,
    },
    /// The document could not be fetched or extracted and contributed
    /// nothing.
    Failed(DocumentError),
}

/// Result for one document of a batch.
#[derive(Debug)]
pub struct DocumentOutcome {
    /// URL, path, or upload name of the document.
    pub source: String,
    /// Outcome.
    pub status: DocumentStatus,
}

/// Outcomes for every document of a batch, in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// One entry per processed document.
    pub documents: Vec<DocumentOutcome>,
}

impl BatchReport {
    /// Appends an outcome.
    pub fn push(&mut self, source: String, status: DocumentStatus) {
        self.documents.push(DocumentOutcome { source, status });
    }

    /// Documents that failed.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &DocumentError)> {
        self.documents.iter().filter_map(|doc| match &doc.status {
            DocumentStatus::Failed(error) => Some((doc.source.as_str(), error)),
            DocumentStatus::Ingested { .. } => None,
        })
    }

    /// Whether any document failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    /// Line and merge counters summed over the ingested documents.
    #[must_use]
    pub fn totals(&self) -> (ParseStats, UpsertSummary) {
        let mut stats = ParseStats::default();
        let mut upsert = UpsertSummary::default();

        for doc in &self.documents {
            if let DocumentStatus::Ingested {
                stats: doc_stats,
                upsert: doc_upsert,
            } = &doc.status
            {
                stats.absorb(*doc_stats);
                upsert.absorb(*doc_upsert);
            }
        }

        (stats, upsert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use incident_digest_pdf::ExtractError;

    fn ingested(parsed: u64, inserted: u64) -> DocumentStatus {
        DocumentStatus::Ingested {
            stats: ParseStats {
                lines: parsed + 1,
                parsed,
                rejected: 1,
            },
            upsert: UpsertSummary {
                inserted,
                duplicates: parsed - inserted,
            },
        }
    }

    #[test]
    fn totals_skip_failed_documents() {
        let mut report = BatchReport::default();
        report.push("a.pdf".to_owned(), ingested(3, 3));
        report.push(
            "b.pdf".to_owned(),
            DocumentStatus::Failed(DocumentError::Extract(ExtractError::Pdf(
                "broken".to_owned(),
            ))),
        );
        report.push("c.pdf".to_owned(), ingested(2, 1));

        let (stats, upsert) = report.totals();
        assert_eq!(
            stats,
            ParseStats {
                lines: 7,
                parsed: 5,
                rejected: 2,
            }
        );
        assert_eq!(
            upsert,
            UpsertSummary {
                inserted: 4,
                duplicates: 1,
            }
        );

        assert!(report.has_failures());
        let failed: Vec<&str> = report.failures().map(|(source, _)| source).collect();
        assert_eq!(failed, vec!["b.pdf"]);
    }

    #[test]
    fn empty_report_has_no_failures() {
        let report = BatchReport::default();
        assert!(!report.has_failures());
        assert_eq!(
            report.totals(),
            (ParseStats::default(), UpsertSummary::default())
        );
    }
}
