//! Row parsing for whitespace-aligned incident tables.
//!
//! Handles two layouts:
//! - **Whitespace runs**: columns are separated by two or more whitespace
//!   characters. This is the default and matches how incident summaries
//!   come out of layout extraction.
//! - **Fixed-width columns**: fields sit at known character positions.
//!
//! Both strategies are strict: a line yields a record only when all five
//! columns are present and non-empty. There is no attempt to reconcile
//! lines with a missing or extra column.

use std::sync::LazyLock;

use incident_digest_incident_models::{FIELD_COUNT, IncidentRecord, ParseStats};
use regex::Regex;

/// Two or more consecutive whitespace characters.
static COLUMN_GAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("valid regex"));

/// A strategy for turning one line of extracted text into a record.
pub trait LineParser: Send + Sync {
    /// Parses a single line. Returns `None` if the line is not a
    /// complete incident row.
    fn parse_line(&self, line: &str) -> Option<IncidentRecord>;

    /// Short name of the strategy, used in log messages.
    fn name(&self) -> &'static str;
}

/// Splits lines on runs of two or more whitespace characters and keeps
/// lines with exactly five non-empty fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WhitespaceRuns;

impl WhitespaceRuns {
    /// Splits `line` into trimmed, non-empty fields.
    #[must_use]
    pub fn tokenize(line: &str) -> Vec<&str> {
        COLUMN_GAP
            .split(line)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }
}

impl LineParser for WhitespaceRuns {
    fn parse_line(&self, line: &str) -> Option<IncidentRecord> {
        let fields = Self::tokenize(line);
        if fields.len() != FIELD_COUNT {
            return None;
        }
        IncidentRecord::from_fields(&fields)
    }

    fn name(&self) -> &'static str {
        "whitespace_runs"
    }
}

/// Slices lines at fixed character positions.
///
/// `column_starts[i]` is the character offset where column `i` begins;
/// each column runs up to the next start (the last one to end of line).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnPositions {
    column_starts: [usize; FIELD_COUNT],
}

impl ColumnPositions {
    /// Creates a column-position parser.
    ///
    /// Returns `None` unless the offsets are strictly increasing.
    #[must_use]
    pub fn new(column_starts: [usize; FIELD_COUNT]) -> Option<Self> {
        column_starts
            .windows(2)
            .all(|w| w[0] < w[1])
            .then_some(Self { column_starts })
    }

    /// Column start offsets.
    #[must_use]
    pub const fn column_starts(&self) -> [usize; FIELD_COUNT] {
        self.column_starts
    }
}

impl LineParser for ColumnPositions {
    fn parse_line(&self, line: &str) -> Option<IncidentRecord> {
        let chars: Vec<char> = line.chars().collect();

        let fields: Vec<String> = (0..FIELD_COUNT)
            .map(|i| {
                let start = self.column_starts[i].min(chars.len());
                let end = self
                    .column_starts
                    .get(i + 1)
                    .copied()
                    .unwrap_or(chars.len())
                    .min(chars.len());
                chars[start..end].iter().collect::<String>()
            })
            .collect();

        IncidentRecord::from_fields(&fields)
    }

    fn name(&self) -> &'static str {
        "column_positions"
    }
}

/// The built-in line parsing strategies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParserStrategy {
    /// See [`WhitespaceRuns`].
    #[default]
    WhitespaceRuns,
    /// See [`ColumnPositions`].
    ColumnPositions(ColumnPositions),
}

impl LineParser for ParserStrategy {
    fn parse_line(&self, line: &str) -> Option<IncidentRecord> {
        match self {
            Self::WhitespaceRuns => WhitespaceRuns.parse_line(line),
            Self::ColumnPositions(columns) => columns.parse_line(line),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::WhitespaceRuns => WhitespaceRuns.name(),
            Self::ColumnPositions(columns) => columns.name(),
        }
    }
}

/// Parses every line of one page.
///
/// Blank lines are ignored entirely; other lines that do not yield a
/// record are counted as rejected.
#[must_use]
pub fn parse_page(text: &str, parser: &dyn LineParser) -> (Vec<IncidentRecord>, ParseStats) {
    let mut records = Vec::new();
    let mut stats = ParseStats::default();

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }

        stats.lines += 1;
        if let Some(record) = parser.parse_line(line) {
            stats.parsed += 1;
            records.push(record);
        } else {
            stats.rejected += 1;
            log::trace!("Rejected line: {line:?}");
        }
    }

    (records, stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_tokens_yield_a_record() {
        let record = WhitespaceRuns
            .parse_line("8/1/2024 0:04   2024-00055419  1345 W LINDSEY ST    Traffic Stop   OK0140200")
            .unwrap();

        assert_eq!(record.occurred_at, "8/1/2024 0:04");
        assert_eq!(record.incident_number, "2024-00055419");
        assert_eq!(record.location, "1345 W LINDSEY ST");
        assert_eq!(record.nature, "Traffic Stop");
        assert_eq!(record.originating_agency, "OK0140200");
    }

    #[test]
    fn other_token_counts_yield_nothing() {
        // Missing ORI.
        assert!(
            WhitespaceRuns
                .parse_line("8/1/2024 0:04  2024-1  MAIN ST  Alarm")
                .is_none()
        );
        // Extra column.
        assert!(
            WhitespaceRuns
                .parse_line("8/1/2024 0:04  2024-1  MAIN ST  Alarm  OK0140200  extra")
                .is_none()
        );
        assert!(WhitespaceRuns.parse_line("").is_none());
    }

    #[test]
    fn single_spaces_do_not_split() {
        assert_eq!(
            WhitespaceRuns::tokenize("a b  c d"),
            vec!["a b", "c d"],
        );
    }

    #[test]
    fn mixed_whitespace_runs_split() {
        assert_eq!(
            WhitespaceRuns::tokenize("  a\t\tb \tc   d  \t e  "),
            vec!["a", "b", "c", "d", "e"],
        );
    }

    #[test]
    fn double_space_inside_a_field_loses_the_row() {
        // "1345 W  LINDSEY" splits into an extra column.
        assert!(
            WhitespaceRuns
                .parse_line("8/1/2024 0:04  2024-1  1345 W  LINDSEY  Alarm  OK0140200")
                .is_none()
        );
    }

    #[test]
    fn column_positions_slice_fixed_width_rows() {
        let parser = ColumnPositions::new([0, 15, 30, 50, 65]).unwrap();
        let line = format!(
            "{:<15}{:<15}{:<20}{:<15}{}",
            "8/1/2024 0:04", "2024-00055419", "1345 W  LINDSEY ST", "Traffic Stop", "OK0140200"
        );

        let record = parser.parse_line(&line).unwrap();
        assert_eq!(record.location, "1345 W  LINDSEY ST");
        assert_eq!(record.nature, "Traffic Stop");
        assert_eq!(record.originating_agency, "OK0140200");
    }

    #[test]
    fn column_positions_reject_short_lines() {
        let parser = ColumnPositions::new([0, 15, 30, 50, 65]).unwrap();
        assert!(parser.parse_line("8/1/2024 0:04  2024-1").is_none());
    }

    #[test]
    fn column_positions_require_increasing_offsets() {
        assert!(ColumnPositions::new([0, 10, 10, 20, 30]).is_none());
        assert!(ColumnPositions::new([5, 0, 10, 20, 30]).is_none());
    }

    #[test]
    fn parse_page_skips_blank_lines_and_counts_rejects() {
        let text = "\n  \na  b  c  d  e\na  b  c  d\n";
        let (records, stats) = parse_page(text, &ParserStrategy::default());

        assert_eq!(records.len(), 1);
        assert_eq!(
            stats,
            ParseStats {
                lines: 2,
                parsed: 1,
                rejected: 1,
            }
        );
    }
}
