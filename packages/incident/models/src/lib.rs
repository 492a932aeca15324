#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident record and aggregate value types.
//!
//! Every stage of the pipeline speaks in these types: the record parser
//! produces [`IncidentRecord`]s, the incident store persists them, and the
//! aggregation query returns [`NatureCount`]s.

use serde::{Deserialize, Serialize};

/// Number of columns in an incident summary row.
pub const FIELD_COUNT: usize = 5;

/// One reported incident as it appears in a daily incident summary.
///
/// All fields are kept as the source printed them. `occurred_at` in
/// particular is not parsed, since departments are inconsistent about the
/// timestamp format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentRecord {
    /// Date/time of the incident, free-form.
    pub occurred_at: String,
    /// Incident number assigned by the department. Unique per store.
    pub incident_number: String,
    /// Location text (usually a block address or intersection).
    pub location: String,
    /// Incident nature, e.g. `"TRAFFIC STOP"`. Aggregation key.
    pub nature: String,
    /// Originating agency identifier (ORI).
    pub originating_agency: String,
}

impl IncidentRecord {
    /// Builds a record from exactly [`FIELD_COUNT`] fields in column order:
    /// time, number, location, nature, ORI.
    ///
    /// Returns `None` if the field count is wrong or any field is empty
    /// after trimming.
    #[must_use]
    pub fn from_fields<S: AsRef<str>>(fields: &[S]) -> Option<Self> {
        let [occurred_at, incident_number, location, nature, originating_agency] = fields else {
            return None;
        };

        let field = |s: &S| {
            let trimmed = s.as_ref().trim();
            (!trimmed.is_empty()).then(|| trimmed.to_owned())
        };

        Some(Self {
            occurred_at: field(occurred_at)?,
            incident_number: field(incident_number)?,
            location: field(location)?,
            nature: field(nature)?,
            originating_agency: field(originating_agency)?,
        })
    }
}

/// Number of stored incidents sharing one nature.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NatureCount {
    /// Incident nature.
    pub nature: String,
    /// Number of incidents with this nature.
    pub count: u64,
}

impl NatureCount {
    /// Creates a new count entry.
    #[must_use]
    pub fn new(nature: impl Into<String>, count: u64) -> Self {
        Self {
            nature: nature.into(),
            count,
        }
    }
}

impl std::fmt::Display for NatureCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}|{}", self.nature, self.count)
    }
}

/// Line counters collected while parsing one document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseStats {
    /// Non-blank lines seen.
    pub lines: u64,
    /// Lines that produced a record.
    pub parsed: u64,
    /// Non-blank lines that did not produce a record.
    pub rejected: u64,
}

impl ParseStats {
    /// Adds another set of counters to this one.
    pub const fn absorb(&mut self, other: Self) {
        self.lines += other.lines;
        self.parsed += other.parsed;
        self.rejected += other.rejected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_fields_assigns_in_column_order() {
        let record = IncidentRecord::from_fields(&[
            "8/1/2024 0:04",
            "2024-00055419",
            "1345 W LINDSEY ST",
            "Traffic Stop",
            "OK0140200",
        ])
        .unwrap();

        assert_eq!(record.occurred_at, "8/1/2024 0:04");
        assert_eq!(record.incident_number, "2024-00055419");
        assert_eq!(record.location, "1345 W LINDSEY ST");
        assert_eq!(record.nature, "Traffic Stop");
        assert_eq!(record.originating_agency, "OK0140200");
    }

    #[test]
    fn from_fields_rejects_wrong_arity() {
        assert!(IncidentRecord::from_fields(&["a", "b", "c", "d"]).is_none());
        assert!(IncidentRecord::from_fields(&["a", "b", "c", "d", "e", "f"]).is_none());
    }

    #[test]
    fn from_fields_rejects_blank_field() {
        assert!(IncidentRecord::from_fields(&["a", "  ", "c", "d", "e"]).is_none());
    }

    #[test]
    fn nature_count_displays_pipe_separated() {
        assert_eq!(NatureCount::new("ALARM", 2).to_string(), "ALARM|2");
    }

    #[test]
    fn record_serializes_camel_case() {
        let record = IncidentRecord::from_fields(&["t", "n", "l", "x", "o"]).unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["incidentNumber"], "n");
        assert_eq!(json["originatingAgency"], "o");
    }

    #[test]
    fn parse_stats_absorb_sums_counters() {
        let mut total = ParseStats {
            lines: 3,
            parsed: 2,
            rejected: 1,
        };
        total.absorb(ParseStats {
            lines: 4,
            parsed: 4,
            rejected: 0,
        });
        assert_eq!(
            total,
            ParseStats {
                lines: 7,
                parsed: 6,
                rejected: 1,
            }
        );
    }
}
