//! The deduplicating incident store.
//!
//! Records are keyed by incident number. Inserting a number that already
//! exists is a no-op: the stored record is never overwritten, and the
//! conflict is not an error. Re-ingesting the same or overlapping documents
//! is therefore safe.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use duckdb::Connection;
use incident_digest_incident_models::{IncidentRecord, NatureCount};

use crate::DbError;

const CREATE_INCIDENTS: &str = "CREATE TABLE IF NOT EXISTS incidents (
        incident_time TEXT,
        incident_number TEXT UNIQUE,
        incident_location TEXT,
        nature TEXT,
        incident_ori TEXT
    );";

/// Outcome of one [`IncidentStore::upsert_all`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertSummary {
    /// Records that were new and got stored.
    pub inserted: u64,
    /// Records skipped because their incident number was already stored
    /// (or appeared earlier in the same call).
    pub duplicates: u64,
}

impl UpsertSummary {
    /// Adds another summary to this one.
    pub const fn absorb(&mut self, other: Self) {
        self.inserted += other.inserted;
        self.duplicates += other.duplicates;
    }
}

/// Handle to one incident store.
///
/// The handle owns its connection; callers pass it explicitly to whatever
/// needs the store. Mutating methods take `&mut self`, so a store has a
/// single writer.
pub struct IncidentStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for IncidentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncidentStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl IncidentStore {
    /// Opens (or creates) a store file, creating the table if it is
    /// missing. Existing records are kept.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the directory, connection, or schema cannot
    /// be created.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        if let Some(parent) = path.parent() {
            crate::paths::ensure_dir(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(CREATE_INCIDENTS)?;

        log::debug!("Opened incident store at {}", path.display());

        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Opens a store that lives only as long as the handle.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the connection or schema cannot be created.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(CREATE_INCIDENTS)?;
        Ok(Self { conn, path: None })
    }

    /// Path of the backing file, or `None` for an in-memory store.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Drops and recreates the `incidents` table, leaving the store empty.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the schema cannot be rebuilt.
    pub fn reset(&mut self) -> Result<(), DbError> {
        self.conn.execute_batch(&format!(
            "DROP TABLE IF EXISTS incidents;
             {CREATE_INCIDENTS}"
        ))?;
        log::debug!("Reset incident store");
        Ok(())
    }

    /// Inserts every record whose incident number is not stored yet.
    ///
    /// Conflicting records are skipped, never overwritten. Within one call
    /// the first occurrence of a number wins. All inserts run in a single
    /// transaction.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the transaction fails; nothing from this call
    /// is stored in that case.
    pub fn upsert_all(&mut self, records: &[IncidentRecord]) -> Result<UpsertSummary, DbError> {
        if records.is_empty() {
            return Ok(UpsertSummary::default());
        }

        // First occurrence of each incident number within the batch.
        let mut seen = BTreeSet::new();
        let unique: Vec<&IncidentRecord> = records
            .iter()
            .filter(|r| seen.insert(r.incident_number.as_str()))
            .collect();

        let tx = self.conn.transaction()?;
        let before = count_rows(&tx)?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO incidents (
                    incident_time, incident_number, incident_location, nature, incident_ori
                 ) VALUES (?, ?, ?, ?, ?)
                 ON CONFLICT (incident_number) DO NOTHING",
            )?;

            for record in &unique {
                stmt.execute(duckdb::params![
                    record.occurred_at,
                    record.incident_number,
                    record.location,
                    record.nature,
                    record.originating_agency,
                ])?;
            }
        }
        let after = count_rows(&tx)?;
        tx.commit()?;

        let inserted = after.saturating_sub(before);
        let summary = UpsertSummary {
            inserted,
            duplicates: records.len() as u64 - inserted,
        };

        if summary.duplicates > 0 {
            log::debug!(
                "Skipped {} duplicate incident number(s) of {}",
                summary.duplicates,
                records.len()
            );
        }

        Ok(summary)
    }

    /// Counts stored incidents per nature, ascending by nature.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    pub fn query_nature_counts(&self) -> Result<Vec<NatureCount>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT nature, COUNT(*) AS count
             FROM incidents
             GROUP BY nature
             ORDER BY nature ASC",
        )?;

        let rows = stmt.query_map([], |row| {
            let nature: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((nature, count))
        })?;

        let mut counts = Vec::new();
        for row in rows {
            let (nature, count) = row?;
            let count = to_count(count, format_args!("nature {nature:?}"))?;
            counts.push(NatureCount { nature, count });
        }

        Ok(counts)
    }

    /// Returns the number of stored incidents.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    pub fn record_count(&self) -> Result<u64, DbError> {
        count_rows(&self.conn)
    }

    /// Looks up one stored incident by number.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    pub fn get(&self, incident_number: &str) -> Result<Option<IncidentRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT incident_time, incident_number, incident_location, nature, incident_ori
             FROM incidents
             WHERE incident_number = ?",
        )?;

        let result = stmt.query_row([incident_number], |row| {
            Ok(IncidentRecord {
                occurred_at: row.get(0)?,
                incident_number: row.get(1)?,
                location: row.get(2)?,
                nature: row.get(3)?,
                originating_agency: row.get(4)?,
            })
        });

        match result {
            Ok(record) => Ok(Some(record)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DbError::DuckDb(e)),
        }
    }
}

fn count_rows(conn: &Connection) -> Result<u64, DbError> {
    let mut stmt = conn.prepare("SELECT COUNT(*) FROM incidents")?;
    let count: i64 = stmt.query_row([], |row| row.get(0))?;
    to_count(count, "incidents")
}

fn to_count(count: i64, what: impl std::fmt::Display) -> Result<u64, DbError> {
    u64::try_from(count).map_err(|_| DbError::Conversion {
        message: format!("negative count {count} for {what}"),
    })
}
