#![allow(clippy::module_name_repetitions)]
//! Canonical file paths for the `DuckDB` data directory.
//!
//! Stores live under the project root's `data/` directory unless the caller
//! supplies another directory.

use std::path::{Path, PathBuf};

/// File stem shared by every store file.
const STORE_STEM: &str = "incidents";

/// Returns the workspace root directory.
///
/// Resolved at compile time from `CARGO_MANIFEST_DIR`.
///
/// # Panics
///
/// Panics if the project root cannot be resolved.
#[must_use]
pub fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .expect("Failed to find project root from CARGO_MANIFEST_DIR")
        .to_path_buf()
}

/// Returns the default `data/` directory path.
#[must_use]
pub fn data_dir() -> PathBuf {
    project_root().join("data")
}

/// Returns the store file name for an optional run identifier.
///
/// `None` selects the default `incidents.duckdb`; `Some("t1")` selects
/// `incidents_t1.duckdb`.
#[must_use]
pub fn store_file_name(run_id: Option<&str>) -> String {
    match run_id {
        Some(id) if !id.is_empty() => format!("{STORE_STEM}_{id}.duckdb"),
        _ => format!("{STORE_STEM}.duckdb"),
    }
}

/// Returns the store path inside `dir` for an optional run identifier.
#[must_use]
pub fn store_path(dir: &Path, run_id: Option<&str>) -> PathBuf {
    dir.join(store_file_name(run_id))
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
