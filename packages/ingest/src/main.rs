#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point: ingest incident summaries and print nature counts.
//!
//! Prints one `nature|count` line per nature, ascending by nature. Exits
//! non-zero if any document could not be fetched or extracted.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use incident_digest_database::IncidentStore;
use incident_digest_ingest::{
    DocumentSource, FailurePolicy, IngestConfig, Pipeline, process_batch,
};
use incident_digest_pdf::{ColumnPositions, ParserStrategy};

#[derive(Parser)]
#[command(
    name = "incident_digest",
    about = "Incident summary ingestion and nature counts"
)]
struct Cli {
    /// Incident summary URLs (values containing whitespace are split)
    #[arg(long, num_args = 1.., required_unless_present = "file")]
    incidents: Vec<String>,
    /// Local incident summary files (PDF or layout text)
    #[arg(long, num_args = 1..)]
    file: Vec<PathBuf>,
    /// Write to `incidents_<RUN_ID>.duckdb` instead of the default store
    #[arg(long)]
    run_id: Option<String>,
    /// Directory holding the store files (overrides `INCIDENT_DIGEST_DATA_DIR`)
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Keep previously stored incidents instead of starting empty
    #[arg(long)]
    keep_existing: bool,
    /// Stop at the first document that cannot be fetched or extracted
    #[arg(long)]
    fail_fast: bool,
    /// Documents processed at once (overrides `INCIDENT_DIGEST_CONCURRENCY`)
    #[arg(long)]
    concurrency: Option<usize>,
    /// Per-request fetch timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Parse fixed-width rows at these five character offsets, e.g.
    /// `0,20,35,70,110`
    #[arg(long, value_delimiter = ',')]
    columns: Option<Vec<usize>>,
}

impl Cli {
    fn config(&self) -> Result<IngestConfig, Box<dyn std::error::Error>> {
        let mut config = IngestConfig::from_env()?;

        if let Some(dir) = &self.data_dir {
            config.data_dir.clone_from(dir);
        }
        config.run_id.clone_from(&self.run_id);
        config.reset = !self.keep_existing;
        if let Some(n) = self.concurrency {
            config.concurrency = n.max(1);
        }
        if let Some(secs) = self.timeout_secs {
            config.fetch_timeout = Some(Duration::from_secs(secs));
        }
        if self.fail_fast {
            config.failure_policy = FailurePolicy::Abort;
        }
        if let Some(columns) = &self.columns {
            let starts: [usize; 5] = columns
                .as_slice()
                .try_into()
                .map_err(|_| format!("--columns needs 5 offsets, got {}", columns.len()))?;
            let columns = ColumnPositions::new(starts)
                .ok_or("--columns offsets must be strictly increasing")?;
            config.parser = ParserStrategy::ColumnPositions(columns);
        }

        Ok(config)
    }

    fn sources(&self) -> Vec<DocumentSource> {
        self.incidents
            .iter()
            .flat_map(|value| DocumentSource::urls(value))
            .chain(self.file.iter().cloned().map(DocumentSource::File))
            .collect()
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let config = cli.config()?;
    let sources = cli.sources();
    if sources.is_empty() {
        return Err("no documents given".into());
    }

    let store_path = config.store_path();
    log::info!("Using incident store {}", store_path.display());
    let mut store = IncidentStore::open(&store_path)?;

    let pipeline = Pipeline::http(&config)?;
    let outcome = process_batch(&mut store, &pipeline, sources, config.reset).await?;

    for count in &outcome.counts {
        println!("{count}");
    }

    if outcome.counts.is_empty() {
        log::warn!("No incidents found");
    }

    if outcome.report.has_failures() {
        for (source, error) in outcome.report.failures() {
            log::error!("Failed to ingest {source}: {error}");
        }
        return Ok(ExitCode::FAILURE);
    }

    Ok(ExitCode::SUCCESS)
}
