//! Fetch every configured city, then hand the batch to both sinks.

use std::{fmt, path::PathBuf};
use tracing::{error, info, warn};

use crate::{
    config::PipelineConfig,
    model::{Batch, City},
    provider::{WeatherProvider, provider_from_config},
    sink::{PostgresStore, RecordStore, write_csv},
};

/// Fetch each city in order, keeping the successes.
///
/// Failures are logged and skipped; this never fails as a whole.
pub async fn assemble(provider: &dyn WeatherProvider, cities: &[City]) -> Batch {
    let mut batch = Batch::new();

    for city in cities {
        match provider.current_weather(city).await {
            Ok(record) => batch.push(record),
            Err(err) => warn!(city = %city.name, error = %err, "skipping city"),
        }
    }

    batch
}

/// What happened to one sink during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkOutcome<T> {
    /// Nothing to write.
    Skipped,
    Done(T),
    Failed(String),
}

impl<T> SinkOutcome<T> {
    pub fn is_failed(&self) -> bool {
        matches!(self, SinkOutcome::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub file: SinkOutcome<PathBuf>,
    pub database: SinkOutcome<u64>,
}

impl RunSummary {
    /// True unless a sink failed. Skipped cities alone don't fail a run.
    pub fn is_success(&self) -> bool {
        !self.file.is_failed() && !self.database.is_failed()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fetched {}/{} cities; file: ", self.succeeded, self.attempted)?;
        match &self.file {
            SinkOutcome::Skipped => f.write_str("skipped")?,
            SinkOutcome::Done(path) => write!(f, "{}", path.display())?,
            SinkOutcome::Failed(err) => write!(f, "failed ({err})")?,
        }
        f.write_str("; database: ")?;
        match &self.database {
            SinkOutcome::Skipped => f.write_str("skipped"),
            SinkOutcome::Done(rows) => write!(f, "{rows} rows"),
            SinkOutcome::Failed(err) => write!(f, "failed ({err})"),
        }
    }
}

/// One configured ETL job. Holds no state between runs.
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    provider: Box<dyn WeatherProvider>,
    store: Box<dyn RecordStore>,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        provider: Box<dyn WeatherProvider>,
        store: Box<dyn RecordStore>,
    ) -> Self {
        Self {
            config,
            provider,
            store,
        }
    }

    /// Open-Meteo for fetching, PostgreSQL for the table.
    pub fn from_config(config: PipelineConfig) -> anyhow::Result<Self> {
        let provider = provider_from_config(&config.api)?;
        let store = Box::new(PostgresStore::new(config.database.clone()));
        Ok(Self::new(config, provider, store))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Execute one run. Every failure ends up in the summary, never as an error.
    pub async fn run(&self) -> RunSummary {
        let attempted = self.config.cities.len();
        info!(cities = attempted, "starting weather run");

        let batch = assemble(self.provider.as_ref(), &self.config.cities).await;
        info!(fetched = batch.len(), attempted, "batch assembled");

        if batch.is_empty() {
            warn!("no data fetched");
        }

        let file = match write_csv(&batch, &self.config.data_dir) {
            Ok(Some(path)) => SinkOutcome::Done(path),
            Ok(None) => SinkOutcome::Skipped,
            Err(err) => {
                error!(error = %err, dir = %self.config.data_dir.display(), "file sink failed");
                SinkOutcome::Failed(err.to_string())
            }
        };

        let database = match self.store.write_batch(&batch).await {
            Ok(_) if batch.is_empty() => SinkOutcome::Skipped,
            Ok(rows) => SinkOutcome::Done(rows),
            Err(err) => {
                error!(error = %err, "database sink failed");
                SinkOutcome::Failed(err.to_string())
            }
        };

        let summary = RunSummary {
            attempted,
            succeeded: batch.len(),
            file,
            database,
        };
        info!(%summary, success = summary.is_success(), "weather run finished");

        summary
    }
}
