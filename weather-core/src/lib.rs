//! Core library for the weather ETL job.
//!
//! This crate defines:
//! - Pipeline configuration (cities, data directory, API and database settings)
//! - The weather provider abstraction and its Open-Meteo implementation
//! - The CSV and PostgreSQL sinks
//! - The pipeline entry point that ties them together
//!
//! It is used by the `weather-etl` binary, but any scheduler can drive
//! [`Pipeline::run`] directly.

pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod provider;
pub mod sink;

#[cfg(test)]
mod test_support;

pub use config::{ApiConfig, DatabaseConfig, PipelineConfig};
pub use error::{DatabaseError, FetchError, FileSinkError};
pub use model::{Batch, City, WeatherRecord};
pub use pipeline::{Pipeline, RunSummary, SinkOutcome, assemble};
pub use provider::{OpenMeteoProvider, WeatherProvider};
pub use sink::{PostgresStore, RecordStore};
