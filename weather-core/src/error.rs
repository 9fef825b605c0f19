use std::{path::PathBuf, time::Duration};

use reqwest::StatusCode;

/// Why a single city could not be fetched. Recovered by the batch assembler.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request for {city} timed out after {timeout:?}")]
    Timeout { city: String, timeout: Duration },

    #[error("request for {city} failed: {source}")]
    Request {
        city: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("weather API returned status {status} for {city}: {body}")]
    Status {
        city: String,
        status: StatusCode,
        body: String,
    },

    #[error("failed to parse weather response for {city}: {source}")]
    Parse {
        city: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no data for {city}")]
    NoData { city: String },
}

impl FetchError {
    pub fn city(&self) -> &str {
        match self {
            FetchError::Timeout { city, .. }
            | FetchError::Request { city, .. }
            | FetchError::Status { city, .. }
            | FetchError::Parse { city, .. }
            | FetchError::NoData { city } => city,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FileSinkError {
    #[error("failed to create data directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("failed to ensure weather_data table: {0}")]
    Schema(#[source] sqlx::Error),

    #[error("failed to start transaction: {0}")]
    Begin(#[source] sqlx::Error),

    #[error("failed to insert record for {city}: {source}")]
    Insert {
        city: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("failed to commit weather batch: {0}")]
    Commit(#[source] sqlx::Error),
}
