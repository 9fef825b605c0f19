use chrono::{DateTime, SecondsFormat, Utc};
use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
};
use tracing::info;

use crate::{error::FileSinkError, model::Batch};

pub const CSV_HEADER: [&str; 5] = ["city", "temperature", "windspeed", "time", "fetched_at"];

/// `weather_<YYYYMMDD_HHMMSS>.csv` for the given run instant.
pub fn file_name_for(now: DateTime<Utc>) -> String {
    format!("weather_{}.csv", now.format("%Y%m%d_%H%M%S"))
}

/// Write the batch to a new timestamped CSV file under `dir`.
///
/// Returns `Ok(None)` without touching the filesystem when the batch is empty.
pub fn write_csv(batch: &Batch, dir: &Path) -> Result<Option<PathBuf>, FileSinkError> {
    write_csv_at(batch, dir, Utc::now())
}

pub fn write_csv_at(
    batch: &Batch,
    dir: &Path,
    now: DateTime<Utc>,
) -> Result<Option<PathBuf>, FileSinkError> {
    if batch.is_empty() {
        info!("no records to save");
        return Ok(None);
    }

    fs::create_dir_all(dir).map_err(|source| FileSinkError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let path = dir.join(file_name_for(now));
    info!(path = %path.display(), rows = batch.len(), "Writing CSV");

    // create_new: a second run within the same second must not clobber the first.
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(|source| FileSinkError::Io {
            path: path.clone(),
            source,
        })?;

    let mut wtr = csv::Writer::from_writer(file);
    wtr.write_record(CSV_HEADER)?;

    for record in batch {
        wtr.write_record([
            record.city.clone(),
            record.temperature.to_string(),
            record.windspeed.to_string(),
            record.observation_time.clone(),
            record
                .fetched_at
                .to_rfc3339_opts(SecondsFormat::AutoSi, true),
        ])?;
    }

    wtr.flush().map_err(|source| FileSinkError::Io {
        path: path.clone(),
        source,
    })?;

    info!(path = %path.display(), rows = batch.len(), "CSV written successfully");
    Ok(Some(path))
}
