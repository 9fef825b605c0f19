//! Persistence destinations for a batch.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{error::DatabaseError, model::Batch};

pub mod database;
pub mod file;

pub use database::PostgresStore;
pub use file::{write_csv, write_csv_at};

/// Relational destination for a batch. Returns the number of rows committed.
///
/// An empty batch must be a no-op returning `Ok(0)`.
#[async_trait]
pub trait RecordStore: Send + Sync + Debug {
    async fn write_batch(&self, batch: &Batch) -> Result<u64, DatabaseError>;
}
