use async_trait::async_trait;
use sqlx::{Connection, PgConnection, postgres::PgConnectOptions};
use tracing::{debug, info, warn};

use crate::{
    config::{DB_PORT, DatabaseConfig},
    error::DatabaseError,
    model::Batch,
};

use super::RecordStore;

pub const CREATE_TABLE_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS weather_data (
        id SERIAL PRIMARY KEY,
        city TEXT,
        temperature DOUBLE PRECISION,
        windspeed DOUBLE PRECISION,
        time TIMESTAMP,
        fetched_at TIMESTAMP
    )
"#;

const INSERT_SQL: &str = r#"
    INSERT INTO weather_data (city, temperature, windspeed, time, fetched_at)
    VALUES ($1, $2, $3, $4::timestamp, $5)
"#;

/// Writes batches into the `weather_data` table, one connection per batch.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    config: DatabaseConfig,
}

impl PostgresStore {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }

    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.config.host)
            .port(DB_PORT)
            .username(&self.config.user)
            .password(&self.config.password)
            .database(&self.config.name)
    }

    pub async fn connect(&self) -> Result<PgConnection, DatabaseError> {
        PgConnection::connect_with(&self.connect_options())
            .await
            .map_err(DatabaseError::Connect)
    }
}

/// Create `weather_data` if it is missing. Safe to run on every batch.
pub async fn ensure_table(conn: &mut PgConnection) -> Result<(), DatabaseError> {
    sqlx::query(CREATE_TABLE_SQL)
        .execute(&mut *conn)
        .await
        .map_err(DatabaseError::Schema)?;
    Ok(())
}

async fn insert_all(conn: &mut PgConnection, batch: &Batch) -> Result<u64, DatabaseError> {
    let mut rows = 0;

    for record in batch {
        let result = sqlx::query(INSERT_SQL)
            .bind(&record.city)
            .bind(record.temperature)
            .bind(record.windspeed)
            .bind(&record.observation_time)
            .bind(record.fetched_at.naive_utc())
            .execute(&mut *conn)
            .await
            .map_err(|source| DatabaseError::Insert {
                city: record.city.clone(),
                source,
            })?;
        rows += result.rows_affected();
    }

    Ok(rows)
}

/// Insert the whole batch in one transaction; nothing is committed if any row fails.
pub async fn write_in_transaction(
    conn: &mut PgConnection,
    batch: &Batch,
) -> Result<u64, DatabaseError> {
    ensure_table(conn).await?;

    let mut tx = conn.begin().await.map_err(DatabaseError::Begin)?;

    match insert_all(&mut tx, batch).await {
        Ok(rows) => {
            tx.commit().await.map_err(DatabaseError::Commit)?;
            Ok(rows)
        }
        Err(err) => {
            if let Err(rollback) = tx.rollback().await {
                warn!(error = %rollback, "rollback of weather batch failed");
            }
            Err(err)
        }
    }
}

#[async_trait]
impl RecordStore for PostgresStore {
    async fn write_batch(&self, batch: &Batch) -> Result<u64, DatabaseError> {
        if batch.is_empty() {
            info!("no records to insert");
            return Ok(0);
        }

        debug!(host = %self.config.host, database = %self.config.name, "connecting to database");
        let mut conn = self.connect().await?;

        let result = write_in_transaction(&mut conn, batch).await;

        if let Err(err) = conn.close().await {
            warn!(error = %err, "failed to close database connection");
        }

        if let Ok(rows) = result {
            info!(rows, "weather records inserted");
        }
        result
    }
}
