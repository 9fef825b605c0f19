//! Runs against a live PostgreSQL configured through `DB_NAME`, `DB_USER`,
//! `DB_PASSWORD` and `DB_HOST`:
//!
//! ```text
//! DB_HOST=localhost cargo test -p weather-core --test postgres -- --ignored
//! ```

use chrono::Utc;
use sqlx::{Connection, Row};
use weather_core::{
    Batch, PipelineConfig, PostgresStore, RecordStore, WeatherRecord,
    sink::database::ensure_table,
};

fn store() -> PostgresStore {
    let mut cfg = PipelineConfig::default();
    cfg.apply_env_overrides(|key| std::env::var(key).ok())
        .expect("DB_* variables must be valid");
    PostgresStore::new(cfg.database)
}

fn record(city: &str, temperature: f64) -> WeatherRecord {
    WeatherRecord {
        city: city.to_string(),
        temperature,
        windspeed: 10.0,
        observation_time: "2025-01-01T12:00".to_string(),
        fetched_at: Utc::now(),
    }
}

async fn count_for(conn: &mut sqlx::PgConnection, city: &str) -> i64 {
    sqlx::query("SELECT COUNT(*) AS n FROM weather_data WHERE city = $1")
        .bind(city)
        .fetch_one(&mut *conn)
        .await
        .unwrap()
        .get("n")
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL"]
async fn ensure_table_is_idempotent_and_keeps_rows() {
    let store = store();
    let marker = format!("idempotency-{}", Utc::now().timestamp_nanos_opt().unwrap());

    let written = store
        .write_batch(&Batch::from(vec![record(&marker, 1.0)]))
        .await
        .unwrap();
    assert_eq!(written, 1);

    let mut conn = store.connect().await.unwrap();
    ensure_table(&mut conn).await.unwrap();
    ensure_table(&mut conn).await.unwrap();

    assert_eq!(count_for(&mut conn, &marker).await, 1);
    conn.close().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL"]
async fn batch_rows_are_inserted_with_typed_columns() {
    let store = store();
    let marker = format!("typed-{}", Utc::now().timestamp_nanos_opt().unwrap());

    let written = store
        .write_batch(&Batch::from(vec![record(&marker, 7.4), record(&marker, -2.5)]))
        .await
        .unwrap();
    assert_eq!(written, 2);

    let mut conn = store.connect().await.unwrap();
    let row = sqlx::query(
        "SELECT MIN(temperature) AS t, MIN(time)::text AS observed FROM weather_data WHERE city = $1",
    )
    .bind(&marker)
    .fetch_one(&mut conn)
    .await
    .unwrap();

    assert_eq!(row.get::<f64, _>("t"), -2.5);
    assert_eq!(row.get::<String, _>("observed"), "2025-01-01 12:00:00");
    conn.close().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL"]
async fn failing_row_rolls_back_the_whole_batch() {
    let store = store();
    let marker = format!("rollback-{}", Utc::now().timestamp_nanos_opt().unwrap());

    let mut bad = record(&marker, 3.0);
    bad.observation_time = "not a timestamp".to_string();

    let err = store
        .write_batch(&Batch::from(vec![record(&marker, 1.0), bad]))
        .await
        .unwrap_err();
    assert!(err.to_string().contains(&marker));

    let mut conn = store.connect().await.unwrap();
    assert_eq!(count_for(&mut conn, &marker).await, 0);
    conn.close().await.unwrap();
}
