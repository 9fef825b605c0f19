//! Shared fakes for unit tests: a canned HTTP server and in-memory provider/store.

use async_trait::async_trait;
use chrono::Utc;
use std::{collections::HashMap, sync::Arc, sync::Mutex, time::Duration};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
};

use crate::{
    error::{DatabaseError, FetchError},
    model::{Batch, City, WeatherRecord},
    provider::{OpenMeteoProvider, WeatherProvider},
    sink::RecordStore,
};

pub enum CannedReply {
    Json(u16, String),
    /// Accept the connection and never answer.
    Hang,
}

impl CannedReply {
    pub fn json(status: u16, body: &str) -> Self {
        CannedReply::Json(status, body.to_string())
    }
}

/// Serve canned replies on a loopback port; returns the endpoint URL.
///
/// `respond` sees the raw request head (request line plus headers).
pub async fn serve<F>(respond: F) -> String
where
    F: Fn(&str) -> CannedReply + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let respond = Arc::new(respond);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let respond = Arc::clone(&respond);
            tokio::spawn(async move {
                let mut buf = vec![0u8; 8192];
                let mut read = 0;
                while read < buf.len() {
                    let n = socket.read(&mut buf[read..]).await.unwrap_or(0);
                    if n == 0 {
                        break;
                    }
                    read += n;
                    if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }
                let request = String::from_utf8_lossy(&buf[..read]).to_string();

                match respond(&request) {
                    CannedReply::Json(status, body) => {
                        let response = format!(
                            "HTTP/1.1 {status} Canned\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                            body.len()
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    }
                    CannedReply::Hang => {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                    }
                }
            });
        }
    });

    format!("http://{addr}/v1/forecast")
}

/// Provider pointed at a canned server, bypassing any proxy from the environment.
pub fn test_provider(url: &str, timeout: Duration) -> OpenMeteoProvider {
    let http = reqwest::Client::builder()
        .timeout(timeout)
        .no_proxy()
        .build()
        .unwrap();
    OpenMeteoProvider::with_client(url.to_string(), timeout, http)
}

pub fn record(city: &str, temperature: f64, windspeed: f64) -> WeatherRecord {
    WeatherRecord {
        city: city.to_string(),
        temperature,
        windspeed,
        observation_time: "2025-01-01T12:00".to_string(),
        fetched_at: Utc::now(),
    }
}

pub fn cities() -> Vec<City> {
    crate::config::default_cities()
}

/// Provider answering from a fixed table; cities not in the table get no data.
#[derive(Debug, Default)]
pub struct FakeProvider {
    readings: HashMap<String, (f64, f64)>,
    timeouts: Vec<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeProvider {
    pub fn with(mut self, city: &str, temperature: f64, windspeed: f64) -> Self {
        self.readings
            .insert(city.to_string(), (temperature, windspeed));
        self
    }

    pub fn timing_out(mut self, city: &str) -> Self {
        self.timeouts.push(city.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl WeatherProvider for FakeProvider {
    async fn current_weather(&self, city: &City) -> Result<WeatherRecord, FetchError> {
        self.calls.lock().unwrap().push(city.name.clone());

        if self.timeouts.contains(&city.name) {
            return Err(FetchError::Timeout {
                city: city.name.clone(),
                timeout: Duration::from_secs(10),
            });
        }

        match self.readings.get(&city.name) {
            Some(&(temperature, windspeed)) => Ok(record(&city.name, temperature, windspeed)),
            None => Err(FetchError::NoData {
                city: city.name.clone(),
            }),
        }
    }
}

/// Store keeping inserted records in memory, or refusing every connection.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<WeatherRecord>>,
    refuse: bool,
}

impl MemoryStore {
    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    pub fn rows(&self) -> Vec<WeatherRecord> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn write_batch(&self, batch: &Batch) -> Result<u64, DatabaseError> {
        if batch.is_empty() {
            return Ok(0);
        }
        if self.refuse {
            return Err(DatabaseError::Connect(sqlx::Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))));
        }

        let mut rows = self.rows.lock().unwrap();
        rows.extend(batch.iter().cloned());
        Ok(batch.len() as u64)
    }
}

#[async_trait]
impl RecordStore for Arc<MemoryStore> {
    async fn write_batch(&self, batch: &Batch) -> Result<u64, DatabaseError> {
        self.as_ref().write_batch(batch).await
    }
}
