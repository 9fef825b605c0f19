use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;

use crate::{
    error::FetchError,
    model::{City, WeatherRecord},
};

use super::{WeatherProvider, truncate_body};

/// Open-Meteo forecast endpoint queried in `current_weather` mode.
#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    base_url: String,
    timeout: Duration,
    http: Client,
}

impl OpenMeteoProvider {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for Open-Meteo")?;

        Ok(Self::with_client(base_url, timeout, http))
    }

    /// Use a pre-built client. `timeout` is only reported in errors; the
    /// client is expected to enforce it.
    pub fn with_client(base_url: String, timeout: Duration, http: Client) -> Self {
        Self {
            base_url,
            timeout,
            http,
        }
    }

    fn request_error(&self, city: &City, source: reqwest::Error) -> FetchError {
        if source.is_timeout() {
            FetchError::Timeout {
                city: city.name.clone(),
                timeout: self.timeout,
            }
        } else {
            FetchError::Request {
                city: city.name.clone(),
                source,
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct OmForecastResponse {
    #[serde(default)]
    current_weather: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct OmCurrentWeather {
    temperature: f64,
    windspeed: f64,
    time: String,
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    async fn current_weather(&self, city: &City) -> Result<WeatherRecord, FetchError> {
        let latitude = city.latitude.to_string();
        let longitude = city.longitude.to_string();

        let res = self
            .http
            .get(&self.base_url)
            .query(&[
                ("latitude", latitude.as_str()),
                ("longitude", longitude.as_str()),
                ("current_weather", "true"),
            ])
            .send()
            .await
            .map_err(|e| self.request_error(city, e))?;

        let status = res.status();
        let body = res.text().await.map_err(|e| self.request_error(city, e))?;

        if !status.is_success() {
            return Err(FetchError::Status {
                city: city.name.clone(),
                status,
                body: truncate_body(&body),
            });
        }

        parse_current_weather(&city.name, &body, Utc::now())
    }
}

/// Extract the `current_weather` object from a forecast response body.
///
/// A missing, null or empty object means the provider had nothing for this
/// coordinate and is reported as [`FetchError::NoData`].
pub fn parse_current_weather(
    city: &str,
    body: &str,
    fetched_at: DateTime<Utc>,
) -> Result<WeatherRecord, FetchError> {
    let parse_err = |source| FetchError::Parse {
        city: city.to_string(),
        source,
    };

    let parsed: OmForecastResponse = serde_json::from_str(body).map_err(parse_err)?;

    let current = match parsed.current_weather {
        Some(map) if !map.is_empty() => map,
        _ => {
            return Err(FetchError::NoData {
                city: city.to_string(),
            });
        }
    };

    let current: OmCurrentWeather =
        serde_json::from_value(Value::Object(current)).map_err(parse_err)?;

    Ok(WeatherRecord {
        city: city.to_string(),
        temperature: current.temperature,
        windspeed: current.windspeed,
        observation_time: current.time,
        fetched_at,
    })
}
