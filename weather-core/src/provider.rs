use crate::{
    config::ApiConfig,
    error::FetchError,
    model::{City, WeatherRecord},
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod open_meteo;

pub use open_meteo::OpenMeteoProvider;

/// Source of current conditions for a single city.
///
/// Implementations must turn every failure into a [`FetchError`] so one city
/// never takes down the rest of the batch.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current_weather(&self, city: &City) -> Result<WeatherRecord, FetchError>;
}

/// Construct the production provider from API settings.
pub fn provider_from_config(api: &ApiConfig) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let provider = OpenMeteoProvider::new(api.base_url.clone(), api.timeout())?;
    Ok(Box::new(provider))
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body.to_string();
    }

    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
