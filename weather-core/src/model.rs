use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named location the pipeline fetches weather for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl City {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
        }
    }
}

/// One normalized observation.
///
/// `observation_time` is kept exactly as the provider sent it, `fetched_at` is
/// stamped by the pipeline when the response was extracted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub city: String,
    pub temperature: f64,
    pub windspeed: f64,
    pub observation_time: String,
    pub fetched_at: DateTime<Utc>,
}

/// Records fetched during a single run, in city order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    records: Vec<WeatherRecord>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: WeatherRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, WeatherRecord> {
        self.records.iter()
    }

    pub fn records(&self) -> &[WeatherRecord] {
        &self.records
    }
}

impl From<Vec<WeatherRecord>> for Batch {
    fn from(records: Vec<WeatherRecord>) -> Self {
        Self { records }
    }
}

impl<'a> IntoIterator for &'a Batch {
    type Item = &'a WeatherRecord;
    type IntoIter = std::slice::Iter<'a, WeatherRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
