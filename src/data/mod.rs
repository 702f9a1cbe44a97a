//! Core data models for City Weather CLI
//!
//! This module contains the types used throughout the application for
//! representing cities, their coordinates, and the last known weather readings.

pub mod city;
pub mod weather;

pub use city::{bootstrap_cities, BootstrapCity};
pub use weather::{forecast_url, parse_current, ForecastSource, WeatherClient, WeatherError};

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when constructing a city record
#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    /// City names are lookup keys and part of the cache path
    #[error("City name must not be empty")]
    EmptyName,
}

/// Geographic position of a city
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Current weather readings for a city
///
/// Each reading is optional: `None` means the value has never been fetched
/// (or the source document did not contain it).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Readings {
    /// Air temperature at 2m in Celsius
    pub temperature: Option<f64>,
    /// Wind speed at 10m
    pub wind_speed: Option<f64>,
    /// Relative humidity at 2m in percent
    pub relative_humidity: Option<f64>,
}

impl Readings {
    /// Returns true when every reading has a value
    pub fn is_populated(&self) -> bool {
        self.temperature.is_some() && self.wind_speed.is_some() && self.relative_humidity.is_some()
    }

    /// Returns true when no reading has a value
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.wind_speed.is_none() && self.relative_humidity.is_none()
    }

    /// Overwrites readings with the values present in `other`, keeping the rest
    pub fn merge(&mut self, other: Readings) {
        if other.temperature.is_some() {
            self.temperature = other.temperature;
        }
        if other.wind_speed.is_some() {
            self.wind_speed = other.wind_speed;
        }
        if other.relative_humidity.is_some() {
            self.relative_humidity = other.relative_humidity;
        }
    }
}

/// A known city together with its last known weather
#[derive(Debug, Clone, PartialEq)]
pub struct CityRecord {
    name: String,
    coordinates: Coordinates,
    /// Last known weather readings
    pub weather: Readings,
    /// When the readings were last written to the cache, if ever
    pub cached_at: Option<DateTime<Utc>>,
    cache_path: PathBuf,
    url: String,
}

impl CityRecord {
    /// Creates a record with empty readings
    ///
    /// # Arguments
    /// * `name` - City name, used as lookup key and in the cache file name
    /// * `coordinates` - Position used for the forecast query and cache file name
    /// * `cache_dir` - Directory holding the per-city cache files
    /// * `api_base` - Base URL of the forecast endpoint
    ///
    /// # Returns
    /// * `Err(RecordError::EmptyName)` if `name` is empty or whitespace
    pub fn new(
        name: impl Into<String>,
        coordinates: Coordinates,
        cache_dir: &Path,
        api_base: &str,
    ) -> Result<Self, RecordError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(RecordError::EmptyName);
        }

        let cache_path = cache_file_path(cache_dir, &name, coordinates);
        let url = forecast_url(api_base, coordinates);

        Ok(Self {
            name,
            coordinates,
            weather: Readings::default(),
            cached_at: None,
            cache_path,
            url,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn coordinates(&self) -> Coordinates {
        self.coordinates
    }

    /// Path of this city's cache file
    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Pre-built forecast query URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Seconds elapsed between `cached_at` and `now`, if a timestamp is known
    pub fn age_seconds(&self, now: DateTime<Utc>) -> Option<i64> {
        self.cached_at.map(|at| (now - at).num_seconds())
    }
}

/// Builds the deterministic cache file path for a city
///
/// The layout is `<cache_dir>/<name>_<lat>_<lon>.json` with coordinates
/// rounded to two decimals, so files can be rediscovered across restarts.
pub fn cache_file_path(cache_dir: &Path, name: &str, coordinates: Coordinates) -> PathBuf {
    cache_dir.join(format!(
        "{}_{:.2}_{:.2}.json",
        name, coordinates.latitude, coordinates.longitude
    ))
}
