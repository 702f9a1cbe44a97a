//! Open-Meteo weather API client
//!
//! This module builds forecast query URLs, fetches raw response bodies from the
//! Open-Meteo API and extracts the current readings from them.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use super::{Coordinates, Readings};

/// Base URL for the Open-Meteo API
pub const OPEN_METEO_BASE_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Current-conditions variables requested from Open-Meteo
const CURRENT_VARIABLES: &str = "temperature_2m,relative_humidity_2m,wind_speed_10m";

/// Request timeout for the HTTP client
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur when fetching weather data
#[derive(Debug, Error)]
pub enum WeatherError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("HTTP request returned status {0}")]
    HttpStatus(u16),

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Missing expected field in response
    #[error("Missing expected field in response: {0}")]
    MissingField(String),
}

impl WeatherError {
    /// Returns true for failures of the transport rather than of the payload
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::RequestFailed(_) | Self::HttpStatus(_))
    }
}

/// Builds the current-conditions query URL for the given coordinates
///
/// Coordinates are rounded to two decimals, matching the cache file naming.
pub fn forecast_url(base_url: &str, coordinates: Coordinates) -> String {
    format!(
        "{}?latitude={:.2}&longitude={:.2}&current={}",
        base_url, coordinates.latitude, coordinates.longitude, CURRENT_VARIABLES
    )
}

/// Something that can deliver a forecast response body for a URL
///
/// The body must be fully buffered before the future resolves.
#[allow(async_fn_in_trait)]
pub trait ForecastSource {
    /// Fetches the raw response body for `url`
    async fn fetch(&self, url: &str) -> Result<String, WeatherError>;
}

/// Client for fetching weather data from Open-Meteo API
#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: Client,
}

impl WeatherClient {
    /// Create a new WeatherClient with a request timeout
    ///
    /// Redirects are followed using reqwest's default policy.
    pub fn new() -> Result<Self, WeatherError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client })
    }

    /// Create a new WeatherClient with a custom HTTP client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl ForecastSource for WeatherClient {
    async fn fetch(&self, url: &str) -> Result<String, WeatherError> {
        tracing::debug!(url, "requesting forecast");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::HttpStatus(status.as_u16()));
        }

        Ok(response.text().await?)
    }
}

/// Open-Meteo API response structure
///
/// Only `current` is inspected; its members are read leniently so that a
/// missing or non-numeric variable does not fail the whole response.
#[derive(Debug, Deserialize)]
struct OpenMeteoResponse {
    #[serde(default)]
    current: Option<Value>,
}

/// Extracts the current readings from an Open-Meteo response body
///
/// # Returns
/// * `Ok(Readings)` - with `None` for every variable absent or non-numeric
/// * `Err(WeatherError::InvalidJson)` - if the body is not a JSON object
/// * `Err(WeatherError::MissingField)` - if there is no `current` object
pub fn parse_current(body: &str) -> Result<Readings, WeatherError> {
    let response: OpenMeteoResponse = serde_json::from_str(body)?;
    let current = response
        .current
        .as_ref()
        .and_then(Value::as_object)
        .ok_or_else(|| WeatherError::MissingField("current".to_string()))?;

    let number = |key: &str| current.get(key).and_then(Value::as_f64);

    Ok(Readings {
        temperature: number("temperature_2m"),
        wind_speed: number("wind_speed_10m"),
        relative_humidity: number("relative_humidity_2m"),
    })
}
