//! Text rendering for the prompt loop
//!
//! Pure formatting helpers, kept apart from `main` so they can be tested
//! without a terminal.

use crate::data::CityRecord;
use crate::freshness::Resolution;
use crate::registry::CityRegistry;

/// Renders the numbered list of known cities
pub fn city_list(registry: &CityRegistry) -> String {
    let mut out = String::from("\nCities:\n");
    for (index, city) in registry.iter().enumerate() {
        out.push_str(&format!("{:>3}. {}\n", index + 1, city.name()));
    }
    out
}

/// Describes which source supplied the weather for `city`
pub fn resolution_note(city: &str, resolution: Resolution) -> String {
    match resolution {
        Resolution::Memory { age_secs } => {
            format!("Using fresh in-memory data for {city} (age {age_secs} seconds).")
        }
        Resolution::CacheFile { age_secs } => {
            format!("Using fresh cached file for {city} (age {age_secs} seconds).")
        }
        Resolution::Network { persisted: true } => {
            format!("Fetched current weather for {city}.")
        }
        Resolution::Network { persisted: false } => {
            format!("Fetched current weather for {city} (cache file could not be updated).")
        }
    }
}

fn reading(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{v:.2} {unit}"),
        None => "n/a".to_string(),
    }
}

/// Renders the current readings of a city
pub fn weather_report(record: &CityRecord) -> String {
    let weather = &record.weather;
    format!(
        "\nCurrent weather for {}:\nTemperature: {}\nWind speed: {}\nHumidity: {}\n",
        record.name(),
        reading(weather.temperature, "°C"),
        reading(weather.wind_speed, "m/s"),
        reading(weather.relative_humidity, "%"),
    )
}
