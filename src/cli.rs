//! Command-line interface parsing for City Weather CLI
//!
//! This module handles parsing of CLI arguments using clap. Every setting can
//! also be supplied through a `CITYWEATHER_*` environment variable.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use reqwest::Url;
use thiserror::Error;

use crate::data::weather::OPEN_METEO_BASE_URL;

/// Error types for CLI argument parsing
#[derive(Debug, Error, PartialEq)]
pub enum CliError {
    /// The forecast endpoint is not an absolute http(s) URL
    #[error("Invalid API URL: '{0}'. Expected an absolute http:// or https:// URL")]
    InvalidApiUrl(String),

    /// `--city` was given an empty name
    #[error("Invalid city: the name must not be empty")]
    EmptyCityName,
}

/// City Weather CLI - Current weather for Swedish cities, cached on disk
#[derive(Parser, Debug)]
#[command(name = "cityweather")]
#[command(about = "Current weather for Swedish cities, cached on disk")]
#[command(version)]
pub struct Cli {
    /// Directory holding one cache file per city
    #[arg(long, env = "CITYWEATHER_CACHE_DIR", value_name = "DIR", default_value = "cities")]
    pub cache_dir: PathBuf,

    /// Seconds before cached weather is considered stale
    #[arg(long, env = "CITYWEATHER_MAX_AGE", value_name = "SECS", default_value_t = 900)]
    pub max_age: u64,

    /// Forecast endpoint queried for current conditions
    #[arg(long, env = "CITYWEATHER_API_URL", value_name = "URL", default_value = OPEN_METEO_BASE_URL)]
    pub api_url: String,

    /// Look up a single city, print its weather and exit
    ///
    /// Examples:
    ///   cityweather --city Stockholm
    ///   cityweather --city "Göteborg"
    #[arg(long, value_name = "NAME", conflicts_with = "list")]
    pub city: Option<String>,

    /// Print the known cities and exit
    #[arg(long)]
    pub list: bool,

    /// Increase log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// What the program should do once the registry is loaded
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Mode {
    /// Prompt for cities until the user quits
    #[default]
    Interactive,
    /// Resolve one city and exit
    Lookup(String),
    /// Print the city list and exit
    List,
}

/// Configuration derived from CLI arguments for application startup
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Directory holding the per-city cache files
    pub cache_dir: PathBuf,
    /// Maximum age of weather data before it is refreshed
    pub max_age: Duration,
    /// Base URL of the forecast endpoint
    pub api_url: String,
    /// Selected run mode
    pub mode: Mode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("cities"),
            max_age: Duration::from_secs(900),
            api_url: OPEN_METEO_BASE_URL.to_string(),
            mode: Mode::default(),
        }
    }
}

/// Checks that `raw` is an absolute http(s) URL
///
/// # Returns
/// * `Ok(String)` with surrounding whitespace removed
/// * `Err(CliError::InvalidApiUrl)` otherwise
pub fn parse_api_url(raw: &str) -> Result<String, CliError> {
    let trimmed = raw.trim();
    match Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(trimmed.to_string()),
        _ => Err(CliError::InvalidApiUrl(raw.to_string())),
    }
}

impl Settings {
    /// Creates Settings from parsed CLI arguments.
    ///
    /// # Arguments
    /// * `cli` - The parsed CLI struct
    ///
    /// # Returns
    /// * `Ok(Settings)` with validated values
    /// * `Err(CliError)` if the API URL or city name is invalid
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let api_url = parse_api_url(&cli.api_url)?;

        let mode = match (&cli.city, cli.list) {
            (Some(name), _) => {
                let name = name.trim();
                if name.is_empty() {
                    return Err(CliError::EmptyCityName);
                }
                Mode::Lookup(name.to_string())
            }
            (None, true) => Mode::List,
            (None, false) => Mode::Interactive,
        };

        Ok(Settings {
            cache_dir: cli.cache_dir.clone(),
            max_age: Duration::from_secs(cli.max_age),
            api_url,
            mode,
        })
    }
}
