//! Per-city cache files
//!
//! Provides a `CacheStore` that persists each city record to its own JSON file
//! with a `cached_at` stamp, and reads such files back tolerantly.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::data::{cache_file_path, CityRecord, Coordinates, Readings};

/// Value older releases wrote for readings that were never fetched
const LEGACY_UNSET_READING: f64 = -1000.0;

/// Errors that can occur while reading or writing cache files
#[derive(Debug, Error)]
pub enum CacheError {
    /// Reading, writing or creating the cache location failed
    #[error("Cache I/O failed for {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Cache file is not a valid JSON object
    #[error("Cache file {} is not valid JSON: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Cache file has no integer `cached_at` field, or one too far out of range
    #[error("Cache file {} has no valid cached_at timestamp", .path.display())]
    MissingTimestamp { path: PathBuf },

    /// A record could not be encoded for writing
    #[error("Failed to encode cache file {}: {source}", .path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// On-disk layout written for every city
#[derive(Debug, Serialize)]
struct CacheFileOut<'a> {
    name: &'a str,
    fp: String,
    lat: f64,
    lon: f64,
    temp: Option<f64>,
    windspeed: Option<f64>,
    rel_hum: Option<f64>,
    cached_at: i64,
}

/// On-disk layout as read back; every field is optional
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CacheFileIn {
    #[serde(deserialize_with = "lenient_string")]
    name: Option<String>,
    #[serde(deserialize_with = "lenient_number")]
    lat: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    lon: Option<f64>,
    #[serde(deserialize_with = "lenient_reading")]
    temp: Option<f64>,
    #[serde(deserialize_with = "lenient_reading")]
    windspeed: Option<f64>,
    #[serde(deserialize_with = "lenient_reading")]
    rel_hum: Option<f64>,
    #[serde(deserialize_with = "lenient_integer")]
    cached_at: Option<i64>,
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_str().map(str::to_owned))
}

fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_f64())
}

fn lenient_reading<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(lenient_number(deserializer)?.filter(|v| *v != LEGACY_UNSET_READING))
}

fn lenient_integer<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_i64())
}

/// Whatever could be recovered from a cache file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CachedCity {
    /// City name, if present
    pub name: Option<String>,
    /// Coordinates, if both `lat` and `lon` are present
    pub coordinates: Option<Coordinates>,
    /// Readings present in the file
    pub weather: Readings,
    /// Write time of the file; `None` when missing or zero
    pub cached_at: Option<DateTime<Utc>>,
}

impl CachedCity {
    /// Copies the cached readings and timestamp into `record`
    ///
    /// Readings absent from the file keep their current value. The timestamp
    /// is always replaced, falling back to `None` when the file had none.
    pub fn apply_to(&self, record: &mut CityRecord) {
        record.weather.merge(self.weather);
        record.cached_at = self.cached_at;
    }
}

impl From<CacheFileIn> for CachedCity {
    fn from(file: CacheFileIn) -> Self {
        let coordinates = match (file.lat, file.lon) {
            (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
            _ => None,
        };
        let cached_at = file
            .cached_at
            .filter(|ts| *ts > 0)
            .and_then(|ts| DateTime::from_timestamp(ts, 0));

        Self {
            name: file.name,
            coordinates,
            weather: Readings {
                temperature: file.temp,
                wind_speed: file.windspeed,
                relative_humidity: file.rel_hum,
            },
            cached_at,
        }
    }
}

/// Reads and writes per-city cache files in a single directory
///
/// Each save fully overwrites the previous file; there is no atomic rename, so
/// a crash mid-write can leave a truncated file behind. Readers treat such a
/// file like any other unparsable one.
#[derive(Debug, Clone)]
pub struct CacheStore {
    cache_dir: PathBuf,
}

impl CacheStore {
    /// Creates a store rooted at `cache_dir`. The directory is created lazily.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the cache file path for a city
    pub fn path_for(&self, name: &str, coordinates: Coordinates) -> PathBuf {
        cache_file_path(&self.cache_dir, name, coordinates)
    }

    /// Ensures the cache directory exists
    fn ensure_dir(&self) -> Result<(), CacheError> {
        fs::create_dir_all(&self.cache_dir).map_err(|source| CacheError::Io {
            path: self.cache_dir.clone(),
            source,
        })
    }

    /// Writes `record` to its cache file, stamped with the current time
    ///
    /// Any `cached_at` already on the record is ignored for the write. On
    /// success the record's `cached_at` is moved to the new stamp.
    ///
    /// # Returns
    /// * `Ok(DateTime<Utc>)` - the stamp written to disk
    /// * `Err(CacheError)` - if the directory or file could not be written
    pub fn save(&self, record: &mut CityRecord) -> Result<DateTime<Utc>, CacheError> {
        self.ensure_dir()?;

        let now = Utc::now().timestamp();
        let path = record.cache_path().to_path_buf();
        let coordinates = record.coordinates();
        let file = CacheFileOut {
            name: record.name(),
            fp: path.to_string_lossy().into_owned(),
            lat: coordinates.latitude,
            lon: coordinates.longitude,
            temp: record.weather.temperature,
            windspeed: record.weather.wind_speed,
            rel_hum: record.weather.relative_humidity,
            cached_at: now,
        };

        let json = serde_json::to_string_pretty(&file).map_err(|source| CacheError::Serialize {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, json).map_err(|source| CacheError::Io {
            path: path.clone(),
            source,
        })?;

        let stamp = DateTime::from_timestamp(now, 0).unwrap_or_else(Utc::now);
        record.cached_at = Some(stamp);
        tracing::debug!(city = record.name(), path = %path.display(), "cache file written");
        Ok(stamp)
    }

    /// Reads the fields present in a cache file
    ///
    /// Missing or mistyped fields come back as `None` instead of failing the
    /// whole load. Only I/O errors and malformed JSON are reported as errors.
    pub fn load(&self, path: &Path) -> Result<CachedCity, CacheError> {
        read_cache_file(path).map(CachedCity::from)
    }

    /// Computes the age in seconds of the data in a cache file
    ///
    /// The file is fully parsed to read `cached_at`. A negative result means
    /// the stamp lies in the future.
    ///
    /// # Returns
    /// * `Ok(i64)` - seconds between `cached_at` and now
    /// * `Err(CacheError)` - if the file is missing, unparsable or has no
    ///   integer `cached_at` whose age fits in an `i64`
    pub fn age_seconds(&self, path: &Path) -> Result<i64, CacheError> {
        let file = read_cache_file(path)?;
        file.cached_at
            .and_then(|cached_at| Utc::now().timestamp().checked_sub(cached_at))
            .ok_or_else(|| CacheError::MissingTimestamp {
                path: path.to_path_buf(),
            })
    }

    /// Loads every usable city record from the cache directory
    ///
    /// Files are visited in file-name order. Files that fail to parse or lack
    /// a name or coordinates are skipped. A missing directory yields an empty
    /// list. Readings are carried over but `cached_at` is left unset, so the
    /// first lookup still checks the file's age.
    pub fn load_all(&self, api_base: &str) -> Vec<CityRecord> {
        let entries = match fs::read_dir(&self.cache_dir) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::debug!(dir = %self.cache_dir.display(), error = %err, "cache directory not readable");
                return Vec::new();
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut records = Vec::with_capacity(paths.len());
        for path in paths {
            let cached = match self.load(&path) {
                Ok(cached) => cached,
                Err(err) => {
                    tracing::debug!(error = %err, "skipping unreadable cache file");
                    continue;
                }
            };

            let (Some(name), Some(coordinates)) = (cached.name.as_deref(), cached.coordinates) else {
                tracing::debug!(path = %path.display(), "skipping cache file without name or coordinates");
                continue;
            };
            if name.chars().any(std::path::is_separator) {
                tracing::warn!(path = %path.display(), name, "skipping cache file with a path in its name");
                continue;
            }

            match CityRecord::new(name, coordinates, &self.cache_dir, api_base) {
                Ok(mut record) => {
                    record.weather = cached.weather;
                    records.push(record);
                }
                Err(err) => {
                    tracing::debug!(path = %path.display(), error = %err, "skipping cache file");
                }
            }
        }

        records
    }
}

fn read_cache_file(path: &Path) -> Result<CacheFileIn, CacheError> {
    let content = fs::read_to_string(path).map_err(|source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| CacheError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
