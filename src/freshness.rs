//! Weather resolution across memory, cache file and network
//!
//! `FreshnessPolicy::resolve` makes sure a city record holds weather no older
//! than the configured max age, consulting the cheapest source first:
//!
//! 1. the readings already held in memory,
//! 2. the city's cache file on disk,
//! 3. a fresh request to the forecast API, written back to the cache file.
//!
//! Cache problems are never fatal and only cause the next source to be tried.
//! A failed network request ends the attempt.

use std::time::Duration;

use chrono::Utc;
use thiserror::Error;

use crate::cache::CacheStore;
use crate::data::{parse_current, CityRecord, ForecastSource, WeatherError};

/// Default maximum age of weather data before it is refreshed
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(900);

/// Errors that end a resolution attempt
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The forecast request failed or returned a non-success status
    #[error("Fetching weather for {city} failed: {source}")]
    Transport {
        city: String,
        #[source]
        source: WeatherError,
    },

    /// The forecast response could not be understood
    #[error("Weather response for {city} could not be parsed: {source}")]
    Parse {
        city: String,
        #[source]
        source: WeatherError,
    },
}

impl ResolveError {
    fn from_weather(city: &str, source: WeatherError) -> Self {
        let city = city.to_string();
        if source.is_transport() {
            Self::Transport { city, source }
        } else {
            Self::Parse { city, source }
        }
    }
}

/// Which source ended up supplying the weather
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// In-memory readings were fresh enough
    Memory { age_secs: i64 },
    /// Readings were loaded from the city's cache file
    CacheFile { age_secs: i64 },
    /// Readings were fetched from the forecast API
    Network {
        /// Whether the fetched readings were written to the cache file
        persisted: bool,
    },
}

/// Returns true when `age_secs` lies within `[0, max_age_secs]`
///
/// A negative age (a stamp in the future) is never considered fresh.
pub fn is_fresh(age_secs: i64, max_age_secs: i64) -> bool {
    (0..=max_age_secs).contains(&age_secs)
}

/// Resolves weather for city records, preferring cheaper sources
#[derive(Debug, Clone)]
pub struct FreshnessPolicy<S> {
    store: CacheStore,
    source: S,
    max_age_secs: i64,
}

impl<S: ForecastSource> FreshnessPolicy<S> {
    /// Creates a policy with the default max age of 900 seconds
    pub fn new(store: CacheStore, source: S) -> Self {
        Self::with_max_age(store, source, DEFAULT_MAX_AGE)
    }

    /// Creates a policy with a custom max age
    pub fn with_max_age(store: CacheStore, source: S, max_age: Duration) -> Self {
        Self {
            store,
            source,
            max_age_secs: i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX),
        }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Ensures `record` holds weather no older than the max age
    ///
    /// # Returns
    /// * `Ok(Resolution)` - the source that supplied the readings now in `record`
    /// * `Err(ResolveError)` - if the network had to be used and failed
    pub async fn resolve(&self, record: &mut CityRecord) -> Result<Resolution, ResolveError> {
        if let Some(age_secs) = self.fresh_in_memory(record) {
            tracing::info!(city = record.name(), age_secs, "using in-memory weather");
            return Ok(Resolution::Memory { age_secs });
        }

        if let Some(age_secs) = self.load_fresh_cache_file(record) {
            tracing::info!(city = record.name(), age_secs, "using cached weather file");
            return Ok(Resolution::CacheFile { age_secs });
        }

        self.fetch_from_network(record).await
    }

    fn fresh_in_memory(&self, record: &CityRecord) -> Option<i64> {
        if !record.weather.is_populated() {
            return None;
        }
        record
            .age_seconds(Utc::now())
            .filter(|age| is_fresh(*age, self.max_age_secs))
    }

    /// Loads the cache file into `record` when it is fresh and holds weather
    fn load_fresh_cache_file(&self, record: &mut CityRecord) -> Option<i64> {
        let path = record.cache_path().to_path_buf();

        let age_secs = match self.store.age_seconds(&path) {
            Ok(age) => age,
            Err(err) => {
                tracing::debug!(city = record.name(), error = %err, "no usable cache file age");
                return None;
            }
        };
        if !is_fresh(age_secs, self.max_age_secs) {
            tracing::debug!(city = record.name(), age_secs, "cache file is stale");
            return None;
        }

        match self.store.load(&path) {
            Ok(cached) => cached.apply_to(record),
            Err(err) => {
                tracing::warn!(city = record.name(), error = %err, "failed to read cache file");
                return None;
            }
        }

        if record.weather.is_populated() {
            Some(age_secs)
        } else {
            tracing::info!(city = record.name(), path = %path.display(), "cache file has no weather data");
            None
        }
    }

    async fn fetch_from_network(&self, record: &mut CityRecord) -> Result<Resolution, ResolveError> {
        tracing::info!(city = record.name(), "fetching weather from network");

        let body = self
            .source
            .fetch(record.url())
            .await
            .map_err(|err| ResolveError::from_weather(record.name(), err))?;
        let readings =
            parse_current(&body).map_err(|err| ResolveError::from_weather(record.name(), err))?;

        record.weather.merge(readings);

        let persisted = match self.store.save(record) {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(city = record.name(), error = %err, "failed to save weather to cache");
                false
            }
        };

        Ok(Resolution::Network { persisted })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Coordinates, Readings};
    use chrono::Duration as ChronoDuration;
    use std::cell::{Cell, RefCell};
    use std::fs;
    use tempfile::TempDir;

    const API: &str = "http://forecast.test/v1/forecast";

    const FULL_BODY: &str = r#"{"current": {"temperature_2m": 11.0, "wind_speed_10m": 4.0, "relative_humidity_2m": 60.0}}"#;

    /// Forecast source that replays a canned outcome and counts calls
    struct StubSource {
        outcome: Result<String, u16>,
        calls: Cell<usize>,
        urls: RefCell<Vec<String>>,
    }

    impl StubSource {
        fn ok(body: &str) -> Self {
            Self {
                outcome: Ok(body.to_string()),
                calls: Cell::new(0),
                urls: RefCell::new(Vec::new()),
            }
        }

        fn status(code: u16) -> Self {
            Self {
                outcome: Err(code),
                calls: Cell::new(0),
                urls: RefCell::new(Vec::new()),
            }
        }
    }

    impl ForecastSource for StubSource {
        async fn fetch(&self, url: &str) -> Result<String, WeatherError> {
            self.calls.set(self.calls.get() + 1);
            self.urls.borrow_mut().push(url.to_string());
            match &self.outcome {
                Ok(body) => Ok(body.clone()),
                Err(code) => Err(WeatherError::HttpStatus(*code)),
            }
        }
    }

    fn setup(source: StubSource) -> (FreshnessPolicy<StubSource>, CityRecord, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = CacheStore::new(temp_dir.path().join("cities"));
        let record =
            CityRecord::new("Stockholm", Coordinates::new(59.3293, 18.0686), store.cache_dir(), API)
                .unwrap();
        (FreshnessPolicy::new(store, source), record, temp_dir)
    }

    fn readings(t: f64, w: f64, h: f64) -> Readings {
        Readings {
            temperature: Some(t),
            wind_speed: Some(w),
            relative_humidity: Some(h),
        }
    }

    /// Writes a cache file for `record` with the given readings and age
    fn write_cache_file(record: &CityRecord, json_readings: &str, age_secs: i64) {
        let coordinates = record.coordinates();
        let stamp = Utc::now().timestamp() - age_secs;
        fs::create_dir_all(record.cache_path().parent().unwrap()).unwrap();
        fs::write(
            record.cache_path(),
            format!(
                r#"{{"name": "{}", "lat": {}, "lon": {}, {}, "cached_at": {}}}"#,
                record.name(),
                coordinates.latitude,
                coordinates.longitude,
                json_readings,
                stamp
            ),
        )
        .unwrap();
    }

    #[test]
    fn test_is_fresh_boundaries() {
        assert!(is_fresh(0, 900));
        assert!(is_fresh(900, 900));
        assert!(!is_fresh(901, 900));
        assert!(!is_fresh(-1, 900));
    }

    #[tokio::test]
    async fn test_fresh_memory_performs_no_io() {
        let (policy, mut record, _temp_dir) = setup(StubSource::ok(FULL_BODY));
        record.weather = readings(1.0, 2.0, 3.0);
        record.cached_at = Some(Utc::now() - ChronoDuration::seconds(60));

        let resolution = policy.resolve(&mut record).await.unwrap();

        assert!(matches!(resolution, Resolution::Memory { age_secs } if (60..=61).contains(&age_secs)));
        assert_eq!(policy.source().calls.get(), 0);
        assert!(!policy.store().cache_dir().exists(), "no file I/O expected");
        assert_eq!(record.weather, readings(1.0, 2.0, 3.0));
    }

    #[tokio::test]
    async fn test_stale_memory_is_not_used() {
        let (policy, mut record, _temp_dir) = setup(StubSource::ok(FULL_BODY));
        record.weather = readings(1.0, 2.0, 3.0);
        record.cached_at = Some(Utc::now() - ChronoDuration::seconds(1_000));

        let resolution = policy.resolve(&mut record).await.unwrap();

        assert_eq!(resolution, Resolution::Network { persisted: true });
        assert_eq!(record.weather, readings(11.0, 4.0, 60.0));
    }

    #[tokio::test]
    async fn test_future_memory_stamp_is_stale() {
        let (policy, mut record, _temp_dir) = setup(StubSource::ok(FULL_BODY));
        record.weather = readings(1.0, 2.0, 3.0);
        record.cached_at = Some(Utc::now() + ChronoDuration::seconds(300));

        let resolution = policy.resolve(&mut record).await.unwrap();

        assert_eq!(resolution, Resolution::Network { persisted: true });
    }

    #[tokio::test]
    async fn test_empty_memory_with_fresh_timestamp_is_not_used() {
        let (policy, mut record, _temp_dir) = setup(StubSource::ok(FULL_BODY));
        record.cached_at = Some(Utc::now());

        let resolution = policy.resolve(&mut record).await.unwrap();

        assert_eq!(resolution, Resolution::Network { persisted: true });
        assert_eq!(policy.source().calls.get(), 1);
    }

    #[tokio::test]
    async fn test_fresh_cache_file_is_loaded() {
        let (policy, mut record, _temp_dir) = setup(StubSource::ok(FULL_BODY));
        write_cache_file(&record, r#""temp": 5.5, "windspeed": 1.5, "rel_hum": 88.0"#, 120);

        let resolution = policy.resolve(&mut record).await.unwrap();

        assert!(matches!(resolution, Resolution::CacheFile { age_secs } if (120..=121).contains(&age_secs)));
        assert_eq!(policy.source().calls.get(), 0);
        assert_eq!(record.weather, readings(5.5, 1.5, 88.0));
        assert!(record.cached_at.is_some());
    }

    #[tokio::test]
    async fn test_loaded_cache_file_then_serves_from_memory() {
        let (policy, mut record, _temp_dir) = setup(StubSource::ok(FULL_BODY));
        write_cache_file(&record, r#""temp": 5.5, "windspeed": 1.5, "rel_hum": 88.0"#, 10);

        policy.resolve(&mut record).await.unwrap();
        fs::remove_file(record.cache_path()).unwrap();
        let second = policy.resolve(&mut record).await.unwrap();

        assert!(matches!(second, Resolution::Memory { .. }));
        assert_eq!(policy.source().calls.get(), 0);
    }

    #[tokio::test]
    async fn test_stale_cache_file_falls_back_to_network() {
        let (policy, mut record, _temp_dir) = setup(StubSource::ok(FULL_BODY));
        write_cache_file(&record, r#""temp": 5.5, "windspeed": 1.5, "rel_hum": 88.0"#, 2_000);

        let resolution = policy.resolve(&mut record).await.unwrap();

        assert_eq!(resolution, Resolution::Network { persisted: true });
        assert_eq!(record.weather, readings(11.0, 4.0, 60.0));
    }

    #[tokio::test]
    async fn test_cache_file_without_weather_falls_back_to_network() {
        let (policy, mut record, _temp_dir) = setup(StubSource::ok(FULL_BODY));
        write_cache_file(&record, r#""temp": null, "windspeed": null, "rel_hum": null"#, 5);

        let resolution = policy.resolve(&mut record).await.unwrap();

        assert_eq!(resolution, Resolution::Network { persisted: true });
        assert_eq!(policy.source().calls.get(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_cache_file_falls_back_to_network() {
        let (policy, mut record, _temp_dir) = setup(StubSource::ok(FULL_BODY));
        fs::create_dir_all(policy.store().cache_dir()).unwrap();
        fs::write(record.cache_path(), "{\"name\": \"Stockholm\", \"temp\": 1").unwrap();

        let resolution = policy.resolve(&mut record).await.unwrap();

        assert_eq!(resolution, Resolution::Network { persisted: true });
        assert_eq!(record.weather, readings(11.0, 4.0, 60.0));

        let repaired = policy.store().load(record.cache_path()).unwrap();
        assert_eq!(repaired.weather, record.weather);
    }

    #[tokio::test]
    async fn test_out_of_range_cache_stamp_falls_back_to_network() {
        let (policy, mut record, _temp_dir) = setup(StubSource::ok(FULL_BODY));
        fs::create_dir_all(policy.store().cache_dir()).unwrap();
        fs::write(
            record.cache_path(),
            format!(
                r#"{{"name": "Stockholm", "lat": 59.3293, "lon": 18.0686, "temp": 1.0, "windspeed": 2.0, "rel_hum": 3.0, "cached_at": {}}}"#,
                i64::MIN
            ),
        )
        .unwrap();

        let resolution = policy.resolve(&mut record).await.unwrap();

        assert_eq!(resolution, Resolution::Network { persisted: true });
        assert_eq!(policy.source().calls.get(), 1);
        assert_eq!(record.weather, readings(11.0, 4.0, 60.0));
    }

    #[tokio::test]
    async fn test_network_fetch_uses_record_url_and_persists() {
        let (policy, mut record, _temp_dir) = setup(StubSource::ok(FULL_BODY));

        let resolution = policy.resolve(&mut record).await.unwrap();

        assert_eq!(resolution, Resolution::Network { persisted: true });
        assert_eq!(policy.source().urls.borrow().as_slice(), [record.url().to_string()]);
        assert!(record.cached_at.is_some());

        let age = policy.store().age_seconds(record.cache_path()).unwrap();
        assert!((0..=1).contains(&age));
    }

    #[tokio::test]
    async fn test_partial_network_response_keeps_previous_wind_speed() {
        let body = r#"{"current": {"temperature_2m": 9.0, "relative_humidity_2m": 55.0}}"#;
        let (policy, mut record, _temp_dir) = setup(StubSource::ok(body));
        record.weather = readings(1.0, 7.5, 3.0);

        policy.resolve(&mut record).await.unwrap();

        assert_eq!(record.weather, readings(9.0, 7.5, 55.0));
    }

    #[tokio::test]
    async fn test_transport_failure_is_fatal() {
        let (policy, mut record, _temp_dir) = setup(StubSource::status(503));

        let result = policy.resolve(&mut record).await;

        assert!(matches!(
            result,
            Err(ResolveError::Transport { source: WeatherError::HttpStatus(503), .. })
        ));
        assert!(record.weather.is_empty());
        assert!(!record.cache_path().exists());
    }

    #[tokio::test]
    async fn test_unparsable_response_is_fatal() {
        let (policy, mut record, _temp_dir) = setup(StubSource::ok("<html>oops</html>"));

        let result = policy.resolve(&mut record).await;

        assert!(matches!(result, Err(ResolveError::Parse { .. })));
        assert!(!record.cache_path().exists());
    }

    #[tokio::test]
    async fn test_response_without_current_is_fatal() {
        let (policy, mut record, _temp_dir) = setup(StubSource::ok(r#"{"hourly": {}}"#));

        let result = policy.resolve(&mut record).await;

        assert!(matches!(
            result,
            Err(ResolveError::Parse { source: WeatherError::MissingField(_), .. })
        ));
    }

    #[tokio::test]
    async fn test_persist_failure_keeps_fetched_weather() {
        let temp_dir = TempDir::new().unwrap();
        // A plain file where the cache directory should be makes every save fail
        let blocked = temp_dir.path().join("blocked");
        fs::write(&blocked, "").unwrap();
        let store = CacheStore::new(&blocked);
        let mut record =
            CityRecord::new("Lund", Coordinates::new(55.7047, 13.1910), store.cache_dir(), API)
                .unwrap();
        let policy = FreshnessPolicy::new(store, StubSource::ok(FULL_BODY));

        let resolution = policy.resolve(&mut record).await.unwrap();

        assert_eq!(resolution, Resolution::Network { persisted: false });
        assert_eq!(record.weather, readings(11.0, 4.0, 60.0));
        assert!(record.cached_at.is_none());
    }

    #[tokio::test]
    async fn test_custom_max_age_is_respected() {
        let temp_dir = TempDir::new().unwrap();
        let store = CacheStore::new(temp_dir.path());
        let mut record =
            CityRecord::new("Luleå", Coordinates::new(65.5848, 22.1567), store.cache_dir(), API)
                .unwrap();
        record.weather = readings(1.0, 2.0, 3.0);
        record.cached_at = Some(Utc::now() - ChronoDuration::seconds(120));
        let policy =
            FreshnessPolicy::with_max_age(store, StubSource::ok(FULL_BODY), Duration::from_secs(60));

        let resolution = policy.resolve(&mut record).await.unwrap();

        assert_eq!(resolution, Resolution::Network { persisted: true });
    }

    #[test]
    fn test_error_messages_name_the_city() {
        let err = ResolveError::from_weather("Gävle", WeatherError::HttpStatus(500));
        assert!(err.to_string().contains("Gävle"));
        assert!(err.to_string().contains("500"));
        assert!(matches!(err, ResolveError::Transport { .. }));
    }
}
