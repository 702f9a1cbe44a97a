//! Ordered registry of known cities
//!
//! The registry is rehydrated from the cache directory when it holds any usable
//! city files, and seeded from a bootstrap list otherwise.

use crate::cache::CacheStore;
use crate::data::{BootstrapCity, CityRecord};

/// How the registry was populated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrySource {
    /// Records were read back from existing cache files
    CacheFiles,
    /// Records were created from the bootstrap list
    Bootstrap,
}

/// Known cities in insertion order
#[derive(Debug, Clone)]
pub struct CityRegistry {
    cities: Vec<CityRecord>,
    source: RegistrySource,
}

impl CityRegistry {
    /// Builds the registry from the cache directory or the bootstrap list
    ///
    /// When no usable cache file exists, every bootstrap city is created with
    /// empty readings and immediately saved so later runs find it on disk. A
    /// failed save is logged and the city is kept in memory.
    pub fn init(store: &CacheStore, api_base: &str, bootstrap: &[BootstrapCity]) -> Self {
        let cities = store.load_all(api_base);
        if !cities.is_empty() {
            tracing::info!(count = cities.len(), dir = %store.cache_dir().display(), "loaded cities from cache");
            return Self {
                cities,
                source: RegistrySource::CacheFiles,
            };
        }

        tracing::info!(count = bootstrap.len(), "cache empty, seeding bootstrap cities");
        let mut cities = Vec::with_capacity(bootstrap.len());
        for city in bootstrap {
            let mut record =
                match CityRecord::new(city.name, city.coordinates(), store.cache_dir(), api_base) {
                    Ok(record) => record,
                    Err(err) => {
                        tracing::warn!(name = city.name, error = %err, "skipping bootstrap city");
                        continue;
                    }
                };
            if let Err(err) = store.save(&mut record) {
                tracing::warn!(city = city.name, error = %err, "failed to save bootstrap city");
            }
            cities.push(record);
        }

        Self {
            cities,
            source: RegistrySource::Bootstrap,
        }
    }

    pub fn source(&self) -> RegistrySource {
        self.source
    }

    /// Finds the first city whose name matches exactly
    pub fn find_by_name(&self, name: &str) -> Option<&CityRecord> {
        self.cities.iter().find(|city| city.name() == name)
    }

    /// Mutable variant of [`CityRegistry::find_by_name`]
    pub fn find_by_name_mut(&mut self, name: &str) -> Option<&mut CityRecord> {
        self.cities.iter_mut().find(|city| city.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CityRecord> {
        self.cities.iter()
    }

    /// City names in registry order
    pub fn names(&self) -> Vec<&str> {
        self.cities.iter().map(CityRecord::name).collect()
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }
}
