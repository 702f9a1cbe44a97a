//! Cache module for storing city weather to disk
//!
//! This module provides a cache store that persists one JSON file per city,
//! stamped with the time it was written. The freshness policy uses the stamp
//! to decide whether a file can stand in for a network fetch.

mod store;

pub use store::{CacheError, CacheStore, CachedCity};
