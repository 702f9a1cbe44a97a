//! City Weather CLI Library
//!
//! Current weather lookups for a small list of cities, served from memory, a
//! per-city cache file, or the Open-Meteo API, whichever is the cheapest fresh
//! source.

pub mod cache;
pub mod cli;
pub mod data;
pub mod freshness;
pub mod logging;
pub mod registry;
pub mod report;
