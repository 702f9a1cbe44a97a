//! Bootstrap city list
//!
//! Cities used to seed the registry the first time the tool runs against an
//! empty cache directory.

use super::Coordinates;

/// A named coordinate pair used to seed the registry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BootstrapCity {
    /// City name
    pub name: &'static str,
    /// Latitude coordinate
    pub latitude: f64,
    /// Longitude coordinate
    pub longitude: f64,
}

impl BootstrapCity {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

/// The sixteen largest Swedish cities
pub static BOOTSTRAP_CITIES: [BootstrapCity; 16] = [
    BootstrapCity {
        name: "Stockholm",
        latitude: 59.3293,
        longitude: 18.0686,
    },
    BootstrapCity {
        name: "Göteborg",
        latitude: 57.7089,
        longitude: 11.9746,
    },
    BootstrapCity {
        name: "Malmö",
        latitude: 55.6050,
        longitude: 13.0038,
    },
    BootstrapCity {
        name: "Uppsala",
        latitude: 59.8586,
        longitude: 17.6389,
    },
    BootstrapCity {
        name: "Västerås",
        latitude: 59.6099,
        longitude: 16.5448,
    },
    BootstrapCity {
        name: "Örebro",
        latitude: 59.2741,
        longitude: 15.2066,
    },
    BootstrapCity {
        name: "Linköping",
        latitude: 58.4109,
        longitude: 15.6216,
    },
    BootstrapCity {
        name: "Helsingborg",
        latitude: 56.0465,
        longitude: 12.6945,
    },
    BootstrapCity {
        name: "Jönköping",
        latitude: 57.7815,
        longitude: 14.1562,
    },
    BootstrapCity {
        name: "Norrköping",
        latitude: 58.5877,
        longitude: 16.1924,
    },
    BootstrapCity {
        name: "Lund",
        latitude: 55.7047,
        longitude: 13.1910,
    },
    BootstrapCity {
        name: "Gävle",
        latitude: 60.6749,
        longitude: 17.1413,
    },
    BootstrapCity {
        name: "Sundsvall",
        latitude: 62.3908,
        longitude: 17.3069,
    },
    BootstrapCity {
        name: "Umeå",
        latitude: 63.8258,
        longitude: 20.2630,
    },
    BootstrapCity {
        name: "Luleå",
        latitude: 65.5848,
        longitude: 22.1567,
    },
    BootstrapCity {
        name: "Kiruna",
        latitude: 67.8558,
        longitude: 20.2253,
    },
];

/// Get the bootstrap city list
///
/// # Example
///
/// ```
/// use cityweather::data::city::bootstrap_cities;
///
/// for city in bootstrap_cities() {
///     println!("{}: ({}, {})", city.name, city.latitude, city.longitude);
/// }
/// ```
pub fn bootstrap_cities() -> &'static [BootstrapCity] {
    &BOOTSTRAP_CITIES
}
