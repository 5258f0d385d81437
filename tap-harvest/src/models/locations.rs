//! Named locations for the multi-location driver

use tap_common::config::LocationConfig;

/// A query centre with a display name
#[derive(Debug, Clone, PartialEq)]
pub struct NamedLocation {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

impl NamedLocation {
    pub fn new(name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            name: name.into(),
            lat,
            lon,
        }
    }
}

impl From<&LocationConfig> for NamedLocation {
    fn from(config: &LocationConfig) -> Self {
        Self::new(config.name.clone(), config.lat, config.lon)
    }
}

const WORLD_CITIES: &[(&str, f64, f64)] = &[
    ("Paris", 48.8566, 2.3522),
    ("New York", 40.7128, -74.0060),
    ("London", 51.5074, -0.1278),
    ("Tokyo", 35.6895, 139.6917),
    ("Sydney", -33.8688, 151.2093),
    ("Rio de Janeiro", -22.9068, -43.1729),
    ("Cairo", 30.0444, 31.2357),
    ("Cape Town", -33.9249, 18.4241),
    ("Moscow", 55.7558, 37.6176),
    ("Beijing", 39.9042, 116.4074),
    ("Berlin", 52.5200, 13.4050),
    ("Madrid", 40.4168, -3.7038),
    ("Rome", 41.9028, 12.4964),
    ("Bangkok", 13.7563, 100.5018),
    ("Los Angeles", 34.0522, -118.2437),
    ("Toronto", 43.6510, -79.3470),
];

/// Built-in city list used when the config names no locations
pub fn world_cities() -> Vec<NamedLocation> {
    WORLD_CITIES
        .iter()
        .map(|&(name, lat, lon)| NamedLocation::new(name, lat, lon))
        .collect()
}

/// Configured locations, or the built-in list when none are configured
pub fn locations_or_default(configured: &[LocationConfig]) -> Vec<NamedLocation> {
    if configured.is_empty() {
        world_cities()
    } else {
        configured.iter().map(NamedLocation::from).collect()
    }
}
