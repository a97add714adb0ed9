//! The normalized weather reading published to the queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Version of the message layout. Bump when a field changes meaning.
pub const SCHEMA_VERSION: u32 = 1;

/// Where a reading came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Measured by the upstream weather source.
    Live,
    /// Synthesized because the upstream source was unavailable.
    Fallback,
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::Live => write!(f, "live"),
            Origin::Fallback => write!(f, "fallback"),
        }
    }
}

/// One weather observation for a city.
///
/// `timestamp` is the moment the reading was built, never the publish time,
/// so consumers can measure publish delay. It goes on the wire as `ts`, the
/// field the downstream worker reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub city: String,
    #[serde(rename = "ts", alias = "timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Degrees Celsius
    pub temperature: f64,
    /// Kilometres per hour
    pub windspeed: f64,
    /// Relative humidity, percent
    pub humidity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feels_like: Option<f64>,
    /// Hectopascals
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f64>,
    #[serde(rename = "source")]
    pub origin: Origin,
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl Reading {
    /// Build a live reading stamped with the current time.
    pub fn live(city: &str, temperature: f64, windspeed: f64, humidity: f64) -> Self {
        Self {
            city: city.to_string(),
            timestamp: Utc::now(),
            temperature,
            windspeed,
            humidity,
            description: None,
            feels_like: None,
            pressure: None,
            origin: Origin::Live,
            schema_version: SCHEMA_VERSION,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.origin == Origin::Fallback
    }

    /// Serialize to the JSON message body.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}
