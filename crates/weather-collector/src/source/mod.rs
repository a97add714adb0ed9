//! Upstream weather APIs.
//!
//! Each source turns one HTTP call into a [`Reading`]. Retries live in
//! [`crate::fetcher`], not here.

mod open_meteo;
mod openweather;

pub use open_meteo::{parse_open_meteo, OpenMeteo};
pub use openweather::{parse_openweather, OpenWeatherMap, Units};

use std::future::Future;

use crate::config::{ProviderKind, Settings};
use crate::error::{ConfigError, FetchError};
use crate::reading::Reading;

/// A single upstream weather API.
///
/// The fetcher calls this instead of reqwest directly, which keeps the retry
/// and fallback paths testable without a network.
pub trait WeatherProvider: Send + Sync {
    /// Human-readable source name for logs.
    fn name(&self) -> &'static str;

    /// Reject configurations that can never succeed. Called once before any
    /// network attempt.
    fn check_config(&self) -> Result<(), ConfigError> {
        Ok(())
    }

    /// One request/response round trip.
    fn fetch_once(&self) -> impl Future<Output = Result<Reading, FetchError>> + Send;
}

/// The source selected in [`Settings`].
#[derive(Debug)]
pub enum Provider {
    OpenMeteo(OpenMeteo),
    OpenWeatherMap(OpenWeatherMap),
}

impl Provider {
    /// Build the configured source with its own HTTP client and timeout.
    pub fn from_settings(settings: &Settings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(settings.source.timeout())
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(match settings.source.provider {
            ProviderKind::OpenMeteo => Provider::OpenMeteo(OpenMeteo::new(client, settings)),
            ProviderKind::OpenWeatherMap => {
                Provider::OpenWeatherMap(OpenWeatherMap::new(client, settings))
            }
        })
    }
}

impl WeatherProvider for Provider {
    fn name(&self) -> &'static str {
        match self {
            Provider::OpenMeteo(p) => p.name(),
            Provider::OpenWeatherMap(p) => p.name(),
        }
    }

    fn check_config(&self) -> Result<(), ConfigError> {
        match self {
            Provider::OpenMeteo(p) => p.check_config(),
            Provider::OpenWeatherMap(p) => p.check_config(),
        }
    }

    async fn fetch_once(&self) -> Result<Reading, FetchError> {
        match self {
            Provider::OpenMeteo(p) => p.fetch_once().await,
            Provider::OpenWeatherMap(p) => p.fetch_once().await,
        }
    }
}

/// Read a response body, turning non-success statuses into [`FetchError::Api`].
async fn read_body(response: reqwest::Response) -> Result<String, FetchError> {
    let status = response.status();
    if !status.is_success() {
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());
        return Err(FetchError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response.text().await?)
}
