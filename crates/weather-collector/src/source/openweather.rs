//! OpenWeatherMap current weather API client.
//!
//! Readings are always normalized to °C and km/h whatever `units` the API
//! was asked for.

use serde::Deserialize;

use super::{read_body, WeatherProvider};
use crate::config::Settings;
use crate::error::{ConfigError, FetchError};
use crate::reading::Reading;

/// Unit system requested from OpenWeatherMap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Units {
    /// °C, m/s
    Metric,
    /// °F, mph
    Imperial,
    /// K, m/s
    Standard,
}

impl Units {
    /// Unknown strings fall back to metric.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "imperial" => Units::Imperial,
            "standard" => Units::Standard,
            _ => Units::Metric,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
            Units::Standard => "standard",
        }
    }

    fn to_celsius(&self, value: f64) -> f64 {
        match self {
            Units::Metric => value,
            Units::Imperial => round2((value - 32.0) * 5.0 / 9.0),
            Units::Standard => round2(value - 273.15),
        }
    }

    fn to_kmh(&self, value: f64) -> f64 {
        match self {
            Units::Metric | Units::Standard => round2(value * 3.6),
            Units::Imperial => round2(value * 1.609_344),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug)]
pub struct OpenWeatherMap {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    units: Units,
    lang: String,
    latitude: f64,
    longitude: f64,
    city: String,
}

impl OpenWeatherMap {
    pub fn new(client: reqwest::Client, settings: &Settings) -> Self {
        Self {
            client,
            base_url: settings.source.openweather_url.clone(),
            api_key: settings.source.api_key.clone(),
            units: Units::parse(&settings.source.units),
            lang: settings.source.lang.clone(),
            latitude: settings.latitude,
            longitude: settings.longitude,
            city: settings.city.clone(),
        }
    }
}

impl WeatherProvider for OpenWeatherMap {
    fn name(&self) -> &'static str {
        "OpenWeatherMap"
    }

    fn check_config(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey {
                provider: "OpenWeatherMap",
                env_var: "OPENWEATHER_API_KEY",
            });
        }
        Ok(())
    }

    async fn fetch_once(&self) -> Result<Reading, FetchError> {
        self.check_config()?;
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("lat", self.latitude.to_string()),
                ("lon", self.longitude.to_string()),
                ("appid", self.api_key.clone()),
                ("units", self.units.as_str().to_string()),
                ("lang", self.lang.clone()),
            ])
            .send()
            .await?;
        let body = read_body(response).await?;
        parse_openweather(&body, &self.city, self.units)
    }
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    main: MainBlock,
    #[serde(default)]
    wind: Option<WindBlock>,
    #[serde(default)]
    weather: Vec<Condition>,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f64,
    #[serde(default)]
    feels_like: Option<f64>,
    humidity: f64,
    #[serde(default)]
    pressure: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WindBlock {
    #[serde(default)]
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct Condition {
    #[serde(default)]
    description: String,
}

/// Parse an OpenWeatherMap current-weather body into a live reading for `city`.
///
/// An absent `feels_like` is reported as the air temperature and an absent
/// wind block as calm.
pub fn parse_openweather(body: &str, city: &str, units: Units) -> Result<Reading, FetchError> {
    let payload: CurrentResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Format(e.to_string()))?;

    let temperature = units.to_celsius(payload.main.temp);
    let windspeed = payload
        .wind
        .map(|w| units.to_kmh(w.speed))
        .unwrap_or(0.0);

    let mut reading = Reading::live(city, temperature, windspeed, payload.main.humidity);
    reading.feels_like = Some(
        payload
            .main
            .feels_like
            .map(|f| units.to_celsius(f))
            .unwrap_or(temperature),
    );
    reading.pressure = payload.main.pressure;
    reading.description = payload
        .weather
        .into_iter()
        .map(|c| c.description)
        .find(|d| !d.is_empty());
    Ok(reading)
}
