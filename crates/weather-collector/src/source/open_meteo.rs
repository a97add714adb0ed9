//! Open-Meteo forecast API client.

use serde::Deserialize;

use super::{read_body, WeatherProvider};
use crate::config::Settings;
use crate::error::FetchError;
use crate::reading::Reading;

/// Hourly variables requested alongside `current_weather`.
const HOURLY_FIELDS: &str = "temperature_2m,relativehumidity_2m,windspeed_10m";

#[derive(Debug)]
pub struct OpenMeteo {
    client: reqwest::Client,
    base_url: String,
    latitude: f64,
    longitude: f64,
    city: String,
}

impl OpenMeteo {
    pub fn new(client: reqwest::Client, settings: &Settings) -> Self {
        Self {
            client,
            base_url: settings.source.open_meteo_url.clone(),
            latitude: settings.latitude,
            longitude: settings.longitude,
            city: settings.city.clone(),
        }
    }

    fn query(&self) -> [(&'static str, String); 4] {
        [
            ("latitude", self.latitude.to_string()),
            ("longitude", self.longitude.to_string()),
            ("hourly", HOURLY_FIELDS.to_string()),
            ("current_weather", "true".to_string()),
        ]
    }
}

impl WeatherProvider for OpenMeteo {
    fn name(&self) -> &'static str {
        "Open-Meteo"
    }

    async fn fetch_once(&self) -> Result<Reading, FetchError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&self.query())
            .send()
            .await?;
        let body = read_body(response).await?;
        parse_open_meteo(&body, &self.city)
    }
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current_weather: Option<CurrentWeather>,
    hourly: Option<Hourly>,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    temperature: f64,
    windspeed: f64,
    #[serde(default)]
    time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Hourly {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default)]
    relativehumidity_2m: Vec<Option<f64>>,
}

/// Parse an Open-Meteo forecast body into a live reading for `city`.
///
/// Humidity comes from the hourly series at the hour matching
/// `current_weather.time`, or the first hour when that time is absent.
pub fn parse_open_meteo(body: &str, city: &str) -> Result<Reading, FetchError> {
    let payload: ForecastResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Format(e.to_string()))?;

    let current = payload
        .current_weather
        .ok_or_else(|| FetchError::Format("missing current_weather".to_string()))?;
    let hourly = payload
        .hourly
        .ok_or_else(|| FetchError::Format("missing hourly".to_string()))?;

    let index = current
        .time
        .as_ref()
        .and_then(|now| hourly.time.iter().position(|t| t == now))
        .unwrap_or(0);
    let humidity = hourly
        .relativehumidity_2m
        .get(index)
        .copied()
        .flatten()
        .ok_or_else(|| FetchError::Format("missing hourly.relativehumidity_2m".to_string()))?;

    Ok(Reading::live(city, current.temperature, current.windspeed, humidity))
}
