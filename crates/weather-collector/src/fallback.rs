//! Synthetic readings used when the weather source is unreachable.
//!
//! They keep the publish cadence alive during outages and are tagged with
//! [`Origin::Fallback`] so consumers can tell them apart from measurements.

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::Range;

use crate::config::Settings;
use crate::reading::{Origin, Reading, SCHEMA_VERSION};

pub const TEMPERATURE_RANGE: Range<f64> = 25.0..35.0;
pub const WINDSPEED_RANGE: Range<f64> = 10.0..30.0;
pub const HUMIDITY_RANGE: Range<f64> = 60.0..90.0;

pub const FALLBACK_DESCRIPTION: &str = "synthetic fallback reading";

/// Generate a plausible reading for the configured city, seeded by the clock.
pub fn generate(settings: &Settings) -> Reading {
    let now = Utc::now();
    let seed = now.timestamp_nanos_opt().unwrap_or_else(|| now.timestamp()) as u64;
    generate_with(settings, &mut StdRng::seed_from_u64(seed))
}

/// Generate a reading from the given random source.
pub fn generate_with<R: Rng>(settings: &Settings, rng: &mut R) -> Reading {
    Reading {
        city: settings.city.clone(),
        timestamp: Utc::now(),
        temperature: sample(rng, TEMPERATURE_RANGE),
        windspeed: sample(rng, WINDSPEED_RANGE),
        humidity: sample(rng, HUMIDITY_RANGE),
        description: Some(FALLBACK_DESCRIPTION.to_string()),
        feels_like: None,
        pressure: None,
        origin: Origin::Fallback,
        schema_version: SCHEMA_VERSION,
    }
}

/// Uniform sample truncated to one decimal; truncation keeps the upper bound
/// exclusive.
fn sample<R: Rng>(rng: &mut R, range: Range<f64>) -> f64 {
    let value = rng.gen_range(range.clone());
    let truncated = (value * 10.0).floor() / 10.0;
    truncated.clamp(range.start, range.end - 0.1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_stay_in_range() {
        let settings = Settings::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1_000 {
            let reading = generate_with(&settings, &mut rng);
            assert!(TEMPERATURE_RANGE.contains(&reading.temperature));
            assert!(WINDSPEED_RANGE.contains(&reading.windspeed));
            assert!(HUMIDITY_RANGE.contains(&reading.humidity));
        }
    }

    #[test]
    fn reading_is_tagged_as_fallback() {
        let mut settings = Settings::default();
        settings.city = "Penápolis".to_string();
        let reading = generate(&settings);
        assert_eq!(reading.city, "Penápolis");
        assert!(reading.is_fallback());
        assert_eq!(reading.description.as_deref(), Some(FALLBACK_DESCRIPTION));
        assert!(reading.feels_like.is_none());
    }

    #[test]
    fn timestamp_is_set_at_generation() {
        let before = Utc::now();
        let reading = generate(&Settings::default());
        assert!(reading.timestamp >= before);
        assert!(reading.timestamp <= Utc::now());
    }

    #[test]
    fn same_seed_same_values() {
        let settings = Settings::default();
        let a = generate_with(&settings, &mut StdRng::seed_from_u64(42));
        let b = generate_with(&settings, &mut StdRng::seed_from_u64(42));
        assert_eq!(a.temperature, b.temperature);
        assert_eq!(a.windspeed, b.windspeed);
        assert_eq!(a.humidity, b.humidity);
    }

    #[test]
    fn values_have_one_decimal() {
        let reading = generate_with(&Settings::default(), &mut StdRng::seed_from_u64(3));
        for value in [reading.temperature, reading.windspeed, reading.humidity] {
            let scaled = value * 10.0;
            assert!((scaled - scaled.round()).abs() < 1e-6, "{}", value);
        }
    }
}
