//! Weather fetcher: one configured source plus a bounded retry policy.

use crate::config::Settings;
use crate::error::FetchError;
use crate::reading::Reading;
use crate::retry::{retry, RetryPolicy};
use crate::source::{Provider, WeatherProvider};

pub struct WeatherFetcher<P> {
    provider: P,
    policy: RetryPolicy,
}

impl WeatherFetcher<Provider> {
    /// Fetcher for the source and retry policy named in `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self, FetchError> {
        Ok(Self::new(
            Provider::from_settings(settings)?,
            settings.fetch_retry.clone(),
        ))
    }
}

impl<P: WeatherProvider> WeatherFetcher<P> {
    pub fn new(provider: P, policy: RetryPolicy) -> Self {
        Self { provider, policy }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetch a live reading.
    ///
    /// A misconfigured source fails immediately without touching the network.
    /// Otherwise each failed attempt is followed by the policy delay, except
    /// the last, whose error is returned.
    pub async fn fetch(&self) -> Result<Reading, FetchError> {
        self.provider.check_config()?;
        let reading = retry(
            &self.policy,
            "Fetcher",
            |e: &FetchError| !e.is_retryable(),
            |attempt| {
                log::debug!(
                    "[Fetcher] requesting {} (attempt {}/{})",
                    self.provider.name(),
                    attempt,
                    self.policy.attempts()
                );
                self.provider.fetch_once()
            },
        )
        .await?;
        log::info!(
            "[Fetcher] {}: {} {:.1}°C, wind {:.1} km/h, humidity {:.0}%",
            self.provider.name(),
            reading.city,
            reading.temperature,
            reading.windspeed,
            reading.humidity
        );
        Ok(reading)
    }
}
