//! Bounded retry with a fixed or exponential delay between attempts.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Upper bound for exponential delays.
const MAX_DELAY: Duration = Duration::from_secs(300);

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    /// Same delay before every retry.
    #[default]
    Fixed,
    /// Delay doubles after each failed attempt, capped at five minutes.
    Exponential,
}

impl std::str::FromStr for Backoff {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(Backoff::Fixed),
            "exponential" => Ok(Backoff::Exponential),
            other => Err(format!("unknown backoff '{}'", other)),
        }
    }
}

/// Retry policy for one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Zero is treated as one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    #[serde(with = "duration_secs")]
    pub delay: Duration,
    #[serde(default)]
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            backoff: Backoff::Fixed,
        }
    }

    /// A policy that retries immediately. Used in tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::fixed(max_attempts, Duration::ZERO)
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential => {
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
                self.delay.saturating_mul(factor).min(MAX_DELAY)
            }
        }
    }

    /// Worst-case time spent sleeping between attempts.
    pub fn total_delay(&self) -> Duration {
        (1..self.attempts())
            .map(|attempt| self.delay_after(attempt))
            .sum()
    }
}

/// A retry policy as written in a config file, where every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct PartialRetryPolicy {
    max_attempts: Option<u32>,
    #[serde(deserialize_with = "duration_secs::option::deserialize")]
    delay: Option<Duration>,
    backoff: Option<Backoff>,
}

impl PartialRetryPolicy {
    /// Fill the missing keys from `base`.
    pub(crate) fn or(self, base: RetryPolicy) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.unwrap_or(base.max_attempts),
            delay: self.delay.unwrap_or(base.delay),
            backoff: self.backoff.unwrap_or(base.backoff),
        }
    }
}

/// Run `op` until it succeeds, the attempts run out, or `is_final` says the
/// error cannot be fixed by trying again. Returns the last error.
///
/// `op` receives the 1-based attempt number.
pub async fn retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    is_final: impl Fn(&E) -> bool,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = policy.attempts();
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    log::info!("[{}] succeeded on attempt {}/{}", label, attempt, attempts);
                }
                return Ok(value);
            }
            Err(e) if is_final(&e) => {
                log::error!("[{}] giving up without retry: {}", label, e);
                return Err(e);
            }
            Err(e) if attempt >= attempts => {
                log::error!("[{}] attempt {}/{} failed: {}", label, attempt, attempts, e);
                return Err(e);
            }
            Err(e) => {
                let delay = policy.delay_after(attempt);
                log::warn!(
                    "[{}] attempt {}/{} failed: {} (retrying in {:?})",
                    label,
                    attempt,
                    attempts,
                    e,
                    delay
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                attempt += 1;
            }
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use serde::{Deserialize, Deserializer};
        use std::time::Duration;

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
            Option::<f64>::deserialize(d)?
                .map(|secs| Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
