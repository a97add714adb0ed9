//! Weather collector: samples a weather API on a fixed interval and publishes
//! a normalized JSON reading to a durable RabbitMQ queue.
//!
//! # Module structure
//!
//! ```text
//! weather_collector
//! ├── config      settings from defaults, YAML file and environment
//! ├── reading     the Reading message and its wire format
//! ├── source      Open-Meteo and OpenWeatherMap clients
//! ├── fetcher     source + bounded retry
//! ├── fallback    synthetic readings for source outages
//! ├── publisher   durable AMQP publish with reconnect retries
//! ├── scheduler   cold-start cycle, then one cycle per interval
//! ├── retry       fixed/exponential retry policy
//! └── error       ConfigError, FetchError, PublishError
//! ```

pub mod config;
pub mod error;
pub mod fallback;
pub mod fetcher;
pub mod publisher;
pub mod reading;
pub mod retry;
pub mod scheduler;
pub mod source;

pub use config::{ProviderKind, Settings, SourceSettings};
pub use error::{ConfigError, FetchError, PublishError};
pub use fetcher::WeatherFetcher;
pub use publisher::{AmqpBroker, Broker, QueuePublisher};
pub use reading::{Origin, Reading};
pub use retry::{Backoff, RetryPolicy};
pub use scheduler::{Collector, CycleReport};
pub use source::{Provider, WeatherProvider};
