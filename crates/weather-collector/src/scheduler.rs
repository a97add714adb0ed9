//! Collection loop.
//!
//! One cycle runs at startup, then one per interval until shutdown. A cycle
//! fetches a live reading, substitutes a fallback reading when the fetch
//! fails, and publishes exactly once. Cycles hold the cycle lock for their
//! whole duration so they never overlap; a cycle that overruns the interval
//! delays the next tick instead of bursting.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::Settings;
use crate::fallback;
use crate::fetcher::WeatherFetcher;
use crate::publisher::{Broker, QueuePublisher};
use crate::reading::{Origin, Reading};
use crate::source::WeatherProvider;

/// Outcome of one collection cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub origin: Origin,
    pub delivered: bool,
}

pub struct Collector<P, B> {
    settings: Arc<Settings>,
    fetcher: WeatherFetcher<P>,
    publisher: QueuePublisher<B>,
    cycle_lock: Mutex<()>,
}

impl<P: WeatherProvider, B: Broker> Collector<P, B> {
    pub fn new(
        settings: Arc<Settings>,
        fetcher: WeatherFetcher<P>,
        publisher: QueuePublisher<B>,
    ) -> Self {
        Self {
            settings,
            fetcher,
            publisher,
            cycle_lock: Mutex::new(()),
        }
    }

    pub fn fetcher(&self) -> &WeatherFetcher<P> {
        &self.fetcher
    }

    pub fn publisher(&self) -> &QueuePublisher<B> {
        &self.publisher
    }

    /// Fetch a live reading, or generate a fallback one when the source fails.
    pub async fn collect(&self) -> Reading {
        match self.fetcher.fetch().await {
            Ok(reading) => reading,
            Err(e) => {
                log::warn!("[Scheduler] fetch failed, publishing fallback reading: {}", e);
                fallback::generate(&self.settings)
            }
        }
    }

    /// Run one fetch-or-fallback-then-publish cycle.
    pub async fn run_cycle(&self) -> CycleReport {
        let _guard = self.cycle_lock.lock().await;
        let started = Instant::now();

        let reading = self.collect().await;
        let delivered = self.publisher.publish(&reading).await;

        let report = CycleReport {
            origin: reading.origin,
            delivered,
        };
        log::info!(
            "[Scheduler] cycle finished in {:.1?}: source={} delivered={}",
            started.elapsed(),
            report.origin,
            report.delivered
        );
        report
    }

    /// Run the loop until `shutdown` fires.
    ///
    /// The shutdown signal is only observed between cycles; an in-flight
    /// cycle always runs to completion.
    pub async fn run(&self, shutdown: watch::Receiver<()>) {
        self.run_every(self.settings.interval(), shutdown).await
    }

    /// Same as [`Collector::run`] with an explicit period.
    pub async fn run_every(&self, period: Duration, mut shutdown: watch::Receiver<()>) {
        log::info!(
            "[Scheduler] collecting for {} every {:?} into queue '{}'",
            self.settings.city,
            period,
            self.publisher.queue()
        );
        let retry_waits =
            self.fetcher.policy().total_delay() + self.publisher.policy().total_delay();
        if retry_waits >= period {
            log::warn!(
                "[Scheduler] worst-case retry waits ({:?}) exceed the interval; late ticks will be delayed",
                retry_waits
            );
        } else {
            log::debug!("[Scheduler] worst-case retry waits per cycle: {:?}", retry_waits);
        }

        // Cold start cycle, outside the timer.
        self.run_cycle().await;

        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    log::info!("[Scheduler] shutdown signal received, exiting");
                    break;
                }
                _ = interval.tick() => {
                    self.run_cycle().await;
                }
            }
        }
    }
}
