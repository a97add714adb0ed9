use argh::FromArgs;
use std::sync::Arc;
use weather_collector::{Collector, QueuePublisher, Settings, WeatherFetcher};

#[derive(FromArgs)]
/// Weather collector: publishes weather readings to a RabbitMQ queue
struct Args {
    /// path to a YAML configuration file (optional, environment variables override it)
    #[argh(option, short = 'c')]
    config: Option<String>,

    /// run a single collection cycle and exit
    #[argh(switch)]
    once: bool,

    /// fetch (or generate) one reading, print it and exit without publishing
    #[argh(switch)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let env = env_logger::Env::default().default_filter_or("info");
    env_logger::init_from_env(env);

    let args: Args = argh::from_env();

    let settings = match &args.config {
        Some(path) => match Settings::load_with_file(path) {
            Ok(s) => s,
            Err(e) => {
                log::error!("Failed to load config from '{}': {}", path, e);
                std::process::exit(1);
            }
        },
        None => Settings::load(),
    };
    let settings = Arc::new(settings);

    log::info!(
        "Using location: ({:.4}, {:.4}) - {} via {}",
        settings.latitude,
        settings.longitude,
        settings.city,
        settings.source.provider.name()
    );

    let fetcher = WeatherFetcher::from_settings(&settings)?;
    let publisher = QueuePublisher::from_settings(&settings);
    let collector = Collector::new(settings.clone(), fetcher, publisher);

    if args.dry_run {
        let reading = collector.collect().await;
        println!("{}", serde_json::to_string_pretty(&reading)?);
        return Ok(());
    }

    if args.once {
        let report = collector.run_cycle().await;
        log::info!("Single cycle done: {:?}", report);
        return Ok(());
    }

    // Create shutdown channel
    let shutdown_tx = tokio::sync::watch::Sender::new(());

    // Set up Ctrl+C handler
    {
        let shutdown_tx = shutdown_tx.clone();
        ctrlc::set_handler(move || {
            log::info!("Received Ctrl+C, shutting down gracefully...");
            let _ = shutdown_tx.send(());
        })?;
    }

    collector.run(shutdown_tx.subscribe()).await;

    log::info!("Weather collector shut down, exiting");
    Ok(())
}
