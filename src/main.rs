use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use plant_telemetry::{
    config::Config,
    ingestor::{create_sample_channel, create_stop_channel, MetricsStreamClient},
    mock::MockStreamServer,
    state::PlantMetricsStore,
    web::WebServer,
};

#[derive(Parser)]
#[command(name = "plant-telemetry")]
#[command(version = "0.1.0")]
#[command(about = "Streaming plant sensor telemetry with rolling summaries")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest the metrics feed and serve the state API (default)
    Run {
        /// Metrics feed URL (overrides config file and environment)
        #[arg(short, long, value_name = "URL")]
        url: Option<String>,

        /// State API listening port
        #[arg(short, long, value_name = "PORT")]
        port: Option<u16>,
    },
    /// Serve the mock NDJSON sample generator
    MockStream {
        /// Listening port
        #[arg(short, long, value_name = "PORT")]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = format!("plant_telemetry={}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting plant telemetry v{}", env!("CARGO_PKG_VERSION"));

    std::env::set_var("CONFIG_FILE", &cli.config);
    let config = Config::load()?;
    info!("Configuration loaded from: {}", cli.config);

    match cli.command.unwrap_or(Command::Run {
        url: None,
        port: None,
    }) {
        Command::Run { url, port } => run(config, url, port).await,
        Command::MockStream { port } => mock_stream(config, port).await,
    }
}

async fn run(mut config: Config, url: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(url) = url {
        config.metrics.url = url;
    }
    if let Some(port) = port {
        config.web.port = port;
    }
    config.validate()?;

    let store = PlantMetricsStore::new(
        config.metrics.history_capacity,
        config.metrics.ambient_co2_baseline_ppm,
    );

    let (sample_tx, mut sample_rx) = create_sample_channel(config.metrics.channel_capacity);
    let (stop_tx, stop_rx) = create_stop_channel();

    let client = MetricsStreamClient::new(&config.metrics.url, sample_tx, stop_rx)?
        .with_reconnect_delay(Duration::from_secs_f64(config.metrics.reconnect_delay_secs));
    info!("Streaming plant metrics from {}", config.metrics.url);
    let mut ingest_task = tokio::spawn(client.run_forever());

    let consumer_store = store.clone();
    tokio::spawn(async move {
        while let Some(sample) = sample_rx.recv().await {
            consumer_store.update(sample).await;
            info!(
                "Plant metrics: temp={:.2}C, humidity={:.2}%, eCO2={:.0} ppm",
                sample.temperature_c, sample.humidity_pct, sample.co2_ppm
            );
        }
    });

    let web_server = WebServer::new(&config.web, store.clone())?;
    info!(
        "Starting state API on {}:{}",
        web_server.host(),
        web_server.port()
    );

    tokio::select! {
        result = web_server.serve() => result?,
        _ = tokio::signal::ctrl_c() => info!("Shutdown signal received"),
    }

    // Cooperative stop: observed within one chunk read or backoff interval
    let _ = stop_tx.send(true);
    match tokio::time::timeout(Duration::from_secs(2), &mut ingest_task).await {
        Ok(join_result) => {
            if let Err(err) = join_result {
                warn!("Metrics stream client task failed: {}", err);
            }
        }
        Err(_) => {
            warn!("Metrics stream client did not stop within 2s; aborting");
            ingest_task.abort();
        }
    }
    Ok(())
}

async fn mock_stream(mut config: Config, port: Option<u16>) -> Result<()> {
    if let Some(port) = port {
        config.mock.port = port;
    }

    let server = MockStreamServer::new(&config.mock)?;
    info!(
        "Starting mock plant stream on {}:{}",
        server.host(),
        server.port()
    );

    tokio::select! {
        result = server.serve() => result?,
        _ = tokio::signal::ctrl_c() => info!("Shutdown signal received"),
    }
    Ok(())
}
