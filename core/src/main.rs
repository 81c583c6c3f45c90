use clap::Parser;
use relayq::{BrokerConfig, BrokerServer, Result};
use tokio::signal;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "relayq")]
#[command(about = "A fault-tolerant broker for line-delimited records")]
struct Args {
    /// Port producers push records to
    #[arg(default_value_t = 9100)]
    producer_port: u16,

    /// Port consumers receive records and answer ACK/ERR on
    #[arg(default_value_t = 9200)]
    consumer_port: u16,

    /// Port answering GET /status
    #[arg(default_value_t = 8081)]
    monitor_port: u16,

    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Append-only journal path; delete it to reset broker state
    #[arg(long, default_value = "broker_log.txt")]
    journal: String,

    /// Per-consumer pipeline window
    #[arg(long, default_value_t = relayq::config::DEFAULT_WINDOW)]
    window: usize,

    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(parse_log_level(&args.log_level))
        .init();

    info!(
        "Starting relayq broker (producers {}, consumers {}, monitor {})",
        args.producer_port, args.consumer_port, args.monitor_port
    );
    info!("Journal: {}", args.journal);
    info!("Pipeline window: {}", args.window);

    let config = BrokerConfig {
        host: args.host,
        producer_port: args.producer_port,
        consumer_port: args.consumer_port,
        monitor_port: args.monitor_port,
        journal_path: args.journal,
        window: args.window,
        ..Default::default()
    };

    // A bind failure surfaces here and exits non-zero.
    let server = BrokerServer::bind(config).await?;

    let server_handle = tokio::spawn(server.run());

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
        outcome = server_handle => {
            match outcome {
                Ok(Err(e)) => error!("Server error: {e}"),
                Err(e) => error!("Server task failed: {e}"),
                Ok(Ok(())) => info!("Server task completed"),
            }
        }
    }

    info!("relayq shut down");
    Ok(())
}

fn parse_log_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => {
            warn!("Invalid log level '{}', defaulting to 'info'", level);
            tracing::Level::INFO
        }
    }
}
