//! ARCHIVE server binary.
//!
//! # Usage
//!
//! ```bash
//! # Listen on the default port (8080)
//! archive-server
//!
//! # Custom port and tighter retransmission policy
//! archive-server --port 9000 --retransmit-timeout-ms 1000 --max-retries 3
//! ```
//!
//! The listen port can also come from the `PORT` environment variable.

use std::time::Duration;

use archive_server::{DriverConfig, SendOptions, Server, ServerRuntimeConfig};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// ARCHIVE realtime game server
#[derive(Parser, Debug)]
#[command(name = "archive-server")]
#[command(about = "ARCHIVE realtime multiplayer server")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = 8080, env = "PORT")]
    port: u16,

    /// Interface to bind
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Maximum concurrent connections
    #[arg(long, default_value_t = 10_000)]
    max_connections: usize,

    /// Default retransmission timeout for reliable sends, in milliseconds
    #[arg(long, default_value_t = 3000)]
    retransmit_timeout_ms: u64,

    /// Retransmissions allowed before a reliable send is failed
    #[arg(long, default_value_t = 5)]
    max_retries: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let config = ServerRuntimeConfig {
        bind_address: format!("{}:{}", args.bind, args.port),
        driver: DriverConfig {
            max_connections: args.max_connections,
            send_options: SendOptions {
                timeout: Duration::from_millis(args.retransmit_timeout_ms),
                max_retries: args.max_retries,
            },
        },
    };

    let server = Server::bind(config).await?;
    tracing::info!("ARCHIVE server listening on {}", server.local_addr()?);

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        },
    }

    Ok(())
}
