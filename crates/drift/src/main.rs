//! CLI for Drift
//!
//! Subcommands:
//! - `server`: run the pub/sub server
//! - `publish`: send one message to a topic
//! - `subscribe`: stream a topic's messages to stdout

use std::sync::Arc;

use clap::Parser;
use drift_broker::Medium;
use drift_client::{Client, HistoryOptions};
use drift_config::load_config;
use drift_transport::start_http_server;
use tracing::{error, info};

const DEFAULT_URL: &str = "http://127.0.0.1:5500";

#[derive(Parser)]
#[command(name = "drift", about = "HTTP/2 publish/subscribe broker")]
enum Command {
    /// Start the pub/sub server
    Server,
    /// Publish one message to a topic
    Publish {
        /// Server to talk to
        #[arg(long, default_value = DEFAULT_URL)]
        url: String,
        topic: String,
        message: String,
    },
    /// Subscribe to a topic and print each message on its own line
    Subscribe {
        /// Server to talk to
        #[arg(long, default_value = DEFAULT_URL)]
        url: String,
        topic: String,
        /// Replay up to N retained messages before live traffic
        #[arg(long)]
        history_length: Option<usize>,
        /// Replay messages stamped after this unix timestamp
        #[arg(long)]
        history_since: Option<i64>,
    },
}

#[tokio::main]
async fn main() {
    drift_utils::logging::init("info");

    match Command::parse() {
        Command::Server => {
            if let Err(e) = run_server().await {
                error!("Server failed: {}", e);
            }
        }
        Command::Publish {
            url,
            topic,
            message,
        } => {
            if let Err(e) = run_publish(&url, &topic, message).await {
                error!("Publish failed: {}", e);
            }
        }
        Command::Subscribe {
            url,
            topic,
            history_length,
            history_since,
        } => {
            if let Err(e) = run_subscribe(&url, &topic, history_length, history_since).await {
                error!("Subscribe failed: {}", e);
            }
        }
    }
}

async fn run_server() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let medium = Arc::new(Medium::new());

    tokio::select! {
        res = start_http_server(addr, medium, config) => {
            if let Err(e) = res {
                error!("HTTP server exited unexpectedly: {e}");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    Ok(())
}

async fn run_publish(
    url: &str,
    topic: &str,
    message: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = Client::new(url)?;
    client.publish(topic, message).await?;
    Ok(())
}

async fn run_subscribe(
    url: &str,
    topic: &str,
    history_length: Option<usize>,
    history_since: Option<i64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = Client::new(url)?;
    let mut sub = client
        .subscribe(
            topic,
            HistoryOptions {
                since: history_since,
                len: history_length,
            },
        )
        .await?;
    info!("history enabled: {}", sub.history_enabled());

    while let Some(msg) = sub.next().await {
        println!("{}", String::from_utf8_lossy(&msg?));
    }
    info!("Stream ended.");

    Ok(())
}
