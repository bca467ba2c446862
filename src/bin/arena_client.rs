//! Headless arena client: connects, spawns local bots and plays on autopilot.

use std::env;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tank_arena_server::client::{run_client, ClientError, DEFAULT_BOTS};

const DEFAULT_URL: &str = "ws://127.0.0.1:3000/ws";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let url = env::var("ARENA_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
    let bots = match env::var("ARENA_BOTS") {
        Ok(raw) => raw.trim().parse::<usize>().context("ARENA_BOTS must be a count")?,
        Err(_) => DEFAULT_BOTS,
    };
    let seed = match env::var("ARENA_SEED") {
        Ok(raw) => raw.trim().parse::<u64>().context("ARENA_SEED must be an integer")?,
        Err(_) => rand::random(),
    };

    match run_client(&url, bots, seed).await {
        Ok(()) => {}
        Err(e @ ClientError::Connect { .. }) => {
            eprintln!("Could not reach the arena: {e}");
            eprintln!("Is the server running at {url}?");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Connection to the arena was lost: {e}");
            std::process::exit(1);
        }
    }
    Ok(())
}
