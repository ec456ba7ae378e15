//! snapcache demo host
//!
//! A line-oriented stand-in for an application front end: it stores and
//! reads values through the engine and shows misses as "value not found".

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use snapcache::{CacheEngine, Config, FileCacheStore};

/// Main entry point for the demo host.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the snapshot directory and file store
/// 4. Open the engine, reloading still-valid entries
/// 5. Serve `set` / `get` / `stats` commands from stdin until `quit` or EOF
#[tokio::main]
async fn main() -> Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "snapcache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env();
    let cache_file = config.cache_file_path();
    info!(
        "Configuration loaded: cache_file={}, default_ttl={}s",
        cache_file.display(),
        config.default_ttl
    );

    std::fs::create_dir_all(config.cache_dir())
        .with_context(|| format!("creating {}", config.cache_dir().display()))?;

    let store = Arc::new(FileCacheStore::new(&cache_file));
    let engine = CacheEngine::open(store, config.default_ttl)
        .await
        .context("opening cache")?;

    println!("commands: set <key> <value> | get <key> | stats | quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));

        match command {
            "" => continue,
            "set" => {
                let (key, value) = rest.split_once(' ').unwrap_or((rest, ""));
                if key.is_empty() {
                    println!("usage: set <key> <value>");
                    continue;
                }
                match engine.set(key, value).await {
                    Ok(()) => println!("ok"),
                    // Memory already holds the value; only the snapshot is behind
                    Err(err) if err.is_store_unavailable() => {
                        println!("stored, but cache unavailable: {}", err)
                    }
                    Err(err) => println!("error: {}", err),
                }
            }
            "get" => match engine.get(rest.trim()).await {
                Some(value) => println!("{}", value),
                None => println!("value not found"),
            },
            "stats" => {
                let stats = engine.stats().await;
                println!("{}", serde_json::to_string(&stats)?);
                println!("hit rate: {:.2}", stats.hit_rate());
            }
            "quit" | "exit" => break,
            other => warn!("Unknown command '{}'", other),
        }
    }

    info!("Demo host shutting down");
    Ok(())
}
