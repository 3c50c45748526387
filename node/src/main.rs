// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # TimeVault Custody Node
//!
//! Entry point for the `timevault-node` binary. Parses CLI arguments,
//! initializes logging and metrics, restores the engine from disk, and serves
//! the HTTP/WS API.
//!
//! The binary supports three subcommands:
//!
//! - `run`    : start the node
//! - `status` : query a running node's status endpoint
//! - `version`: print build version information

mod api;
mod cli;
mod engine;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::{broadcast, RwLock};

use timevault_protocol::storage::VaultDb;
use timevault_protocol::{Clock, SystemClock};

use cli::{Commands, TimeVaultCli};
use engine::Engine;
use metrics::NodeMetrics;

/// Broadcast channel capacity for live event streaming.
const EVENT_CHANNEL_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = TimeVaultCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Status(args) => query_status(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the node: restores the engine, then serves the API and metrics
/// endpoints until a shutdown signal arrives.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(args.log_level, args.log_format)
        .context("failed to install log subscriber")?;

    let config = args.engine_config();
    config.validate().context("invalid engine configuration")?;

    tracing::info!(
        rpc_port = args.rpc_port,
        metrics_port = args.metrics_port,
        data_dir = %args.data_dir.display(),
        admin = %config.admin,
        protocol_fee_bps = config.protocol_fee_bps,
        "starting timevault-node"
    );

    // --- Persistent storage ---
    let db_path = args.data_dir.join("db");
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create database directory: {}", db_path.display()))?;

    let db = Arc::new(
        VaultDb::open(&db_path)
            .with_context(|| format!("failed to open database at {}", db_path.display()))?,
    );
    tracing::info!(path = %db_path.display(), "database opened");

    // --- Engine ---
    let engine = Engine::restore(&db, &config).context("failed to restore engine state")?;
    tracing::info!(
        registry_vaults = engine.registry.total_vaults(),
        ledger_vaults = engine.ledger.total_vaults(),
        value_locked = engine.value_locked(),
        "engine ready"
    );

    // --- Metrics ---
    let node_metrics = Arc::new(NodeMetrics::new().context("failed to register metrics")?);
    node_metrics.set_value_locked(engine.value_locked());

    // --- Event broadcast ---
    let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

    // --- Application state ---
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let app_state = api::AppState {
        version: format!(
            "{} (engine {})",
            env!("CARGO_PKG_VERSION"),
            timevault_protocol::config::ENGINE_VERSION,
        ),
        started_at: clock.now(),
        engine: Arc::new(RwLock::new(engine)),
        clock,
        journal: db.clone(),
        event_tx,
        metrics: Arc::clone(&node_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.rpc_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind RPC listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received");
        }
    }

    db.flush().context("failed to flush database")?;
    tracing::info!("timevault-node stopped");
    Ok(())
}

/// Queries a running node's status endpoint and prints the response body.
async fn query_status(args: cli::StatusArgs) -> Result<()> {
    let (authority, base_path) = split_endpoint(&args.rpc_url)?;
    let path = format!("{}/status", base_path.trim_end_matches('/'));
    let body = http_get(&authority, &path).await?;
    println!("{}", body);
    Ok(())
}

/// Splits `http://host:port/prefix` into `("host:port", "/prefix")`.
/// A missing port defaults to 80.
fn split_endpoint(url: &str) -> Result<(String, String)> {
    let rest = url.strip_prefix("http://").unwrap_or(url);
    if rest.starts_with("https://") {
        anyhow::bail!("https endpoints are not supported: {}", url);
    }

    let (authority, path) = match rest.find('/') {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, ""),
    };
    if authority.is_empty() {
        anyhow::bail!("missing host in {}", url);
    }

    let authority = match authority.rsplit_once(':') {
        Some((host, port)) => {
            port.parse::<u16>()
                .with_context(|| format!("bad port in {}", url))?;
            format!("{}:{}", host, port)
        }
        None => format!("{}:80", authority),
    };
    Ok((authority, path.to_string()))
}

/// One-shot HTTP/1.1 GET over a raw TCP stream. Returns the response body.
async fn http_get(authority: &str, path: &str) -> Result<String> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let mut stream = tokio::net::TcpStream::connect(authority)
        .await
        .with_context(|| format!("failed to connect to {}", authority))?;

    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nAccept: application/json\r\nConnection: close\r\n\r\n",
        path, authority,
    );
    stream.write_all(request.as_bytes()).await?;

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await?;
    let response = String::from_utf8_lossy(&buf);

    let (head, body) = response
        .split_once("\r\n\r\n")
        .ok_or_else(|| anyhow::anyhow!("malformed response from {}", authority))?;
    let status_line = head.lines().next().unwrap_or_default();
    if !status_line.contains(" 200 ") {
        anyhow::bail!("{} returned {}", authority, status_line);
    }
    Ok(body.to_string())
}

/// Prints version information to stdout.
fn print_version() {
    println!("timevault-node {}", env!("CARGO_PKG_VERSION"));
    println!("engine         {}", timevault_protocol::config::ENGINE_VERSION);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_splitting() {
        assert_eq!(
            split_endpoint("http://127.0.0.1:8645").unwrap(),
            ("127.0.0.1:8645".to_string(), String::new())
        );
        assert_eq!(
            split_endpoint("http://node.local/api/").unwrap(),
            ("node.local:80".to_string(), "/api/".to_string())
        );
        assert!(split_endpoint("https://node.local").is_err());
        assert!(split_endpoint("http://node.local:http").is_err());
        assert!(split_endpoint("http://").is_err());
    }
}
