// Copyright (c) 2026 Fichaje Protocol Contributors. MIT License.
// See LICENSE for details.

//! # Fichaje Node
//!
//! Binary entry point for the transfer settlement node. Hosts the escrow
//! ledger behind the HTTP API, serves Prometheus metrics on a second
//! port, and manages the federation's key material on disk.

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{bail, Context, Result};
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use clap::Parser;
use parking_lot::RwLock;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fichaje_ledger::FichajeLedger;
use fichaje_protocol::crypto::sealed::FederationKeypair;
use fichaje_protocol::identity::ActorKeypair;
use fichaje_protocol::store::MemoryStore;

use api::{create_router, AppState};
use cli::{Commands, FichajeNodeCli, InitArgs, RunArgs};
use logging::{init_logging, LogFormat};
use metrics::{metrics_handler, NodeMetrics};

const FEDERATION_KEY_FILE: &str = "federation.key";
const SEALING_KEY_FILE: &str = "sealing.key";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = FichajeNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Init(args) => init_node(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

async fn run_node(args: RunArgs) -> Result<()> {
    init_logging(
        "fichaje_node=info,fichaje_ledger=info,tower_http=debug",
        LogFormat::from_str_lossy(&args.log_format),
    );

    let data_dir = expand_home(&args.data_dir);

    let federation = load_federation_keypair(&args, &data_dir)?;
    let sealing = load_sealing_keypair(&data_dir)?;
    let federation_address = federation.address();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        federation = %federation_address,
        "starting fichaje node"
    );

    let ledger = FichajeLedger::new(federation_address);
    let metrics = Arc::new(NodeMetrics::new());

    let state = AppState {
        version: env!("CARGO_PKG_VERSION").to_string(),
        ledger: Arc::new(RwLock::new(ledger)),
        store: Arc::new(MemoryStore::new()),
        sealing_public_key: sealing.public_key_hex(),
        metrics: metrics.clone(),
        started_at: Utc::now(),
    };

    let api_router = create_router(state);
    let metrics_router = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics);

    let api_addr = SocketAddr::from(([0, 0, 0, 0], args.api_port));
    let metrics_addr = SocketAddr::from(([0, 0, 0, 0], args.metrics_port));

    let api_listener = tokio::net::TcpListener::bind(api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {api_addr}"))?;
    let metrics_listener = tokio::net::TcpListener::bind(metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {metrics_addr}"))?;

    tracing::info!(api = %api_addr, metrics = %metrics_addr, "listening");

    tokio::select! {
        result = axum::serve(api_listener, api_router) => {
            result.context("API server exited")?;
        }
        result = axum::serve(metrics_listener, metrics_router) => {
            result.context("metrics server exited")?;
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, stopping");
        }
    }

    Ok(())
}

/// Resolves until Ctrl-C or SIGTERM arrives.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

// ---------------------------------------------------------------------------
// Key Material
// ---------------------------------------------------------------------------

fn load_federation_keypair(args: &RunArgs, data_dir: &Path) -> Result<ActorKeypair> {
    if let Some(hex_key) = &args.federation_key {
        return ActorKeypair::from_hex(hex_key.trim())
            .context("invalid --federation-key value");
    }

    let path = data_dir.join(FEDERATION_KEY_FILE);
    let hex_key = std::fs::read_to_string(&path).with_context(|| {
        format!(
            "failed to read federation key from {}; run `fichaje-node init` first",
            path.display()
        )
    })?;
    ActorKeypair::from_hex(hex_key.trim())
        .with_context(|| format!("corrupt federation key file {}", path.display()))
}

fn load_sealing_keypair(data_dir: &Path) -> Result<FederationKeypair> {
    let path = data_dir.join(SEALING_KEY_FILE);
    let hex_key = std::fs::read_to_string(&path).with_context(|| {
        format!(
            "failed to read sealing key from {}; run `fichaje-node init` first",
            path.display()
        )
    })?;

    let bytes = hex::decode(hex_key.trim())
        .with_context(|| format!("corrupt sealing key file {}", path.display()))?;
    let secret: [u8; 32] = bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("sealing key in {} must be 32 bytes", path.display()))?;
    Ok(FederationKeypair::from_secret_bytes(secret))
}

// ---------------------------------------------------------------------------
// init
// ---------------------------------------------------------------------------

fn init_node(args: InitArgs) -> Result<()> {
    let data_dir = expand_home(&args.data_dir);

    let federation_path = data_dir.join(FEDERATION_KEY_FILE);
    let sealing_path = data_dir.join(SEALING_KEY_FILE);
    if federation_path.exists() || sealing_path.exists() {
        bail!(
            "key material already exists in {}; refusing to overwrite",
            data_dir.display()
        );
    }

    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

    let federation = ActorKeypair::generate();
    let sealing = FederationKeypair::generate();

    write_key_file(&federation_path, &hex::encode(federation.secret_key_bytes()))?;
    write_key_file(&sealing_path, &hex::encode(sealing.secret_bytes()))?;

    println!("Initialized data directory: {}", data_dir.display());
    println!("Federation address:         {}", federation.address());
    println!("Document sealing key:       {}", sealing.public_key_hex());
    println!();
    println!("Keep {} private.", data_dir.display());
    Ok(())
}

/// Writes a hex-encoded key to disk, owner-readable only on unix.
fn write_key_file(path: &Path, hex_key: &str) -> Result<()> {
    std::fs::write(path, format!("{hex_key}\n"))
        .with_context(|| format!("failed to write key file {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

fn expand_home(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    path.to_path_buf()
}

// ---------------------------------------------------------------------------
// version
// ---------------------------------------------------------------------------

fn print_version() {
    println!("fichaje-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol version: {}", fichaje_protocol::config::PROTOCOL_VERSION);
}
