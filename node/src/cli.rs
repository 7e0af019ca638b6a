//! # CLI Interface
//!
//! Command-line argument structure for `fichaje-node` via `clap` derive.
//! Three subcommands: `run`, `init`, and `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use fichaje_protocol::config::{DEFAULT_API_PORT, DEFAULT_METRICS_PORT};

/// Fichaje transfer settlement node.
///
/// Runs the federation's escrow ledger and serves the transfer settlement
/// API over HTTP, with Prometheus metrics on a separate port.
#[derive(Parser, Debug)]
#[command(
    name = "fichaje-node",
    about = "Fichaje transfer settlement node",
    version,
    propagate_version = true
)]
pub struct FichajeNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the settlement node.
    Run(RunArgs),
    /// Initialize a data directory: generates the federation signing
    /// keypair and the document sealing keypair.
    Init(InitArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Node data directory holding the federation key files.
    #[arg(long, short = 'd', env = "FICHAJE_DATA_DIR", default_value = "~/.fichaje")]
    pub data_dir: PathBuf,

    /// Port for the settlement HTTP API.
    #[arg(long, env = "FICHAJE_API_PORT", default_value_t = DEFAULT_API_PORT)]
    pub api_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "FICHAJE_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Log output format: "pretty" or "json".
    #[arg(long, env = "FICHAJE_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Hex-encoded Ed25519 federation signing key.
    ///
    /// If not provided, the node reads the key from the data directory.
    /// Never pass this flag in production; use the key file instead.
    #[arg(long, env = "FICHAJE_FEDERATION_KEY")]
    pub federation_key: Option<String>,
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Data directory to initialize.
    #[arg(long, short = 'd', env = "FICHAJE_DATA_DIR", default_value = "~/.fichaje")]
    pub data_dir: PathBuf,
}
