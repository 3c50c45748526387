// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # CLI Interface
//!
//! Defines the command-line argument structure for `timevault-node` using
//! `clap` derive. Supports three subcommands: `run`, `status`, and
//! `version`. Every `run` flag can also be set through a `TIMEVAULT_*`
//! environment variable.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::Level;

use timevault_contracts::{EngineConfig, FeePolicy, PenaltyPolicy};
use timevault_protocol::Address;

use crate::logging::LogFormat;

/// TimeVault custody node.
///
/// Hosts the vault registry and the shared vault ledger behind an HTTP/JSON
/// API, persists every committed operation, streams events over WebSocket,
/// and exposes Prometheus metrics.
#[derive(Parser, Debug)]
#[command(
    name = "timevault-node",
    about = "TimeVault custody node",
    version,
    propagate_version = true
)]
pub struct TimeVaultCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the TimeVault node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the node.
    Run(RunArgs),
    /// Query the status of a running node via its API endpoint.
    Status(StatusArgs),
    /// Print version information and exit.
    Version,
}

/// Fee policy as written on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeePolicyArg {
    /// Vaults keep the fee in force when they were created.
    Captured,
    /// Vaults read the current fee on every use.
    Live,
}

impl From<FeePolicyArg> for FeePolicy {
    fn from(arg: FeePolicyArg) -> Self {
        match arg {
            FeePolicyArg::Captured => FeePolicy::CapturedAtCreation,
            FeePolicyArg::Live => FeePolicy::Live,
        }
    }
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the node data directory where snapshots and the event
    /// journal are stored.
    ///
    /// Created on first run if it does not exist.
    #[arg(long, short = 'd', env = "TIMEVAULT_DATA_DIR", default_value = "./timevault-data")]
    pub data_dir: PathBuf,

    /// Port for the HTTP/JSON API and WebSocket stream.
    #[arg(long, env = "TIMEVAULT_RPC_PORT", default_value_t = 8645)]
    pub rpc_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "TIMEVAULT_METRICS_PORT", default_value_t = 8646)]
    pub metrics_port: u16,

    /// Administrator of the registry and the shared ledger (0x-prefixed hex).
    #[arg(long, env = "TIMEVAULT_ADMIN")]
    pub admin: Address,

    /// Identity of the registry, mixed into derived vault addresses.
    /// Defaults to the administrator.
    #[arg(long, env = "TIMEVAULT_REGISTRY_ADDRESS")]
    pub registry_address: Option<Address>,

    /// Recipient of shared-ledger fees and penalties. Defaults to the
    /// administrator.
    #[arg(long, env = "TIMEVAULT_FEE_RECIPIENT")]
    pub fee_recipient: Option<Address>,

    /// Initial protocol fee in basis points (0 to 1000).
    #[arg(
        long,
        env = "TIMEVAULT_PROTOCOL_FEE_BPS",
        default_value_t = timevault_protocol::config::DEFAULT_PROTOCOL_FEE_BPS
    )]
    pub protocol_fee_bps: u16,

    /// Fee policy of the vault registry.
    #[arg(
        long,
        env = "TIMEVAULT_REGISTRY_FEE_POLICY",
        value_enum,
        default_value_t = FeePolicyArg::Captured
    )]
    pub registry_fee_policy: FeePolicyArg,

    /// Fee policy of the shared ledger.
    #[arg(
        long,
        env = "TIMEVAULT_LEDGER_FEE_POLICY",
        value_enum,
        default_value_t = FeePolicyArg::Live
    )]
    pub ledger_fee_policy: FeePolicyArg,

    /// Fixed emergency penalty in basis points. When omitted the penalty
    /// equals the protocol fee.
    #[arg(long, env = "TIMEVAULT_PENALTY_BPS")]
    pub penalty_bps: Option<u16>,

    /// Level for the engine crates: error, warn, info, debug or trace.
    #[arg(long, env = "TIMEVAULT_LOG_LEVEL", default_value_t = Level::INFO)]
    pub log_level: Level,

    /// Log output format.
    #[arg(
        long,
        env = "TIMEVAULT_LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Pretty
    )]
    pub log_format: LogFormat,
}

impl RunArgs {
    /// Engine configuration described by these flags. Not yet validated.
    pub fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig::new(
            self.admin,
            self.registry_address.unwrap_or(self.admin),
            self.fee_recipient.unwrap_or(self.admin),
        );
        config.protocol_fee_bps = self.protocol_fee_bps;
        config.registry_fee_policy = self.registry_fee_policy.into();
        config.ledger_fee_policy = self.ledger_fee_policy.into();
        config.penalty = match self.penalty_bps {
            Some(bps) => PenaltyPolicy::Fixed(bps),
            None => PenaltyPolicy::ProtocolFee,
        };
        config
    }
}

/// Arguments for the `status` subcommand.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// API endpoint of the running node.
    #[arg(long, env = "TIMEVAULT_RPC_URL", default_value = "http://127.0.0.1:8645")]
    pub rpc_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        // Ensures the derive macros produce a valid CLI definition.
        TimeVaultCli::command().debug_assert();
    }

    #[test]
    fn run_flags_build_engine_config() {
        let cli = TimeVaultCli::try_parse_from([
            "timevault-node",
            "run",
            "--admin",
            "0x00000000000000000000000000000000000000a0",
            "--protocol-fee-bps",
            "100",
            "--registry-fee-policy",
            "live",
            "--penalty-bps",
            "750",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("expected run subcommand");
        };
        let config = args.engine_config();
        let admin = Address::from_low_u8(0xA0);
        assert_eq!(config.admin, admin);
        assert_eq!(config.registry_address, admin);
        assert_eq!(config.fee_recipient, admin);
        assert_eq!(config.protocol_fee_bps, 100);
        assert_eq!(config.registry_fee_policy, FeePolicy::Live);
        assert_eq!(config.ledger_fee_policy, FeePolicy::Live);
        assert_eq!(config.penalty, PenaltyPolicy::Fixed(750));
        assert!(config.validate().is_ok());
        assert_eq!(args.log_level, Level::INFO);
        assert_eq!(args.log_format, LogFormat::Pretty);
    }

    #[test]
    fn log_flags_parse() {
        let cli = TimeVaultCli::try_parse_from([
            "timevault-node",
            "run",
            "--admin",
            "0x00000000000000000000000000000000000000a0",
            "--log-level",
            "debug",
            "--log-format",
            "json",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run subcommand");
        };
        assert_eq!(args.log_level, Level::DEBUG);
        assert_eq!(args.log_format, LogFormat::Json);

        assert!(TimeVaultCli::try_parse_from([
            "timevault-node",
            "run",
            "--admin",
            "0x00000000000000000000000000000000000000a0",
            "--log-format",
            "xml",
        ])
        .is_err());
    }

    #[test]
    fn bad_admin_is_rejected() {
        let result = TimeVaultCli::try_parse_from(["timevault-node", "run", "--admin", "0x12"]);
        assert!(result.is_err());
    }
}
