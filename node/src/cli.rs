//! # CLI Interface
//!
//! Command-line arguments for `linkchain-node`, built with `clap` derive.
//! Every `run` option can also come from the environment (`HTTP_PORT`,
//! `P2P_PORT`, `PEERS`, ...), so a node can be configured either way.

use std::net::{IpAddr, Ipv4Addr};

use clap::{Parser, Subcommand};

use linkchain_protocol::config;

use crate::logging::LogFormat;

/// linkchain ledger node.
///
/// Keeps a hash-linked chain in memory, syncs it with peers over TCP, and
/// serves an HTTP API for listing blocks, mining, and managing peers.
#[derive(Parser, Debug)]
#[command(
    name = "linkchain-node",
    about = "linkchain ledger node",
    version,
    propagate_version = true
)]
pub struct LinkchainCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the node.
    Run(RunArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Address both listeners bind to.
    #[arg(long, env = "BIND_ADDR", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind: IpAddr,

    /// Port for the HTTP API.
    #[arg(long, env = "HTTP_PORT", default_value_t = config::DEFAULT_HTTP_PORT)]
    pub http_port: u16,

    /// Port for peer-to-peer connections.
    #[arg(long, env = "P2P_PORT", default_value_t = config::DEFAULT_P2P_PORT)]
    pub p2p_port: u16,

    /// Peers to connect to at startup, as comma-separated `host:port` pairs.
    #[arg(long, env = "PEERS", value_delimiter = ',')]
    pub peers: Vec<String>,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl RunArgs {
    /// Configured peers with blanks removed (`PEERS=""` yields none).
    pub fn initial_peers(&self) -> Vec<String> {
        self.peers
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        // Ensures the derive macros produce a valid CLI definition.
        LinkchainCli::command().debug_assert();
    }

    #[test]
    fn run_parses_explicit_arguments() {
        let cli = LinkchainCli::try_parse_from([
            "linkchain-node",
            "run",
            "--http-port",
            "4001",
            "--p2p-port",
            "7001",
            "--peers",
            "10.0.0.1:6001,10.0.0.2:6001",
            "--log-format",
            "json",
        ])
        .expect("valid arguments");

        let Commands::Run(args) = cli.command else {
            panic!("expected run subcommand");
        };
        assert_eq!(args.http_port, 4001);
        assert_eq!(args.p2p_port, 7001);
        assert_eq!(args.log_format, LogFormat::Json);
        assert_eq!(
            args.initial_peers(),
            vec!["10.0.0.1:6001".to_string(), "10.0.0.2:6001".to_string()]
        );
    }

    #[test]
    fn blank_peers_are_dropped() {
        let cli = LinkchainCli::try_parse_from(["linkchain-node", "run", "--peers", " , a:1,"])
            .expect("valid arguments");
        let Commands::Run(args) = cli.command else {
            panic!("expected run subcommand");
        };
        assert_eq!(args.initial_peers(), vec!["a:1".to_string()]);
    }

    #[test]
    fn rejects_unknown_log_format() {
        let result =
            LinkchainCli::try_parse_from(["linkchain-node", "run", "--log-format", "xml"]);
        assert!(result.is_err());
    }
}
