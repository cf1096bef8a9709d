use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "oraclenet")]
#[command(about = "OracleNet - A staked price oracle network")]
#[command(version = "0.1.0")]
pub struct Cli {
    /// Log output format (pretty, json, compact); defaults to the config value
    #[arg(long, global = true, env = "ORACLENET_LOG_FORMAT")]
    pub log_format: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new configuration file with all defaults
    Init {
        /// Output path for the new configuration file
        #[arg(short, long, default_value = "oracle_network.yaml")]
        output: PathBuf,
    },

    /// Validate configuration without starting the network
    Validate {
        /// Path to the configuration file
        #[arg(short, long, default_value = "oracle_network.yaml")]
        config: PathBuf,
    },

    /// Run the network as an HTTP service
    Serve {
        /// Path to the configuration file
        #[arg(short, long, default_value = "oracle_network.yaml")]
        config: PathBuf,

        /// Override the bind host
        #[arg(long)]
        host: Option<String>,

        /// Override the HTTP port
        #[arg(long)]
        port: Option<u16>,

        /// Expose Prometheus metrics on this port
        #[arg(long)]
        metrics_port: Option<u16>,

        /// Override the snapshot file loaded on start and saved on shutdown
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },

    /// Run a seeded in-process simulation and print the resulting statistics
    Simulate {
        /// Optional configuration file; protocol defaults otherwise
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of oracles to register
        #[arg(long, default_value_t = 7)]
        oracles: usize,

        /// Number of report rounds to run
        #[arg(long, default_value_t = 20)]
        rounds: u64,

        /// RNG seed
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Asset pair to report on
        #[arg(long, default_value = "ETH/USD")]
        asset: String,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_overrides() {
        let cli = Cli::try_parse_from([
            "oraclenet",
            "--log-format",
            "json",
            "serve",
            "--port",
            "9000",
            "--snapshot",
            "state.json",
        ])
        .unwrap();

        assert_eq!(cli.log_format.as_deref(), Some("json"));
        match cli.command {
            Commands::Serve {
                config,
                port,
                snapshot,
                host,
                metrics_port,
            } => {
                assert_eq!(config, PathBuf::from("oracle_network.yaml"));
                assert_eq!(port, Some(9000));
                assert_eq!(snapshot, Some(PathBuf::from("state.json")));
                assert!(host.is_none());
                assert!(metrics_port.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_simulate_defaults() {
        let cli = Cli::try_parse_from(["oraclenet", "simulate"]).unwrap();
        match cli.command {
            Commands::Simulate {
                config,
                oracles,
                rounds,
                seed,
                asset,
            } => {
                assert!(config.is_none());
                assert_eq!(oracles, 7);
                assert_eq!(rounds, 20);
                assert_eq!(seed, 42);
                assert_eq!(asset, "ETH/USD");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(Cli::try_parse_from(["oraclenet", "start"]).is_err());
    }
}
