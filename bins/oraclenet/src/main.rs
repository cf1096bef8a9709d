//! OracleNet CLI and Server Binary
//!
//! Entry point for initializing and validating configuration, running the
//! network as an HTTP service, and running seeded simulations.

mod simulate;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Cli, Commands};
use config::{
    generate_default_config, load_config, save_config, validate_config, MasterConfig, ProtocolConfig,
};
use observability::{init_logging, init_metrics, LogFormat};
use oracle_network::api::{create_router, ApiState};
use oracle_network::{create_store, OracleNetwork, StateStore};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// How often the service finalizes rounds whose deadline has passed
const EXPIRY_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    let format = resolve_log_format(&cli);
    init_logging("oraclenet", format)?;
    debug!(?cli, "CLI arguments parsed");

    match cli.command {
        Commands::Init { output } => {
            info!("Executing 'init' command");
            init_command(output).await
        }
        Commands::Validate { config } => {
            info!("Executing 'validate' command");
            validate_command(config).await
        }
        Commands::Serve {
            config,
            host,
            port,
            metrics_port,
            snapshot,
        } => {
            info!("Executing 'serve' command");
            serve_command(config, host, port, metrics_port, snapshot).await
        }
        Commands::Simulate {
            config,
            oracles,
            rounds,
            seed,
            asset,
        } => {
            info!("Executing 'simulate' command");
            let protocol = match config {
                Some(path) => load_config(&path)?.protocol,
                None => ProtocolConfig::default(),
            };
            let options = simulate::SimulationOptions {
                oracles,
                rounds,
                seed,
                asset,
            };
            let report = simulate::run(protocol, &options)?;
            simulate::print_report(&report);
            Ok(())
        }
    }
}

/// `--log-format` wins, then the config file's `logging.format`, then pretty
fn resolve_log_format(cli: &Cli) -> LogFormat {
    if let Some(format) = cli.log_format.as_deref().and_then(LogFormat::parse) {
        return format;
    }

    let config_path: Option<&Path> = match &cli.command {
        Commands::Validate { config } | Commands::Serve { config, .. } => Some(config.as_path()),
        Commands::Simulate { config, .. } => config.as_deref(),
        Commands::Init { .. } => None,
    };

    config_path
        .and_then(|path| std::fs::read_to_string(path).ok())
        .and_then(|content| config::parse_config(&content).ok())
        .and_then(|config| LogFormat::parse(&config.logging.format))
        .unwrap_or_default()
}

/// Load a config and refuse to continue past validation errors
fn load_valid_config(path: &Path) -> Result<MasterConfig> {
    let config = load_config(path)?;
    let report = validate_config(&config);

    if !report.warnings.is_empty() {
        warn!("Configuration warnings:");
        for warning in &report.warnings {
            warn!(field = %warning.field, message = %warning.message);
        }
    }

    if !report.is_valid() {
        error!(
            error_count = report.errors.len(),
            "Configuration validation failed"
        );
        for err in &report.errors {
            error!("{}", err);
        }
        anyhow::bail!("Cannot start network due to configuration errors");
    }

    Ok(config)
}

/// Cancelled on Ctrl+C
fn shutdown_signal() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, initiating graceful shutdown...");
                trigger.cancel();
            }
            Err(e) => {
                warn!("Failed to listen for Ctrl+C: {}", e);
            }
        }
    });

    token
}

async fn restore_network(config: &MasterConfig, store: &dyn StateStore) -> Result<OracleNetwork> {
    let snapshot = store
        .load()
        .await
        .with_context(|| format!("Failed to load snapshot from {} store", store.backend()))?;

    match snapshot {
        Some(snapshot) => {
            let network = OracleNetwork::from_snapshot(config.protocol.clone(), snapshot)
                .context("Snapshot failed consistency checks")?;
            Ok(network.restrict_to(config))
        }
        None => {
            info!("No snapshot found, starting from genesis");
            Ok(OracleNetwork::from_master(config))
        }
    }
}

async fn serve_command(
    config_path: PathBuf,
    host_override: Option<String>,
    port_override: Option<u16>,
    metrics_port_override: Option<u16>,
    snapshot_override: Option<PathBuf>,
) -> Result<()> {
    let config = load_valid_config(&config_path)?;

    let host = host_override.unwrap_or_else(|| config.server.host.clone());
    let port = port_override.unwrap_or(config.server.http_port);
    let metrics_port = metrics_port_override.or(config.server.metrics_port);
    let snapshot_path = snapshot_override
        .map(|p| p.to_string_lossy().into_owned())
        .or_else(|| config.storage.snapshot_path.clone());

    if let Some(metrics_port) = metrics_port {
        init_metrics(&host, metrics_port)?;
    }

    let store = create_store(snapshot_path.as_deref());
    let network = restore_network(&config, store.as_ref()).await?;
    let network = Arc::new(RwLock::new(network));

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", host, port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(
        network = %config.network.name,
        %addr,
        metrics_port,
        store = store.backend(),
        "OracleNet listening"
    );

    let shutdown = shutdown_signal();
    let sweeper = tokio::spawn(expiry_sweeper(network.clone(), shutdown.child_token()));

    let router = create_router(ApiState::new(network.clone()));
    let server_token = shutdown.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { server_token.cancelled().await })
        .await
        .context("HTTP server error")?;

    shutdown.cancel();
    if let Err(e) = sweeper.await {
        warn!(error = %e, "Expiry sweeper task failed");
    }

    let snapshot = network.read().await.snapshot();
    store
        .save(&snapshot)
        .await
        .with_context(|| format!("Failed to save snapshot to {} store", store.backend()))?;
    info!(events = snapshot.events.len(), "Snapshot saved, shutdown complete");

    Ok(())
}

/// Periodically finalize rounds past their deadline until cancelled
async fn expiry_sweeper(network: Arc<RwLock<OracleNetwork>>, token: CancellationToken) {
    let mut ticker = tokio::time::interval(EXPIRY_SWEEP_INTERVAL);

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                debug!("Expiry sweeper stopping");
                break;
            }
            _ = ticker.tick() => {
                let outcomes = network.write().await.close_expired_rounds(Utc::now());
                for outcome in &outcomes {
                    debug!(
                        asset = %outcome.asset,
                        round = %outcome.round,
                        status = ?outcome.status,
                        "Round finalized by deadline"
                    );
                }
            }
        }
    }
}

async fn validate_command<P: AsRef<Path>>(config_path: P) -> Result<()> {
    info!(path = ?config_path.as_ref(), "Validating configuration");

    let config = match load_config(&config_path) {
        Ok(c) => c,
        Err(e) => {
            error!(%e, "Failed to load configuration");
            anyhow::bail!(e);
        }
    };

    let report = validate_config(&config);

    println!("\n=== Configuration Validation Report ===\n");

    if !report.defaults_applied.is_empty() {
        println!("Defaults Applied ({}):", report.defaults_applied.len());
        for default in &report.defaults_applied {
            println!("  [info] {} = {}", default.field, default.value);
        }
        println!();
    }

    if !report.warnings.is_empty() {
        println!("Warnings ({}):", report.warnings.len());
        for warning in &report.warnings {
            println!("  [warn] [{}] {}", warning.field, warning.message);
        }
        println!();
    }

    if !report.errors.is_empty() {
        println!("Errors ({}):", report.errors.len());
        for err in &report.errors {
            println!("  [error] {}", err);
        }
        println!();
        anyhow::bail!("Configuration validation failed");
    }

    let protocol = &config.protocol;
    let enabled = config.assets.iter().filter(|a| a.enabled).count();

    println!("[ok] Configuration is valid!");
    println!();
    println!("Network: {}", config.network.name);
    println!("Version: {}", config.network.version);
    println!("Enabled Assets: {} of {}", enabled, config.assets.len());
    println!("Minimum Stake: {}", protocol.staking.min_stake_amount);
    println!(
        "Quorum: {} (closes at {} reports)",
        protocol.consensus.min_quorum,
        protocol.consensus.close_threshold()
    );
    println!(
        "Round Duration: {}s",
        protocol.consensus.round_duration_seconds
    );

    Ok(())
}

async fn init_command<P: AsRef<Path>>(output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    info!(?output_path, "Initializing new configuration file");

    let config = generate_default_config();

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }

    save_config(&config, output_path)?;

    println!("[ok] Configuration file created successfully!");
    println!();
    println!("Location: {:?}", output_path);
    println!();
    println!("This configuration includes:");
    println!("  - Network metadata (name, description, version)");
    println!("  - {} enabled asset feeds", config.assets.len());
    println!("  - Staking, consensus and incentive parameters");
    println!();
    println!("Next steps:");
    println!("  1. Edit the configuration file to tune protocol parameters");
    println!(
        "  2. Run 'oraclenet validate --config {:?}' to check configuration",
        output_path
    );
    println!(
        "  3. Run 'oraclenet serve --config {:?}' to start the network",
        output_path
    );

    Ok(())
}
