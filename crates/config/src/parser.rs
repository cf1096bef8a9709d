use crate::*;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

#[instrument(skip(path))]
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<MasterConfig> {
    let path = path.as_ref();
    info!("Loading configuration from: {:?}", path);

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    debug!("Config file content length: {} bytes", content.len());

    let substituted = substitution::substitute_env_vars(&content)?;
    if substitution::has_unresolved_env_vars(&substituted) {
        warn!("Configuration still contains unresolved environment variables");
    }

    let config = parse_config(&substituted)?;

    info!(
        network = %config.network.name,
        assets = config.assets.len(),
        "Configuration loaded successfully"
    );
    Ok(config)
}

/// Parse a YAML document into a [`MasterConfig`]
pub fn parse_config(content: &str) -> Result<MasterConfig> {
    serde_yaml::from_str(content).with_context(|| "Failed to parse YAML configuration")
}

#[instrument]
pub fn generate_default_config() -> MasterConfig {
    MasterConfig {
        network: NetworkConfig {
            name: "OracleNet".to_string(),
            description: "A staked, reputation-weighted price oracle network".to_string(),
            version: "1.0.0".to_string(),
        },
        protocol: ProtocolConfig::default(),
        assets: vec![
            AssetConfig {
                symbol: "ETH/USD".to_string(),
                description: "Ether in US dollars".to_string(),
                enabled: true,
            },
            AssetConfig {
                symbol: "BTC/USD".to_string(),
                description: "Bitcoin in US dollars".to_string(),
                enabled: true,
            },
        ],
        server: ServerConfig::default(),
        logging: LoggingConfig::default(),
        storage: StorageConfig::default(),
    }
}

#[instrument(skip(config))]
pub fn save_config<P: AsRef<Path> + std::fmt::Debug>(config: &MasterConfig, path: P) -> Result<()> {
    let path = path.as_ref();
    info!("Saving configuration to: {:?}", path);

    let yaml = serde_yaml::to_string(config)
        .with_context(|| "Failed to serialize configuration to YAML")?;

    fs::write(path, yaml).with_context(|| format!("Failed to write config file: {:?}", path))?;

    info!("Configuration saved successfully");
    Ok(())
}
