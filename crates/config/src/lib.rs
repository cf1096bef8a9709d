//! Configuration for OracleNet
//!
//! A single YAML master config describes the network metadata, the protocol
//! parameters (staking, consensus, incentives), the served assets, and the
//! process-level settings (server, logging, storage).
//!
//! ```yaml
//! network:
//!   name: OracleNet
//!   description: Staked price oracle network
//!   version: 1.0.0
//! protocol:
//!   staking:
//!     min_stake_amount: 100000000
//!   consensus:
//!     min_quorum: 3
//!     max_deviation_fraction: 0.1
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub mod defaults;
pub mod parser;
pub mod substitution;
pub mod validator;

pub use defaults::*;
pub use parser::*;
pub use substitution::*;
pub use validator::*;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MasterConfig {
    pub network: NetworkConfig,
    #[serde(default)]
    pub protocol: ProtocolConfig,
    #[serde(default)]
    pub assets: Vec<AssetConfig>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
    pub name: String,
    pub description: String,
    pub version: String,
}

/// Protocol parameters of the oracle network state machine
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ProtocolConfig {
    #[serde(default)]
    pub staking: StakingConfig,
    #[serde(default)]
    pub consensus: ConsensusConfig,
    #[serde(default)]
    pub incentives: IncentiveConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StakingConfig {
    /// Minimum locked stake (base units) to register and stay active
    #[serde(default = "default_min_stake_amount")]
    pub min_stake_amount: u64,
    /// Upper bound on an oracle's declared commission fraction
    #[serde(default = "default_max_commission")]
    pub max_commission: Decimal,
    /// Delay between deregistration and stake release
    #[serde(default = "default_exit_cooldown_seconds")]
    pub exit_cooldown_seconds: u64,
    /// Where slashed stake goes
    #[serde(default)]
    pub slash_beneficiary: SlashBeneficiary,
}

impl Default for StakingConfig {
    fn default() -> Self {
        Self {
            min_stake_amount: default_min_stake_amount(),
            max_commission: default_max_commission(),
            exit_cooldown_seconds: default_exit_cooldown_seconds(),
            slash_beneficiary: SlashBeneficiary::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlashBeneficiary {
    /// Slashed stake funds rewards for honest reporters
    #[default]
    RewardPool,
    /// Slashed stake is retained by the protocol treasury
    Treasury,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ConsensusConfig {
    /// Minimum surviving reports required to publish a value
    #[serde(default = "default_min_quorum")]
    pub min_quorum: usize,
    /// Report count that closes a round early (defaults to `min_quorum`)
    #[serde(default)]
    pub reports_to_close: Option<usize>,
    /// Time after the first report at which a round closes regardless of count
    #[serde(default = "default_round_duration_seconds")]
    pub round_duration_seconds: u64,
    /// Maximum relative distance from the median before a report is an outlier
    #[serde(default = "default_max_deviation_fraction")]
    pub max_deviation_fraction: Decimal,
    /// Maximum share of reports that may be discarded as outliers
    #[serde(default = "default_max_outlier_fraction")]
    pub max_outlier_fraction: Decimal,
    /// Cap on any single reporter's normalized stake weight
    #[serde(default = "default_max_single_weight")]
    pub max_single_weight: Decimal,
    /// Finalized rounds kept per asset
    #[serde(default = "default_round_retention")]
    pub round_retention: usize,
}

impl ConsensusConfig {
    /// Effective early-close threshold
    pub fn close_threshold(&self) -> usize {
        self.reports_to_close.unwrap_or(self.min_quorum).max(1)
    }
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            min_quorum: default_min_quorum(),
            reports_to_close: None,
            round_duration_seconds: default_round_duration_seconds(),
            max_deviation_fraction: default_max_deviation_fraction(),
            max_outlier_fraction: default_max_outlier_fraction(),
            max_single_weight: default_max_single_weight(),
            round_retention: default_round_retention(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct IncentiveConfig {
    /// Minimum fee (base units) to fund a feed update
    #[serde(default = "default_request_fee")]
    pub request_fee: u64,
    /// EWMA smoothing factor for reputation
    #[serde(default = "default_reputation_alpha")]
    pub reputation_alpha: Decimal,
    /// Reputation assigned at registration
    #[serde(default = "default_neutral_reputation")]
    pub neutral_reputation: Decimal,
    /// Reputation deducted per outlier report
    #[serde(default = "default_outlier_penalty")]
    pub outlier_penalty: Decimal,
    /// Outlier rate over the trailing window above which stake is slashed
    #[serde(default = "default_slash_threshold")]
    pub slash_threshold: Decimal,
    /// Number of trailing participations used for the outlier rate
    #[serde(default = "default_slash_window")]
    pub slash_window: usize,
    /// Fraction of locked stake removed per slash
    #[serde(default = "default_slash_fraction")]
    pub slash_fraction: Decimal,
    /// Consecutive missed rounds before reputation starts to decay
    #[serde(default = "default_missed_rounds_limit")]
    pub missed_rounds_limit: u32,
    /// Multiplicative reputation decay per missed round past the limit
    #[serde(default = "default_missed_round_decay")]
    pub missed_round_decay: Decimal,
    /// Reputation below which an oracle is suspended
    #[serde(default = "default_suspension_floor")]
    pub suspension_floor: Decimal,
    /// Round records kept per oracle
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

impl Default for IncentiveConfig {
    fn default() -> Self {
        Self {
            request_fee: default_request_fee(),
            reputation_alpha: default_reputation_alpha(),
            neutral_reputation: default_neutral_reputation(),
            outlier_penalty: default_outlier_penalty(),
            slash_threshold: default_slash_threshold(),
            slash_window: default_slash_window(),
            slash_fraction: default_slash_fraction(),
            missed_rounds_limit: default_missed_rounds_limit(),
            missed_round_decay: default_missed_round_decay(),
            suspension_floor: default_suspension_floor(),
            history_window: default_history_window(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssetConfig {
    pub symbol: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
            metrics_port: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// One of: pretty, json, compact
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StorageConfig {
    /// JSON snapshot loaded on start and written on shutdown
    #[serde(default)]
    pub snapshot_path: Option<String>,
}
