use crate::*;
use regex::Regex;
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Network name is required")]
    MissingNetworkName,

    #[error("Invalid version format: {0}. Must be in format X.Y.Z (e.g., 1.0.0)")]
    InvalidVersionFormat(String),

    #[error("Asset {symbol}: {message}")]
    InvalidAsset { symbol: String, message: String },

    #[error("Duplicate asset symbol '{0}'")]
    DuplicateAsset(String),

    #[error("{field} must be a positive integer")]
    InvalidPositiveInteger { field: String },

    #[error("{field} must be a fraction between 0 and 1, got {value}")]
    InvalidFraction { field: String, value: Decimal },

    #[error("Consensus: {message}")]
    InvalidConsensus { message: String },

    #[error("Incentives: {message}")]
    InvalidIncentives { message: String },

    #[error("Invalid log format: {0}. Must be one of: pretty, json, compact")]
    InvalidLogFormat(String),

    #[error("Server: {message}")]
    InvalidServer { message: String },

    #[error("Environment variable placeholder left unresolved in {field}")]
    UnresolvedEnvVar { field: String },
}

#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct DefaultApplied {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    pub defaults_applied: Vec<DefaultApplied>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
            defaults_applied: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, field: &str, message: &str) {
        self.warnings.push(ValidationWarning {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn add_default(&mut self, field: &str, value: &str) {
        self.defaults_applied.push(DefaultApplied {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

pub fn validate_config(config: &MasterConfig) -> ValidationReport {
    let mut report = ValidationReport::new();

    validate_network(&config.network, &mut report);
    validate_staking(&config.protocol.staking, &mut report);
    validate_consensus(&config.protocol.consensus, &mut report);
    validate_incentives(&config.protocol.incentives, &mut report);
    validate_assets(&config.assets, &mut report);
    validate_server(&config.server, &mut report);
    validate_logging(&config.logging, &mut report);

    if let Some(path) = &config.storage.snapshot_path {
        if has_unresolved_env_vars(path) {
            report.add_error(ValidationError::UnresolvedEnvVar {
                field: "storage.snapshot_path".to_string(),
            });
        }
    }

    report
}

fn validate_network(network: &NetworkConfig, report: &mut ValidationReport) {
    if network.name.trim().is_empty() {
        report.add_error(ValidationError::MissingNetworkName);
    }

    if network.description.trim().is_empty() {
        report.add_warning("network.description", "Network description is empty");
    }

    let version_ok = Regex::new(r"^\d+\.\d+\.\d+$")
        .map(|re| re.is_match(&network.version))
        .unwrap_or(false);
    if !version_ok {
        report.add_error(ValidationError::InvalidVersionFormat(network.version.clone()));
    }
}

fn check_fraction(field: &str, value: Decimal, report: &mut ValidationReport) -> bool {
    if value < Decimal::ZERO || value > Decimal::ONE {
        report.add_error(ValidationError::InvalidFraction {
            field: field.to_string(),
            value,
        });
        return false;
    }
    true
}

fn validate_staking(staking: &StakingConfig, report: &mut ValidationReport) {
    if staking.min_stake_amount == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "protocol.staking.min_stake_amount".to_string(),
        });
    }

    check_fraction("protocol.staking.max_commission", staking.max_commission, report);

    if staking.exit_cooldown_seconds == 0 {
        report.add_warning(
            "protocol.staking.exit_cooldown_seconds",
            "Zero exit cooldown lets an oracle withdraw immediately after deregistering",
        );
    }
}

fn validate_consensus(consensus: &ConsensusConfig, report: &mut ValidationReport) {
    if consensus.min_quorum == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "protocol.consensus.min_quorum".to_string(),
        });
    }

    match consensus.reports_to_close {
        None => report.add_default(
            "protocol.consensus.reports_to_close",
            &consensus.min_quorum.to_string(),
        ),
        Some(n) if n < consensus.min_quorum => {
            report.add_error(ValidationError::InvalidConsensus {
                message: format!(
                    "reports_to_close ({}) must be at least min_quorum ({})",
                    n, consensus.min_quorum
                ),
            });
        }
        Some(_) => {}
    }

    if consensus.round_duration_seconds == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "protocol.consensus.round_duration_seconds".to_string(),
        });
    }

    if consensus.round_retention == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "protocol.consensus.round_retention".to_string(),
        });
    }

    if check_fraction(
        "protocol.consensus.max_deviation_fraction",
        consensus.max_deviation_fraction,
        report,
    ) && consensus.max_deviation_fraction.is_zero()
    {
        report.add_warning(
            "protocol.consensus.max_deviation_fraction",
            "Zero deviation tolerance discards every report that differs from the median",
        );
    }

    check_fraction(
        "protocol.consensus.max_outlier_fraction",
        consensus.max_outlier_fraction,
        report,
    );

    if check_fraction(
        "protocol.consensus.max_single_weight",
        consensus.max_single_weight,
        report,
    ) {
        if consensus.max_single_weight.is_zero() {
            report.add_error(ValidationError::InvalidConsensus {
                message: "max_single_weight must be greater than zero".to_string(),
            });
        } else if consensus.max_single_weight * Decimal::from(consensus.min_quorum) < Decimal::ONE
        {
            report.add_warning(
                "protocol.consensus.max_single_weight",
                "Weight cap cannot be met at quorum size; small rounds fall back to equal weights",
            );
        }
    }
}

fn validate_incentives(incentives: &IncentiveConfig, report: &mut ValidationReport) {
    if incentives.request_fee == 0 {
        report.add_warning(
            "protocol.incentives.request_fee",
            "Zero request fee allows unfunded feed requests",
        );
    }

    if check_fraction(
        "protocol.incentives.reputation_alpha",
        incentives.reputation_alpha,
        report,
    ) && incentives.reputation_alpha.is_zero()
    {
        report.add_error(ValidationError::InvalidIncentives {
            message: "reputation_alpha must be greater than zero".to_string(),
        });
    }

    check_fraction(
        "protocol.incentives.neutral_reputation",
        incentives.neutral_reputation,
        report,
    );
    check_fraction("protocol.incentives.outlier_penalty", incentives.outlier_penalty, report);
    check_fraction("protocol.incentives.slash_threshold", incentives.slash_threshold, report);
    check_fraction("protocol.incentives.slash_fraction", incentives.slash_fraction, report);
    check_fraction(
        "protocol.incentives.missed_round_decay",
        incentives.missed_round_decay,
        report,
    );
    check_fraction(
        "protocol.incentives.suspension_floor",
        incentives.suspension_floor,
        report,
    );

    if incentives.slash_window == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "protocol.incentives.slash_window".to_string(),
        });
    }

    if incentives.history_window < incentives.slash_window {
        report.add_error(ValidationError::InvalidIncentives {
            message: format!(
                "history_window ({}) must cover slash_window ({})",
                incentives.history_window, incentives.slash_window
            ),
        });
    }

    if incentives.missed_rounds_limit == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "protocol.incentives.missed_rounds_limit".to_string(),
        });
    }

    if incentives.neutral_reputation < incentives.suspension_floor {
        report.add_error(ValidationError::InvalidIncentives {
            message: "neutral_reputation is below suspension_floor; new oracles would be suspended"
                .to_string(),
        });
    }
}

fn validate_assets(assets: &[AssetConfig], report: &mut ValidationReport) {
    if assets.is_empty() {
        report.add_warning(
            "assets",
            "No assets configured; feeds are created on first report",
        );
        return;
    }

    let symbol_regex = Regex::new(r"^[A-Za-z0-9./_-]+$").ok();
    let mut seen = BTreeSet::new();

    for asset in assets {
        let valid = symbol_regex
            .as_ref()
            .map(|re| re.is_match(asset.symbol.trim()))
            .unwrap_or(false);
        if !valid {
            report.add_error(ValidationError::InvalidAsset {
                symbol: asset.symbol.clone(),
                message: "symbol must be non-empty and contain only A-Z, 0-9, '/', '-', '_', '.'"
                    .to_string(),
            });
            continue;
        }

        let normalized = asset.symbol.trim().to_uppercase();
        if !seen.insert(normalized.clone()) {
            report.add_error(ValidationError::DuplicateAsset(normalized));
        }
    }

    if !assets.iter().any(|a| a.enabled) {
        report.add_warning("assets", "All configured assets are disabled");
    }
}

fn validate_server(server: &ServerConfig, report: &mut ValidationReport) {
    if server.host.trim().is_empty() {
        report.add_error(ValidationError::InvalidServer {
            message: "host must not be empty".to_string(),
        });
    }

    if server.http_port == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "server.http_port".to_string(),
        });
    }

    if server.metrics_port == Some(server.http_port) {
        report.add_error(ValidationError::InvalidServer {
            message: format!(
                "metrics_port and http_port must differ (both {})",
                server.http_port
            ),
        });
    }
}

fn validate_logging(logging: &LoggingConfig, report: &mut ValidationReport) {
    let valid_formats = ["pretty", "json", "compact"];
    if !valid_formats.contains(&logging.format.as_str()) {
        report.add_error(ValidationError::InvalidLogFormat(logging.format.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults_valid_with_reports_to_close_default() {
        let report = validate_config(&generate_default_config());
        assert!(report.is_valid());
        assert!(report
            .defaults_applied
            .iter()
            .any(|d| d.field == "protocol.consensus.reports_to_close" && d.value == "3"));
    }

    #[test]
    fn test_bad_version_rejected() {
        let mut config = generate_default_config();
        config.network.version = "v1".to_string();
        let report = validate_config(&config);
        assert_matches!(
            report.errors.as_slice(),
            [ValidationError::InvalidVersionFormat(v)] if v == "v1"
        );
    }

    #[test]
    fn test_fraction_out_of_range() {
        let mut config = generate_default_config();
        config.protocol.consensus.max_deviation_fraction = dec!(1.5);
        let report = validate_config(&config);
        assert!(!report.is_valid());
        assert_matches!(
            &report.errors[0],
            ValidationError::InvalidFraction { field, .. }
                if field == "protocol.consensus.max_deviation_fraction"
        );
    }

    #[test]
    fn test_reports_to_close_below_quorum() {
        let mut config = generate_default_config();
        config.protocol.consensus.reports_to_close = Some(2);
        let report = validate_config(&config);
        assert_matches!(&report.errors[0], ValidationError::InvalidConsensus { .. });
    }

    #[test]
    fn test_duplicate_assets_after_normalization() {
        let mut config = generate_default_config();
        config.assets.push(AssetConfig {
            symbol: "eth/usd".to_string(),
            description: String::new(),
            enabled: true,
        });
        let report = validate_config(&config);
        assert_matches!(
            report.errors.as_slice(),
            [ValidationError::DuplicateAsset(s)] if s == "ETH/USD"
        );
    }

    #[test]
    fn test_infeasible_cap_is_warning_only() {
        let cap_warned = |report: &ValidationReport| {
            report
                .warnings
                .iter()
                .any(|w| w.field == "protocol.consensus.max_single_weight")
        };

        let mut config = generate_default_config();
        config.protocol.consensus.min_quorum = 4;
        let report = validate_config(&config);
        assert!(report.is_valid());
        assert!(!cap_warned(&report));

        config.protocol.consensus.max_single_weight = dec!(0.2);
        let report = validate_config(&config);
        assert!(report.is_valid());
        assert!(cap_warned(&report));
    }

    #[test]
    fn test_history_must_cover_slash_window() {
        let mut config = generate_default_config();
        config.protocol.incentives.history_window = 5;
        let report = validate_config(&config);
        assert_matches!(&report.errors[0], ValidationError::InvalidIncentives { .. });
    }

    #[test]
    fn test_port_collision() {
        let mut config = generate_default_config();
        config.server.metrics_port = Some(config.server.http_port);
        let report = validate_config(&config);
        assert_matches!(&report.errors[0], ValidationError::InvalidServer { .. });
    }
}
