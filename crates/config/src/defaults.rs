use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub fn default_enabled() -> bool {
    true
}

// Staking defaults
pub fn default_min_stake_amount() -> u64 {
    // 100 tokens at 6 decimals
    100_000_000
}

pub fn default_max_commission() -> Decimal {
    dec!(0.5)
}

pub fn default_exit_cooldown_seconds() -> u64 {
    86_400
}

// Consensus defaults
pub fn default_min_quorum() -> usize {
    3
}

pub fn default_round_duration_seconds() -> u64 {
    60
}

pub fn default_max_deviation_fraction() -> Decimal {
    dec!(0.1)
}

pub fn default_max_outlier_fraction() -> Decimal {
    dec!(0.34)
}

pub fn default_max_single_weight() -> Decimal {
    dec!(0.25)
}

pub fn default_round_retention() -> usize {
    100
}

// Incentive defaults
pub fn default_request_fee() -> u64 {
    // 0.1 token
    100_000
}

pub fn default_reputation_alpha() -> Decimal {
    dec!(0.2)
}

pub fn default_neutral_reputation() -> Decimal {
    dec!(0.5)
}

pub fn default_outlier_penalty() -> Decimal {
    dec!(0.05)
}

pub fn default_slash_threshold() -> Decimal {
    dec!(0.4)
}

pub fn default_slash_window() -> usize {
    10
}

pub fn default_slash_fraction() -> Decimal {
    dec!(0.1)
}

pub fn default_missed_rounds_limit() -> u32 {
    5
}

pub fn default_missed_round_decay() -> Decimal {
    dec!(0.1)
}

pub fn default_suspension_floor() -> Decimal {
    dec!(0.2)
}

pub fn default_history_window() -> usize {
    100
}

// Deployment defaults
pub fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub fn default_http_port() -> u16 {
    8080
}

pub fn default_log_format() -> String {
    "pretty".to_string()
}
