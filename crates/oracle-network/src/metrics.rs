//! Network metrics
//!
//! Thin wrappers over the `metrics` facade. Without an installed recorder
//! (see `observability::init_metrics`) every call is a no-op.

use common::AssetId;
use metrics::{counter, gauge};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::ErrorKind;
use crate::types::RoundStatus;

pub fn report_accepted(asset: &AssetId) {
    counter!("oracle_reports_total", "asset" => asset.to_string()).increment(1);
}

pub fn report_rejected(kind: ErrorKind) {
    counter!("oracle_report_rejections_total", "kind" => kind.to_string()).increment(1);
}

pub fn round_finalized(asset: &AssetId, status: RoundStatus) {
    let outcome = match status {
        RoundStatus::Closed => "closed",
        RoundStatus::Expired => "expired",
        RoundStatus::Open => "open",
    };
    counter!(
        "oracle_rounds_finalized_total",
        "asset" => asset.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn consensus_published(asset: &AssetId, value: Decimal) {
    gauge!("oracle_consensus_value", "asset" => asset.to_string())
        .set(value.to_f64().unwrap_or(0.0));
}

pub fn oracle_slashed(amount: u64) {
    counter!("oracle_slashes_total").increment(1);
    counter!("oracle_slashed_amount_total").increment(amount);
}

pub fn rewards_paid(amount: u64) {
    counter!("oracle_rewards_paid_total").increment(amount);
}

pub fn asset_halted(asset: &AssetId) {
    counter!("oracle_asset_halts_total", "asset" => asset.to_string()).increment(1);
}

pub fn network_gauges(active_oracles: usize, total_value_locked: u64, reward_pool: u64) {
    gauge!("oracle_active_oracles").set(active_oracles as f64);
    gauge!("oracle_total_value_locked").set(total_value_locked as f64);
    gauge!("oracle_reward_pool_balance").set(reward_pool as f64);
}
