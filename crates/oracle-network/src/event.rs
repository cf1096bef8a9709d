//! Event types for the oracle network
//!
//! Every state transition that outside observers care about appends exactly
//! one event to the log.

use chrono::{DateTime, Utc};
use common::{Amount, AssetId, OracleId, RoundId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use staking::Beneficiary;

use crate::types::{RoundFailure, SuspensionReason};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NetworkEvent {
    OracleRegistered {
        oracle: OracleId,
        endpoint: String,
        stake: Amount,
        commission: Decimal,
    },

    PriceReported {
        asset: AssetId,
        round: RoundId,
        oracle: OracleId,
        value: Decimal,
        confidence: Decimal,
    },

    ConsensusPublished {
        asset: AssetId,
        round: RoundId,
        value: Decimal,
        reports: usize,
        outliers: usize,
    },

    RoundExpired {
        asset: AssetId,
        round: RoundId,
        failure: RoundFailure,
    },

    OracleSlashed {
        asset: AssetId,
        round: RoundId,
        oracle: OracleId,
        amount: Amount,
        beneficiary: Beneficiary,
        remaining_locked: Amount,
    },

    OracleRewarded {
        asset: AssetId,
        round: RoundId,
        oracle: OracleId,
        amount: Amount,
        /// Part of `amount` retained as the oracle's commission
        commission: Amount,
    },

    OracleSuspended {
        oracle: OracleId,
        reason: SuspensionReason,
    },

    OracleReactivated {
        oracle: OracleId,
    },

    OracleExited {
        oracle: OracleId,
    },

    StakeWithdrawn {
        oracle: OracleId,
        amount: Amount,
        balance: Amount,
    },

    RequestFunded {
        asset: AssetId,
        amount: Amount,
    },

    AssetHalted {
        asset: AssetId,
        reason: String,
    },

    AssetResumed {
        asset: AssetId,
    },
}

impl NetworkEvent {
    /// Asset the event belongs to, if any
    pub fn asset(&self) -> Option<&AssetId> {
        match self {
            NetworkEvent::PriceReported { asset, .. }
            | NetworkEvent::ConsensusPublished { asset, .. }
            | NetworkEvent::RoundExpired { asset, .. }
            | NetworkEvent::OracleSlashed { asset, .. }
            | NetworkEvent::OracleRewarded { asset, .. }
            | NetworkEvent::RequestFunded { asset, .. }
            | NetworkEvent::AssetHalted { asset, .. }
            | NetworkEvent::AssetResumed { asset } => Some(asset),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            NetworkEvent::OracleRegistered { .. } => "oracle_registered",
            NetworkEvent::PriceReported { .. } => "price_reported",
            NetworkEvent::ConsensusPublished { .. } => "consensus_published",
            NetworkEvent::RoundExpired { .. } => "round_expired",
            NetworkEvent::OracleSlashed { .. } => "oracle_slashed",
            NetworkEvent::OracleRewarded { .. } => "oracle_rewarded",
            NetworkEvent::OracleSuspended { .. } => "oracle_suspended",
            NetworkEvent::OracleReactivated { .. } => "oracle_reactivated",
            NetworkEvent::OracleExited { .. } => "oracle_exited",
            NetworkEvent::StakeWithdrawn { .. } => "stake_withdrawn",
            NetworkEvent::RequestFunded { .. } => "request_funded",
            NetworkEvent::AssetHalted { .. } => "asset_halted",
            NetworkEvent::AssetResumed { .. } => "asset_resumed",
        }
    }
}

/// An event with its position in the log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequencedEvent {
    pub sequence: u64,
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: NetworkEvent,
}
