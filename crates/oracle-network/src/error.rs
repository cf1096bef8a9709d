//! Oracle network error types

use aggregator::ConsensusError;
use common::{Amount, AssetId, OracleId, RoundId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use staking::StakeError;
use thiserror::Error;

use crate::types::OracleStatus;

/// Coarse failure class reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad input; nothing changed
    Validation,
    /// Caller is not allowed to act; nothing changed
    Eligibility,
    /// Too early, too late or out of order; nothing changed
    Timing,
    /// No consensus value available
    Consensus,
    /// Internal accounting broke; the affected asset is halted
    InvariantViolation,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Eligibility => "eligibility",
            ErrorKind::Timing => "timing",
            ErrorKind::Consensus => "consensus",
            ErrorKind::InvariantViolation => "invariant_violation",
        };
        write!(f, "{}", s)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
    // Validation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Report value must be positive, got {0}")]
    InvalidValue(Decimal),

    #[error("Confidence {0} outside [0, 1]")]
    InvalidConfidence(Decimal),

    #[error("Commission {commission} outside [0, {max}]")]
    InvalidCommission { commission: Decimal, max: Decimal },

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Fee {amount} below the request fee {minimum}")]
    FeeTooLow { amount: Amount, minimum: Amount },

    #[error("Unknown asset: {0}")]
    UnknownAsset(AssetId),

    // Eligibility
    #[error("Oracle {0} is not registered or not eligible to report")]
    NotRegistered(OracleId),

    #[error("Unknown oracle: {0}")]
    UnknownOracle(OracleId),

    #[error("Oracle {0} is already registered")]
    AlreadyRegistered(OracleId),

    #[error("Insufficient stake: required {required}, provided {provided}")]
    InsufficientStake { required: Amount, provided: Amount },

    #[error("{caller} may not act on behalf of {oracle}")]
    Unauthorized { caller: OracleId, oracle: OracleId },

    #[error("Oracle {oracle} is {status:?}")]
    InvalidStatus { oracle: OracleId, status: OracleStatus },

    #[error(transparent)]
    Stake(#[from] StakeError),

    // Timing
    #[error("Stale report from {oracle}: previous report at {previous} is not older")]
    StaleReport {
        oracle: OracleId,
        previous: chrono::DateTime<chrono::Utc>,
    },

    #[error("Round {round} of {asset} is already closed")]
    RoundClosed { asset: AssetId, round: RoundId },

    #[error("Round {round} of {asset} is not the current round {current}")]
    InvalidRound {
        asset: AssetId,
        round: RoundId,
        current: RoundId,
    },

    #[error("Oracle {oracle} has reports in open rounds: {assets:?}")]
    ActiveRoundsPending {
        oracle: OracleId,
        assets: Vec<AssetId>,
    },

    #[error("Exit cooldown for {oracle} ends in {remaining_secs}s")]
    CooldownActive { oracle: OracleId, remaining_secs: i64 },

    // Consensus
    #[error("No consensus value published for {0}")]
    NoConsensusYet(AssetId),

    #[error(transparent)]
    Consensus(#[from] ConsensusError),

    // Invariants
    #[error("Asset {asset} is halted: {reason}")]
    AssetHalted { asset: AssetId, reason: String },

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

impl NetworkError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NetworkError::InvalidInput(_)
            | NetworkError::InvalidValue(_)
            | NetworkError::InvalidConfidence(_)
            | NetworkError::InvalidCommission { .. }
            | NetworkError::InvalidEndpoint(_)
            | NetworkError::FeeTooLow { .. }
            | NetworkError::UnknownAsset(_) => ErrorKind::Validation,

            NetworkError::NotRegistered(_)
            | NetworkError::UnknownOracle(_)
            | NetworkError::AlreadyRegistered(_)
            | NetworkError::InsufficientStake { .. }
            | NetworkError::Unauthorized { .. }
            | NetworkError::InvalidStatus { .. } => ErrorKind::Eligibility,

            NetworkError::Stake(e) => match e {
                StakeError::InvalidAmount(_) => ErrorKind::Validation,
                StakeError::Overflow | StakeError::LockedExceedsBalance { .. } => {
                    ErrorKind::InvariantViolation
                }
                StakeError::InsufficientPool { .. } => ErrorKind::InvariantViolation,
                _ => ErrorKind::Eligibility,
            },

            NetworkError::StaleReport { .. }
            | NetworkError::RoundClosed { .. }
            | NetworkError::InvalidRound { .. }
            | NetworkError::ActiveRoundsPending { .. }
            | NetworkError::CooldownActive { .. } => ErrorKind::Timing,

            NetworkError::NoConsensusYet(_) => ErrorKind::Consensus,
            NetworkError::Consensus(e) => match e {
                ConsensusError::InvalidInput(_) => ErrorKind::Validation,
                _ => ErrorKind::Consensus,
            },

            NetworkError::AssetHalted { .. } | NetworkError::InvariantViolation(_) => {
                ErrorKind::InvariantViolation
            }
        }
    }

    /// True for lookups of things that do not exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            NetworkError::UnknownOracle(_)
                | NetworkError::UnknownAsset(_)
                | NetworkError::NoConsensusYet(_)
        )
    }
}

impl From<common::Error> for NetworkError {
    fn from(err: common::Error) -> Self {
        NetworkError::InvalidInput(err.to_string())
    }
}

/// A failure tagged with the operation that produced it
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{operation} failed: {source}")]
pub struct OperationError {
    pub operation: &'static str,
    #[source]
    pub source: NetworkError,
}

impl OperationError {
    pub fn new(operation: &'static str, source: NetworkError) -> Self {
        Self { operation, source }
    }

    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

/// Attach an operation name to a network result
pub trait OperationContext<T> {
    fn during(self, operation: &'static str) -> Result<T, OperationError>;
}

impl<T> OperationContext<T> for Result<T, NetworkError> {
    fn during(self, operation: &'static str) -> Result<T, OperationError> {
        self.map_err(|source| OperationError::new(operation, source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            NetworkError::InvalidConfidence(Decimal::TWO).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            NetworkError::NotRegistered(OracleId::new("x")).kind(),
            ErrorKind::Eligibility
        );
        assert_eq!(
            NetworkError::RoundClosed {
                asset: AssetId::new("ETH/USD"),
                round: RoundId(1)
            }
            .kind(),
            ErrorKind::Timing
        );
        assert_eq!(
            NetworkError::Stake(StakeError::StakeLocked {
                requested: 5,
                withdrawable: 0
            })
            .kind(),
            ErrorKind::Eligibility
        );
        assert_eq!(
            NetworkError::InvariantViolation("x".into()).kind(),
            ErrorKind::InvariantViolation
        );
    }

    #[test]
    fn test_operation_context() {
        let result: Result<(), NetworkError> = Err(NetworkError::UnknownOracle(OracleId::new("x")));
        let err = result.during("withdraw_stake").unwrap_err();
        assert_eq!(err.operation, "withdraw_stake");
        assert_eq!(err.kind(), ErrorKind::Eligibility);
        assert!(err.to_string().starts_with("withdraw_stake failed"));
    }
}
