//! Stake ledger error types

use common::{Amount, OracleId};
use thiserror::Error;

/// Errors that can occur during stake operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StakeError {
    /// Zero amount where a positive one is required
    #[error("Invalid amount: {0}")]
    InvalidAmount(Amount),

    /// Not enough free balance to lock
    #[error("Insufficient stake: required {required}, available {available}")]
    InsufficientStake { required: Amount, available: Amount },

    /// Not enough locked stake to slash or unlock
    #[error("Insufficient locked stake: required {required}, locked {locked}")]
    InsufficientLockedStake { required: Amount, locked: Amount },

    /// Withdrawal would touch locked stake
    #[error("Stake locked: requested {requested}, withdrawable {withdrawable}")]
    StakeLocked { requested: Amount, withdrawable: Amount },

    /// Withdrawal would leave an active oracle under the minimum
    #[error("Remaining stake {remaining} would fall below minimum {minimum}")]
    BelowMinimumStake { remaining: Amount, minimum: Amount },

    /// No ledger entry for the oracle
    #[error("Unknown stake account: {0}")]
    UnknownAccount(OracleId),

    /// Reward pool cannot cover a payout
    #[error("Insufficient reward pool: required {required}, available {available}")]
    InsufficientPool { required: Amount, available: Amount },

    /// Arithmetic overflow on a balance
    #[error("Amount overflow")]
    Overflow,

    /// An entry holds more locked stake than balance
    #[error("Locked stake {locked} exceeds balance {balance} for {oracle}")]
    LockedExceedsBalance {
        oracle: OracleId,
        locked: Amount,
        balance: Amount,
    },
}
