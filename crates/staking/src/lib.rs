//! Stake ledger for OracleNet
//!
//! Holds every oracle's balance and locked (at-risk) stake, plus the reward
//! pool and the protocol treasury. All amounts are integral base units, so
//! the ledger's total value only changes through external deposits,
//! withdrawals and pool funding.

pub mod error;
pub mod ledger;
pub mod types;

pub use error::StakeError;
pub use ledger::StakeLedger;
pub use types::{Beneficiary, SlashRecord, StakeAccount};

/// Result type for stake operations
pub type Result<T> = std::result::Result<T, StakeError>;
