use common::{Amount, OracleId};
use serde::{Deserialize, Serialize};

/// One oracle's entry in the stake ledger
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeAccount {
    /// Total tokens held for the oracle
    pub balance: Amount,
    /// Portion of `balance` currently at risk; never exceeds `balance`
    pub locked: Amount,
}

impl StakeAccount {
    /// Balance that is not locked
    pub fn free(&self) -> Amount {
        self.balance.saturating_sub(self.locked)
    }
}

/// Recipient of slashed stake
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Beneficiary {
    #[default]
    RewardPool,
    Treasury,
}

impl std::fmt::Display for Beneficiary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Beneficiary::RewardPool => write!(f, "reward_pool"),
            Beneficiary::Treasury => write!(f, "treasury"),
        }
    }
}

/// Outcome of a successful slash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashRecord {
    pub oracle: OracleId,
    pub amount: Amount,
    pub beneficiary: Beneficiary,
    /// Locked stake left after the slash
    pub remaining_locked: Amount,
}
