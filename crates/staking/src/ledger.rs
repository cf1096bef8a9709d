use crate::types::{Beneficiary, SlashRecord, StakeAccount};
use crate::{Result, StakeError};
use common::{Amount, OracleId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeLedger {
    accounts: BTreeMap<OracleId, StakeAccount>,
    reward_pool: Amount,
    treasury: Amount,
}

impl StakeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account(&self, oracle: &OracleId) -> Option<&StakeAccount> {
        self.accounts.get(oracle)
    }

    pub fn accounts(&self) -> impl Iterator<Item = (&OracleId, &StakeAccount)> {
        self.accounts.iter()
    }

    pub fn balance(&self, oracle: &OracleId) -> Amount {
        self.accounts.get(oracle).map(|a| a.balance).unwrap_or(0)
    }

    pub fn locked(&self, oracle: &OracleId) -> Amount {
        self.accounts.get(oracle).map(|a| a.locked).unwrap_or(0)
    }

    pub fn free(&self, oracle: &OracleId) -> Amount {
        self.accounts.get(oracle).map(StakeAccount::free).unwrap_or(0)
    }

    pub fn reward_pool(&self) -> Amount {
        self.reward_pool
    }

    pub fn treasury(&self) -> Amount {
        self.treasury
    }

    /// Sum of all locked stake
    pub fn total_locked(&self) -> Amount {
        self.accounts
            .values()
            .fold(0, |acc: Amount, a| acc.saturating_add(a.locked))
    }

    /// Sum of all balances plus the reward pool and the treasury.
    ///
    /// Only deposits, withdrawals and pool funding change this figure.
    pub fn total_value(&self) -> Amount {
        self.accounts
            .values()
            .fold(0, |acc: Amount, a| acc.saturating_add(a.balance))
            .saturating_add(self.reward_pool)
            .saturating_add(self.treasury)
    }

    fn account_mut(&mut self, oracle: &OracleId) -> Result<&mut StakeAccount> {
        self.accounts
            .get_mut(oracle)
            .ok_or_else(|| StakeError::UnknownAccount(oracle.clone()))
    }

    /// Credit external tokens to an oracle's balance, returning the new balance
    pub fn deposit(&mut self, oracle: &OracleId, amount: Amount) -> Result<Amount> {
        if amount == 0 {
            return Err(StakeError::InvalidAmount(amount));
        }

        let account = self.accounts.entry(oracle.clone()).or_default();
        account.balance = account
            .balance
            .checked_add(amount)
            .ok_or(StakeError::Overflow)?;

        debug!(oracle = %oracle, amount, balance = account.balance, "Stake deposited");
        Ok(account.balance)
    }

    /// Move free balance into locked stake
    pub fn lock(&mut self, oracle: &OracleId, amount: Amount) -> Result<()> {
        if amount == 0 {
            return Err(StakeError::InvalidAmount(amount));
        }

        let account = self.account_mut(oracle)?;
        let available = account.free();
        if available < amount {
            return Err(StakeError::InsufficientStake {
                required: amount,
                available,
            });
        }

        account.locked += amount;
        debug!(oracle = %oracle, amount, locked = account.locked, "Stake locked");
        Ok(())
    }

    /// Release locked stake back to free balance
    pub fn unlock(&mut self, oracle: &OracleId, amount: Amount) -> Result<()> {
        if amount == 0 {
            return Err(StakeError::InvalidAmount(amount));
        }

        let account = self.account_mut(oracle)?;
        if account.locked < amount {
            return Err(StakeError::InsufficientLockedStake {
                required: amount,
                locked: account.locked,
            });
        }

        account.locked -= amount;
        debug!(oracle = %oracle, amount, locked = account.locked, "Stake unlocked");
        Ok(())
    }

    /// Remove locked stake and credit it to `beneficiary`
    pub fn slash(
        &mut self,
        oracle: &OracleId,
        amount: Amount,
        beneficiary: Beneficiary,
    ) -> Result<SlashRecord> {
        if amount == 0 {
            return Err(StakeError::InvalidAmount(amount));
        }

        let (locked, balance) = {
            let account = self.account_mut(oracle)?;
            (account.locked, account.balance)
        };
        if locked < amount {
            return Err(StakeError::InsufficientLockedStake {
                required: amount,
                locked,
            });
        }
        if balance < amount {
            return Err(StakeError::LockedExceedsBalance {
                oracle: oracle.clone(),
                locked,
                balance,
            });
        }

        let credited = match beneficiary {
            Beneficiary::RewardPool => self.reward_pool.checked_add(amount),
            Beneficiary::Treasury => self.treasury.checked_add(amount),
        }
        .ok_or(StakeError::Overflow)?;

        match beneficiary {
            Beneficiary::RewardPool => self.reward_pool = credited,
            Beneficiary::Treasury => self.treasury = credited,
        }
        let account = self.account_mut(oracle)?;
        account.locked -= amount;
        account.balance -= amount;
        let remaining_locked = account.locked;

        warn!(
            oracle = %oracle,
            amount,
            beneficiary = %beneficiary,
            remaining_locked,
            "Stake slashed"
        );

        Ok(SlashRecord {
            oracle: oracle.clone(),
            amount,
            beneficiary,
            remaining_locked,
        })
    }

    /// Pay out free balance, returning the new balance.
    ///
    /// With `active_minimum` set, the remaining balance must stay at or above
    /// it; an active oracle has to deregister before dropping under the
    /// registration minimum.
    pub fn withdraw(
        &mut self,
        oracle: &OracleId,
        amount: Amount,
        active_minimum: Option<Amount>,
    ) -> Result<Amount> {
        if amount == 0 {
            return Err(StakeError::InvalidAmount(amount));
        }

        let account = self.account_mut(oracle)?;
        if let Some(minimum) = active_minimum {
            let remaining = account.balance.saturating_sub(amount);
            if remaining < minimum {
                return Err(StakeError::BelowMinimumStake { remaining, minimum });
            }
        }

        let withdrawable = account.free();
        if amount > withdrawable {
            return Err(StakeError::StakeLocked {
                requested: amount,
                withdrawable,
            });
        }

        account.balance -= amount;
        debug!(oracle = %oracle, amount, balance = account.balance, "Stake withdrawn");
        Ok(account.balance)
    }

    /// Credit external request fees to the reward pool
    pub fn fund_pool(&mut self, amount: Amount) -> Result<Amount> {
        if amount == 0 {
            return Err(StakeError::InvalidAmount(amount));
        }
        self.reward_pool = self
            .reward_pool
            .checked_add(amount)
            .ok_or(StakeError::Overflow)?;
        debug!(amount, pool = self.reward_pool, "Reward pool funded");
        Ok(self.reward_pool)
    }

    /// Move tokens from the reward pool to an oracle's free balance
    pub fn pay_reward(&mut self, oracle: &OracleId, amount: Amount) -> Result<Amount> {
        if amount == 0 {
            return Err(StakeError::InvalidAmount(amount));
        }
        if self.reward_pool < amount {
            return Err(StakeError::InsufficientPool {
                required: amount,
                available: self.reward_pool,
            });
        }

        let account = self.account_mut(oracle)?;
        account.balance = account
            .balance
            .checked_add(amount)
            .ok_or(StakeError::Overflow)?;
        let balance = account.balance;
        self.reward_pool -= amount;

        debug!(oracle = %oracle, amount, balance, "Reward paid");
        Ok(balance)
    }

    /// Check `locked <= balance` for every entry
    pub fn verify(&self) -> Result<()> {
        for (oracle, account) in &self.accounts {
            if account.locked > account.balance {
                return Err(StakeError::LockedExceedsBalance {
                    oracle: oracle.clone(),
                    locked: account.locked,
                    balance: account.balance,
                });
            }
        }
        Ok(())
    }
}
