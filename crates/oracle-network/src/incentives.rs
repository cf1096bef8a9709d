//! Reputation and incentive settlement
//!
//! Settlement of a finalized round is computed as a [`SettlementPlan`] from a
//! read-only view of the registry and the ledger, then applied in one step by
//! the network.

use aggregator::{Consensus, Screening};
use common::{Amount, AssetId, OracleId, RoundId};
use config::ProtocolConfig;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use staking::{Beneficiary, StakeLedger};
use std::collections::BTreeSet;

use crate::registry::OracleRegistry;
use crate::types::{Oracle, Participation, Round, SuspensionReason};

/// How the round ended, from the incentive engine's point of view
#[derive(Debug, Clone, Copy)]
pub enum Verdict<'a> {
    /// A value was published; reports are scored against it
    Published(&'a Consensus),
    /// Quorum was met but consensus fell short; reports are scored against
    /// the unweighted median and nothing is paid out
    Unpublished(&'a Screening),
    /// No trusted reference value; reporters only get uptime credit
    Unscored,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleUpdate {
    pub oracle: OracleId,
    pub participation: Participation,
    pub reputation: Decimal,
    pub missed_rounds: u32,
    pub suspend: Option<SuspensionReason>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedSlash {
    pub oracle: OracleId,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedReward {
    pub oracle: OracleId,
    /// Full share credited to the oracle
    pub amount: Amount,
    /// Part of `amount` booked as commission
    pub commission: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementPlan {
    pub asset: AssetId,
    pub round: RoundId,
    pub updates: Vec<OracleUpdate>,
    pub slashes: Vec<PlannedSlash>,
    pub rewards: Vec<PlannedReward>,
    pub beneficiary: Beneficiary,
    /// Fees available to this round
    pub budget: Amount,
    /// Fees left earmarked for the asset afterwards
    pub carried: Amount,
}

impl SettlementPlan {
    pub fn total_slashed(&self) -> Amount {
        self.slashes.iter().map(|s| s.amount).sum()
    }

    pub fn total_rewards(&self) -> Amount {
        self.rewards.iter().map(|r| r.amount).sum()
    }
}

/// `clamp(1 - |value - consensus| / consensus, 0, 1)`
pub fn accuracy(value: Decimal, consensus: Decimal) -> Decimal {
    if consensus <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let Some(error) = value
        .checked_sub(consensus)
        .and_then(|diff| diff.checked_div(consensus))
    else {
        return Decimal::ZERO;
    };
    (Decimal::ONE - error.abs()).max(Decimal::ZERO).min(Decimal::ONE)
}

fn scored(reputation: Decimal, value: Decimal, reference: Decimal, alpha: Decimal) -> (Participation, Decimal) {
    let score = accuracy(value, reference);
    (
        Participation::Accurate { accuracy: score },
        ewma(reputation, score, alpha),
    )
}

/// Exponentially weighted update toward `accuracy`
pub fn ewma(reputation: Decimal, accuracy: Decimal, alpha: Decimal) -> Decimal {
    alpha * accuracy + (Decimal::ONE - alpha) * reputation
}

/// Outlier rate over the trailing window if `next` were appended
fn projected_outlier_rate(oracle: &Oracle, next: Participation, window: usize) -> Decimal {
    if window == 0 {
        return Decimal::ZERO;
    }
    let history = oracle
        .history
        .iter()
        .rev()
        .map(|r| r.participation)
        .filter(Participation::is_scored)
        .take(window.saturating_sub(1));
    let outliers = std::iter::once(next)
        .chain(history)
        .filter(|p| *p == Participation::Outlier)
        .count();
    Decimal::from(outliers as u64) / Decimal::from(window as u64)
}

fn floor_amount(value: Decimal) -> Amount {
    value.floor().to_u64().unwrap_or(0)
}

/// Compute the settlement of a finalized round without touching state
pub fn plan_settlement(
    round: &Round,
    verdict: Verdict<'_>,
    registry: &OracleRegistry,
    ledger: &StakeLedger,
    accrued_fees: Amount,
    protocol: &ProtocolConfig,
) -> SettlementPlan {
    let incentives = &protocol.incentives;
    let staking = &protocol.staking;
    let beneficiary = match staking.slash_beneficiary {
        config::SlashBeneficiary::RewardPool => Beneficiary::RewardPool,
        config::SlashBeneficiary::Treasury => Beneficiary::Treasury,
    };

    let mut updates = Vec::new();
    let mut slashes = Vec::new();
    let reporters: BTreeSet<&OracleId> = round.reports.keys().collect();

    for (oracle_id, report) in &round.reports {
        let Some(oracle) = registry.get(oracle_id) else {
            continue;
        };

        let penalized = (
            Participation::Outlier,
            (oracle.reputation - incentives.outlier_penalty).max(Decimal::ZERO),
        );
        let alpha = incentives.reputation_alpha;
        let (participation, reputation) = match verdict {
            Verdict::Published(consensus) => match consensus.survivor(oracle_id) {
                Some(_) => scored(oracle.reputation, report.value, consensus.value, alpha),
                None => penalized,
            },
            Verdict::Unpublished(screening) => {
                if screening.survivors.contains(oracle_id) {
                    scored(oracle.reputation, report.value, screening.median, alpha)
                } else {
                    penalized
                }
            }
            Verdict::Unscored => (Participation::Unscored, oracle.reputation),
        };

        let mut suspend = None;
        if participation == Participation::Outlier {
            let rate = projected_outlier_rate(oracle, participation, incentives.slash_window);
            let locked = ledger.locked(oracle_id);
            if rate > incentives.slash_threshold && locked > 0 {
                let amount = floor_amount(Decimal::from(locked) * incentives.slash_fraction);
                if amount > 0 {
                    slashes.push(PlannedSlash {
                        oracle: oracle_id.clone(),
                        amount,
                    });
                    let remaining = locked - amount;
                    if oracle.is_active() && remaining < staking.min_stake_amount {
                        suspend = Some(SuspensionReason::StakeBelowMinimum {
                            locked: remaining,
                            minimum: staking.min_stake_amount,
                        });
                    }
                }
            }
        }

        updates.push(OracleUpdate {
            oracle: oracle_id.clone(),
            participation,
            reputation,
            missed_rounds: 0,
            suspend,
        });
    }

    // Uptime: active oracles serving this asset that stayed silent
    for oracle in registry.iter() {
        if !oracle.is_active()
            || !oracle.assets.contains(&round.asset)
            || reporters.contains(&oracle.id)
        {
            continue;
        }

        let missed_rounds = oracle.missed_rounds.saturating_add(1);
        let mut reputation = oracle.reputation;
        let mut suspend = None;
        if missed_rounds >= incentives.missed_rounds_limit {
            reputation *= Decimal::ONE - incentives.missed_round_decay;
            if reputation < incentives.suspension_floor {
                suspend = Some(SuspensionReason::ReputationBelowFloor { reputation });
            }
        }

        updates.push(OracleUpdate {
            oracle: oracle.id.clone(),
            participation: Participation::Missed,
            reputation,
            missed_rounds,
            suspend,
        });
    }

    let slashed_to_pool: Amount = match beneficiary {
        Beneficiary::RewardPool => slashes.iter().map(|s| s.amount).sum(),
        Beneficiary::Treasury => 0,
    };
    let budget = accrued_fees.saturating_add(slashed_to_pool);

    let mut rewards = Vec::new();
    let mut distributed: Amount = 0;
    if let Verdict::Published(consensus) = verdict {
        if budget > 0 && consensus.total_weight > Decimal::ZERO {
            let pot = Decimal::from(budget);
            for survivor in &consensus.survivors {
                let amount =
                    floor_amount(pot * survivor.effective_weight / consensus.total_weight);
                if amount == 0 {
                    continue;
                }
                let rate = registry
                    .get(&survivor.oracle)
                    .map(|o| o.commission)
                    .unwrap_or(Decimal::ZERO);
                rewards.push(PlannedReward {
                    oracle: survivor.oracle.clone(),
                    amount,
                    commission: floor_amount(Decimal::from(amount) * rate),
                });
                distributed += amount;
            }
        }
    }

    SettlementPlan {
        asset: round.asset.clone(),
        round: round.id,
        updates,
        slashes,
        rewards,
        beneficiary,
        budget,
        carried: budget - distributed,
    }
}
