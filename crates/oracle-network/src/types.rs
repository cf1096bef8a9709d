//! Domain types of the oracle network

use aggregator::Shortfall;
use chrono::{DateTime, Utc};
use common::{Amount, AssetId, OracleId, RoundId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleStatus {
    Active,
    Suspended,
    Exited,
}

/// Lifetime counters of one oracle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleCounters {
    pub reports_submitted: u64,
    /// Finalized rounds the oracle reported in
    pub rounds_participated: u64,
    /// Rounds where the report survived the outlier filter
    pub rounds_accurate: u64,
    pub rounds_outlier: u64,
    pub rounds_missed: u64,
    pub total_rewards: Amount,
    pub total_commission: Amount,
    pub total_slashed: Amount,
}

/// How an oracle fared in one finalized round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Participation {
    /// Survived the filter; scored against consensus, or the median when
    /// nothing was published
    Accurate { accuracy: Decimal },
    /// Filtered out as an outlier
    Outlier,
    /// Reported, but the round produced no reference value
    Unscored,
    /// Served the asset but did not report
    Missed,
}

impl Participation {
    /// Scored participations feed the outlier rate
    pub fn is_scored(&self) -> bool {
        matches!(self, Participation::Accurate { .. } | Participation::Outlier)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub asset: AssetId,
    pub round: RoundId,
    pub participation: Participation,
    pub reputation: Decimal,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Oracle {
    pub id: OracleId,
    pub endpoint: Url,
    pub commission: Decimal,
    pub status: OracleStatus,
    pub reputation: Decimal,
    pub registered_at: DateTime<Utc>,
    pub exit_requested_at: Option<DateTime<Utc>>,
    /// Consecutive rounds missed on served assets
    pub missed_rounds: u32,
    /// Assets this oracle has reported on
    pub assets: BTreeSet<AssetId>,
    pub counters: OracleCounters,
    /// Most recent round records, oldest first
    pub history: VecDeque<RoundRecord>,
}

impl Oracle {
    pub fn is_active(&self) -> bool {
        self.status == OracleStatus::Active
    }

    /// Append a record, keeping at most `window` entries
    pub fn push_record(&mut self, record: RoundRecord, window: usize) {
        self.history.push_back(record);
        while self.history.len() > window {
            self.history.pop_front();
        }
    }

    /// Outliers among the last `window` scored rounds divided by `window`
    pub fn outlier_rate(&self, window: usize) -> Decimal {
        if window == 0 {
            return Decimal::ZERO;
        }
        let outliers = self
            .history
            .iter()
            .rev()
            .filter(|r| r.participation.is_scored())
            .take(window)
            .filter(|r| r.participation == Participation::Outlier)
            .count();
        Decimal::from(outliers as u64) / Decimal::from(window as u64)
    }
}

/// Read view of an oracle including its stake
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleInfo {
    pub id: OracleId,
    pub endpoint: String,
    pub commission: Decimal,
    pub status: OracleStatus,
    pub reputation: Decimal,
    pub stake: Amount,
    pub balance: Amount,
    pub registered_at: DateTime<Utc>,
    pub exit_requested_at: Option<DateTime<Utc>>,
    pub assets: Vec<AssetId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceReport {
    pub asset: AssetId,
    pub oracle: OracleId,
    pub value: Decimal,
    pub confidence: Decimal,
    pub submitted_at: DateTime<Utc>,
    pub round: RoundId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    Open,
    Closed,
    Expired,
}

/// Why a round finalized without a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RoundFailure {
    NoQuorum { reports: usize, required: usize },
    InsufficientConsensus { shortfall: Shortfall },
}

impl std::fmt::Display for RoundFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoundFailure::NoQuorum { reports, required } => {
                write!(f, "no quorum ({} of {} reports)", reports, required)
            }
            RoundFailure::InsufficientConsensus { shortfall } => {
                write!(f, "insufficient consensus: {}", shortfall)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub asset: AssetId,
    pub id: RoundId,
    pub status: RoundStatus,
    /// One report per oracle; the latest wins while the round is open
    pub reports: BTreeMap<OracleId, PriceReport>,
    pub opened_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub consensus_value: Option<Decimal>,
    pub closed_at: Option<DateTime<Utc>>,
    pub outliers: Vec<OracleId>,
    pub failure: Option<RoundFailure>,
}

impl Round {
    pub fn open(asset: AssetId, id: RoundId, opened_at: DateTime<Utc>, duration: chrono::Duration) -> Self {
        Self {
            asset,
            id,
            status: RoundStatus::Open,
            reports: BTreeMap::new(),
            opened_at,
            deadline: opened_at + duration,
            consensus_value: None,
            closed_at: None,
            outliers: Vec::new(),
            failure: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == RoundStatus::Open
    }

    pub fn is_past_deadline(&self, now: DateTime<Utc>) -> bool {
        now >= self.deadline
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetFeed {
    pub asset: AssetId,
    /// Id of the round that produced `latest_value`; never decreases
    pub latest_round: Option<RoundId>,
    pub latest_value: Option<Decimal>,
    pub last_updated: Option<DateTime<Utc>>,
    /// Number of values ever published
    pub publications: u64,
}

impl AssetFeed {
    pub fn new(asset: AssetId) -> Self {
        Self {
            asset,
            latest_round: None,
            latest_value: None,
            last_updated: None,
            publications: 0,
        }
    }
}

/// Oracle report submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSubmission {
    pub oracle: OracleId,
    pub asset: AssetId,
    pub value: Decimal,
    pub confidence: Decimal,
    /// Round the reporter believes is current; `None` targets the current round
    #[serde(default)]
    pub round: Option<RoundId>,
}

/// Oracle registration request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub id: String,
    pub endpoint: String,
    pub stake: Amount,
    pub commission: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub asset: AssetId,
    pub round: RoundId,
    pub reports_in_round: usize,
    /// Rounds finalized while handling the submission
    pub finalized: Vec<RoundOutcome>,
}

/// Result of finalizing one round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundOutcome {
    pub asset: AssetId,
    pub round: RoundId,
    pub status: RoundStatus,
    pub consensus_value: Option<Decimal>,
    pub failure: Option<RoundFailure>,
    pub rewards_paid: Amount,
    pub slashed: Amount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkStats {
    pub total_oracles: usize,
    pub active_oracles: usize,
    pub total_reports: u64,
    pub total_value_locked: Amount,
    pub total_rewards: Amount,
    pub active_feeds: usize,
    pub reward_pool_balance: Amount,
    pub rounds_closed: u64,
    pub rounds_expired: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OraclePerformance {
    pub oracle: OracleId,
    pub status: OracleStatus,
    pub reputation: Decimal,
    pub stake: Amount,
    /// Mean accuracy over scored rounds still in history
    pub average_accuracy: Option<Decimal>,
    /// Participated rounds over participated plus missed
    pub uptime: Option<Decimal>,
    pub outlier_rate: Decimal,
    pub counters: OracleCounters,
    pub recent: Vec<RoundRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SuspensionReason {
    StakeBelowMinimum { locked: Amount, minimum: Amount },
    ReputationBelowFloor { reputation: Decimal },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(participation: Participation) -> RoundRecord {
        RoundRecord {
            asset: AssetId::new("ETH/USD"),
            round: RoundId(1),
            participation,
            reputation: Decimal::ONE,
            at: Utc::now(),
        }
    }

    fn oracle() -> Oracle {
        Oracle {
            id: OracleId::new("a"),
            endpoint: Url::parse("https://a.example").unwrap(),
            commission: Decimal::ZERO,
            status: OracleStatus::Active,
            reputation: Decimal::ONE,
            registered_at: Utc::now(),
            exit_requested_at: None,
            missed_rounds: 0,
            assets: BTreeSet::new(),
            counters: OracleCounters::default(),
            history: VecDeque::new(),
        }
    }

    #[test]
    fn test_history_bounded() {
        let mut o = oracle();
        for _ in 0..15 {
            o.push_record(record(Participation::Outlier), 10);
        }
        assert_eq!(o.history.len(), 10);
    }

    #[test]
    fn test_outlier_rate_ignores_unscored() {
        let mut o = oracle();
        for _ in 0..5 {
            o.push_record(record(Participation::Outlier), 100);
        }
        for _ in 0..20 {
            o.push_record(record(Participation::Missed), 100);
            o.push_record(record(Participation::Unscored), 100);
        }
        assert_eq!(o.outlier_rate(10), Decimal::new(5, 1));

        for _ in 0..10 {
            o.push_record(
                record(Participation::Accurate {
                    accuracy: Decimal::ONE,
                }),
                100,
            );
        }
        assert_eq!(o.outlier_rate(10), Decimal::ZERO);
    }
}
