use common::{Amount, OracleId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One oracle's input to a round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub oracle: OracleId,
    pub value: Decimal,
    pub confidence: Decimal,
    /// Locked stake at aggregation time
    pub stake: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusParams {
    pub min_quorum: usize,
    pub max_deviation_fraction: Decimal,
    pub max_outlier_fraction: Decimal,
    pub max_single_weight: Decimal,
}

/// A surviving report with its weights
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedReport {
    pub oracle: OracleId,
    pub value: Decimal,
    pub confidence: Decimal,
    /// Normalized, capped stake share
    pub stake_weight: Decimal,
    /// `confidence * stake_weight`
    pub effective_weight: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consensus {
    pub value: Decimal,
    /// Unweighted median used by the outlier filter
    pub median: Decimal,
    /// Survivors sorted by (value, oracle)
    pub survivors: Vec<WeightedReport>,
    /// Oracles whose reports were filtered out, sorted
    pub outliers: Vec<OracleId>,
    pub total_weight: Decimal,
}

impl Consensus {
    pub fn survivor(&self, oracle: &OracleId) -> Option<&WeightedReport> {
        self.survivors.iter().find(|r| &r.oracle == oracle)
    }
}

/// Outcome of the outlier filter alone, available even when a round falls
/// short of consensus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Screening {
    /// Unweighted median of every report
    pub median: Decimal,
    /// Oracles within the deviation band, sorted
    pub survivors: Vec<OracleId>,
    /// Oracles outside the deviation band, sorted
    pub outliers: Vec<OracleId>,
}
