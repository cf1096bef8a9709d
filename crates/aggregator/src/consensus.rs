use crate::median::{median, within_deviation};
use crate::types::{Consensus, ConsensusParams, Screening, Submission, WeightedReport};
use crate::weights::{cap_weights, weighted_median};
use crate::{ConsensusError, Result, Shortfall};
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use tracing::debug;

/// Reports split around the unweighted median, in oracle order
struct Partition<'a> {
    median: Decimal,
    survivors: Vec<&'a Submission>,
    outliers: Vec<&'a Submission>,
}

fn partition<'a>(submissions: &'a [Submission], params: &ConsensusParams) -> Result<Partition<'a>> {
    validate(submissions)?;

    let total = submissions.len();
    if total < params.min_quorum {
        return Err(ConsensusError::NoQuorum {
            reports: total,
            required: params.min_quorum,
        });
    }

    // Canonical order makes the result independent of submission order
    let mut reports: Vec<&Submission> = submissions.iter().collect();
    reports.sort_by(|a, b| a.oracle.cmp(&b.oracle));

    let values: Vec<Decimal> = reports.iter().map(|s| s.value).collect();
    let median = median(&values)
        .ok_or_else(|| ConsensusError::InvalidInput("no reports".to_string()))?;

    let (survivors, outliers): (Vec<&Submission>, Vec<&Submission>) = reports
        .into_iter()
        .partition(|s| within_deviation(s.value, median, params.max_deviation_fraction));

    Ok(Partition {
        median,
        survivors,
        outliers,
    })
}

/// Run only the outlier filter of [`aggregate`]
///
/// Succeeds whenever quorum is met, so reports of a round that ends without
/// consensus can still be judged against the median.
pub fn screen(submissions: &[Submission], params: &ConsensusParams) -> Result<Screening> {
    let Partition {
        median,
        survivors,
        outliers,
    } = partition(submissions, params)?;

    Ok(Screening {
        median,
        survivors: survivors.into_iter().map(|s| s.oracle.clone()).collect(),
        outliers: outliers.into_iter().map(|s| s.oracle.clone()).collect(),
    })
}

/// Compute the consensus value of one round
pub fn aggregate(submissions: &[Submission], params: &ConsensusParams) -> Result<Consensus> {
    let Partition {
        median: mid,
        survivors,
        outliers,
    } = partition(submissions, params)?;
    let total = submissions.len();

    let dropped = outliers.len();
    if Decimal::from(dropped as u64)
        > params.max_outlier_fraction * Decimal::from(total as u64)
    {
        return Err(ConsensusError::InsufficientConsensus(
            Shortfall::TooManyOutliers { dropped, total },
        ));
    }
    if survivors.len() < params.min_quorum {
        return Err(ConsensusError::InsufficientConsensus(
            Shortfall::BelowQuorum {
                survivors: survivors.len(),
                required: params.min_quorum,
            },
        ));
    }

    let stakes: Vec<_> = survivors.iter().map(|s| s.stake).collect();
    let stake_weights = cap_weights(&stakes, params.max_single_weight);

    let mut weighted: Vec<WeightedReport> = survivors
        .iter()
        .zip(stake_weights)
        .map(|(s, stake_weight)| WeightedReport {
            oracle: s.oracle.clone(),
            value: s.value,
            confidence: s.confidence,
            stake_weight,
            effective_weight: s.confidence * stake_weight,
        })
        .collect();
    weighted.sort_by(|a, b| a.value.cmp(&b.value).then_with(|| a.oracle.cmp(&b.oracle)));

    let pairs: Vec<(Decimal, Decimal)> = weighted
        .iter()
        .map(|r| (r.value, r.effective_weight))
        .collect();
    let total_weight: Decimal = pairs.iter().map(|(_, w)| *w).sum();
    let value = weighted_median(&pairs)
        .ok_or(ConsensusError::InsufficientConsensus(Shortfall::ZeroWeight))?;

    debug!(
        median = %mid,
        consensus = %value,
        survivors = weighted.len(),
        outliers = dropped,
        "Consensus computed"
    );

    Ok(Consensus {
        value,
        median: mid,
        survivors: weighted,
        outliers: outliers.into_iter().map(|s| s.oracle.clone()).collect(),
        total_weight,
    })
}

fn validate(submissions: &[Submission]) -> Result<()> {
    let mut seen = BTreeSet::new();
    for s in submissions {
        if s.value <= Decimal::ZERO {
            return Err(ConsensusError::InvalidInput(format!(
                "non-positive value {} from {}",
                s.value, s.oracle
            )));
        }
        if s.confidence < Decimal::ZERO || s.confidence > Decimal::ONE {
            return Err(ConsensusError::InvalidInput(format!(
                "confidence {} from {} outside [0, 1]",
                s.confidence, s.oracle
            )));
        }
        if !seen.insert(&s.oracle) {
            return Err(ConsensusError::InvalidInput(format!(
                "duplicate report from {}",
                s.oracle
            )));
        }
    }
    Ok(())
}
