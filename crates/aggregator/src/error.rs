//! Aggregation error types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a round with enough reports still produced no value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shortfall {
    /// The outlier filter removed more than the allowed share
    TooManyOutliers { dropped: usize, total: usize },
    /// Fewer than quorum reports survived the filter
    BelowQuorum { survivors: usize, required: usize },
    /// Every surviving report carried zero effective weight
    ZeroWeight,
}

impl std::fmt::Display for Shortfall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Shortfall::TooManyOutliers { dropped, total } => {
                write!(f, "{} of {} reports rejected as outliers", dropped, total)
            }
            Shortfall::BelowQuorum {
                survivors,
                required,
            } => write!(f, "{} surviving reports, quorum is {}", survivors, required),
            Shortfall::ZeroWeight => write!(f, "surviving reports carry zero weight"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsensusError {
    #[error("No quorum: {reports} reports, {required} required")]
    NoQuorum { reports: usize, required: usize },

    #[error("Insufficient consensus: {0}")]
    InsufficientConsensus(Shortfall),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
