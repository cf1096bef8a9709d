//! Consensus aggregation for OracleNet
//!
//! Turns the reports of one round into a single value:
//!
//! 1. quorum check
//! 2. outlier filter around the unweighted median
//! 3. stake weights normalized over survivors and capped by water-filling
//! 4. confidence-scaled weighted median with an oracle-id tie-break
//!
//! The computation is pure and deterministic: the same report set yields the
//! same result regardless of input order.

pub mod consensus;
pub mod error;
pub mod median;
pub mod types;
pub mod weights;

pub use consensus::{aggregate, screen};
pub use error::{ConsensusError, Shortfall};
pub use types::{Consensus, ConsensusParams, Screening, Submission, WeightedReport};

/// Result type for aggregation
pub type Result<T> = std::result::Result<T, ConsensusError>;
