//! OracleNet core
//!
//! Staked oracles register, report prices per asset and round, and the
//! network publishes one weighted-median value per finalized round. Each
//! finalization settles reputation, request-fee rewards and slashing in the
//! same step.
//!
//! # Architecture
//!
//! ```text
//!                        OracleNetwork
//!   +----------------+--------------+-------------+----------+
//!   | OracleRegistry | ReportLedger | StakeLedger | EventLog |
//!   +-------+--------+------+-------+------+------+----------+
//!           |               | finalize     |
//!           |               v              |
//!           |     aggregator::aggregate    |
//!           |               |              |
//!           +-------> incentives::plan_settlement
//! ```
//!
//! # Features
//!
//! - `api`: axum HTTP routes over a shared [`OracleNetwork`]

pub mod error;
pub mod event;
pub mod incentives;
pub mod log;
pub mod metrics;
pub mod network;
pub mod registry;
pub mod rounds;
pub mod store;
pub mod types;

#[cfg(feature = "api")]
pub mod api;

pub use error::{ErrorKind, NetworkError, OperationContext, OperationError};
pub use event::{NetworkEvent, SequencedEvent};
pub use log::EventLog;
pub use network::{NetworkSnapshot, OracleNetwork};
pub use registry::OracleRegistry;
pub use rounds::{AssetRounds, ReportLedger};
pub use store::{create_store, InMemoryStateStore, JsonFileStateStore, StateStore, StoreError};
pub use types::*;

pub type Result<T> = std::result::Result<T, NetworkError>;
