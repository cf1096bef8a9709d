//! Common types and utilities for OracleNet
//!
//! This crate provides shared identifiers, amounts, and error types used
//! across all OracleNet crates.
//!
//! # Modules
//!
//! - [`error`] - Common error types
//! - [`types`] - Shared domain types (OracleId, AssetId, RoundId, Amount)

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
