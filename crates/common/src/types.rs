//! Common types used across OracleNet
//!
//! This module provides the fundamental identifiers and units used
//! throughout the oracle network.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Token amount in base units.
///
/// Amounts are integral so that stake conservation is exact. By convention a
/// token has [`TOKEN_DECIMALS`] decimals.
pub type Amount = u64;

/// Decimals of the staking token
pub const TOKEN_DECIMALS: u32 = 6;

/// One whole token in base units
pub const TOKEN_UNIT: Amount = 1_000_000;

/// Convert whole tokens into base units (saturating)
pub fn tokens(whole: u64) -> Amount {
    whole.saturating_mul(TOKEN_UNIT)
}

/// Identity of an oracle operator (address or public key)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OracleId(String);

impl OracleId {
    /// Create an OracleId, trimming surrounding whitespace
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_string())
    }

    /// Parse and validate an OracleId
    pub fn parse(id: &str) -> Result<Self> {
        let id = Self::new(id);
        if id.0.is_empty() {
            return Err(Error::EmptyId { kind: "oracle" });
        }
        if id.0.chars().any(char::is_whitespace) {
            return Err(Error::MalformedId {
                kind: "oracle",
                id: id.0,
                reason: "must not contain whitespace",
            });
        }
        Ok(id)
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OracleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for OracleId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Asset pair identifier (e.g., "ETH/USD")
///
/// Always stored uppercase so that `eth/usd` and `ETH/USD` name the same feed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    /// Create a new AssetId
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().trim().to_uppercase())
    }

    /// Parse and validate an AssetId
    pub fn parse(s: &str) -> Result<Self> {
        let asset = Self::new(s);
        if asset.0.is_empty() {
            return Err(Error::EmptyId { kind: "asset" });
        }
        let valid = asset
            .0
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '-' | '_' | '.'));
        if !valid {
            return Err(Error::MalformedId {
                kind: "asset",
                id: asset.0,
                reason: "may only contain letters, digits and / - _ .",
            });
        }
        Ok(asset)
    }

    /// Get the asset as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AssetId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for AssetId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Round number within one asset's feed
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoundId(pub u64);

impl RoundId {
    /// The first round of every feed
    pub const FIRST: RoundId = RoundId(1);

    /// The round that follows this one
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Get the raw round number
    pub fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RoundId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
