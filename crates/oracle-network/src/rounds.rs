//! Report ledger
//!
//! Per asset: the open round collecting reports, the finalized rounds kept for
//! reads, the published feed, and the request fees earmarked for the next
//! consensus round.

use chrono::{DateTime, Duration, Utc};
use common::{Amount, AssetId, OracleId, RoundId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use tracing::debug;

use crate::error::NetworkError;
use crate::types::{AssetFeed, PriceReport, Round, RoundStatus};
use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRounds {
    pub feed: AssetFeed,
    /// The round currently collecting reports
    pub current: Option<Round>,
    /// Most recent finalized rounds, oldest first
    pub finalized: VecDeque<Round>,
    /// Id the next opened round receives
    pub next_round: RoundId,
    /// Fees and slashed stake awaiting distribution
    pub accrued_fees: Amount,
    /// Set when an invariant broke; submissions are refused until cleared
    pub halted: Option<String>,
    pub rounds_closed: u64,
    pub rounds_expired: u64,
}

impl AssetRounds {
    pub fn new(asset: AssetId) -> Self {
        Self {
            feed: AssetFeed::new(asset),
            current: None,
            finalized: VecDeque::new(),
            next_round: RoundId::FIRST,
            accrued_fees: 0,
            halted: None,
            rounds_closed: 0,
            rounds_expired: 0,
        }
    }

    pub fn asset(&self) -> &AssetId {
        &self.feed.asset
    }

    /// Id of the open round, or of the round the next report would open
    pub fn current_id(&self) -> RoundId {
        self.current.as_ref().map(|r| r.id).unwrap_or(self.next_round)
    }

    /// Check that `target` names the round now accepting reports
    pub fn check_target(&self, target: RoundId) -> Result<()> {
        let current = self.current_id();
        if target.value() > 0 && target < current {
            return Err(NetworkError::RoundClosed {
                asset: self.asset().clone(),
                round: target,
            });
        }
        if target != current {
            return Err(NetworkError::InvalidRound {
                asset: self.asset().clone(),
                round: target,
                current,
            });
        }
        Ok(())
    }

    /// True when the open round has passed its deadline
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.current
            .as_ref()
            .map(|r| r.is_past_deadline(now))
            .unwrap_or(false)
    }

    /// Oracle has a report in the open round
    pub fn has_pending_report(&self, oracle: &OracleId) -> bool {
        self.current
            .as_ref()
            .map(|r| r.reports.contains_key(oracle))
            .unwrap_or(false)
    }

    /// Insert or replace an oracle's report in the open round, opening one
    /// if needed. Returns the round id and its report count.
    pub fn insert_report(
        &mut self,
        oracle: &OracleId,
        value: Decimal,
        confidence: Decimal,
        now: DateTime<Utc>,
        duration: Duration,
    ) -> Result<(RoundId, usize)> {
        if let Some(previous) = self
            .current
            .as_ref()
            .and_then(|r| r.reports.get(oracle))
        {
            if previous.submitted_at >= now {
                return Err(NetworkError::StaleReport {
                    oracle: oracle.clone(),
                    previous: previous.submitted_at,
                });
            }
        }

        if self.current.is_none() {
            let id = self.next_round;
            self.next_round = id.next();
            debug!(asset = %self.feed.asset, round = %id, "Round opened");
            self.current = Some(Round::open(self.feed.asset.clone(), id, now, duration));
        }

        let asset = self.feed.asset.clone();
        let round = self
            .current
            .as_mut()
            .ok_or_else(|| NetworkError::InvariantViolation("open round vanished".to_string()))?;
        round.reports.insert(
            oracle.clone(),
            PriceReport {
                asset,
                oracle: oracle.clone(),
                value,
                confidence,
                submitted_at: now,
                round: round.id,
            },
        );
        Ok((round.id, round.reports.len()))
    }

    /// Record a published value; a round id at or below the latest one is an
    /// invariant violation
    pub fn publish(&mut self, round: RoundId, value: Decimal, now: DateTime<Utc>) -> Result<()> {
        if let Some(latest) = self.feed.latest_round {
            if round <= latest {
                return Err(NetworkError::InvariantViolation(format!(
                    "duplicate publication for {}: round {} after round {}",
                    self.feed.asset, round, latest
                )));
            }
        }
        self.feed.latest_round = Some(round);
        self.feed.latest_value = Some(value);
        self.feed.last_updated = Some(now);
        self.feed.publications += 1;
        Ok(())
    }

    /// Move a finalized round into history, keeping at most `retention`
    pub fn archive(&mut self, round: Round, retention: usize) {
        match round.status {
            RoundStatus::Closed => self.rounds_closed += 1,
            RoundStatus::Expired => self.rounds_expired += 1,
            RoundStatus::Open => {}
        }
        self.finalized.push_back(round);
        while self.finalized.len() > retention.max(1) {
            self.finalized.pop_front();
        }
    }

    /// Look up the open round or a retained finalized round
    pub fn round(&self, id: RoundId) -> Option<&Round> {
        self.current
            .as_ref()
            .filter(|r| r.id == id)
            .or_else(|| self.finalized.iter().rev().find(|r| r.id == id))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportLedger {
    assets: BTreeMap<AssetId, AssetRounds>,
    total_reports: u64,
}

impl ReportLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, asset: &AssetId) -> Option<&AssetRounds> {
        self.assets.get(asset)
    }

    pub fn get_mut(&mut self, asset: &AssetId) -> Option<&mut AssetRounds> {
        self.assets.get_mut(asset)
    }

    /// Book for `asset`, created on first use
    pub fn entry(&mut self, asset: &AssetId) -> &mut AssetRounds {
        self.assets
            .entry(asset.clone())
            .or_insert_with(|| AssetRounds::new(asset.clone()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AssetId, &AssetRounds)> {
        self.assets.iter()
    }

    pub fn assets(&self) -> impl Iterator<Item = &AssetId> {
        self.assets.keys()
    }

    pub fn total_reports(&self) -> u64 {
        self.total_reports
    }

    pub fn count_report(&mut self) {
        self.total_reports += 1;
    }

    /// Sum of fees earmarked across all assets
    pub fn total_accrued(&self) -> Amount {
        self.assets
            .values()
            .fold(0, |acc: Amount, a| acc.saturating_add(a.accrued_fees))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn book() -> AssetRounds {
        AssetRounds::new(AssetId::new("ETH/USD"))
    }

    #[test]
    fn test_first_report_opens_round_one() {
        let mut rounds = book();
        let now = Utc::now();
        let (id, count) = rounds
            .insert_report(&OracleId::new("a"), dec!(3000), dec!(1), now, Duration::seconds(60))
            .unwrap();
        assert_eq!(id, RoundId::FIRST);
        assert_eq!(count, 1);
        assert_eq!(rounds.next_round, RoundId(2));
        assert_eq!(rounds.current.as_ref().unwrap().deadline, now + Duration::seconds(60));
    }

    #[test]
    fn test_latest_report_wins_and_stale_rejected() {
        let mut rounds = book();
        let a = OracleId::new("a");
        let now = Utc::now();
        rounds.insert_report(&a, dec!(3000), dec!(1), now, Duration::seconds(60)).unwrap();

        assert_matches!(
            rounds.insert_report(&a, dec!(3001), dec!(1), now, Duration::seconds(60)),
            Err(NetworkError::StaleReport { .. })
        );

        let later = now + Duration::seconds(1);
        let (_, count) = rounds
            .insert_report(&a, dec!(3002), dec!(1), later, Duration::seconds(60))
            .unwrap();
        assert_eq!(count, 1);
        let report = &rounds.current.as_ref().unwrap().reports[&a];
        assert_eq!(report.value, dec!(3002));
    }

    #[test]
    fn test_check_target() {
        let mut rounds = book();
        rounds.next_round = RoundId(5);

        assert!(rounds.check_target(RoundId(5)).is_ok());
        assert_matches!(
            rounds.check_target(RoundId(4)),
            Err(NetworkError::RoundClosed { .. })
        );
        assert_matches!(
            rounds.check_target(RoundId(6)),
            Err(NetworkError::InvalidRound { .. })
        );
        assert_matches!(
            rounds.check_target(RoundId(0)),
            Err(NetworkError::InvalidRound { .. })
        );
    }

    #[test]
    fn test_publish_monotonic() {
        let mut rounds = book();
        let now = Utc::now();
        rounds.publish(RoundId(1), dec!(3000), now).unwrap();
        rounds.publish(RoundId(3), dec!(3010), now).unwrap();
        assert_eq!(rounds.feed.publications, 2);
        assert_matches!(
            rounds.publish(RoundId(3), dec!(3020), now),
            Err(NetworkError::InvariantViolation(_))
        );
        assert_eq!(rounds.feed.latest_value, Some(dec!(3010)));
    }

    #[test]
    fn test_archive_retention() {
        let mut rounds = book();
        let now = Utc::now();
        for i in 1..=5 {
            let mut round = Round::open(rounds.asset().clone(), RoundId(i), now, Duration::seconds(1));
            round.status = RoundStatus::Expired;
            rounds.archive(round, 3);
        }
        assert_eq!(rounds.finalized.len(), 3);
        assert!(rounds.round(RoundId(2)).is_none());
        assert!(rounds.round(RoundId(5)).is_some());
        assert_eq!(rounds.rounds_expired, 5);
    }
}
