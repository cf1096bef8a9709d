//! The oracle network state machine
//!
//! [`OracleNetwork`] owns every table and is the only entry point for
//! mutations. Operations take `now` explicitly and never read the clock, so
//! replaying the same calls yields the same state.

use aggregator::{aggregate, screen, Consensus, ConsensusError, ConsensusParams, Submission};
use chrono::{DateTime, Duration, Utc};
use common::{Amount, AssetId, OracleId, RoundId};
use config::{ConsensusConfig, MasterConfig, ProtocolConfig};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use staking::StakeLedger;
use std::collections::BTreeSet;
use tracing::{debug, error, info, warn};

use crate::error::NetworkError;
use crate::event::{NetworkEvent, SequencedEvent};
use crate::incentives::{plan_settlement, SettlementPlan, Verdict};
use crate::log::EventLog;
use crate::metrics;
use crate::registry::{authorize, OracleRegistry};
use crate::rounds::{AssetRounds, ReportLedger};
use crate::types::{
    AssetFeed, NetworkStats, Oracle, OracleInfo, OraclePerformance, Participation, Registration,
    ReportSubmission, Round, RoundFailure, RoundOutcome, RoundRecord, RoundStatus, SubmitReceipt,
};
use crate::Result;

/// Serializable image of the whole network state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    pub registry: OracleRegistry,
    pub ledger: StakeLedger,
    pub reports: ReportLedger,
    pub events: EventLog,
}

/// Assets enabled in the master config
pub fn enabled_assets(config: &MasterConfig) -> Vec<AssetId> {
    config
        .assets
        .iter()
        .filter(|a| a.enabled)
        .map(|a| AssetId::new(a.symbol.as_str()))
        .collect()
}

pub fn consensus_params(config: &ConsensusConfig) -> ConsensusParams {
    ConsensusParams {
        min_quorum: config.min_quorum,
        max_deviation_fraction: config.max_deviation_fraction,
        max_outlier_fraction: config.max_outlier_fraction,
        max_single_weight: config.max_single_weight,
    }
}

#[derive(Debug, Clone)]
pub struct OracleNetwork {
    config: ProtocolConfig,
    /// Served assets; `None` accepts any well-formed asset id
    assets: Option<BTreeSet<AssetId>>,
    registry: OracleRegistry,
    ledger: StakeLedger,
    reports: ReportLedger,
    events: EventLog,
}

impl OracleNetwork {
    pub fn new(config: ProtocolConfig) -> Self {
        Self {
            config,
            assets: None,
            registry: OracleRegistry::new(),
            ledger: StakeLedger::new(),
            reports: ReportLedger::new(),
            events: EventLog::new(),
        }
    }

    /// Build from the master config, serving its enabled assets
    pub fn from_master(config: &MasterConfig) -> Self {
        Self::new(config.protocol.clone()).restrict_to(config)
    }

    /// Apply the enabled assets of `config` as the allowlist; none enabled
    /// leaves the network unrestricted
    pub fn restrict_to(self, config: &MasterConfig) -> Self {
        let assets = enabled_assets(config);
        if assets.is_empty() {
            self
        } else {
            self.with_assets(assets)
        }
    }

    /// Restrict submissions and fee funding to `assets`
    pub fn with_assets<I: IntoIterator<Item = AssetId>>(mut self, assets: I) -> Self {
        self.assets = Some(assets.into_iter().collect());
        self
    }

    /// Restore a network from a snapshot, checking ledger consistency
    pub fn from_snapshot(config: ProtocolConfig, snapshot: NetworkSnapshot) -> Result<Self> {
        snapshot.ledger.verify()?;
        let accrued = snapshot.reports.total_accrued();
        if snapshot.ledger.reward_pool() < accrued {
            return Err(NetworkError::InvariantViolation(format!(
                "reward pool {} does not cover accrued fees {}",
                snapshot.ledger.reward_pool(),
                accrued
            )));
        }

        info!(
            oracles = snapshot.registry.len(),
            events = snapshot.events.len(),
            "Network restored from snapshot"
        );
        Ok(Self {
            config,
            assets: None,
            registry: snapshot.registry,
            ledger: snapshot.ledger,
            reports: snapshot.reports,
            events: snapshot.events,
        })
    }

    pub fn snapshot(&self) -> NetworkSnapshot {
        NetworkSnapshot {
            registry: self.registry.clone(),
            ledger: self.ledger.clone(),
            reports: self.reports.clone(),
            events: self.events.clone(),
        }
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn registry(&self) -> &OracleRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &StakeLedger {
        &self.ledger
    }

    pub fn reports(&self) -> &ReportLedger {
        &self.reports
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    fn emit(&mut self, now: DateTime<Utc>, event: NetworkEvent) -> u64 {
        self.events.append(now, event)
    }

    fn check_asset(&self, asset: &AssetId) -> Result<()> {
        match &self.assets {
            Some(served) if !served.contains(asset) => {
                Err(NetworkError::UnknownAsset(asset.clone()))
            }
            _ => Ok(()),
        }
    }

    fn round_duration(&self) -> Duration {
        Duration::seconds(self.config.consensus.round_duration_seconds as i64)
    }

    fn refresh_gauges(&self) {
        let active = self.registry.iter().filter(|o| o.is_active()).count();
        metrics::network_gauges(active, self.ledger.total_locked(), self.ledger.reward_pool());
    }

    // ------------------------------------------------------------------
    // Oracle lifecycle
    // ------------------------------------------------------------------

    pub fn register_oracle(
        &mut self,
        registration: &Registration,
        now: DateTime<Utc>,
    ) -> Result<OracleInfo> {
        let oracle = self.registry.register(
            &mut self.ledger,
            registration,
            &self.config.staking,
            self.config.incentives.neutral_reputation,
            now,
        )?;

        self.emit(
            now,
            NetworkEvent::OracleRegistered {
                oracle: oracle.id.clone(),
                endpoint: oracle.endpoint.to_string(),
                stake: registration.stake,
                commission: oracle.commission,
            },
        );
        self.refresh_gauges();
        Ok(self.info_of(&oracle))
    }

    pub fn update_endpoint(&mut self, caller: &OracleId, id: &OracleId, endpoint: &str) -> Result<()> {
        self.registry.update_endpoint(caller, id, endpoint)?;
        Ok(())
    }

    pub fn update_commission(
        &mut self,
        caller: &OracleId,
        id: &OracleId,
        commission: Decimal,
    ) -> Result<()> {
        let max = self.config.staking.max_commission;
        self.registry.update_commission(caller, id, commission, max)
    }

    /// Leave the network. Rounds past their deadline are finalized first; a
    /// report in a round that is still open blocks the exit.
    pub fn deregister(&mut self, caller: &OracleId, id: &OracleId, now: DateTime<Utc>) -> Result<()> {
        authorize(caller, id)?;
        self.registry.oracle(id)?;

        let due: Vec<AssetId> = self
            .reports
            .iter()
            .filter(|(_, book)| {
                book.halted.is_none() && book.has_pending_report(id) && book.is_due(now)
            })
            .map(|(asset, _)| asset.clone())
            .collect();
        for asset in &due {
            self.finalize(asset, now)?;
        }

        let pending: Vec<AssetId> = self
            .reports
            .iter()
            .filter(|(_, book)| book.has_pending_report(id))
            .map(|(asset, _)| asset.clone())
            .collect();
        if !pending.is_empty() {
            return Err(NetworkError::ActiveRoundsPending {
                oracle: id.clone(),
                assets: pending,
            });
        }

        self.registry.request_exit(caller, id, now)?;
        self.emit(now, NetworkEvent::OracleExited { oracle: id.clone() });
        self.refresh_gauges();
        Ok(())
    }

    /// Release the remaining stake of an exited oracle after the cooldown
    pub fn complete_exit(&mut self, caller: &OracleId, id: &OracleId, now: DateTime<Utc>) -> Result<Amount> {
        let cooldown = Duration::seconds(self.config.staking.exit_cooldown_seconds as i64);
        self.registry
            .complete_exit(&mut self.ledger, caller, id, cooldown, now)
    }

    pub fn restake(&mut self, caller: &OracleId, id: &OracleId, amount: Amount) -> Result<Amount> {
        let locked = self.registry.restake(&mut self.ledger, caller, id, amount)?;
        info!(oracle = %id, amount, locked, "Stake added");
        Ok(locked)
    }

    pub fn reactivate(&mut self, caller: &OracleId, id: &OracleId, now: DateTime<Utc>) -> Result<()> {
        self.registry.reactivate(
            &self.ledger,
            caller,
            id,
            self.config.staking.min_stake_amount,
            self.config.incentives.suspension_floor,
        )?;
        self.emit(now, NetworkEvent::OracleReactivated { oracle: id.clone() });
        self.refresh_gauges();
        Ok(())
    }

    /// Withdraw free balance; an active oracle keeps at least the minimum
    pub fn withdraw_stake(
        &mut self,
        caller: &OracleId,
        id: &OracleId,
        amount: Amount,
        now: DateTime<Utc>,
    ) -> Result<Amount> {
        authorize(caller, id)?;
        let oracle = self.registry.oracle(id)?;
        let active_minimum = oracle
            .is_active()
            .then_some(self.config.staking.min_stake_amount);

        let balance = self.ledger.withdraw(id, amount, active_minimum)?;
        info!(oracle = %id, amount, balance, "Stake withdrawn");
        self.emit(
            now,
            NetworkEvent::StakeWithdrawn {
                oracle: id.clone(),
                amount,
                balance,
            },
        );
        Ok(balance)
    }

    // ------------------------------------------------------------------
    // Reports and rounds
    // ------------------------------------------------------------------

    /// Accept a price report, closing the round when enough reports are in
    ///
    /// Input, eligibility and halt checks run before a round past its
    /// deadline is closed, so a rejected report changes nothing. A round
    /// that is due is closed first and the report opens the next one.
    pub fn report_price(
        &mut self,
        submission: ReportSubmission,
        now: DateTime<Utc>,
    ) -> Result<SubmitReceipt> {
        let oracle = submission.oracle.clone();
        let result = self.submit(submission, now);
        if let Err(err) = &result {
            warn!(oracle = %oracle, kind = %err.kind(), error = %err, "Report rejected");
            metrics::report_rejected(err.kind());
        }
        result
    }

    fn submit(&mut self, submission: ReportSubmission, now: DateTime<Utc>) -> Result<SubmitReceipt> {
        let ReportSubmission {
            oracle,
            asset,
            value,
            confidence,
            round: target,
        } = submission;

        if value <= Decimal::ZERO {
            return Err(NetworkError::InvalidValue(value));
        }
        if confidence < Decimal::ZERO || confidence > Decimal::ONE {
            return Err(NetworkError::InvalidConfidence(confidence));
        }
        let asset = AssetId::parse(asset.as_str())?;
        self.check_asset(&asset)?;

        // Rejections up to here leave every table untouched
        self.check_eligible(&oracle)?;
        let due = match self.reports.get(&asset) {
            Some(book) => {
                if let Some(reason) = &book.halted {
                    return Err(NetworkError::AssetHalted {
                        asset,
                        reason: reason.clone(),
                    });
                }
                book.is_due(now)
            }
            None => false,
        };

        let mut finalized = Vec::new();
        if due {
            finalized.extend(self.finalize(&asset, now)?);
            // Settling the closed round may have suspended the reporter
            self.check_eligible(&oracle)?;
        }

        match self.reports.get(&asset) {
            Some(book) => {
                if let Some(target) = target {
                    book.check_target(target)?;
                }
            }
            None => {
                if let Some(target) = target {
                    AssetRounds::new(asset.clone()).check_target(target)?;
                }
            }
        }

        let duration = self.round_duration();
        let (round, reports_in_round) =
            self.reports
                .entry(&asset)
                .insert_report(&oracle, value, confidence, now, duration)?;

        if let Some(entry) = self.registry.get_mut(&oracle) {
            entry.assets.insert(asset.clone());
            entry.counters.reports_submitted += 1;
        }
        self.reports.count_report();
        self.emit(
            now,
            NetworkEvent::PriceReported {
                asset: asset.clone(),
                round,
                oracle: oracle.clone(),
                value,
                confidence,
            },
        );
        metrics::report_accepted(&asset);
        debug!(
            asset = %asset,
            round = %round,
            oracle = %oracle,
            value = %value,
            reports = reports_in_round,
            "Report accepted"
        );

        if reports_in_round >= self.config.consensus.close_threshold() {
            finalized.extend(self.finalize(&asset, now)?);
        }

        Ok(SubmitReceipt {
            asset,
            round,
            reports_in_round,
            finalized,
        })
    }

    fn check_eligible(&self, oracle: &OracleId) -> Result<()> {
        if !self
            .registry
            .is_eligible(oracle, &self.ledger, self.config.staking.min_stake_amount)
        {
            return Err(NetworkError::NotRegistered(oracle.clone()));
        }
        Ok(())
    }

    /// Credit a request fee to the reward pool, earmarked for the asset's
    /// next consensus round. Returns the asset's accrued fees.
    pub fn fund_request(&mut self, asset: &AssetId, amount: Amount, now: DateTime<Utc>) -> Result<Amount> {
        let asset = AssetId::parse(asset.as_str())?;
        self.check_asset(&asset)?;
        let minimum = self.config.incentives.request_fee;
        if amount < minimum {
            return Err(NetworkError::FeeTooLow { amount, minimum });
        }

        self.ledger.fund_pool(amount)?;
        let book = self.reports.entry(&asset);
        book.accrued_fees = book.accrued_fees.saturating_add(amount);
        let accrued = book.accrued_fees;

        info!(asset = %asset, amount, accrued, "Request funded");
        self.emit(now, NetworkEvent::RequestFunded { asset, amount });
        Ok(accrued)
    }

    /// Finalize the asset's open round if its deadline has passed
    pub fn close_round(&mut self, asset: &AssetId, now: DateTime<Utc>) -> Result<Option<RoundOutcome>> {
        let asset = AssetId::parse(asset.as_str())?;
        let Some(book) = self.reports.get(&asset) else {
            return Ok(None);
        };
        if let Some(reason) = &book.halted {
            return Err(NetworkError::AssetHalted {
                asset,
                reason: reason.clone(),
            });
        }
        if !book.is_due(now) {
            return Ok(None);
        }
        self.finalize(&asset, now)
    }

    /// Finalize every open round past its deadline. Assets whose settlement
    /// fails are halted and skipped.
    pub fn close_expired_rounds(&mut self, now: DateTime<Utc>) -> Vec<RoundOutcome> {
        let due: Vec<AssetId> = self
            .reports
            .iter()
            .filter(|(_, book)| book.halted.is_none() && book.is_due(now))
            .map(|(asset, _)| asset.clone())
            .collect();

        let mut outcomes = Vec::new();
        for asset in due {
            match self.finalize(&asset, now) {
                Ok(Some(outcome)) => outcomes.push(outcome),
                Ok(None) => {}
                Err(err) => warn!(asset = %asset, error = %err, "Round finalization failed"),
            }
        }
        outcomes
    }

    /// Clear an asset halt after operator review
    pub fn resume_asset(&mut self, asset: &AssetId, now: DateTime<Utc>) -> Result<()> {
        let book = self
            .reports
            .get_mut(asset)
            .ok_or_else(|| NetworkError::UnknownAsset(asset.clone()))?;
        if book.halted.take().is_none() {
            return Err(NetworkError::InvalidInput(format!("asset {} is not halted", asset)));
        }
        info!(asset = %asset, "Asset resumed");
        self.emit(now, NetworkEvent::AssetResumed { asset: asset.clone() });
        Ok(())
    }

    fn halt(&mut self, asset: &AssetId, reason: String, now: DateTime<Utc>) -> NetworkError {
        error!(asset = %asset, reason = %reason, "Invariant violation, asset halted");
        if let Some(book) = self.reports.get_mut(asset) {
            book.halted = Some(reason.clone());
        }
        metrics::asset_halted(asset);
        self.emit(
            now,
            NetworkEvent::AssetHalted {
                asset: asset.clone(),
                reason: reason.clone(),
            },
        );
        NetworkError::InvariantViolation(reason)
    }

    /// Aggregate the open round and settle it in one step
    fn finalize(&mut self, asset: &AssetId, now: DateTime<Utc>) -> Result<Option<RoundOutcome>> {
        let Some(book) = self.reports.get(asset) else {
            return Ok(None);
        };
        if let Some(reason) = &book.halted {
            return Err(NetworkError::AssetHalted {
                asset: asset.clone(),
                reason: reason.clone(),
            });
        }
        let Some(mut round) = book.current.clone() else {
            return Ok(None);
        };
        let accrued = book.accrued_fees;

        let submissions: Vec<Submission> = round
            .reports
            .values()
            .map(|report| Submission {
                oracle: report.oracle.clone(),
                value: report.value,
                confidence: report.confidence,
                stake: self.ledger.locked(&report.oracle),
            })
            .collect();

        let params = consensus_params(&self.config.consensus);
        let (consensus, failure) = match aggregate(&submissions, &params) {
            Ok(consensus) => (Some(consensus), None),
            Err(ConsensusError::NoQuorum { reports, required }) => {
                (None, Some(RoundFailure::NoQuorum { reports, required }))
            }
            Err(ConsensusError::InsufficientConsensus(shortfall)) => {
                (None, Some(RoundFailure::InsufficientConsensus { shortfall }))
            }
            Err(err @ ConsensusError::InvalidInput(_)) => {
                let reason = format!("round {} of {} rejected by aggregator: {}", round.id, asset, err);
                return Err(self.halt(asset, reason, now));
            }
        };

        // Quorum was met, so reports are still judged against the median
        let screening = match failure {
            Some(RoundFailure::InsufficientConsensus { .. }) => screen(&submissions, &params).ok(),
            _ => None,
        };
        if let Some(screening) = &screening {
            round.outliers = screening.outliers.clone();
        }

        let verdict = match (&consensus, &screening) {
            (Some(c), _) => Verdict::Published(c),
            (None, Some(s)) => Verdict::Unpublished(s),
            (None, None) => Verdict::Unscored,
        };
        let plan = plan_settlement(&round, verdict, &self.registry, &self.ledger, accrued, &self.config);

        let round_id = round.id;
        match self.apply(round, consensus.as_ref(), failure, &plan, now) {
            Ok(outcome) => Ok(Some(outcome)),
            Err(err) => {
                let reason = format!("settlement of round {} of {} failed: {}", round_id, asset, err);
                Err(self.halt(asset, reason, now))
            }
        }
    }

    /// Apply a settlement plan to copies of the tables and swap them in only
    /// when every step succeeded
    fn apply(
        &mut self,
        mut round: Round,
        consensus: Option<&Consensus>,
        failure: Option<RoundFailure>,
        plan: &SettlementPlan,
        now: DateTime<Utc>,
    ) -> Result<RoundOutcome> {
        let asset = round.asset.clone();
        let mut registry = self.registry.clone();
        let mut ledger = self.ledger.clone();
        let mut book = self
            .reports
            .get(&asset)
            .cloned()
            .ok_or_else(|| NetworkError::UnknownAsset(asset.clone()))?;
        let mut events = Vec::new();

        book.current = None;
        round.closed_at = Some(now);
        match consensus {
            Some(consensus) => {
                book.publish(round.id, consensus.value, now)?;
                round.status = RoundStatus::Closed;
                round.consensus_value = Some(consensus.value);
                round.outliers = consensus.outliers.clone();
                events.push(NetworkEvent::ConsensusPublished {
                    asset: asset.clone(),
                    round: round.id,
                    value: consensus.value,
                    reports: round.reports.len(),
                    outliers: consensus.outliers.len(),
                });
            }
            None => {
                round.status = RoundStatus::Expired;
                round.failure = failure;
                if let Some(failure) = failure {
                    events.push(NetworkEvent::RoundExpired {
                        asset: asset.clone(),
                        round: round.id,
                        failure,
                    });
                }
            }
        }

        for slash in &plan.slashes {
            let record = ledger.slash(&slash.oracle, slash.amount, plan.beneficiary)?;
            if let Some(oracle) = registry.get_mut(&slash.oracle) {
                oracle.counters.total_slashed += record.amount;
            }
            events.push(NetworkEvent::OracleSlashed {
                asset: asset.clone(),
                round: round.id,
                oracle: record.oracle,
                amount: record.amount,
                beneficiary: record.beneficiary,
                remaining_locked: record.remaining_locked,
            });
        }

        for reward in &plan.rewards {
            ledger.pay_reward(&reward.oracle, reward.amount)?;
            if let Some(oracle) = registry.get_mut(&reward.oracle) {
                oracle.counters.total_rewards += reward.amount;
                oracle.counters.total_commission += reward.commission;
            }
            events.push(NetworkEvent::OracleRewarded {
                asset: asset.clone(),
                round: round.id,
                oracle: reward.oracle.clone(),
                amount: reward.amount,
                commission: reward.commission,
            });
        }

        let history_window = self.config.incentives.history_window;
        for update in &plan.updates {
            let oracle = registry.get_mut(&update.oracle).ok_or_else(|| {
                NetworkError::InvariantViolation(format!("settled unknown oracle {}", update.oracle))
            })?;
            oracle.reputation = update.reputation;
            oracle.missed_rounds = update.missed_rounds;
            let counters = &mut oracle.counters;
            match update.participation {
                Participation::Accurate { .. } => {
                    counters.rounds_participated += 1;
                    counters.rounds_accurate += 1;
                }
                Participation::Outlier => {
                    counters.rounds_participated += 1;
                    counters.rounds_outlier += 1;
                }
                Participation::Unscored => counters.rounds_participated += 1,
                Participation::Missed => counters.rounds_missed += 1,
            }
            oracle.push_record(
                RoundRecord {
                    asset: asset.clone(),
                    round: round.id,
                    participation: update.participation,
                    reputation: update.reputation,
                    at: now,
                },
                history_window,
            );
        }

        for update in &plan.updates {
            if let Some(reason) = update.suspend {
                if registry.suspend(&update.oracle, reason) {
                    events.push(NetworkEvent::OracleSuspended {
                        oracle: update.oracle.clone(),
                        reason,
                    });
                }
            }
        }

        ledger.verify()?;
        let accrued_total = self
            .reports
            .total_accrued()
            .saturating_sub(book_accrued(&self.reports, &asset))
            .saturating_add(plan.carried);
        if ledger.reward_pool() < accrued_total {
            return Err(NetworkError::InvariantViolation(format!(
                "reward pool {} does not cover accrued fees {}",
                ledger.reward_pool(),
                accrued_total
            )));
        }
        book.accrued_fees = plan.carried;

        let outcome = RoundOutcome {
            asset: asset.clone(),
            round: round.id,
            status: round.status,
            consensus_value: round.consensus_value,
            failure: round.failure,
            rewards_paid: plan.total_rewards(),
            slashed: plan.total_slashed(),
        };
        book.archive(round, self.config.consensus.round_retention);

        self.registry = registry;
        self.ledger = ledger;
        *self.reports.entry(&asset) = book;
        for event in events {
            self.emit(now, event);
        }

        match outcome.consensus_value {
            Some(value) => {
                info!(
                    asset = %asset,
                    round = %outcome.round,
                    value = %value,
                    rewards = outcome.rewards_paid,
                    slashed = outcome.slashed,
                    "Consensus published"
                );
                metrics::consensus_published(&asset, value);
            }
            None => {
                if let Some(failure) = &outcome.failure {
                    warn!(asset = %asset, round = %outcome.round, failure = %failure, "Round expired");
                }
            }
        }
        metrics::round_finalized(&asset, outcome.status);
        if outcome.slashed > 0 {
            metrics::oracle_slashed(outcome.slashed);
        }
        if outcome.rewards_paid > 0 {
            metrics::rewards_paid(outcome.rewards_paid);
        }
        self.refresh_gauges();

        Ok(outcome)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Latest published value for an asset
    pub fn latest(&self, asset: &AssetId) -> Result<AssetFeed> {
        let asset = AssetId::parse(asset.as_str())?;
        self.reports
            .get(&asset)
            .map(|book| &book.feed)
            .filter(|feed| feed.publications > 0)
            .cloned()
            .ok_or(NetworkError::NoConsensusYet(asset))
    }

    pub fn round(&self, asset: &AssetId, id: RoundId) -> Option<&Round> {
        self.reports.get(asset).and_then(|book| book.round(id))
    }

    pub fn current_round(&self, asset: &AssetId) -> Option<&Round> {
        self.reports.get(asset).and_then(|book| book.current.as_ref())
    }

    /// Halt reason, if the asset is halted
    pub fn halted(&self, asset: &AssetId) -> Option<&str> {
        self.reports.get(asset).and_then(|book| book.halted.as_deref())
    }

    pub fn feeds(&self) -> Vec<AssetFeed> {
        self.reports.iter().map(|(_, book)| book.feed.clone()).collect()
    }

    pub fn is_eligible(&self, id: &OracleId) -> bool {
        self.registry
            .is_eligible(id, &self.ledger, self.config.staking.min_stake_amount)
    }

    fn info_of(&self, oracle: &Oracle) -> OracleInfo {
        OracleInfo {
            id: oracle.id.clone(),
            endpoint: oracle.endpoint.to_string(),
            commission: oracle.commission,
            status: oracle.status,
            reputation: oracle.reputation,
            stake: self.ledger.locked(&oracle.id),
            balance: self.ledger.balance(&oracle.id),
            registered_at: oracle.registered_at,
            exit_requested_at: oracle.exit_requested_at,
            assets: oracle.assets.iter().cloned().collect(),
        }
    }

    pub fn oracle(&self, id: &OracleId) -> Result<OracleInfo> {
        let oracle = self.registry.oracle(id)?;
        Ok(self.info_of(oracle))
    }

    pub fn active_oracles(&self) -> Vec<OracleInfo> {
        self.registry
            .iter()
            .filter(|o| o.is_active())
            .map(|o| self.info_of(o))
            .collect()
    }

    pub fn oracle_performance(&self, id: &OracleId) -> Result<OraclePerformance> {
        let oracle = self.registry.oracle(id)?;

        let accuracies: Vec<Decimal> = oracle
            .history
            .iter()
            .filter_map(|r| match r.participation {
                Participation::Accurate { accuracy } => Some(accuracy),
                _ => None,
            })
            .collect();
        let average_accuracy = (!accuracies.is_empty()).then(|| {
            accuracies.iter().copied().sum::<Decimal>() / Decimal::from(accuracies.len() as u64)
        });

        let counters = &oracle.counters;
        let attended = counters.rounds_participated + counters.rounds_missed;
        let uptime = (attended > 0)
            .then(|| Decimal::from(counters.rounds_participated) / Decimal::from(attended));

        Ok(OraclePerformance {
            oracle: oracle.id.clone(),
            status: oracle.status,
            reputation: oracle.reputation,
            stake: self.ledger.locked(id),
            average_accuracy,
            uptime,
            outlier_rate: oracle.outlier_rate(self.config.incentives.slash_window),
            counters: oracle.counters.clone(),
            recent: oracle.history.iter().cloned().collect(),
        })
    }

    pub fn network_stats(&self) -> NetworkStats {
        let (rounds_closed, rounds_expired, active_feeds) = self.reports.iter().fold(
            (0u64, 0u64, 0usize),
            |(closed, expired, feeds), (_, book)| {
                (
                    closed + book.rounds_closed,
                    expired + book.rounds_expired,
                    feeds + usize::from(book.feed.publications > 0),
                )
            },
        );

        NetworkStats {
            total_oracles: self.registry.len(),
            active_oracles: self.registry.iter().filter(|o| o.is_active()).count(),
            total_reports: self.reports.total_reports(),
            total_value_locked: self.ledger.total_locked(),
            total_rewards: self.registry.iter().map(|o| o.counters.total_rewards).sum(),
            active_feeds,
            reward_pool_balance: self.ledger.reward_pool(),
            rounds_closed,
            rounds_expired,
        }
    }

    pub fn events_since(&self, from: u64) -> &[SequencedEvent] {
        self.events.since(from)
    }
}

fn book_accrued(reports: &ReportLedger, asset: &AssetId) -> Amount {
    reports.get(asset).map(|book| book.accrued_fees).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aggregator::Shortfall;
    use assert_matches::assert_matches;
    use chrono::TimeZone;
    use common::tokens;
    use rust_decimal_macros::dec;
    use staking::StakeError;

    use crate::types::{OracleStatus, SuspensionReason};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        t0() + Duration::seconds(secs)
    }

    fn eth() -> AssetId {
        AssetId::new("ETH/USD")
    }

    fn id(s: &str) -> OracleId {
        OracleId::new(s)
    }

    fn network_with(config: ProtocolConfig) -> OracleNetwork {
        OracleNetwork::new(config)
    }

    fn network() -> OracleNetwork {
        network_with(ProtocolConfig::default())
    }

    fn register(net: &mut OracleNetwork, name: &str, stake: Amount) -> OracleInfo {
        net.register_oracle(
            &Registration {
                id: name.to_string(),
                endpoint: format!("https://{}.oracles.example/feed", name),
                stake,
                commission: dec!(0.1),
            },
            t0(),
        )
        .unwrap()
    }

    fn submission(name: &str, value: Decimal) -> ReportSubmission {
        ReportSubmission {
            oracle: id(name),
            asset: eth(),
            value,
            confidence: Decimal::ONE,
            round: None,
        }
    }

    fn report(net: &mut OracleNetwork, name: &str, value: Decimal, now: DateTime<Utc>) -> Result<SubmitReceipt> {
        net.report_price(submission(name, value), now)
    }

    fn count_events(net: &OracleNetwork, name: &str) -> usize {
        net.events().iter().filter(|e| e.event.name() == name).count()
    }

    #[test]
    fn test_basic_median() {
        let mut net = network();
        for name in ["a", "b", "c"] {
            register(&mut net, name, tokens(100));
        }

        report(&mut net, "a", dec!(3000), at(1)).unwrap();
        let receipt = report(&mut net, "b", dec!(3050), at(2)).unwrap();
        assert!(receipt.finalized.is_empty());
        assert_matches!(net.latest(&eth()), Err(NetworkError::NoConsensusYet(_)));

        let receipt = report(&mut net, "c", dec!(3100), at(3)).unwrap();
        assert_eq!(receipt.round, RoundId(1));
        assert_eq!(receipt.finalized.len(), 1);
        assert_eq!(receipt.finalized[0].status, RoundStatus::Closed);
        assert_eq!(receipt.finalized[0].consensus_value, Some(dec!(3050)));

        let feed = net.latest(&eth()).unwrap();
        assert_eq!(feed.latest_value, Some(dec!(3050)));
        assert_eq!(feed.latest_round, Some(RoundId(1)));
        assert_eq!(feed.last_updated, Some(at(3)));
        assert_eq!(count_events(&net, "consensus_published"), 1);

        let stats = net.network_stats();
        assert_eq!(stats.total_oracles, 3);
        assert_eq!(stats.total_reports, 3);
        assert_eq!(stats.total_value_locked, tokens(300));
        assert_eq!(stats.active_feeds, 1);
        assert_eq!(stats.rounds_closed, 1);
    }

    #[test]
    fn test_outlier_rejected_and_penalized() {
        let mut config = ProtocolConfig::default();
        config.consensus.reports_to_close = Some(4);
        let mut net = network_with(config);
        for name in ["a", "b", "c", "d"] {
            register(&mut net, name, tokens(100));
        }

        report(&mut net, "a", dec!(3000), at(1)).unwrap();
        report(&mut net, "b", dec!(3050), at(2)).unwrap();
        report(&mut net, "c", dec!(3100), at(3)).unwrap();
        let receipt = report(&mut net, "d", dec!(50000), at(4)).unwrap();

        assert_eq!(receipt.finalized[0].consensus_value, Some(dec!(3050)));
        let round = net.round(&eth(), RoundId(1)).unwrap();
        assert_eq!(round.outliers, vec![id("d")]);

        let d = net.oracle(&id("d")).unwrap();
        assert_eq!(d.reputation, dec!(0.45));
        // One outlier in a ten-round window does not reach the slash threshold
        assert_eq!(d.stake, tokens(100));
        assert!(net.oracle(&id("b")).unwrap().reputation > dec!(0.5));

        let perf = net.oracle_performance(&id("d")).unwrap();
        assert_eq!(perf.counters.rounds_outlier, 1);
        assert_eq!(perf.outlier_rate, dec!(0.1));
        assert_eq!(perf.average_accuracy, None);
    }

    #[test]
    fn test_insufficient_stake_registration() {
        let mut net = network();
        let result = net.register_oracle(
            &Registration {
                id: "poor".to_string(),
                endpoint: "https://poor.example".to_string(),
                stake: tokens(100) - 1,
                commission: Decimal::ZERO,
            },
            t0(),
        );

        assert_matches!(result, Err(NetworkError::InsufficientStake { .. }));
        assert_matches!(net.oracle(&id("poor")), Err(NetworkError::UnknownOracle(_)));
        assert!(net.events().is_empty());
        assert_eq!(net.ledger().total_value(), 0);
    }

    #[test]
    fn test_sustained_outlier_is_slashed_and_suspended() {
        let mut config = ProtocolConfig::default();
        config.consensus.reports_to_close = Some(4);
        config.incentives.slash_window = 2;
        let mut net = network_with(config);
        for name in ["a", "b", "c", "d"] {
            register(&mut net, name, tokens(100));
        }
        let before = net.ledger().total_value();

        report(&mut net, "a", dec!(3000), at(1)).unwrap();
        report(&mut net, "b", dec!(3050), at(2)).unwrap();
        report(&mut net, "c", dec!(3100), at(3)).unwrap();
        let receipt = report(&mut net, "d", dec!(50000), at(4)).unwrap();

        let outcome = &receipt.finalized[0];
        assert_eq!(outcome.slashed, tokens(10));

        let d = net.oracle(&id("d")).unwrap();
        assert_eq!(d.stake, tokens(90));
        assert_eq!(d.status, OracleStatus::Suspended);
        assert!(!net.is_eligible(&id("d")));
        assert_eq!(count_events(&net, "oracle_slashed"), 1);
        assert_eq!(count_events(&net, "oracle_suspended"), 1);

        // Slashed stake went to the survivors; dust stays earmarked
        let book = net.reports().get(&eth()).unwrap();
        assert_eq!(outcome.rewards_paid + book.accrued_fees, tokens(10));
        assert!(book.accrued_fees < 3);
        assert_eq!(net.ledger().total_value(), before);

        assert_matches!(
            report(&mut net, "d", dec!(3000), at(10)),
            Err(NetworkError::NotRegistered(_))
        );
    }

    #[test]
    fn test_lazy_deadline_expiry() {
        let mut net = network();
        for name in ["a", "b", "c"] {
            register(&mut net, name, tokens(100));
        }

        report(&mut net, "a", dec!(3000), at(1)).unwrap();
        report(&mut net, "b", dec!(3010), at(2)).unwrap();

        assert!(net.close_expired_rounds(at(30)).is_empty());
        assert_eq!(net.close_round(&eth(), at(30)).unwrap(), None);

        // Deadline is opened_at + 60s
        let receipt = report(&mut net, "c", dec!(3005), at(61)).unwrap();
        assert_eq!(receipt.finalized.len(), 1);
        let expired = &receipt.finalized[0];
        assert_eq!(expired.round, RoundId(1));
        assert_eq!(expired.status, RoundStatus::Expired);
        assert_eq!(
            expired.failure,
            Some(RoundFailure::NoQuorum {
                reports: 2,
                required: 3
            })
        );
        assert_eq!(receipt.round, RoundId(2));
        assert_eq!(receipt.reports_in_round, 1);

        let a = net.oracle_performance(&id("a")).unwrap();
        assert_eq!(a.recent[0].participation, Participation::Unscored);
        assert_eq!(a.reputation, dec!(0.5));
        assert_eq!(net.network_stats().rounds_expired, 1);
        assert_eq!(count_events(&net, "round_expired"), 1);
    }

    #[test]
    fn test_rejected_report_leaves_due_round_open() {
        let mut net = network();
        register(&mut net, "a", tokens(100));
        report(&mut net, "a", dec!(3000), at(1)).unwrap();

        assert_matches!(
            report(&mut net, "ghost", dec!(3000), at(61)),
            Err(NetworkError::NotRegistered(_))
        );
        assert_eq!(net.current_round(&eth()).map(|r| r.id), Some(RoundId(1)));
        assert_eq!(count_events(&net, "round_expired"), 0);

        let outcomes = net.close_expired_rounds(at(61));
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].round, RoundId(1));
    }

    #[test]
    fn test_insufficient_consensus_still_scored() {
        let mut config = ProtocolConfig::default();
        config.consensus.reports_to_close = Some(5);
        let mut net = network_with(config);
        for name in ["a", "b", "c", "d", "e"] {
            register(&mut net, name, tokens(100));
        }

        report(&mut net, "a", dec!(2970), at(1)).unwrap();
        report(&mut net, "b", dec!(3000), at(2)).unwrap();
        report(&mut net, "c", dec!(3000), at(3)).unwrap();
        report(&mut net, "d", dec!(4000), at(4)).unwrap();
        let receipt = report(&mut net, "e", dec!(5000), at(5)).unwrap();

        let outcome = &receipt.finalized[0];
        assert_eq!(outcome.status, RoundStatus::Expired);
        assert_eq!(
            outcome.failure,
            Some(RoundFailure::InsufficientConsensus {
                shortfall: Shortfall::TooManyOutliers {
                    dropped: 2,
                    total: 5
                }
            })
        );
        assert_eq!(outcome.consensus_value, None);
        assert_eq!(outcome.rewards_paid, 0);

        let round = net.round(&eth(), RoundId(1)).unwrap();
        assert_eq!(round.outliers, vec![id("d"), id("e")]);

        assert_eq!(net.oracle(&id("b")).unwrap().reputation, dec!(0.6));
        assert_eq!(net.oracle(&id("d")).unwrap().reputation, dec!(0.45));
        let a = net.oracle_performance(&id("a")).unwrap();
        assert_eq!(
            a.recent[0].participation,
            Participation::Accurate { accuracy: dec!(0.99) }
        );
        let e = net.oracle_performance(&id("e")).unwrap();
        assert_eq!(e.counters.rounds_outlier, 1);
        assert_eq!(count_events(&net, "oracle_rewarded"), 0);
        assert_eq!(count_events(&net, "consensus_published"), 0);
    }

    #[test]
    fn test_extreme_values_do_not_stall_asset() {
        let huge = Decimal::from_i128_with_scale(7 * 10i128.pow(28), 0);
        let tiny = Decimal::new(1, 20);
        let mut net = network();
        for name in ["a", "b", "c"] {
            register(&mut net, name, tokens(100));
        }

        report(&mut net, "a", tiny, at(1)).unwrap();
        report(&mut net, "b", tiny, at(2)).unwrap();
        let receipt = report(&mut net, "c", huge, at(3)).unwrap();

        assert_eq!(receipt.finalized[0].status, RoundStatus::Expired);
        assert_eq!(
            net.round(&eth(), RoundId(1)).unwrap().outliers,
            vec![id("c")]
        );
        assert!(net.halted(&eth()).is_none());

        let receipt = report(&mut net, "a", dec!(3000), at(4)).unwrap();
        assert_eq!(receipt.round, RoundId(2));
    }

    #[test]
    fn test_close_expired_rounds_trigger() {
        let mut net = network();
        register(&mut net, "a", tokens(100));
        report(&mut net, "a", dec!(3000), at(0)).unwrap();

        let outcomes = net.close_expired_rounds(at(60));
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].status, RoundStatus::Expired);
        assert!(net.current_round(&eth()).is_none());
        assert!(net.close_expired_rounds(at(120)).is_empty());
    }

    #[test]
    fn test_stale_and_closed_round_rejections() {
        let mut net = network();
        for name in ["a", "b", "c"] {
            register(&mut net, name, tokens(100));
        }

        report(&mut net, "a", dec!(3000), at(5)).unwrap();
        assert_matches!(
            report(&mut net, "a", dec!(3001), at(5)),
            Err(NetworkError::StaleReport { .. })
        );
        assert_matches!(
            report(&mut net, "a", dec!(3001), at(4)),
            Err(NetworkError::StaleReport { .. })
        );
        report(&mut net, "b", dec!(3000), at(6)).unwrap();
        report(&mut net, "c", dec!(3000), at(7)).unwrap();

        let mut late = submission("a", dec!(3000));
        late.round = Some(RoundId(1));
        assert_matches!(
            net.report_price(late, at(8)),
            Err(NetworkError::RoundClosed { .. })
        );

        let mut ahead = submission("a", dec!(3000));
        ahead.round = Some(RoundId(5));
        assert_matches!(
            net.report_price(ahead, at(8)),
            Err(NetworkError::InvalidRound { .. })
        );

        let mut current = submission("a", dec!(3000));
        current.round = Some(RoundId(2));
        assert_eq!(net.report_price(current, at(8)).unwrap().round, RoundId(2));
    }

    #[test]
    fn test_input_validation() {
        let mut net = network();
        register(&mut net, "a", tokens(100));

        assert_matches!(
            report(&mut net, "a", Decimal::ZERO, at(1)),
            Err(NetworkError::InvalidValue(_))
        );
        let mut sub = submission("a", dec!(3000));
        sub.confidence = dec!(1.5);
        assert_matches!(
            net.report_price(sub, at(1)),
            Err(NetworkError::InvalidConfidence(_))
        );
        assert_matches!(
            report(&mut net, "ghost", dec!(3000), at(1)),
            Err(NetworkError::NotRegistered(_))
        );
        assert_eq!(net.reports().total_reports(), 0);
        assert!(net.feeds().is_empty());
    }

    #[test]
    fn test_served_assets() {
        let mut net = network().with_assets([eth()]);
        register(&mut net, "a", tokens(100));

        let mut sub = submission("a", dec!(3000));
        sub.asset = AssetId::new("DOGE/USD");
        assert_matches!(net.report_price(sub, at(1)), Err(NetworkError::UnknownAsset(_)));

        let mut sub = submission("a", dec!(3000));
        sub.asset = AssetId::new("eth/usd");
        assert_eq!(net.report_price(sub, at(1)).unwrap().asset, eth());
    }

    #[test]
    fn test_master_config_allowlist() {
        let mut master = config::generate_default_config();
        master.assets[1].enabled = false;
        let mut net = OracleNetwork::from_master(&master);
        assert!(net.fund_request(&eth(), tokens(1), at(0)).is_ok());
        assert_matches!(
            net.fund_request(&AssetId::new("BTC/USD"), tokens(1), at(0)),
            Err(NetworkError::UnknownAsset(_))
        );

        // Restored snapshots pick the allowlist up again
        let mut restored = OracleNetwork::from_snapshot(master.protocol.clone(), net.snapshot())
            .unwrap()
            .restrict_to(&master);
        assert_matches!(
            restored.fund_request(&AssetId::new("BTC/USD"), tokens(1), at(1)),
            Err(NetworkError::UnknownAsset(_))
        );

        for asset in master.assets.iter_mut() {
            asset.enabled = false;
        }
        let mut open = OracleNetwork::from_master(&master);
        assert!(open.fund_request(&AssetId::new("SOL/USD"), tokens(1), at(0)).is_ok());
    }

    #[test]
    fn test_deregister_and_cooldown() {
        let mut net = network();
        register(&mut net, "a", tokens(100));
        let a = id("a");

        report(&mut net, "a", dec!(3000), at(0)).unwrap();
        assert_matches!(
            net.deregister(&a, &a, at(10)),
            Err(NetworkError::ActiveRoundsPending { .. })
        );
        assert_matches!(
            net.deregister(&id("b"), &a, at(10)),
            Err(NetworkError::Unauthorized { .. })
        );

        // Past the deadline the round is finalized and the exit proceeds
        net.deregister(&a, &a, at(60)).unwrap();
        assert_eq!(net.oracle(&a).unwrap().status, OracleStatus::Exited);
        assert_eq!(count_events(&net, "round_expired"), 1);
        assert_eq!(count_events(&net, "oracle_exited"), 1);

        assert_matches!(
            net.complete_exit(&a, &a, at(3600)),
            Err(NetworkError::CooldownActive { .. })
        );
        let unlocked = net.complete_exit(&a, &a, at(60 + 86_400)).unwrap();
        assert_eq!(unlocked, tokens(100));

        let balance = net.withdraw_stake(&a, &a, tokens(100), at(60 + 86_401)).unwrap();
        assert_eq!(balance, 0);
        assert_eq!(count_events(&net, "stake_withdrawn"), 1);
    }

    #[test]
    fn test_withdraw_rules() {
        let mut net = network();
        register(&mut net, "a", tokens(150));
        let a = id("a");

        assert_matches!(
            net.withdraw_stake(&id("b"), &a, 1, at(1)),
            Err(NetworkError::Unauthorized { .. })
        );
        assert_matches!(
            net.withdraw_stake(&a, &a, tokens(60), at(1)),
            Err(NetworkError::Stake(StakeError::BelowMinimumStake { .. }))
        );
        assert_matches!(
            net.withdraw_stake(&a, &a, tokens(10), at(1)),
            Err(NetworkError::Stake(StakeError::StakeLocked { .. }))
        );
        assert_eq!(net.ledger().balance(&a), tokens(150));
    }

    #[test]
    fn test_rewards_and_commission() {
        let mut config = ProtocolConfig::default();
        config.incentives.request_fee = 1_000;
        let mut net = network_with(config);
        for name in ["a", "b", "c"] {
            register(&mut net, name, tokens(100));
        }

        assert_matches!(
            net.fund_request(&eth(), 999, at(0)),
            Err(NetworkError::FeeTooLow { .. })
        );
        assert_eq!(net.fund_request(&eth(), 1_000, at(0)).unwrap(), 1_000);
        let before = net.ledger().total_value();

        report(&mut net, "a", dec!(3000), at(1)).unwrap();
        report(&mut net, "b", dec!(3000), at(2)).unwrap();
        let receipt = report(&mut net, "c", dec!(3000), at(3)).unwrap();
        assert_eq!(receipt.finalized[0].rewards_paid, 999);

        for name in ["a", "b", "c"] {
            let perf = net.oracle_performance(&id(name)).unwrap();
            assert_eq!(perf.counters.total_rewards, 333);
            assert_eq!(perf.counters.total_commission, 33);
            assert_eq!(perf.average_accuracy, Some(Decimal::ONE));
            assert_eq!(net.ledger().free(&id(name)), 333);
        }
        assert_eq!(net.reports().get(&eth()).unwrap().accrued_fees, 1);
        assert_eq!(net.ledger().reward_pool(), 1);
        assert_eq!(net.ledger().total_value(), before);
        assert_eq!(net.network_stats().total_rewards, 999);
        assert_eq!(count_events(&net, "oracle_rewarded"), 3);

        // Rewards are free balance and can be withdrawn while active
        let a = id("a");
        assert_eq!(net.withdraw_stake(&a, &a, 333, at(4)).unwrap(), tokens(100));
    }

    #[test]
    fn test_missed_rounds_suspend_and_reactivate() {
        let mut config = ProtocolConfig::default();
        config.incentives.missed_rounds_limit = 1;
        config.incentives.missed_round_decay = dec!(0.5);
        let mut net = network_with(config);
        for name in ["a", "b", "c", "e"] {
            register(&mut net, name, tokens(100));
        }

        // Round 1: e reports and starts serving the asset
        report(&mut net, "e", dec!(3000), at(1)).unwrap();
        report(&mut net, "a", dec!(3000), at(2)).unwrap();
        report(&mut net, "b", dec!(3000), at(3)).unwrap();
        assert_eq!(net.oracle(&id("e")).unwrap().reputation, dec!(0.6));

        // Round 2: e is silent
        report(&mut net, "a", dec!(3000), at(10)).unwrap();
        report(&mut net, "b", dec!(3000), at(11)).unwrap();
        report(&mut net, "c", dec!(3000), at(12)).unwrap();
        let e = net.oracle(&id("e")).unwrap();
        assert_eq!(e.reputation, dec!(0.3));
        assert_eq!(e.status, OracleStatus::Active);

        // Round 3: decays below the floor
        report(&mut net, "a", dec!(3000), at(20)).unwrap();
        report(&mut net, "b", dec!(3000), at(21)).unwrap();
        report(&mut net, "c", dec!(3000), at(22)).unwrap();
        let e = net.oracle(&id("e")).unwrap();
        assert_eq!(e.reputation, dec!(0.15));
        assert_eq!(e.status, OracleStatus::Suspended);

        let suspended = net.events().iter().find_map(|e| match &e.event {
            NetworkEvent::OracleSuspended { reason, .. } => Some(*reason),
            _ => None,
        });
        assert_matches!(suspended, Some(SuspensionReason::ReputationBelowFloor { .. }));

        let perf = net.oracle_performance(&id("e")).unwrap();
        assert_eq!(perf.counters.rounds_missed, 2);
        assert_eq!(perf.uptime, Some(dec!(1) / dec!(3)));
        assert_eq!(net.active_oracles().len(), 3);

        let e_id = id("e");
        net.reactivate(&e_id, &e_id, at(30)).unwrap();
        let e = net.oracle(&e_id).unwrap();
        assert_eq!(e.status, OracleStatus::Active);
        assert_eq!(e.reputation, dec!(0.2));
        assert_eq!(count_events(&net, "oracle_reactivated"), 1);
    }

    #[test]
    fn test_settlement_failure_halts_asset() {
        let mut net = network();
        for name in ["a", "b", "c"] {
            register(&mut net, name, tokens(100));
        }
        net.reports.entry(&eth()).feed.latest_round = Some(RoundId(7));
        let ledger_before = net.ledger().clone();

        report(&mut net, "a", dec!(3000), at(1)).unwrap();
        report(&mut net, "b", dec!(3000), at(2)).unwrap();
        assert_matches!(
            report(&mut net, "c", dec!(3000), at(3)),
            Err(NetworkError::InvariantViolation(_))
        );

        assert!(net.halted(&eth()).is_some());
        assert_eq!(net.ledger(), &ledger_before);
        assert_eq!(count_events(&net, "asset_halted"), 1);
        assert_eq!(net.oracle(&id("a")).unwrap().reputation, dec!(0.5));

        assert_matches!(
            report(&mut net, "a", dec!(3001), at(4)),
            Err(NetworkError::AssetHalted { .. })
        );
        assert_matches!(
            net.close_round(&eth(), at(100)),
            Err(NetworkError::AssetHalted { .. })
        );
        assert!(net.close_expired_rounds(at(100)).is_empty());
        assert_eq!(count_events(&net, "asset_halted"), 1);

        net.resume_asset(&eth(), at(5)).unwrap();
        assert!(net.halted(&eth()).is_none());
        assert_matches!(
            net.resume_asset(&eth(), at(6)),
            Err(NetworkError::InvalidInput(_))
        );
    }

    #[test]
    fn test_snapshot_restore() {
        let mut config = ProtocolConfig::default();
        config.incentives.request_fee = 1_000;
        let mut net = network_with(config.clone());
        for name in ["a", "b", "c"] {
            register(&mut net, name, tokens(100));
        }
        net.fund_request(&eth(), 5_000, at(0)).unwrap();
        report(&mut net, "a", dec!(3000), at(1)).unwrap();
        report(&mut net, "b", dec!(3050), at(2)).unwrap();
        report(&mut net, "c", dec!(3100), at(3)).unwrap();
        report(&mut net, "a", dec!(3020), at(4)).unwrap();

        let snapshot = net.snapshot();
        let restored = OracleNetwork::from_snapshot(config.clone(), snapshot.clone()).unwrap();
        assert_eq!(restored.snapshot(), snapshot);
        assert_eq!(restored.latest(&eth()).unwrap().latest_value, Some(dec!(3050)));
        assert_eq!(restored.events_since(1).len(), net.events().len());

        let mut broken = snapshot;
        broken.reports.entry(&eth()).accrued_fees = tokens(1_000);
        assert_matches!(
            OracleNetwork::from_snapshot(config, broken),
            Err(NetworkError::InvariantViolation(_))
        );
    }

    #[test]
    fn test_replay_is_deterministic() {
        let run = || {
            let mut config = ProtocolConfig::default();
            config.consensus.reports_to_close = Some(4);
            config.incentives.request_fee = 1;
            let mut net = network_with(config);
            for (i, name) in ["a", "b", "c", "d"].iter().enumerate() {
                register(&mut net, name, tokens(100 + 50 * i as u64));
            }
            for round in 0..5i64 {
                net.fund_request(&eth(), 777, at(round * 100)).unwrap();
                for (i, name) in ["a", "b", "c", "d"].iter().enumerate() {
                    let value = Decimal::from(3000 + 7 * round + 13 * i as i64);
                    report(&mut net, name, value, at(round * 100 + i as i64 + 1)).unwrap();
                }
            }
            net.snapshot()
        };
        assert_eq!(run(), run());
    }
}
