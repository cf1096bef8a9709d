//! Oracle registry
//!
//! Identity, endpoint, commission and status of every oracle. Stake lives in
//! the [`StakeLedger`]; the registry enforces the minimum through it.

use chrono::{DateTime, Utc};
use common::{Amount, OracleId};
use config::StakingConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use staking::StakeLedger;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::{info, warn};
use url::Url;

use crate::error::NetworkError;
use crate::types::{Oracle, OracleCounters, OracleStatus, Registration, SuspensionReason};
use crate::Result;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OracleRegistry {
    oracles: BTreeMap<OracleId, Oracle>,
}

/// Parse an oracle endpoint; it must be an absolute URL with a host
pub fn parse_endpoint(endpoint: &str) -> Result<Url> {
    let url = Url::parse(endpoint.trim())
        .map_err(|e| NetworkError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;
    if !url.has_host() {
        return Err(NetworkError::InvalidEndpoint(format!(
            "{}: missing host",
            endpoint
        )));
    }
    Ok(url)
}

fn check_commission(commission: Decimal, max: Decimal) -> Result<()> {
    if commission < Decimal::ZERO || commission > max {
        return Err(NetworkError::InvalidCommission { commission, max });
    }
    Ok(())
}

pub(crate) fn authorize(caller: &OracleId, oracle: &OracleId) -> Result<()> {
    if caller != oracle {
        return Err(NetworkError::Unauthorized {
            caller: caller.clone(),
            oracle: oracle.clone(),
        });
    }
    Ok(())
}

impl OracleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &OracleId) -> Option<&Oracle> {
        self.oracles.get(id)
    }

    pub fn get_mut(&mut self, id: &OracleId) -> Option<&mut Oracle> {
        self.oracles.get_mut(id)
    }

    pub fn oracle(&self, id: &OracleId) -> Result<&Oracle> {
        self.oracles
            .get(id)
            .ok_or_else(|| NetworkError::UnknownOracle(id.clone()))
    }

    fn oracle_mut(&mut self, id: &OracleId) -> Result<&mut Oracle> {
        self.oracles
            .get_mut(id)
            .ok_or_else(|| NetworkError::UnknownOracle(id.clone()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Oracle> {
        self.oracles.values()
    }

    pub fn len(&self) -> usize {
        self.oracles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.oracles.is_empty()
    }

    /// Active with at least the minimum stake locked
    pub fn is_eligible(&self, id: &OracleId, ledger: &StakeLedger, min_stake: Amount) -> bool {
        self.oracles
            .get(id)
            .map(|o| o.is_active() && ledger.locked(id) >= min_stake)
            .unwrap_or(false)
    }

    /// Register a new oracle, depositing and locking its stake.
    ///
    /// Nothing is recorded when validation fails. An exited oracle may
    /// register again under the same id.
    pub fn register(
        &mut self,
        ledger: &mut StakeLedger,
        registration: &Registration,
        staking: &StakingConfig,
        neutral_reputation: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Oracle> {
        let id = OracleId::parse(&registration.id)?;
        let endpoint = parse_endpoint(&registration.endpoint)?;
        check_commission(registration.commission, staking.max_commission)?;

        if let Some(existing) = self.oracles.get(&id) {
            if existing.status != OracleStatus::Exited {
                return Err(NetworkError::AlreadyRegistered(id));
            }
        }

        if registration.stake < staking.min_stake_amount {
            return Err(NetworkError::InsufficientStake {
                required: staking.min_stake_amount,
                provided: registration.stake,
            });
        }

        ledger.deposit(&id, registration.stake)?;
        ledger.lock(&id, registration.stake)?;

        let oracle = Oracle {
            id: id.clone(),
            endpoint,
            commission: registration.commission,
            status: OracleStatus::Active,
            reputation: neutral_reputation,
            registered_at: now,
            exit_requested_at: None,
            missed_rounds: 0,
            assets: BTreeSet::new(),
            counters: OracleCounters::default(),
            history: VecDeque::new(),
        };
        self.oracles.insert(id.clone(), oracle.clone());

        info!(
            oracle = %id,
            stake = registration.stake,
            commission = %registration.commission,
            "Oracle registered"
        );
        Ok(oracle)
    }

    pub fn update_endpoint(
        &mut self,
        caller: &OracleId,
        id: &OracleId,
        endpoint: &str,
    ) -> Result<Url> {
        authorize(caller, id)?;
        let url = parse_endpoint(endpoint)?;
        let oracle = self.oracle_mut(id)?;
        oracle.endpoint = url.clone();
        info!(oracle = %id, endpoint = %url, "Oracle endpoint updated");
        Ok(url)
    }

    pub fn update_commission(
        &mut self,
        caller: &OracleId,
        id: &OracleId,
        commission: Decimal,
        max: Decimal,
    ) -> Result<()> {
        authorize(caller, id)?;
        check_commission(commission, max)?;
        let oracle = self.oracle_mut(id)?;
        oracle.commission = commission;
        info!(oracle = %id, commission = %commission, "Oracle commission updated");
        Ok(())
    }

    /// Mark an oracle as exited; pending-round checks are the caller's job
    pub fn request_exit(
        &mut self,
        caller: &OracleId,
        id: &OracleId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        authorize(caller, id)?;
        let oracle = self.oracle_mut(id)?;
        if oracle.status == OracleStatus::Exited {
            return Err(NetworkError::InvalidStatus {
                oracle: id.clone(),
                status: oracle.status,
            });
        }
        oracle.status = OracleStatus::Exited;
        oracle.exit_requested_at = Some(now);
        info!(oracle = %id, "Oracle deregistered");
        Ok(())
    }

    /// Unlock all remaining stake once the exit cooldown has passed
    pub fn complete_exit(
        &mut self,
        ledger: &mut StakeLedger,
        caller: &OracleId,
        id: &OracleId,
        cooldown: chrono::Duration,
        now: DateTime<Utc>,
    ) -> Result<Amount> {
        authorize(caller, id)?;
        let oracle = self.oracle(id)?;
        let requested_at = match (oracle.status, oracle.exit_requested_at) {
            (OracleStatus::Exited, Some(at)) => at,
            (status, _) => {
                return Err(NetworkError::InvalidStatus {
                    oracle: id.clone(),
                    status,
                })
            }
        };

        let release_at = requested_at + cooldown;
        if now < release_at {
            return Err(NetworkError::CooldownActive {
                oracle: id.clone(),
                remaining_secs: (release_at - now).num_seconds().max(1),
            });
        }

        let locked = ledger.locked(id);
        if locked > 0 {
            ledger.unlock(id, locked)?;
        }
        info!(oracle = %id, unlocked = locked, "Oracle exit completed");
        Ok(locked)
    }

    /// Deposit and lock additional stake; returns the new locked amount
    pub fn restake(
        &mut self,
        ledger: &mut StakeLedger,
        caller: &OracleId,
        id: &OracleId,
        amount: Amount,
    ) -> Result<Amount> {
        authorize(caller, id)?;
        let oracle = self.oracle(id)?;
        if oracle.status == OracleStatus::Exited {
            return Err(NetworkError::InvalidStatus {
                oracle: id.clone(),
                status: oracle.status,
            });
        }
        ledger.deposit(id, amount)?;
        ledger.lock(id, amount)?;
        Ok(ledger.locked(id))
    }

    /// Return a suspended oracle to service
    pub fn reactivate(
        &mut self,
        ledger: &StakeLedger,
        caller: &OracleId,
        id: &OracleId,
        min_stake: Amount,
        reputation_floor: Decimal,
    ) -> Result<()> {
        authorize(caller, id)?;
        let locked = ledger.locked(id);
        let oracle = self.oracle_mut(id)?;
        if oracle.status != OracleStatus::Suspended {
            return Err(NetworkError::InvalidStatus {
                oracle: id.clone(),
                status: oracle.status,
            });
        }
        if locked < min_stake {
            return Err(NetworkError::InsufficientStake {
                required: min_stake,
                provided: locked,
            });
        }

        oracle.status = OracleStatus::Active;
        oracle.reputation = oracle.reputation.max(reputation_floor);
        oracle.missed_rounds = 0;
        info!(oracle = %id, reputation = %oracle.reputation, "Oracle reactivated");
        Ok(())
    }

    /// Suspend an active oracle; returns false when it was not active
    pub fn suspend(&mut self, id: &OracleId, reason: SuspensionReason) -> bool {
        match self.oracles.get_mut(id) {
            Some(oracle) if oracle.is_active() => {
                oracle.status = OracleStatus::Suspended;
                warn!(oracle = %id, reason = ?reason, "Oracle suspended");
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use common::tokens;
    use rust_decimal_macros::dec;

    fn staking() -> StakingConfig {
        StakingConfig::default()
    }

    fn registration(id: &str, stake: Amount) -> Registration {
        Registration {
            id: id.to_string(),
            endpoint: format!("https://{}.oracles.example/feed", id),
            stake,
            commission: dec!(0.1),
        }
    }

    fn setup() -> (OracleRegistry, StakeLedger) {
        (OracleRegistry::new(), StakeLedger::new())
    }

    #[test]
    fn test_register_locks_stake() {
        let (mut registry, mut ledger) = setup();
        let now = Utc::now();
        let oracle = registry
            .register(&mut ledger, &registration("alice", tokens(150)), &staking(), dec!(0.5), now)
            .unwrap();

        assert_eq!(oracle.status, OracleStatus::Active);
        assert_eq!(oracle.reputation, dec!(0.5));
        assert_eq!(ledger.locked(&oracle.id), tokens(150));
        assert!(registry.is_eligible(&oracle.id, &ledger, tokens(100)));
    }

    #[test]
    fn test_insufficient_stake_creates_nothing() {
        let (mut registry, mut ledger) = setup();
        let result = registry.register(
            &mut ledger,
            &registration("alice", tokens(100) - 1),
            &staking(),
            dec!(0.5),
            Utc::now(),
        );
        assert_matches!(result, Err(NetworkError::InsufficientStake { .. }));
        assert!(registry.is_empty());
        assert_eq!(ledger.total_value(), 0);
    }

    #[test]
    fn test_duplicate_and_reregistration() {
        let (mut registry, mut ledger) = setup();
        let now = Utc::now();
        let reg = registration("alice", tokens(100));
        registry.register(&mut ledger, &reg, &staking(), dec!(0.5), now).unwrap();
        assert_matches!(
            registry.register(&mut ledger, &reg, &staking(), dec!(0.5), now),
            Err(NetworkError::AlreadyRegistered(_))
        );

        let id = OracleId::new("alice");
        registry.request_exit(&id, &id, now).unwrap();
        assert!(registry.register(&mut ledger, &reg, &staking(), dec!(0.5), now).is_ok());
    }

    #[test]
    fn test_validation_errors() {
        let (mut registry, mut ledger) = setup();
        let now = Utc::now();

        let mut reg = registration("alice", tokens(100));
        reg.endpoint = "not a url".to_string();
        assert_matches!(
            registry.register(&mut ledger, &reg, &staking(), dec!(0.5), now),
            Err(NetworkError::InvalidEndpoint(_))
        );

        let mut reg = registration("alice", tokens(100));
        reg.commission = dec!(0.9);
        assert_matches!(
            registry.register(&mut ledger, &reg, &staking(), dec!(0.5), now),
            Err(NetworkError::InvalidCommission { .. })
        );

        let reg = registration("", tokens(100));
        assert_matches!(
            registry.register(&mut ledger, &reg, &staking(), dec!(0.5), now),
            Err(NetworkError::InvalidInput(_))
        );
    }

    #[test]
    fn test_owner_only_updates() {
        let (mut registry, mut ledger) = setup();
        registry
            .register(&mut ledger, &registration("alice", tokens(100)), &staking(), dec!(0.5), Utc::now())
            .unwrap();
        let alice = OracleId::new("alice");
        let mallory = OracleId::new("mallory");

        assert_matches!(
            registry.update_endpoint(&mallory, &alice, "https://evil.example"),
            Err(NetworkError::Unauthorized { .. })
        );
        registry
            .update_endpoint(&alice, &alice, "https://alice2.example")
            .unwrap();
        registry
            .update_commission(&alice, &alice, dec!(0.2), dec!(0.5))
            .unwrap();

        let oracle = registry.oracle(&alice).unwrap();
        assert_eq!(oracle.endpoint.host_str(), Some("alice2.example"));
        assert_eq!(oracle.commission, dec!(0.2));
        assert_eq!(ledger.locked(&alice), tokens(100));
    }

    #[test]
    fn test_exit_cooldown() {
        let (mut registry, mut ledger) = setup();
        let now = Utc::now();
        registry
            .register(&mut ledger, &registration("alice", tokens(100)), &staking(), dec!(0.5), now)
            .unwrap();
        let alice = OracleId::new("alice");
        let cooldown = chrono::Duration::hours(24);

        assert_matches!(
            registry.complete_exit(&mut ledger, &alice, &alice, cooldown, now),
            Err(NetworkError::InvalidStatus { .. })
        );

        registry.request_exit(&alice, &alice, now).unwrap();
        assert!(!registry.is_eligible(&alice, &ledger, tokens(100)));
        assert_matches!(
            registry.complete_exit(&mut ledger, &alice, &alice, cooldown, now + chrono::Duration::hours(1)),
            Err(NetworkError::CooldownActive { .. })
        );

        let unlocked = registry
            .complete_exit(&mut ledger, &alice, &alice, cooldown, now + cooldown)
            .unwrap();
        assert_eq!(unlocked, tokens(100));
        assert_eq!(ledger.free(&alice), tokens(100));
    }

    #[test]
    fn test_suspend_and_reactivate() {
        let (mut registry, mut ledger) = setup();
        registry
            .register(&mut ledger, &registration("alice", tokens(100)), &staking(), dec!(0.5), Utc::now())
            .unwrap();
        let alice = OracleId::new("alice");

        assert!(registry.suspend(&alice, SuspensionReason::ReputationBelowFloor { reputation: dec!(0.1) }));
        assert!(!registry.suspend(&alice, SuspensionReason::ReputationBelowFloor { reputation: dec!(0.1) }));
        registry.get_mut(&alice).unwrap().reputation = dec!(0.1);

        registry
            .reactivate(&ledger, &alice, &alice, tokens(100), dec!(0.2))
            .unwrap();
        let oracle = registry.oracle(&alice).unwrap();
        assert!(oracle.is_active());
        assert_eq!(oracle.reputation, dec!(0.2));

        assert_matches!(
            registry.reactivate(&ledger, &alice, &alice, tokens(100), dec!(0.2)),
            Err(NetworkError::InvalidStatus { .. })
        );
    }

    #[test]
    fn test_reactivate_requires_stake() {
        let (mut registry, mut ledger) = setup();
        registry
            .register(&mut ledger, &registration("alice", tokens(100)), &staking(), dec!(0.5), Utc::now())
            .unwrap();
        let alice = OracleId::new("alice");
        ledger
            .slash(&alice, tokens(10), staking::Beneficiary::RewardPool)
            .unwrap();
        registry.suspend(&alice, SuspensionReason::StakeBelowMinimum { locked: tokens(90), minimum: tokens(100) });

        assert_matches!(
            registry.reactivate(&ledger, &alice, &alice, tokens(100), dec!(0.2)),
            Err(NetworkError::InsufficientStake { .. })
        );

        registry.restake(&mut ledger, &alice, &alice, tokens(10)).unwrap();
        registry
            .reactivate(&ledger, &alice, &alice, tokens(100), dec!(0.2))
            .unwrap();
    }
}
