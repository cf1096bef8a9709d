//! Seeded in-process simulation
//!
//! Registers a set of oracles, runs report rounds around a random-walk
//! price, and collects the network's own statistics at the end. Oracle 0 is
//! a rogue reporter that frequently quotes far from the market.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use common::{AssetId, OracleId};
use config::ProtocolConfig;
use oracle_network::{
    AssetFeed, NetworkStats, OracleNetwork, OraclePerformance, Registration, ReportSubmission,
    RoundOutcome, RoundStatus,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use tracing::{debug, info};

/// Simulated start time (2023-11-14T22:13:20Z)
const GENESIS_TIMESTAMP: i64 = 1_700_000_000;

/// Probability that the rogue oracle misreports in a round
const ROGUE_RATE: f64 = 0.6;

/// Probability that an honest oracle sits out a round
const SKIP_RATE: f64 = 0.05;

#[derive(Debug, Clone)]
pub struct SimulationOptions {
    pub oracles: usize,
    pub rounds: u64,
    pub seed: u64,
    pub asset: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationReport {
    pub asset: AssetId,
    pub rounds_published: u64,
    pub rounds_expired: u64,
    pub reports_rejected: u64,
    pub feed: Option<AssetFeed>,
    pub stats: NetworkStats,
    pub oracles: Vec<OraclePerformance>,
}

fn oracle_name(index: usize) -> String {
    if index == 0 {
        "rogue".to_string()
    } else {
        format!("oracle-{}", index)
    }
}

/// Apply a move of `bps` basis points
fn shift(value: Decimal, bps: i64) -> Decimal {
    (value * (Decimal::ONE + Decimal::new(bps, 4))).round_dp(2)
}

/// Rounds close early only once every oracle has reported, unless the
/// config sets its own threshold; one simulated step is then one round.
pub fn run(mut protocol: ProtocolConfig, options: &SimulationOptions) -> Result<SimulationReport> {
    if options.oracles == 0 {
        return Err(anyhow!("simulation needs at least one oracle"));
    }
    if protocol.consensus.reports_to_close.is_none() {
        protocol.consensus.reports_to_close =
            Some(options.oracles.max(protocol.consensus.min_quorum));
    }

    let asset = AssetId::parse(&options.asset)?;
    let genesis: DateTime<Utc> = Utc
        .timestamp_opt(GENESIS_TIMESTAMP, 0)
        .single()
        .ok_or_else(|| anyhow!("invalid genesis timestamp"))?;
    let round_length = Duration::seconds(
        i64::try_from(protocol.consensus.round_duration_seconds)?.saturating_mul(2),
    );
    let deadline_offset =
        Duration::seconds(i64::try_from(protocol.consensus.round_duration_seconds)? + 1);
    let min_stake = protocol.staking.min_stake_amount;
    let request_fee = protocol.incentives.request_fee;

    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut network = OracleNetwork::new(protocol);

    info!(
        oracles = options.oracles,
        rounds = options.rounds,
        seed = options.seed,
        asset = %asset,
        "Starting simulation"
    );

    let ids: Vec<OracleId> = (0..options.oracles)
        .map(|index| OracleId::new(oracle_name(index)))
        .collect();
    for id in &ids {
        let registration = Registration {
            id: id.to_string(),
            endpoint: format!("https://{}.oracles.example", id),
            stake: min_stake.saturating_mul(rng.gen_range(1..=3)),
            commission: Decimal::new(rng.gen_range(0..=10), 2),
        };
        network.register_oracle(&registration, genesis)?;
    }

    let mut price = Decimal::new(300_000, 2);
    let mut outcomes: Vec<RoundOutcome> = Vec::new();
    let mut rejected = 0u64;

    for round in 0..options.rounds {
        let now = genesis + round_length * i32::try_from(round)?;
        price = shift(price, rng.gen_range(-50..=50));

        network.fund_request(&asset, request_fee, now)?;

        for (index, id) in ids.iter().enumerate() {
            if !network.is_eligible(id) {
                continue;
            }
            let value = if index == 0 && rng.gen_bool(ROGUE_RATE) {
                shift(price, 2_500)
            } else if index != 0 && rng.gen_bool(SKIP_RATE) {
                continue;
            } else {
                shift(price, rng.gen_range(-20..=20))
            };

            let submission = ReportSubmission {
                oracle: id.clone(),
                asset: asset.clone(),
                value,
                confidence: Decimal::new(rng.gen_range(80..=100), 2),
                round: None,
            };
            match network.report_price(submission, now) {
                Ok(receipt) => outcomes.extend(receipt.finalized),
                Err(e) => {
                    debug!(oracle = %id, error = %e, "Simulated report rejected");
                    rejected += 1;
                }
            }
        }

        outcomes.extend(network.close_expired_rounds(now + deadline_offset));
    }

    let rounds_published = outcomes
        .iter()
        .filter(|o| o.status == RoundStatus::Closed)
        .count() as u64;
    let rounds_expired = outcomes.len() as u64 - rounds_published;

    let oracles = ids
        .iter()
        .map(|id| network.oracle_performance(id))
        .collect::<oracle_network::Result<Vec<_>>>()?;

    let report = SimulationReport {
        feed: network.latest(&asset).ok(),
        asset,
        rounds_published,
        rounds_expired,
        reports_rejected: rejected,
        stats: network.network_stats(),
        oracles,
    };

    info!(
        published = report.rounds_published,
        expired = report.rounds_expired,
        rejected = report.reports_rejected,
        "Simulation complete"
    );
    Ok(report)
}

pub fn print_report(report: &SimulationReport) {
    println!("\n=== Simulation Report ({}) ===\n", report.asset);

    match &report.feed {
        Some(feed) => println!(
            "Latest Value: {} (round {}, {} publications)",
            feed.latest_value.map(|v| v.to_string()).unwrap_or_default(),
            feed.latest_round.map(|r| r.to_string()).unwrap_or_default(),
            feed.publications
        ),
        None => println!("Latest Value: none published"),
    }
    println!("Rounds Published: {}", report.rounds_published);
    println!("Rounds Expired: {}", report.rounds_expired);
    println!("Reports Rejected: {}", report.reports_rejected);
    println!();

    let stats = &report.stats;
    println!("Oracles: {} ({} active)", stats.total_oracles, stats.active_oracles);
    println!("Total Reports: {}", stats.total_reports);
    println!("Total Value Locked: {}", stats.total_value_locked);
    println!("Total Rewards: {}", stats.total_rewards);
    println!("Reward Pool: {}", stats.reward_pool_balance);
    println!();

    println!(
        "{:<12} {:<10} {:>10} {:>14} {:>8} {:>8}",
        "ORACLE", "STATUS", "REPUTATION", "STAKE", "UPTIME", "SLASHED"
    );
    for perf in &report.oracles {
        println!(
            "{:<12} {:<10} {:>10} {:>14} {:>8} {:>8}",
            perf.oracle.as_str(),
            format!("{:?}", perf.status),
            perf.reputation.round_dp(4),
            perf.stake,
            perf.uptime
                .map(|u| u.round_dp(2).to_string())
                .unwrap_or_else(|| "-".to_string()),
            perf.counters.total_slashed
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oracle_network::OracleStatus;
    use rust_decimal_macros::dec;

    fn options(seed: u64) -> SimulationOptions {
        SimulationOptions {
            oracles: 5,
            rounds: 12,
            seed,
            asset: "eth/usd".to_string(),
        }
    }

    #[test]
    fn test_shift() {
        assert_eq!(shift(dec!(3000), 100), dec!(3030));
        assert_eq!(shift(dec!(3000), -20), dec!(2994));
    }

    #[test]
    fn test_simulation_is_reproducible() {
        let first = run(ProtocolConfig::default(), &options(7)).unwrap();
        let second = run(ProtocolConfig::default(), &options(7)).unwrap();
        assert_eq!(first, second);

        assert_eq!(first.asset.as_str(), "ETH/USD");
        assert_eq!(first.stats.total_oracles, 5);
        assert_eq!(first.rounds_published + first.rounds_expired, 12);
        assert!(first.rounds_published > 0);
        let feed = first.feed.unwrap();
        assert_eq!(feed.publications, first.rounds_published);
    }

    #[test]
    fn test_rogue_loses_reputation() {
        let report = run(ProtocolConfig::default(), &options(11)).unwrap();
        let rogue = &report.oracles[0];
        let honest = &report.oracles[1..];

        assert_eq!(rogue.oracle.as_str(), "rogue");
        assert!(honest
            .iter()
            .filter(|p| p.status == OracleStatus::Active)
            .all(|p| p.reputation > rogue.reputation));
    }

    #[test]
    fn test_requires_oracles() {
        let mut opts = options(1);
        opts.oracles = 0;
        assert!(run(ProtocolConfig::default(), &opts).is_err());
    }
}
