use common::Amount;
use rust_decimal::Decimal;

/// Normalize stakes to shares summing to one, capping each share at `cap`.
///
/// Excess above the cap is redistributed to uncapped entries in proportion to
/// their stake, repeating until no entry exceeds the cap. A cap that cannot be
/// met (`n * cap < 1`) is raised to `1 / n`. Zero total stake yields equal
/// shares.
pub fn cap_weights(stakes: &[Amount], cap: Decimal) -> Vec<Decimal> {
    let n = stakes.len();
    if n == 0 {
        return Vec::new();
    }

    let count = Decimal::from(n as u64);
    let floor = Decimal::ONE / count;
    let cap = if cap * count < Decimal::ONE { floor } else { cap };

    let stakes: Vec<Decimal> = stakes.iter().map(|s| Decimal::from(*s)).collect();
    if stakes.iter().all(Decimal::is_zero) {
        return vec![floor; n];
    }

    let mut capped = vec![false; n];
    let mut weights = vec![Decimal::ZERO; n];

    loop {
        let capped_count = capped.iter().filter(|c| **c).count();
        let remaining = Decimal::ONE - cap * Decimal::from(capped_count as u64);
        let uncapped_stake: Decimal = stakes
            .iter()
            .zip(&capped)
            .filter(|(_, c)| !**c)
            .map(|(s, _)| *s)
            .sum();

        let mut newly_capped = false;
        for i in 0..n {
            if capped[i] {
                weights[i] = cap;
                continue;
            }
            weights[i] = if uncapped_stake.is_zero() {
                Decimal::ZERO
            } else {
                remaining * stakes[i] / uncapped_stake
            };
            if weights[i] > cap {
                capped[i] = true;
                newly_capped = true;
            }
        }

        if !newly_capped {
            return weights;
        }
    }
}

/// Weighted median of `(value, weight)` pairs already sorted by value and
/// tie-break key: the first value whose cumulative weight reaches half the
/// total. An exact half split resolves to the lower value.
pub fn weighted_median(sorted: &[(Decimal, Decimal)]) -> Option<Decimal> {
    let total: Decimal = sorted.iter().map(|(_, w)| *w).sum();
    if total <= Decimal::ZERO {
        return None;
    }

    let mut cumulative = Decimal::ZERO;
    for (value, weight) in sorted {
        cumulative += *weight;
        if cumulative * Decimal::TWO >= total {
            return Some(*value);
        }
    }
    sorted.last().map(|(v, _)| *v)
}
