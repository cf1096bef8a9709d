use rust_decimal::Decimal;

/// Unweighted median; the midpoint of the two middle values for even counts
pub fn median(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort();

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some(midpoint(sorted[mid - 1], sorted[mid]))
    } else {
        Some(sorted[mid])
    }
}

/// Halving each side first only when the plain sum does not fit
fn midpoint(a: Decimal, b: Decimal) -> Decimal {
    match a.checked_add(b) {
        Some(sum) => sum / Decimal::TWO,
        None => a / Decimal::TWO + b / Decimal::TWO,
    }
}

/// Relative distance `|value - reference| / reference`
///
/// Saturates at `Decimal::MAX` for a zero reference or when the ratio does
/// not fit, so such a value always lands outside any deviation band.
pub fn relative_deviation(value: Decimal, reference: Decimal) -> Decimal {
    if reference.is_zero() {
        return Decimal::MAX;
    }
    value
        .checked_sub(reference)
        .and_then(|diff| diff.checked_div(reference))
        .map(|ratio| ratio.abs())
        .unwrap_or(Decimal::MAX)
}

/// True when `value` is within `max_fraction` of `reference`
pub fn within_deviation(value: Decimal, reference: Decimal, max_fraction: Decimal) -> bool {
    relative_deviation(value, reference) <= max_fraction
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn huge() -> Decimal {
        Decimal::from_i128_with_scale(7 * 10i128.pow(28), 0)
    }

    fn tiny() -> Decimal {
        Decimal::new(1, 20)
    }

    #[test]
    fn test_odd_count() {
        assert_eq!(median(&[dec!(3100), dec!(3000), dec!(3050)]), Some(dec!(3050)));
    }

    #[test]
    fn test_even_count_midpoint() {
        let values = [dec!(3000), dec!(3050), dec!(3100), dec!(50000)];
        assert_eq!(median(&values), Some(dec!(3075)));
    }

    #[test]
    fn test_even_count_near_max() {
        assert_eq!(median(&[huge(), huge()]), Some(huge()));
        assert_eq!(median(&[Decimal::MAX, Decimal::MAX]), Some(Decimal::MAX));
    }

    #[test]
    fn test_empty() {
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_deviation_boundary_inclusive() {
        assert!(within_deviation(dec!(110), dec!(100), dec!(0.1)));
        assert!(!within_deviation(dec!(110.01), dec!(100), dec!(0.1)));
        assert!(within_deviation(dec!(90), dec!(100), dec!(0.1)));
    }

    #[test]
    fn test_deviation_saturates() {
        assert_eq!(relative_deviation(huge(), tiny()), Decimal::MAX);
        assert_eq!(relative_deviation(dec!(1), Decimal::ZERO), Decimal::MAX);
        assert!(!within_deviation(huge(), tiny(), dec!(0.1)));
        assert!(within_deviation(tiny(), tiny(), dec!(0.1)));
    }
}
