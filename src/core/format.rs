use rust_decimal::{Decimal, RoundingStrategy};

const SMALL_VALUE: Decimal = Decimal::from_parts(1, 0, 0, false, 1);

/// Renders an amount for display.
///
/// Values below 0.1 in magnitude keep 8 fractional digits, everything else 4,
/// then trailing zeros and a dangling point are dropped. Only call this on final
/// results, never between arithmetic steps.
pub fn format_decimal(value: Decimal) -> String {
    let places = if value.abs() < SMALL_VALUE { 8 } else { 4 };
    let rounded = value
        .round_dp_with_strategy(places, RoundingStrategy::MidpointNearestEven)
        .normalize();
    if rounded.is_zero() {
        return "0".to_string();
    }
    rounded.to_string()
}
