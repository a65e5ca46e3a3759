// src/utils/precision.rs
use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds a price (or any settled amount) to the quote-currency
/// granularity. Example: 100.166 at 2 dp -> 100.17
pub fn round_price(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Floors a quantity to its precision so exposure is never overstated.
/// Example: 33.33339 at 4 dp -> 33.3333
pub fn floor_quantity(quantity: Decimal, dp: u32) -> Decimal {
    quantity.round_dp_with_strategy(dp, RoundingStrategy::ToZero)
}
