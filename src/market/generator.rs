// src/market/generator.rs
use rand::Rng;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::warn;

use crate::config::MarketConfig;
use crate::market::book::PriceBook;
use crate::utils::precision::round_price;

/// Quotes never fall below this. One cent in quote currency.
const PRICE_FLOOR: Decimal = dec!(0.01);

/// Synthetic price source: a multiplicative random walk per instrument.
/// Generic over the Rng so tests can seed it and replay identical series.
pub struct PriceGenerator<R: Rng> {
    rng: R,
    smoothing_draws: u32,
    max_step_ratio: f64,
    drift: f64,
    price_precision: u32,
}

impl<R: Rng> PriceGenerator<R> {
    pub fn new(rng: R, market: &MarketConfig) -> Self {
        Self {
            rng,
            smoothing_draws: market.smoothing_draws.max(1),
            max_step_ratio: market.max_step_ratio,
            drift: market.drift,
            price_precision: market.price_precision,
        }
    }

    /// Starting quote: the configured base nudged upward by less than 1%
    /// so each session opens from a slightly different level.
    pub fn initial_price(&mut self, base: Decimal) -> Decimal {
        let jitter = self.rng.gen_range(0.0..0.01);
        let factor = Decimal::from_f64(1.0 + jitter).unwrap_or(Decimal::ONE);
        round_price(base * factor, self.price_precision).max(PRICE_FLOOR)
    }

    /// Advances every instrument one step. A conversion failure on one
    /// instrument is logged and skipped; the rest of the book still moves.
    pub fn tick(&mut self, book: &mut PriceBook) {
        for index in 0..book.len() {
            let (volatility, old_price) = {
                let entry = book.at(index);
                (entry.volatility, entry.price)
            };

            let change = self.next_change(volatility);
            let factor = match Decimal::from_f64(1.0 + change) {
                Some(f) => f,
                None => {
                    warn!(
                        symbol = %book.at(index).symbol,
                        change,
                        "skipping unrepresentable price change"
                    );
                    continue;
                }
            };

            let price = round_price(old_price * factor, self.price_precision).max(PRICE_FLOOR);
            book.set_price_at(index, price);
        }
    }

    /// Relative change for one step: the mean of several uniform draws
    /// (smoother than a single draw) plus the drift bias, scaled by the
    /// instrument volatility and clamped to the per-step limit.
    fn next_change(&mut self, volatility: f64) -> f64 {
        let mut sum = 0.0;
        for _ in 0..self.smoothing_draws {
            sum += self.rng.gen_range(-1.0..1.0);
        }
        let shock = sum / self.smoothing_draws as f64 + self.drift;

        let limit = self.max_step_ratio * volatility;
        (shock * volatility).clamp(-limit, limit)
    }
}
