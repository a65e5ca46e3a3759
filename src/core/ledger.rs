// src/core/ledger.rs
use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::config::AccountConfig;
use crate::core::risk;
use crate::errors::TradeError;
use crate::types::{PersistedState, Position, Side, TradeRecord};
use crate::utils::precision::{floor_quantity, round_price};

/// Settled amounts (profit, percent) carry quote-currency granularity.
const SETTLEMENT_DP: u32 = 2;

/// Owns the account, the single open position and the trade history.
///
/// Two states: Flat (no position) and Open (exactly one). Every operation
/// either succeeds as a whole or is rejected with a typed error leaving
/// state untouched.
pub struct TradingCore {
    cfg: AccountConfig,
    balance: Decimal,
    leverage: u32,
    stop_loss_percent: Decimal,
    take_profit_percent: Decimal,
    position: Option<Position>,
    history: VecDeque<TradeRecord>,
}

impl TradingCore {
    pub fn new(cfg: AccountConfig) -> Self {
        let balance = cfg.initial_balance;
        let leverage = cfg.default_leverage.clamp(1, cfg.max_leverage);
        Self {
            cfg,
            balance,
            leverage,
            stop_loss_percent: Decimal::ZERO,
            take_profit_percent: Decimal::ZERO,
            position: None,
            history: VecDeque::new(),
        }
    }

    /// Rebuilds the core from a persisted snapshot. Out-of-range values
    /// from an older or hand-edited file are clamped into validity.
    pub fn restore(cfg: AccountConfig, state: PersistedState) -> Self {
        let leverage = state.leverage.clamp(1, cfg.max_leverage);
        let mut history: VecDeque<TradeRecord> = state.trade_history.into();
        while history.len() > cfg.trade_history_cap {
            history.pop_front();
        }
        Self {
            balance: state.balance,
            leverage,
            stop_loss_percent: state.stop_loss_percent.max(Decimal::ZERO),
            take_profit_percent: state.take_profit_percent.max(Decimal::ZERO),
            position: state.open_position,
            history,
            cfg,
        }
    }

    pub fn persisted(&self) -> PersistedState {
        PersistedState {
            balance: self.balance,
            leverage: self.leverage,
            stop_loss_percent: self.stop_loss_percent,
            take_profit_percent: self.take_profit_percent,
            open_position: self.position.clone(),
            trade_history: self.history.iter().cloned().collect(),
        }
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn leverage(&self) -> u32 {
        self.leverage
    }

    pub fn stop_loss_percent(&self) -> Decimal {
        self.stop_loss_percent
    }

    pub fn take_profit_percent(&self) -> Decimal {
        self.take_profit_percent
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    /// Trade history, most recent first.
    pub fn history_newest_first(&self) -> Vec<TradeRecord> {
        self.history.iter().rev().cloned().collect()
    }

    /// Opens a position sized to the full balance at the current leverage:
    /// quantity = balance * leverage / price.
    ///
    /// The balance is deliberately not debited; margin is never escrowed
    /// and profit settles net on close.
    pub fn open(
        &mut self,
        side: Side,
        symbol: &str,
        price: Decimal,
        now: DateTime<Utc>,
    ) -> Result<(), TradeError> {
        if self.position.is_some() {
            return Err(TradeError::PositionAlreadyOpen);
        }
        if self.balance < self.cfg.min_open_balance {
            return Err(TradeError::InsufficientBalance {
                balance: self.balance,
                minimum: self.cfg.min_open_balance,
            });
        }

        let leverage = Decimal::from(self.leverage);
        let quantity = floor_quantity(
            self.balance * leverage / price,
            self.cfg.quantity_precision,
        );
        if quantity <= Decimal::ZERO {
            return Err(TradeError::QuantityTooSmall { price });
        }

        // Margin check. The stake is the whole balance, so the maintenance
        // allowance is granted on both sides of the comparison; a one-sided
        // check would refuse every full-stake open.
        let required = quantity * price / leverage;
        let buffer = self.cfg.maintenance_margin * required;
        let available = self.balance * (Decimal::ONE + self.cfg.maintenance_margin);
        if required + buffer > available {
            return Err(TradeError::InsufficientMargin {
                required: required + buffer,
                available,
            });
        }

        self.position = Some(Position {
            symbol: symbol.to_string(),
            side,
            entry_price: price,
            quantity,
            opened_at: now,
        });
        Ok(())
    }

    /// Closes the open position at `exit_price`: settles realized PnL into
    /// the balance and appends a TradeRecord, evicting the oldest record
    /// once the history ring is full.
    pub fn close(
        &mut self,
        exit_price: Decimal,
        now: DateTime<Utc>,
    ) -> Result<TradeRecord, TradeError> {
        let position = self.position.take().ok_or(TradeError::NoOpenPosition)?;

        let pnl = risk::unrealized_pnl(&position, exit_price, self.leverage);
        let profit = round_price(pnl.profit, SETTLEMENT_DP);
        let profit_percent = round_price(pnl.percent, SETTLEMENT_DP);

        self.balance += profit;

        let record = TradeRecord {
            symbol: position.symbol,
            side: position.side,
            entry_price: position.entry_price,
            exit_price,
            profit,
            profit_percent,
            closed_at: now,
        };
        self.history.push_back(record.clone());
        while self.history.len() > self.cfg.trade_history_cap {
            self.history.pop_front();
        }

        Ok(record)
    }

    /// Updates leverage. A live position is resized to the new buying
    /// power at its original entry price (retroactive re-margining):
    /// quantity = balance * new_leverage / entry_price.
    pub fn set_leverage(&mut self, leverage: u32) -> Result<(), TradeError> {
        if leverage < 1 || leverage > self.cfg.max_leverage {
            return Err(TradeError::InvalidLeverage {
                got: leverage,
                max: self.cfg.max_leverage,
            });
        }
        self.leverage = leverage;

        if let Some(position) = self.position.as_mut() {
            position.quantity = floor_quantity(
                self.balance * Decimal::from(leverage) / position.entry_price,
                self.cfg.quantity_precision,
            );
        }
        Ok(())
    }

    /// Sets both trigger thresholds. Negative values are rejected; exactly
    /// zero disables the corresponding trigger.
    pub fn set_risk_limits(
        &mut self,
        stop_loss_percent: Decimal,
        take_profit_percent: Decimal,
    ) -> Result<(), TradeError> {
        if stop_loss_percent < Decimal::ZERO {
            return Err(TradeError::InvalidRiskLimit(stop_loss_percent));
        }
        if take_profit_percent < Decimal::ZERO {
            return Err(TradeError::InvalidRiskLimit(take_profit_percent));
        }
        self.stop_loss_percent = stop_loss_percent;
        self.take_profit_percent = take_profit_percent;
        Ok(())
    }

    /// Full account wipe back to configured defaults. Destructive; the
    /// presentation layer asks for confirmation before issuing it.
    pub fn reset(&mut self) {
        self.balance = self.cfg.initial_balance;
        self.leverage = self.cfg.default_leverage.clamp(1, self.cfg.max_leverage);
        self.stop_loss_percent = Decimal::ZERO;
        self.take_profit_percent = Decimal::ZERO;
        self.position = None;
        self.history.clear();
    }

    /// Empties the trade history only; balance and position are untouched.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_cfg() -> AccountConfig {
        AccountConfig::default()
    }

    fn core_with_balance(balance: Decimal, leverage: u32) -> TradingCore {
        let mut core = TradingCore::new(test_cfg());
        core.balance = balance;
        core.leverage = leverage;
        core
    }

    #[test]
    fn open_sizes_quantity_from_balance_and_leverage() {
        let mut core = core_with_balance(dec!(1000), 5);
        core.open(Side::Long, "BTC/USDT", dec!(100), Utc::now())
            .unwrap();

        let position = core.position().unwrap();
        assert_eq!(position.quantity, dec!(50));
        assert_eq!(position.entry_price, dec!(100));
        // No escrow: opening never touches the balance.
        assert_eq!(core.balance(), dec!(1000));
    }

    #[test]
    fn second_open_is_rejected_and_leaves_position_intact() {
        let mut core = core_with_balance(dec!(1000), 5);
        core.open(Side::Long, "BTC/USDT", dec!(100), Utc::now())
            .unwrap();

        let err = core
            .open(Side::Short, "ETH/USDT", dec!(50), Utc::now())
            .unwrap_err();
        assert_eq!(err, TradeError::PositionAlreadyOpen);

        let position = core.position().unwrap();
        assert_eq!(position.symbol, "BTC/USDT");
        assert_eq!(position.side, Side::Long);
        assert_eq!(position.quantity, dec!(50));
    }

    #[test]
    fn open_requires_the_minimum_balance() {
        let mut core = core_with_balance(dec!(49.99), 5);

        let err = core
            .open(Side::Long, "BTC/USDT", dec!(100), Utc::now())
            .unwrap_err();
        assert_eq!(
            err,
            TradeError::InsufficientBalance {
                balance: dec!(49.99),
                minimum: dec!(50),
            }
        );
        assert!(core.position().is_none());
    }

    #[test]
    fn open_rejects_a_quantity_that_rounds_to_zero() {
        // 50 * 1 / 10_000_000 floors to zero at 4 dp.
        let mut core = core_with_balance(dec!(50), 1);

        let err = core
            .open(Side::Long, "BTC/USDT", dec!(10000000), Utc::now())
            .unwrap_err();
        assert_eq!(
            err,
            TradeError::QuantityTooSmall {
                price: dec!(10000000)
            }
        );
    }

    #[test]
    fn closing_a_long_settles_profit_into_balance() {
        // balance 100 at 5x and price 100 gives exactly quantity 5.
        let mut core = core_with_balance(dec!(100), 5);
        core.open(Side::Long, "BTC/USDT", dec!(100), Utc::now())
            .unwrap();

        let record = core.close(dec!(110), Utc::now()).unwrap();

        assert_eq!(record.profit, dec!(50.00));
        assert_eq!(core.balance(), dec!(150.00));
        assert!(core.position().is_none());
        assert_eq!(core.history_newest_first().len(), 1);
        assert_eq!(core.history_newest_first()[0].profit, dec!(50.00));
    }

    #[test]
    fn closing_a_short_profits_on_a_fall() {
        let mut core = core_with_balance(dec!(100), 5);
        core.open(Side::Short, "BTC/USDT", dec!(100), Utc::now())
            .unwrap();

        let record = core.close(dec!(90), Utc::now()).unwrap();

        assert_eq!(record.profit, dec!(50.00));
        // Percent is on margin: 50 / (5 * 100 / 5) = 50%.
        assert_eq!(record.profit_percent, dec!(50.00));
    }

    #[test]
    fn losses_can_push_the_balance_negative() {
        let mut core = core_with_balance(dec!(100), 5);
        core.open(Side::Long, "BTC/USDT", dec!(100), Utc::now())
            .unwrap();

        // Quantity 5, price halves: -250 against a 100 balance.
        let record = core.close(dec!(50), Utc::now()).unwrap();
        assert_eq!(record.profit, dec!(-250.00));
        assert_eq!(core.balance(), dec!(-150.00));
    }

    #[test]
    fn close_on_flat_is_a_typed_rejection_mutating_nothing() {
        let mut core = core_with_balance(dec!(1000), 5);

        let err = core.close(dec!(100), Utc::now()).unwrap_err();
        assert_eq!(err, TradeError::NoOpenPosition);
        assert_eq!(core.balance(), dec!(1000));
        assert!(core.history_newest_first().is_empty());
    }

    #[test]
    fn set_leverage_resizes_a_live_position_at_entry_price() {
        let mut core = core_with_balance(dec!(1000), 5);
        core.open(Side::Long, "BTC/USDT", dec!(100), Utc::now())
            .unwrap();
        assert_eq!(core.position().unwrap().quantity, dec!(50));

        core.set_leverage(10).unwrap();

        let position = core.position().unwrap();
        assert_eq!(position.quantity, dec!(100));
        assert_eq!(position.entry_price, dec!(100));
    }

    #[test]
    fn leverage_is_validated_before_anything_changes() {
        let mut core = core_with_balance(dec!(1000), 5);
        core.open(Side::Long, "BTC/USDT", dec!(100), Utc::now())
            .unwrap();

        let err = core.set_leverage(0).unwrap_err();
        assert!(matches!(err, TradeError::InvalidLeverage { got: 0, .. }));
        let err = core.set_leverage(101).unwrap_err();
        assert!(matches!(err, TradeError::InvalidLeverage { got: 101, .. }));

        assert_eq!(core.leverage(), 5);
        assert_eq!(core.position().unwrap().quantity, dec!(50));
    }

    #[test]
    fn risk_limits_reject_negatives_and_zero_disables() {
        let mut core = core_with_balance(dec!(1000), 5);

        let err = core.set_risk_limits(dec!(-1), dec!(5)).unwrap_err();
        assert_eq!(err, TradeError::InvalidRiskLimit(dec!(-1)));

        core.set_risk_limits(dec!(5), dec!(10)).unwrap();
        assert_eq!(core.stop_loss_percent(), dec!(5));
        assert_eq!(core.take_profit_percent(), dec!(10));

        core.set_risk_limits(Decimal::ZERO, Decimal::ZERO).unwrap();
        assert_eq!(core.stop_loss_percent(), Decimal::ZERO);
        assert_eq!(core.take_profit_percent(), Decimal::ZERO);
    }

    #[test]
    fn trade_history_is_a_bounded_ring() {
        let cfg = AccountConfig {
            trade_history_cap: 3,
            ..AccountConfig::default()
        };
        let mut core = TradingCore::new(cfg);

        for i in 0..5u32 {
            core.open(Side::Long, "BTC/USDT", dec!(100), Utc::now())
                .unwrap();
            core.close(dec!(100) + Decimal::from(i), Utc::now()).unwrap();
        }

        let history = core.history_newest_first();
        assert_eq!(history.len(), 3);
        // Newest first; the two oldest records were evicted.
        assert_eq!(history[0].exit_price, dec!(104));
        assert_eq!(history[2].exit_price, dec!(102));
    }

    #[test]
    fn clear_history_leaves_balance_and_position_alone() {
        let mut core = core_with_balance(dec!(100), 5);
        core.open(Side::Long, "BTC/USDT", dec!(100), Utc::now())
            .unwrap();
        core.close(dec!(110), Utc::now()).unwrap();
        core.open(Side::Short, "ETH/USDT", dec!(50), Utc::now())
            .unwrap();

        core.clear_history();

        assert!(core.history_newest_first().is_empty());
        assert_eq!(core.balance(), dec!(150.00));
        assert!(core.position().is_some());
    }

    #[test]
    fn reset_restores_documented_defaults() {
        let mut core = core_with_balance(dec!(100), 5);
        core.set_leverage(20).unwrap();
        core.set_risk_limits(dec!(5), dec!(10)).unwrap();
        core.open(Side::Long, "BTC/USDT", dec!(100), Utc::now())
            .unwrap();
        core.close(dec!(110), Utc::now()).unwrap();

        core.reset();

        assert_eq!(core.balance(), dec!(1000));
        assert_eq!(core.leverage(), 5);
        assert_eq!(core.stop_loss_percent(), Decimal::ZERO);
        assert_eq!(core.take_profit_percent(), Decimal::ZERO);
        assert!(core.position().is_none());
        assert!(core.history_newest_first().is_empty());
    }

    #[test]
    fn restore_round_trips_and_clamps_bad_values() {
        let mut core = core_with_balance(dec!(100), 5);
        core.open(Side::Long, "BTC/USDT", dec!(100), Utc::now())
            .unwrap();
        core.close(dec!(110), Utc::now()).unwrap();
        core.set_risk_limits(dec!(5), dec!(10)).unwrap();

        let snapshot = core.persisted();
        let restored = TradingCore::restore(test_cfg(), snapshot.clone());
        assert_eq!(restored.persisted(), snapshot);

        // A hand-edited file with out-of-range values is clamped.
        let bad = PersistedState {
            leverage: 9999,
            stop_loss_percent: dec!(-3),
            ..snapshot
        };
        let restored = TradingCore::restore(test_cfg(), bad);
        assert_eq!(restored.leverage(), 100);
        assert_eq!(restored.stop_loss_percent(), Decimal::ZERO);
    }
}
