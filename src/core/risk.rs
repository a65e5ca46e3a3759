// src/core/risk.rs
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::types::{Pnl, Position, Side, TriggerDecision};

/// Mark-to-market PnL of an open position.
///
/// `percent` is the return on margin (notional / leverage), not on
/// notional: at 10x leverage a 1% favorable move reads as 10%.
pub fn unrealized_pnl(position: &Position, price: Decimal, leverage: u32) -> Pnl {
    let profit = match position.side {
        Side::Long => (price - position.entry_price) * position.quantity,
        Side::Short => (position.entry_price - price) * position.quantity,
    };

    // leverage >= 1 is a ledger invariant; max(1) keeps the math total.
    let margin = position.quantity * position.entry_price / Decimal::from(leverage.max(1));
    let percent = if margin.is_zero() {
        Decimal::ZERO
    } else {
        profit / margin * dec!(100)
    };

    Pnl { profit, percent }
}

/// Evaluates stop-loss / take-profit against the side-aware percent move.
/// Both thresholds are boundary-inclusive and a value of zero disables
/// that trigger. Stop-loss is checked first and wins if a misconfigured
/// pair would satisfy both in one evaluation.
pub fn check_triggers(
    position: &Position,
    price: Decimal,
    leverage: u32,
    stop_loss_percent: Decimal,
    take_profit_percent: Decimal,
) -> TriggerDecision {
    let pnl = unrealized_pnl(position, price, leverage);

    if stop_loss_percent > Decimal::ZERO && pnl.percent <= -stop_loss_percent {
        return TriggerDecision::StopLoss;
    }
    if take_profit_percent > Decimal::ZERO && pnl.percent >= take_profit_percent {
        return TriggerDecision::TakeProfit;
    }
    TriggerDecision::Hold
}
