// src/types.rs
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => write!(f, "Long"),
            Side::Short => write!(f, "Short"),
        }
    }
}

/// The single open position. Owned exclusively by the ledger; at most one
/// exists at any time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub side: Side,
    pub entry_price: Decimal,
    pub quantity: Decimal,
    pub opened_at: DateTime<Utc>,
}

/// A settled trade. Immutable once appended to the history ring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub symbol: String,
    pub side: Side,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub profit: Decimal,
    pub profit_percent: Decimal,
    pub closed_at: DateTime<Utc>,
}

/// Outcome of a stop-loss / take-profit evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerDecision {
    Hold,
    StopLoss,
    TakeProfit,
}

/// Mark-to-market result. `percent` is return on margin, not on notional.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pnl {
    pub profit: Decimal,
    pub percent: Decimal,
}

/// Commands the presentation layer issues against the core.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    OpenTrade(Side),
    CloseTrade,
    SetLeverage(u32),
    SetRiskLimits {
        stop_loss: Decimal,
        take_profit: Decimal,
    },
    SelectInstrument(String),
    ClearHistory,
    Reset,
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentQuote {
    pub symbol: String,
    pub price: Decimal,
}

/// Read-only view of core state published to the presentation layer
/// after every tick and every command.
#[derive(Debug, Clone, PartialEq)]
pub struct CoreSnapshot {
    pub balance: Decimal,
    pub leverage: u32,
    pub stop_loss_percent: Decimal,
    pub take_profit_percent: Decimal,
    pub selected: String,
    pub quotes: Vec<InstrumentQuote>,
    /// Price window of the selected instrument, oldest first.
    pub chart: Vec<Decimal>,
    pub position: Option<Position>,
    pub unrealized: Option<Pnl>,
    /// Most-recent-first for display.
    pub history: Vec<TradeRecord>,
}

#[derive(Debug, Clone)]
pub enum UiEvent {
    Snapshot(CoreSnapshot),
    Notice(String),
}

/// On-disk account snapshot. Save/load must round-trip exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    pub balance: Decimal,
    pub leverage: u32,
    pub stop_loss_percent: Decimal,
    pub take_profit_percent: Decimal,
    pub open_position: Option<Position>,
    pub trade_history: Vec<TradeRecord>,
}
