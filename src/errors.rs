// src/errors.rs
use rust_decimal::Decimal;
use thiserror::Error;

/// Typed rejection for every ledger/account operation. All variants are
/// recoverable at the call site: the operation is refused and core state
/// is left exactly as it was.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TradeError {
    // Validation
    #[error("unknown instrument: {0}")]
    UnknownInstrument(String),

    #[error("leverage {got}x outside the allowed 1..={max}x range")]
    InvalidLeverage { got: u32, max: u32 },

    #[error("risk limit must be >= 0, got {0}")]
    InvalidRiskLimit(Decimal),

    #[error("position size rounds to zero at price {price}")]
    QuantityTooSmall { price: Decimal },

    // State conflicts
    #[error("a position is already open, close it first")]
    PositionAlreadyOpen,

    #[error("no open position")]
    NoOpenPosition,

    // Funds
    #[error("balance {balance} is below the {minimum} minimum required to open")]
    InsufficientBalance { balance: Decimal, minimum: Decimal },

    #[error("required margin {required} exceeds available margin {available}")]
    InsufficientMargin {
        required: Decimal,
        available: Decimal,
    },
}
