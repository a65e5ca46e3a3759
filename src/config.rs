// src/config.rs

use config::{Config, ConfigError, File};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct InstrumentConfig {
    pub symbol: String,
    pub base_price: Decimal,
    /// Fraction of price per tick, > 0.
    pub volatility: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MarketConfig {
    pub tick_interval_secs: u64,
    pub price_history_cap: usize,
    /// Independent uniform draws averaged per perturbation. More draws
    /// give a smoother, more bell-shaped step distribution.
    pub smoothing_draws: u32,
    /// Hard cap on a single step, as a multiple of the volatility.
    pub max_step_ratio: f64,
    /// Constant upward bias added to the averaged draw.
    pub drift: f64,
    pub price_precision: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AccountConfig {
    pub initial_balance: Decimal,
    pub default_leverage: u32,
    pub max_leverage: u32,
    pub min_open_balance: Decimal,
    /// Maintenance buffer as a fraction of required margin.
    pub maintenance_margin: Decimal,
    pub quantity_precision: u32,
    pub trade_history_cap: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub state_file: String,
    pub log_dir: String,
    pub instruments: Vec<InstrumentConfig>,
    pub market: MarketConfig,
    pub account: AccountConfig,
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name("Settings"))
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        let config = builder.build()?;
        config.try_deserialize()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            state_file: "sandbox_state.json".to_string(),
            log_dir: "logs".to_string(),
            instruments: vec![
                InstrumentConfig {
                    symbol: "BTC/USDT".to_string(),
                    base_price: dec!(60000),
                    volatility: 0.015,
                },
                InstrumentConfig {
                    symbol: "ETH/USDT".to_string(),
                    base_price: dec!(3000),
                    volatility: 0.02,
                },
                InstrumentConfig {
                    symbol: "SOL/USDT".to_string(),
                    base_price: dec!(150),
                    volatility: 0.035,
                },
            ],
            market: MarketConfig::default(),
            account: AccountConfig::default(),
        }
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 2,
            price_history_cap: 50,
            smoothing_draws: 3,
            max_step_ratio: 1.0,
            drift: 0.04,
            price_precision: 2,
        }
    }
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            initial_balance: dec!(1000),
            default_leverage: 5,
            max_leverage: 100,
            min_open_balance: dec!(50),
            maintenance_margin: dec!(0.10),
            quantity_precision: 4,
            trade_history_cap: 100,
        }
    }
}
