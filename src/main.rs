// src/main.rs
use std::time::Duration;

use anyhow::Context;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::mpsc;
use tracing::{info, warn};

mod config;
mod core;
mod errors;
mod market;
mod storage;
mod tui;
mod types;
mod utils;

use crate::config::AppConfig;
use crate::core::engine::Engine;
use crate::core::ledger::TradingCore;
use crate::market::book::PriceBook;
use crate::market::generator::PriceGenerator;
use crate::storage::{JsonFileStore, StateStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::new().unwrap_or_else(|e| {
        eprintln!("Settings not loaded ({e}), falling back to built-in defaults");
        AppConfig::default()
    });

    // Logs go to a file: stdout belongs to the TUI.
    std::fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("creating log directory {}", config.log_dir))?;
    let file_appender = tracing_appender::rolling::never(&config.log_dir, "marginsim.log");
    let (writer, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_ansi(false)
        .init();

    info!("marginsim starting");

    // Restore the previous session if a snapshot exists. A broken file is
    // reported and ignored rather than blocking startup.
    let store = JsonFileStore::new(&config.state_file);
    let restored = match store.load().await {
        Ok(state) => state,
        Err(e) => {
            warn!("ignoring unreadable state file: {e}");
            None
        }
    };
    let core = match restored {
        Some(state) => {
            info!("restored account state from {}", config.state_file);
            TradingCore::restore(config.account.clone(), state)
        }
        None => TradingCore::new(config.account.clone()),
    };

    let mut generator = PriceGenerator::new(StdRng::from_entropy(), &config.market);
    let mut book = PriceBook::new(config.market.price_history_cap);
    for instrument in &config.instruments {
        let price = generator.initial_price(instrument.base_price);
        book.list(&instrument.symbol, instrument.volatility, price);
    }
    let selected = config
        .instruments
        .first()
        .map(|i| i.symbol.clone())
        .context("no instruments configured")?;

    let (command_sender, command_receiver) = mpsc::channel(32);
    let (ui_sender, ui_receiver) = mpsc::channel(100);

    let mut engine = Engine::new(
        core,
        book,
        generator,
        Box::new(store),
        selected,
        Duration::from_secs(config.market.tick_interval_secs),
        command_receiver,
        ui_sender,
    );
    let engine_task = tokio::spawn(async move { engine.run().await });

    tui::run(ui_receiver, command_sender).await?;

    // The TUI sent Quit (or dropped its sender); wait for the final save.
    engine_task.await??;
    info!("marginsim stopped");

    Ok(())
}
