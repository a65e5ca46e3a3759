// src/core/engine.rs
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use rand::Rng;
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::core::ledger::TradingCore;
use crate::core::risk;
use crate::errors::TradeError;
use crate::market::book::PriceBook;
use crate::market::generator::PriceGenerator;
use crate::storage::StateStore;
use crate::types::{Command, CoreSnapshot, InstrumentQuote, Side, TriggerDecision, UiEvent};

/// Owns the whole mutable core (ledger, price book, generator) on one
/// task. The tick timer and user commands are serialized through a single
/// select loop, so no operation ever interleaves with another.
pub struct Engine<R: Rng> {
    core: TradingCore,
    book: PriceBook,
    generator: PriceGenerator<R>,
    store: Box<dyn StateStore>,
    selected: String,
    tick_interval: Duration,
    command_receiver: mpsc::Receiver<Command>,
    ui_sender: mpsc::Sender<UiEvent>,
}

impl<R: Rng> Engine<R> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        core: TradingCore,
        book: PriceBook,
        generator: PriceGenerator<R>,
        store: Box<dyn StateStore>,
        selected: String,
        tick_interval: Duration,
        command_receiver: mpsc::Receiver<Command>,
        ui_sender: mpsc::Sender<UiEvent>,
    ) -> Self {
        Self {
            core,
            book,
            generator,
            store,
            selected,
            tick_interval,
            command_receiver,
            ui_sender,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        info!("engine loop running, tick every {:?}", self.tick_interval);
        self.publish_snapshot();

        let mut ticker = time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.on_tick().await,
                command = self.command_receiver.recv() => match command {
                    // Quit or a dropped sender stops the timer with the task.
                    Some(Command::Quit) | None => break,
                    Some(command) => self.on_command(command).await,
                },
            }
        }

        self.persist().await;
        info!("engine stopped");
        Ok(())
    }

    async fn on_tick(&mut self) {
        self.generator.tick(&mut self.book);
        self.auto_close().await;
        self.publish_snapshot();
    }

    /// Evaluates stop-loss / take-profit against the open position and
    /// closes it through the ledger when a trigger fires.
    async fn auto_close(&mut self) {
        let Some(position) = self.core.position().cloned() else {
            return;
        };
        let Some(price) = self.book.price(&position.symbol) else {
            return;
        };

        let decision = risk::check_triggers(
            &position,
            price,
            self.core.leverage(),
            self.core.stop_loss_percent(),
            self.core.take_profit_percent(),
        );
        let label = match decision {
            TriggerDecision::Hold => return,
            TriggerDecision::StopLoss => "stop-loss",
            TriggerDecision::TakeProfit => "take-profit",
        };

        match self.core.close(price, Utc::now()) {
            Ok(record) => {
                info!(
                    trigger = label,
                    symbol = %record.symbol,
                    profit = %record.profit,
                    "auto-closed position"
                );
                self.notify(format!(
                    "{} hit: closed {} {} @ {} ({:+})",
                    label, record.side, record.symbol, record.exit_price, record.profit
                ));
                self.persist().await;
            }
            Err(e) => warn!("auto-close rejected: {e}"),
        }
    }

    async fn on_command(&mut self, command: Command) {
        let outcome = match command {
            Command::OpenTrade(side) => self.open_trade(side),
            Command::CloseTrade => self.close_trade(),
            Command::SetLeverage(leverage) => self
                .core
                .set_leverage(leverage)
                .map(|_| format!("leverage set to {leverage}x")),
            Command::SetRiskLimits {
                stop_loss,
                take_profit,
            } => self
                .core
                .set_risk_limits(stop_loss, take_profit)
                .map(|_| format!("risk limits: SL {stop_loss}% / TP {take_profit}%")),
            Command::SelectInstrument(symbol) => self.select_instrument(symbol),
            Command::ClearHistory => {
                self.core.clear_history();
                Ok("trade history cleared".to_string())
            }
            Command::Reset => {
                self.core.reset();
                Ok(format!("account reset to {}", self.core.balance()))
            }
            // Quit never reaches here; run() breaks on it.
            Command::Quit => return,
        };

        match outcome {
            Ok(message) => {
                info!("{message}");
                self.notify(message);
                self.persist().await;
            }
            Err(e) => {
                warn!("command rejected: {e}");
                self.notify(format!("rejected: {e}"));
            }
        }
        self.publish_snapshot();
    }

    fn open_trade(&mut self, side: Side) -> Result<String, TradeError> {
        let price = self
            .book
            .price(&self.selected)
            .ok_or_else(|| TradeError::UnknownInstrument(self.selected.clone()))?;
        self.core.open(side, &self.selected, price, Utc::now())?;
        Ok(format!("opened {} {} @ {}", side, self.selected, price))
    }

    fn close_trade(&mut self) -> Result<String, TradeError> {
        let symbol = self
            .core
            .position()
            .map(|p| p.symbol.clone())
            .ok_or(TradeError::NoOpenPosition)?;
        let price = self
            .book
            .price(&symbol)
            .ok_or(TradeError::UnknownInstrument(symbol))?;
        let record = self.core.close(price, Utc::now())?;
        Ok(format!(
            "closed {} {} @ {} ({:+})",
            record.side, record.symbol, record.exit_price, record.profit
        ))
    }

    fn select_instrument(&mut self, symbol: String) -> Result<String, TradeError> {
        if !self.book.contains(&symbol) {
            return Err(TradeError::UnknownInstrument(symbol));
        }
        self.selected = symbol;
        Ok(format!("selected {}", self.selected))
    }

    /// Fire-and-forget: a failed save must never poison in-memory state.
    async fn persist(&mut self) {
        if let Err(e) = self.store.save(&self.core.persisted()).await {
            error!("failed to persist state: {e}");
        }
    }

    fn publish_snapshot(&self) {
        let unrealized = self.core.position().and_then(|position| {
            self.book
                .price(&position.symbol)
                .map(|price| risk::unrealized_pnl(position, price, self.core.leverage()))
        });

        let snapshot = CoreSnapshot {
            balance: self.core.balance(),
            leverage: self.core.leverage(),
            stop_loss_percent: self.core.stop_loss_percent(),
            take_profit_percent: self.core.take_profit_percent(),
            selected: self.selected.clone(),
            quotes: self
                .book
                .entries()
                .iter()
                .map(|e| InstrumentQuote {
                    symbol: e.symbol.clone(),
                    price: e.price,
                })
                .collect(),
            chart: self.book.window(&self.selected).unwrap_or_default(),
            position: self.core.position().cloned(),
            unrealized,
            history: self.core.history_newest_first(),
        };
        self.send_ui_event(UiEvent::Snapshot(snapshot));
    }

    fn notify(&self, message: String) {
        self.send_ui_event(UiEvent::Notice(message));
    }

    fn send_ui_event(&self, event: UiEvent) {
        match self.ui_sender.try_send(event) {
            Ok(_) => {}
            // A slow UI just misses a frame.
            Err(mpsc::error::TrySendError::Full(_)) => {}
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!("UI channel closed, interface is likely dead");
            }
        }
    }
}
