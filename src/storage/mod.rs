// src/storage/mod.rs
use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::PersistedState;

/// Key-value persistence boundary for the account snapshot.
/// Save followed by load must round-trip exactly.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn save(&self, state: &PersistedState) -> Result<()>;

    /// `None` means no snapshot exists yet (first run).
    async fn load(&self) -> Result<Option<PersistedState>>;
}

/// One pretty-printed JSON document per account.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl StateStore for JsonFileStore {
    async fn save(&self, state: &PersistedState) -> Result<()> {
        let data = serde_json::to_string_pretty(state)?;
        tokio::fs::write(&self.path, data).await?;
        Ok(())
    }

    async fn load(&self) -> Result<Option<PersistedState>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => Ok(Some(serde_json::from_str(&data)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Position, Side, TradeRecord};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn temp_store(name: &str) -> JsonFileStore {
        let path = std::env::temp_dir().join(format!("marginsim-{}-{}.json", name, std::process::id()));
        let _ = std::fs::remove_file(&path);
        JsonFileStore::new(path)
    }

    fn sample_state() -> PersistedState {
        PersistedState {
            balance: dec!(1234.56),
            leverage: 10,
            stop_loss_percent: dec!(5),
            take_profit_percent: dec!(12.5),
            open_position: Some(Position {
                symbol: "ETH/USDT".to_string(),
                side: Side::Short,
                entry_price: dec!(3000.12),
                quantity: dec!(4.1152),
                opened_at: Utc::now(),
            }),
            trade_history: vec![TradeRecord {
                symbol: "BTC/USDT".to_string(),
                side: Side::Long,
                entry_price: dec!(60000),
                exit_price: dec!(61000),
                profit: dec!(50.00),
                profit_percent: dec!(8.33),
                closed_at: Utc::now(),
            }],
        }
    }

    #[tokio::test]
    async fn save_then_load_round_trips_exactly() {
        let store = temp_store("roundtrip");
        let state = sample_state();

        store.save(&state).await.unwrap();
        let loaded = store.load().await.unwrap().unwrap();

        assert_eq!(loaded, state);
    }

    #[tokio::test]
    async fn saving_twice_is_idempotent() {
        let store = temp_store("idempotent");
        let state = sample_state();

        store.save(&state).await.unwrap();
        store.save(&state).await.unwrap();

        assert_eq!(store.load().await.unwrap().unwrap(), state);
    }

    #[tokio::test]
    async fn missing_file_loads_as_none() {
        let store = temp_store("missing");
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error_not_a_panic() {
        let store = temp_store("corrupt");
        tokio::fs::write(&store.path, "not json").await.unwrap();

        assert!(store.load().await.is_err());
    }
}
