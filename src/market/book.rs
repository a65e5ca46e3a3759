// src/market/book.rs
use rust_decimal::Decimal;
use std::collections::VecDeque;

/// One listed instrument plus its rolling quote window.
#[derive(Debug, Clone)]
pub struct InstrumentState {
    pub symbol: String,
    pub volatility: f64,
    pub price: Decimal,
    history: VecDeque<Decimal>,
}

/// Current quotes for the fixed instrument set. Mutated only by the price
/// generator; iteration order is the configured listing order, which also
/// pins the order the generator consumes random draws in.
#[derive(Debug, Clone)]
pub struct PriceBook {
    history_cap: usize,
    entries: Vec<InstrumentState>,
}

impl PriceBook {
    pub fn new(history_cap: usize) -> Self {
        Self {
            history_cap: history_cap.max(1),
            entries: Vec::new(),
        }
    }

    /// Lists an instrument and pre-fills its window with the initial
    /// price, so the chart is full from the first frame.
    pub fn list(&mut self, symbol: &str, volatility: f64, initial_price: Decimal) {
        let mut history = VecDeque::with_capacity(self.history_cap);
        history.extend(std::iter::repeat(initial_price).take(self.history_cap));
        self.entries.push(InstrumentState {
            symbol: symbol.to_string(),
            volatility,
            price: initial_price,
            history,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn at(&self, index: usize) -> &InstrumentState {
        &self.entries[index]
    }

    pub fn entries(&self) -> &[InstrumentState] {
        &self.entries
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.entries.iter().any(|e| e.symbol == symbol)
    }

    pub fn price(&self, symbol: &str) -> Option<Decimal> {
        self.entries
            .iter()
            .find(|e| e.symbol == symbol)
            .map(|e| e.price)
    }

    /// Price window of one instrument, oldest first.
    pub fn window(&self, symbol: &str) -> Option<Vec<Decimal>> {
        self.entries
            .iter()
            .find(|e| e.symbol == symbol)
            .map(|e| e.history.iter().copied().collect())
    }

    /// Records a fresh quote, evicting the oldest window entry at cap.
    pub fn set_price_at(&mut self, index: usize, price: Decimal) {
        let entry = &mut self.entries[index];
        entry.price = price;
        entry.history.push_back(price);
        while entry.history.len() > self.history_cap {
            entry.history.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn listing_prefills_the_window() {
        let mut book = PriceBook::new(5);
        book.list("BTC/USDT", 0.015, dec!(60000));

        assert_eq!(book.price("BTC/USDT"), Some(dec!(60000)));
        assert_eq!(book.window("BTC/USDT").unwrap().len(), 5);
    }

    #[test]
    fn window_never_exceeds_cap() {
        let mut book = PriceBook::new(3);
        book.list("SOL/USDT", 0.035, dec!(150));

        for i in 0..10 {
            book.set_price_at(0, dec!(150) + Decimal::from(i));
        }

        let window = book.window("SOL/USDT").unwrap();
        assert_eq!(window.len(), 3);
        // Oldest evicted first.
        assert_eq!(window, vec![dec!(157), dec!(158), dec!(159)]);
        assert_eq!(book.price("SOL/USDT"), Some(dec!(159)));
    }

    #[test]
    fn unknown_symbols_resolve_to_none() {
        let book = PriceBook::new(50);
        assert!(!book.contains("DOGE/USDT"));
        assert_eq!(book.price("DOGE/USDT"), None);
    }
}
