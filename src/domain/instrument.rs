//! A tradable symbol with a simulated price and bounded price history.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::VecDeque;

use super::error::{StocksimError, normalize_symbol};
use super::price_process::Gbm;

/// Oldest history entries are evicted past this many points.
pub const HISTORY_CAPACITY: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

#[derive(Debug, Clone)]
pub struct Instrument {
    symbol: String,
    price: f64,
    process: Gbm,
    history: VecDeque<PricePoint>,
}

impl Instrument {
    pub fn new(symbol: &str, price: f64, mu: f64, sigma: f64) -> Result<Self, StocksimError> {
        let symbol = normalize_symbol(symbol)?;
        if !price.is_finite() || price <= 0.0 {
            return Err(StocksimError::InvalidPrice { price });
        }
        let process = Gbm::new(mu, sigma)?;
        Ok(Instrument {
            symbol,
            price,
            process,
            history: VecDeque::new(),
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn process(&self) -> &Gbm {
        &self.process
    }

    pub fn history(&self) -> &VecDeque<PricePoint> {
        &self.history
    }

    /// First recorded price, or the current price when nothing is recorded yet.
    pub fn start_price(&self) -> f64 {
        self.history.front().map(|p| p.price).unwrap_or(self.price)
    }

    pub(crate) fn record(&mut self, date: NaiveDate) {
        if self.history.len() == HISTORY_CAPACITY {
            self.history.pop_front();
        }
        self.history.push_back(PricePoint {
            date,
            price: self.price,
        });
    }

    pub(crate) fn set_price(&mut self, price: f64) {
        self.price = price;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(n as u64)
    }

    #[test]
    fn new_normalizes_symbol() {
        let inst = Instrument::new("abc", 100.0, 0.0, 0.02).unwrap();
        assert_eq!(inst.symbol(), "ABC");
        assert!(inst.history().is_empty());
    }

    #[test]
    fn rejects_non_positive_price() {
        assert!(matches!(
            Instrument::new("ABC", 0.0, 0.0, 0.02),
            Err(StocksimError::InvalidPrice { .. })
        ));
        assert!(Instrument::new("ABC", -5.0, 0.0, 0.02).is_err());
        assert!(Instrument::new("ABC", f64::NAN, 0.0, 0.02).is_err());
        assert!(Instrument::new("ABC", f64::INFINITY, 0.0, 0.02).is_err());
    }

    #[test]
    fn rejects_non_finite_parameters() {
        assert!(matches!(
            Instrument::new("ABC", 10.0, f64::NAN, 0.02),
            Err(StocksimError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn record_appends_current_price() {
        let mut inst = Instrument::new("ABC", 100.0, 0.0, 0.02).unwrap();
        inst.record(day(0));
        inst.set_price(101.0);
        inst.record(day(1));
        let hist: Vec<_> = inst.history().iter().copied().collect();
        assert_eq!(hist.len(), 2);
        assert_eq!(hist[0], PricePoint { date: day(0), price: 100.0 });
        assert_eq!(hist[1], PricePoint { date: day(1), price: 101.0 });
        assert!((inst.start_price() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn history_evicts_oldest_past_capacity() {
        let mut inst = Instrument::new("ABC", 1.0, 0.0, 0.0).unwrap();
        for n in 0..(HISTORY_CAPACITY as u32 + 5) {
            inst.set_price(1.0 + n as f64);
            inst.record(day(n));
        }
        assert_eq!(inst.history().len(), HISTORY_CAPACITY);
        assert_eq!(inst.history().front().unwrap().date, day(5));
    }
}
