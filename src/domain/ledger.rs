//! Cash, holdings and trade log of the single trading account.
//!
//! All mutation goes through [`Ledger::buy`] and [`Ledger::sell`]. Both
//! validate every input before touching state, so a rejected trade leaves the
//! ledger exactly as it was. Holdings never contain a zero or negative entry.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use super::error::{StocksimError, normalize_symbol};
use super::market::Market;
use super::trade::{Side, Trade};

pub const DEFAULT_STARTING_CASH: f64 = 10_000.0;

/// Tolerance for floating round-off when comparing cost against cash.
pub const CASH_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    cash: f64,
    initial_cash: f64,
    holdings: BTreeMap<String, i64>,
    trades: Vec<Trade>,
}

/// One holdings row valued against the market; price and value are absent
/// when the symbol is no longer listed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingView {
    pub symbol: String,
    pub qty: i64,
    pub price: Option<f64>,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub cash: f64,
    pub net_worth: f64,
    pub holdings: Vec<HoldingView>,
}

/// Resolve the execution date of a trade. Falls back to the wall-clock date
/// when none is given, which mixes real and simulated time.
pub fn trade_date(date: Option<NaiveDate>) -> NaiveDate {
    match date {
        Some(d) => d,
        None => {
            let today = chrono::Local::now().date_naive();
            tracing::warn!(%today, "trade without a simulated date, using wall-clock date");
            today
        }
    }
}

impl Ledger {
    pub fn new(starting_cash: f64) -> Self {
        Ledger {
            cash: starting_cash,
            initial_cash: starting_cash,
            holdings: BTreeMap::new(),
            trades: Vec::new(),
        }
    }

    /// Rebuild a ledger from persisted parts. Symbols are uppercased and
    /// non-positive holdings are dropped.
    pub fn from_parts(
        cash: f64,
        initial_cash: f64,
        holdings: impl IntoIterator<Item = (String, i64)>,
        trades: Vec<Trade>,
    ) -> Self {
        let mut merged: BTreeMap<String, i64> = BTreeMap::new();
        for (symbol, qty) in holdings {
            if qty <= 0 {
                continue;
            }
            let entry = merged.entry(symbol.trim().to_uppercase()).or_insert(0);
            match entry.checked_add(qty) {
                Some(total) => *entry = total,
                None => tracing::warn!(%symbol, qty, "dropping holding that exceeds the share limit"),
            }
        }
        Ledger {
            cash,
            initial_cash,
            holdings: merged,
            trades,
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn initial_cash(&self) -> f64 {
        self.initial_cash
    }

    pub fn holdings(&self) -> &BTreeMap<String, i64> {
        &self.holdings
    }

    pub fn quantity(&self, symbol: &str) -> i64 {
        self.holdings
            .get(&symbol.trim().to_uppercase())
            .copied()
            .unwrap_or(0)
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn buy(
        &mut self,
        symbol: &str,
        price: f64,
        qty: i64,
        date: Option<NaiveDate>,
    ) -> Result<Trade, StocksimError> {
        let (symbol, price, qty) = validate_order(symbol, price, qty)?;
        let cost = price * qty as f64;
        if !cost.is_finite() {
            return Err(StocksimError::InvalidPrice { price });
        }
        if cost > self.cash + CASH_EPSILON {
            return Err(StocksimError::InsufficientCash {
                required: cost,
                available: self.cash,
            });
        }
        let held = self.quantity(&symbol);
        let total = held
            .checked_add(qty)
            .ok_or_else(|| StocksimError::HoldingLimit {
                symbol: symbol.clone(),
                held,
                requested: qty,
            })?;

        self.cash -= cost;
        self.holdings.insert(symbol.clone(), total);
        Ok(self.append(Side::Buy, symbol, qty, price, date))
    }

    pub fn sell(
        &mut self,
        symbol: &str,
        price: f64,
        qty: i64,
        date: Option<NaiveDate>,
    ) -> Result<Trade, StocksimError> {
        let (symbol, price, qty) = validate_order(symbol, price, qty)?;
        let held = self.holdings.get(&symbol).copied().unwrap_or(0);
        if qty > held {
            return Err(StocksimError::InsufficientShares {
                symbol,
                requested: qty,
                held,
            });
        }

        let cash = self.cash + price * qty as f64;
        if !cash.is_finite() {
            return Err(StocksimError::InvalidPrice { price });
        }

        self.cash = cash;
        let remaining = held - qty;
        if remaining <= 0 {
            self.holdings.remove(&symbol);
        } else {
            self.holdings.insert(symbol.clone(), remaining);
        }
        Ok(self.append(Side::Sell, symbol, qty, price, date))
    }

    /// `cash + sum(qty * price)` over held symbols still listed in `market`;
    /// unlisted symbols are skipped.
    pub fn net_worth(&self, market: &Market) -> f64 {
        let positions: f64 = self
            .holdings
            .iter()
            .filter_map(|(symbol, &qty)| market.price_of(symbol).map(|p| p * qty as f64))
            .sum();
        self.cash + positions
    }

    pub fn summary(&self, market: &Market) -> PortfolioSummary {
        let holdings = self
            .holdings
            .iter()
            .map(|(symbol, &qty)| {
                let price = market.price_of(symbol);
                HoldingView {
                    symbol: symbol.clone(),
                    qty,
                    price,
                    value: price.map(|p| p * qty as f64),
                }
            })
            .collect();
        PortfolioSummary {
            cash: self.cash,
            net_worth: self.net_worth(market),
            holdings,
        }
    }

    fn append(
        &mut self,
        side: Side,
        symbol: String,
        qty: i64,
        price: f64,
        date: Option<NaiveDate>,
    ) -> Trade {
        let trade = Trade {
            date: trade_date(date),
            side,
            symbol,
            qty,
            price,
        };
        self.trades.push(trade.clone());
        trade
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Ledger::new(DEFAULT_STARTING_CASH)
    }
}

fn validate_order(symbol: &str, price: f64, qty: i64) -> Result<(String, f64, i64), StocksimError> {
    let symbol = normalize_symbol(symbol)?;
    if qty <= 0 {
        return Err(StocksimError::InvalidQuantity { qty });
    }
    if !price.is_finite() || price <= 0.0 {
        return Err(StocksimError::InvalidPrice { price });
    }
    Ok((symbol, price, qty))
}
