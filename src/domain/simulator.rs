//! Process-wide simulation context: one market, one ledger, one store.
//!
//! Built once through [`Simulator::bootstrap`] (load the ledger, or create and
//! persist a fresh one) and only reinitialised through [`Simulator::reset`].
//! Trades take their price from the market unless an explicit override is
//! given, and always take their date from the market. Every trade is written
//! through to the store; if that write fails the in-memory ledger is left as
//! it was before the trade.

use chrono::NaiveDate;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;

use super::error::{StocksimError, normalize_symbol};
use super::instrument::{Instrument, PricePoint};
use super::ledger::{Ledger, PortfolioSummary};
use super::market::Market;
use super::settings::Settings;
use super::stats::TradeStats;
use super::trade::{Side, Trade};
use crate::ports::ledger_store::LedgerStore;

/// A buy or sell request. `price` overrides the market price when set.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub side: Side,
    pub symbol: String,
    pub qty: i64,
    pub price: Option<f64>,
}

impl Order {
    pub fn buy(symbol: &str, qty: i64) -> Self {
        Order {
            side: Side::Buy,
            symbol: symbol.to_string(),
            qty,
            price: None,
        }
    }

    pub fn sell(symbol: &str, qty: i64) -> Self {
        Order {
            side: Side::Sell,
            symbol: symbol.to_string(),
            qty,
            price: None,
        }
    }

    pub fn at_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }
}

pub struct Simulator {
    settings: Settings,
    market: Market,
    ledger: Ledger,
    store: Box<dyn LedgerStore + Send>,
}

fn build_market(settings: &Settings) -> Result<Market, StocksimError> {
    let rng = match settings.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    Market::with_instruments(settings.start_date_or_today(), rng, &settings.instruments)
}

impl Simulator {
    pub fn bootstrap(
        settings: Settings,
        store: Box<dyn LedgerStore + Send>,
    ) -> Result<Self, StocksimError> {
        let market = build_market(&settings)?;
        let ledger = store.load(settings.starting_cash)?;
        tracing::info!(
            store = %store.location(),
            date = %market.date(),
            instruments = market.len(),
            cash = ledger.cash(),
            "simulator ready"
        );
        Ok(Simulator {
            settings,
            market,
            ledger,
            store,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn market(&self) -> &Market {
        &self.market
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn date(&self) -> NaiveDate {
        self.market.date()
    }

    pub fn list_prices(&self) -> std::collections::BTreeMap<String, f64> {
        self.market.list_prices()
    }

    pub fn price_history(&self, symbol: &str) -> Result<Vec<PricePoint>, StocksimError> {
        self.market.price_history(symbol)
    }

    /// Advance the market, bounded by the configured per-request maximum.
    pub fn advance(&mut self, days: i64) -> Result<NaiveDate, StocksimError> {
        if days > self.settings.max_advance_days {
            return Err(StocksimError::InvalidDuration {
                days,
                reason: format!("too large (max {})", self.settings.max_advance_days),
            });
        }
        let date = self.market.advance(days)?;
        tracing::info!(days, %date, "simulated days");
        Ok(date)
    }

    pub fn add_instrument(
        &mut self,
        symbol: &str,
        price: f64,
        mu: f64,
        sigma: f64,
    ) -> Result<&Instrument, StocksimError> {
        self.market.add_instrument(symbol, price, mu, sigma)
    }

    pub fn buy(&mut self, symbol: &str, qty: i64) -> Result<Trade, StocksimError> {
        self.execute(Order::buy(symbol, qty))
    }

    pub fn sell(&mut self, symbol: &str, qty: i64) -> Result<Trade, StocksimError> {
        self.execute(Order::sell(symbol, qty))
    }

    /// Execute an order against a copy of the ledger, persist the copy, then
    /// swap it in. The symbol must be listed even when a price override is given.
    pub fn execute(&mut self, order: Order) -> Result<Trade, StocksimError> {
        let symbol = normalize_symbol(&order.symbol)?;
        let market_price = self.market.price(&symbol)?;
        let price = order.price.unwrap_or(market_price);
        let date = Some(self.market.date());

        let mut next = self.ledger.clone();
        let trade = match order.side {
            Side::Buy => next.buy(&symbol, price, order.qty, date)?,
            Side::Sell => next.sell(&symbol, price, order.qty, date)?,
        };

        if let Err(e) = self.store.save(&next) {
            tracing::error!(error = %e, side = %order.side, %symbol, "persist failed, trade rolled back");
            return Err(e);
        }
        self.ledger = next;

        tracing::info!(
            side = %trade.side,
            symbol = %trade.symbol,
            qty = trade.qty,
            price = trade.price,
            cash_after = self.ledger.cash(),
            "trade executed"
        );
        Ok(trade)
    }

    pub fn net_worth(&self) -> f64 {
        self.ledger.net_worth(&self.market)
    }

    pub fn summary(&self) -> PortfolioSummary {
        self.ledger.summary(&self.market)
    }

    pub fn stats(&self) -> TradeStats {
        TradeStats::compute(
            self.ledger.trades(),
            self.net_worth(),
            self.ledger.initial_cash(),
        )
    }

    /// Archive the current record, then reinitialise ledger and market to
    /// their configured defaults. Returns the archive location, if any.
    pub fn reset(&mut self) -> Result<Option<PathBuf>, StocksimError> {
        let backup = self.store.archive()?;
        let ledger = Ledger::new(self.settings.starting_cash);
        let market = build_market(&self.settings)?;
        self.store.save(&ledger)?;
        self.ledger = ledger;
        self.market = market;
        tracing::info!(backup = ?backup, "reset performed");
        Ok(backup)
    }
}
