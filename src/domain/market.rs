//! Simulated market: a calendar date plus a set of instruments evolved day by day.

use chrono::{Days, NaiveDate};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::BTreeMap;

use super::error::{StocksimError, normalize_symbol};
use super::instrument::{Instrument, PricePoint};

/// Instrument definition used to seed a market.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentSpec {
    pub symbol: String,
    pub price: f64,
    pub mu: f64,
    pub sigma: f64,
}

impl InstrumentSpec {
    pub fn new(symbol: &str, price: f64, mu: f64, sigma: f64) -> Self {
        InstrumentSpec {
            symbol: symbol.to_string(),
            price,
            mu,
            sigma,
        }
    }
}

pub fn default_instruments() -> Vec<InstrumentSpec> {
    vec![
        InstrumentSpec::new("ABC", 100.0, 0.0006, 0.02),
        InstrumentSpec::new("XYZ", 50.0, 0.0003, 0.03),
        InstrumentSpec::new("FOO", 200.0, 0.0008, 0.015),
        InstrumentSpec::new("BAR", 10.0, 0.0001, 0.05),
    ]
}

#[derive(Debug, Clone)]
pub struct Market {
    date: NaiveDate,
    instruments: BTreeMap<String, Instrument>,
    rng: StdRng,
}

impl Market {
    pub fn new(start_date: NaiveDate, rng: StdRng) -> Self {
        Market {
            date: start_date,
            instruments: BTreeMap::new(),
            rng,
        }
    }

    /// Market whose price paths are reproducible for a given seed.
    pub fn seeded(start_date: NaiveDate, seed: u64) -> Self {
        Self::new(start_date, StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy(start_date: NaiveDate) -> Self {
        Self::new(start_date, StdRng::from_entropy())
    }

    /// Build a market pre-populated with `specs`.
    pub fn with_instruments(
        start_date: NaiveDate,
        rng: StdRng,
        specs: &[InstrumentSpec],
    ) -> Result<Self, StocksimError> {
        let mut market = Self::new(start_date, rng);
        for spec in specs {
            market.add_instrument(&spec.symbol, spec.price, spec.mu, spec.sigma)?;
        }
        Ok(market)
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Insert a new instrument and record its opening price at the current date.
    pub fn add_instrument(
        &mut self,
        symbol: &str,
        price: f64,
        mu: f64,
        sigma: f64,
    ) -> Result<&Instrument, StocksimError> {
        let symbol = normalize_symbol(symbol)?;
        if self.instruments.contains_key(&symbol) {
            return Err(StocksimError::DuplicateSymbol { symbol });
        }
        let mut instrument = Instrument::new(&symbol, price, mu, sigma)?;
        instrument.record(self.date);
        tracing::info!(symbol = %symbol, price, mu, sigma, "instrument added");
        Ok(self.instruments.entry(symbol).or_insert(instrument))
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.instruments.contains_key(&symbol.trim().to_uppercase())
    }

    pub fn instrument(&self, symbol: &str) -> Option<&Instrument> {
        self.instruments.get(&symbol.trim().to_uppercase())
    }

    /// Instruments in symbol order.
    pub fn instruments(&self) -> impl Iterator<Item = &Instrument> {
        self.instruments.values()
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    /// Current price, `None` when the symbol is not listed.
    pub fn price_of(&self, symbol: &str) -> Option<f64> {
        self.instrument(symbol).map(Instrument::price)
    }

    pub fn price(&self, symbol: &str) -> Result<f64, StocksimError> {
        self.price_of(symbol)
            .ok_or_else(|| StocksimError::UnknownSymbol {
                symbol: symbol.trim().to_uppercase(),
            })
    }

    /// Every instrument's current price keyed in lexicographic symbol order.
    pub fn list_prices(&self) -> BTreeMap<String, f64> {
        self.instruments
            .iter()
            .map(|(symbol, inst)| (symbol.clone(), inst.price()))
            .collect()
    }

    /// Advance `days` whole calendar days. Each day moves the date forward, then
    /// steps every instrument once and records the new price. Returns the new date.
    pub fn advance(&mut self, days: i64) -> Result<NaiveDate, StocksimError> {
        if days < 1 {
            return Err(StocksimError::InvalidDuration {
                days,
                reason: "number of days must be >= 1".into(),
            });
        }
        if self.date.checked_add_days(Days::new(days as u64)).is_none() {
            return Err(StocksimError::InvalidDuration {
                days,
                reason: "date would leave the supported calendar range".into(),
            });
        }

        for _ in 0..days {
            // Range already checked above.
            self.date = self.date + Days::new(1);
            for instrument in self.instruments.values_mut() {
                let next = instrument.process().simulate_day(instrument.price(), &mut self.rng);
                instrument.set_price(next);
                instrument.record(self.date);
            }
        }

        tracing::debug!(days, date = %self.date, "market advanced");
        Ok(self.date)
    }

    /// Full recorded (date, price) sequence for `symbol`, oldest first.
    pub fn price_history(&self, symbol: &str) -> Result<Vec<PricePoint>, StocksimError> {
        self.instrument(symbol)
            .map(|inst| inst.history().iter().copied().collect())
            .ok_or_else(|| StocksimError::UnknownSymbol {
                symbol: symbol.trim().to_uppercase(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn sample_market() -> Market {
        Market::with_instruments(start(), StdRng::seed_from_u64(42), &default_instruments()).unwrap()
    }

    #[test]
    fn default_market_has_four_instruments() {
        let market = sample_market();
        assert_eq!(market.len(), 4);
        assert!((market.price("ABC").unwrap() - 100.0).abs() < f64::EPSILON);
        assert!((market.price("bar").unwrap() - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn add_records_initial_point() {
        let mut market = Market::seeded(start(), 1);
        market.add_instrument("abc", 100.0, 0.0, 0.02).unwrap();
        let hist = market.price_history("ABC").unwrap();
        assert_eq!(hist, vec![PricePoint { date: start(), price: 100.0 }]);
    }

    #[test]
    fn duplicate_symbol_is_case_insensitive() {
        let mut market = sample_market();
        let err = market.add_instrument("abc", 5.0, 0.0, 0.02).unwrap_err();
        assert!(matches!(err, StocksimError::DuplicateSymbol { ref symbol } if symbol == "ABC"));
        assert_eq!(market.len(), 4);
        assert!((market.price("ABC").unwrap() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn list_prices_sorted_regardless_of_insertion() {
        let mut market = Market::seeded(start(), 3);
        for sym in ["ZED", "ALPHA", "MID"] {
            market.add_instrument(sym, 10.0, 0.0, 0.02).unwrap();
        }
        let keys: Vec<_> = market.list_prices().into_keys().collect();
        assert_eq!(keys, vec!["ALPHA", "MID", "ZED"]);
    }

    #[test]
    fn advance_moves_date_and_appends_history() {
        let mut market = sample_market();
        let new_date = market.advance(5).unwrap();
        assert_eq!(new_date, NaiveDate::from_ymd_opt(2024, 1, 6).unwrap());
        assert_eq!(market.date(), new_date);
        for inst in market.instruments() {
            let hist = inst.history();
            assert_eq!(hist.len(), 6);
            let dates: Vec<_> = hist.iter().map(|p| p.date).collect();
            let mut sorted = dates.clone();
            sorted.sort();
            assert_eq!(dates, sorted);
            assert!((hist.back().unwrap().price - inst.price()).abs() < f64::EPSILON);
            assert!(inst.price() > 0.0);
        }
    }

    #[test]
    fn advance_rejects_non_positive_days() {
        let mut market = sample_market();
        assert!(matches!(
            market.advance(0),
            Err(StocksimError::InvalidDuration { days: 0, .. })
        ));
        assert!(market.advance(-3).is_err());
        assert_eq!(market.date(), start());
    }

    #[test]
    fn same_seed_same_path() {
        let mut a = sample_market();
        let mut b = sample_market();
        a.advance(30).unwrap();
        b.advance(30).unwrap();
        assert_eq!(a.list_prices(), b.list_prices());
    }

    #[test]
    fn advance_one_at_a_time_matches_bulk() {
        let mut bulk = sample_market();
        let mut stepwise = sample_market();
        bulk.advance(10).unwrap();
        for _ in 0..10 {
            stepwise.advance(1).unwrap();
        }
        assert_eq!(bulk.list_prices(), stepwise.list_prices());
    }

    #[test]
    fn unknown_symbol_history() {
        let market = sample_market();
        assert!(matches!(
            market.price_history("NOPE"),
            Err(StocksimError::UnknownSymbol { .. })
        ));
        assert!(market.price_of("NOPE").is_none());
    }

    #[test]
    fn empty_market_advances_date_only() {
        let mut market = Market::seeded(start(), 9);
        assert!(market.is_empty());
        market.advance(2).unwrap();
        assert_eq!(market.date(), NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
    }
}
