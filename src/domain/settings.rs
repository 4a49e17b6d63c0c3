//! Typed runtime settings built from an INI configuration.

use chrono::NaiveDate;
use std::path::PathBuf;

use super::error::StocksimError;
use super::ledger::DEFAULT_STARTING_CASH;
use super::market::{InstrumentSpec, default_instruments};
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_MAX_ADVANCE_DAYS: i64 = 3650;
pub const DEFAULT_PORTFOLIO_PATH: &str = "data/portfolio.json";
pub const DEFAULT_LISTEN: &str = "127.0.0.1:5001";
pub const DEFAULT_STATIC_DIR: &str = "static";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Simulated start date; `None` means today.
    pub start_date: Option<NaiveDate>,
    /// RNG seed; `None` draws from OS entropy.
    pub seed: Option<u64>,
    pub max_advance_days: i64,
    pub portfolio_path: PathBuf,
    pub starting_cash: f64,
    pub listen: String,
    pub static_dir: PathBuf,
    pub instruments: Vec<InstrumentSpec>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            start_date: None,
            seed: None,
            max_advance_days: DEFAULT_MAX_ADVANCE_DAYS,
            portfolio_path: PathBuf::from(DEFAULT_PORTFOLIO_PATH),
            starting_cash: DEFAULT_STARTING_CASH,
            listen: DEFAULT_LISTEN.to_string(),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            instruments: default_instruments(),
        }
    }
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> StocksimError {
    StocksimError::ConfigInvalid {
        section: section.into(),
        key: key.into(),
        reason: reason.into(),
    }
}

impl Settings {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, StocksimError> {
        let defaults = Settings::default();

        let start_date = match config.get_string("simulator", "start_date") {
            Some(s) => Some(NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
                invalid("simulator", "start_date", "invalid date format (expected YYYY-MM-DD)")
            })?),
            None => None,
        };

        let seed = match config.get_string("simulator", "seed") {
            Some(s) => Some(
                s.trim()
                    .parse::<u64>()
                    .map_err(|_| invalid("simulator", "seed", "must be a non-negative integer"))?,
            ),
            None => None,
        };

        let max_advance_days = config
            .get_int("simulator", "max_advance_days")
            .map_err(|bad| invalid("simulator", "max_advance_days", format!("not an integer: {}", bad.0)))?
            .unwrap_or(DEFAULT_MAX_ADVANCE_DAYS);
        if max_advance_days < 1 {
            return Err(invalid("simulator", "max_advance_days", "must be >= 1"));
        }

        let starting_cash = config
            .get_double("portfolio", "starting_cash")
            .map_err(|bad| invalid("portfolio", "starting_cash", format!("not a number: {}", bad.0)))?
            .unwrap_or(DEFAULT_STARTING_CASH);
        if !starting_cash.is_finite() || starting_cash < 0.0 {
            return Err(invalid("portfolio", "starting_cash", "must be a finite number >= 0"));
        }

        let instruments = parse_instruments(config)?;

        Ok(Settings {
            start_date,
            seed,
            max_advance_days,
            portfolio_path: config
                .get_string("portfolio", "path")
                .map(PathBuf::from)
                .unwrap_or(defaults.portfolio_path),
            starting_cash,
            listen: config.get_string("web", "listen").unwrap_or(defaults.listen),
            static_dir: config
                .get_string("web", "static_dir")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
            instruments: if instruments.is_empty() {
                defaults.instruments
            } else {
                instruments
            },
        })
    }

    pub fn start_date_or_today(&self) -> NaiveDate {
        self.start_date
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

/// `[instruments]` entries of the form `SYMBOL = price[, mu[, sigma]]`.
fn parse_instruments(config: &dyn ConfigPort) -> Result<Vec<InstrumentSpec>, StocksimError> {
    let mut specs = Vec::new();
    for key in config.keys("instruments") {
        let raw = config.get_string("instruments", &key).unwrap_or_default();
        let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
        if parts.is_empty() || parts.len() > 3 || parts[0].is_empty() {
            return Err(invalid(
                "instruments",
                &key,
                "expected `price[, mu[, sigma]]`",
            ));
        }
        let number = |idx: usize, default: f64| -> Result<f64, StocksimError> {
            match parts.get(idx) {
                Some(s) => s
                    .parse::<f64>()
                    .map_err(|_| invalid("instruments", &key, format!("not a number: {s}"))),
                None => Ok(default),
            }
        };
        specs.push(InstrumentSpec {
            symbol: key.to_uppercase(),
            price: number(0, f64::NAN)?,
            mu: number(1, super::price_process::DEFAULT_MU)?,
            sigma: number(2, super::price_process::DEFAULT_SIGMA)?,
        });
    }
    Ok(specs)
}
