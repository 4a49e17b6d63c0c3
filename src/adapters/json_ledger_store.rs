//! JSON file ledger store.
//!
//! The durable record is a single JSON object:
//!
//! ```json
//! {
//!   "cash": 5000.0,
//!   "initial_cash": 10000.0,
//!   "holdings": { "ABC": 50 },
//!   "trade_history": [
//!     { "date": "2024-01-02", "type": "BUY", "symbol": "ABC", "qty": 50, "price": 100.0 }
//!   ]
//! }
//! ```
//!
//! Reading is lenient where it is safe to be: a leading UTF-8 byte-order mark
//! is ignored, holding entries whose quantity is not an integer are skipped,
//! and the legacy `trades` key is accepted when `trade_history` is absent.
//! `cash` and `initial_cash` default to the starting cash only when the key is
//! absent; `null`, negative or non-numeric amounts are malformed. Trade-log
//! rows are kept as written, including ones with a non-positive quantity or
//! price; trade statistics leave those rows out of their totals.
//! Anything that fails to decode as a whole is a [`StocksimError::MalformedRecord`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::error::StocksimError;
use crate::domain::ledger::{CASH_EPSILON, Ledger};
use crate::domain::trade::Trade;
use crate::ports::ledger_store::LedgerStore;

const BOM: &[u8] = b"\xEF\xBB\xBF";

/// Largest float magnitude that converts to `i64` without saturating.
const MAX_INTEGRAL_FLOAT: f64 = 9.2e18;

#[derive(Serialize)]
struct RecordRef<'a> {
    cash: f64,
    initial_cash: f64,
    holdings: &'a BTreeMap<String, i64>,
    trade_history: &'a [Trade],
}

#[derive(Deserialize)]
struct RawRecord {
    #[serde(default, deserialize_with = "present")]
    cash: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    initial_cash: Option<Value>,
    #[serde(default)]
    holdings: BTreeMap<String, Value>,
    trade_history: Option<Vec<Trade>>,
    trades: Option<Vec<Trade>>,
}

pub struct JsonLedgerStore {
    path: PathBuf,
}

impl JsonLedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persistence_error(&self, reason: impl ToString) -> StocksimError {
        StocksimError::Persistence {
            path: self.location(),
            reason: reason.to_string(),
        }
    }

    fn malformed(&self, reason: impl ToString) -> StocksimError {
        StocksimError::MalformedRecord {
            path: self.location(),
            reason: reason.to_string(),
        }
    }

    fn ensure_parent_dir(&self) -> Result<(), StocksimError> {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => {
                fs::create_dir_all(dir).map_err(|e| self.persistence_error(e))
            }
            _ => Ok(()),
        }
    }

    fn backup_path(&self) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("portfolio");
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let dir = self.path.parent().unwrap_or_else(|| Path::new(""));

        let mut candidate = dir.join(format!("{stem}_backup_{stamp}.json"));
        let mut n = 1;
        while candidate.exists() {
            candidate = dir.join(format!("{stem}_backup_{stamp}_{n}.json"));
            n += 1;
        }
        candidate
    }
}

/// Decode a durable record. `starting_cash` fills in a missing `cash` or
/// `initial_cash` field.
pub fn decode_record(bytes: &[u8], starting_cash: f64) -> Result<Ledger, serde_json::Error> {
    let bytes = bytes.strip_prefix(BOM).unwrap_or(bytes);
    let raw: RawRecord = serde_json::from_slice(bytes)?;

    let holdings = raw.holdings.into_iter().filter_map(|(symbol, qty)| {
        let parsed = holding_quantity(&qty);
        if parsed.is_none() {
            tracing::warn!(%symbol, value = %qty, "skipping holding with non-integer quantity");
        }
        parsed.map(|q| (symbol, q))
    });

    let trades = raw.trade_history.or(raw.trades).unwrap_or_default();

    Ok(Ledger::from_parts(
        cash_field("cash", raw.cash, starting_cash)?,
        cash_field("initial_cash", raw.initial_cash, starting_cash)?,
        holdings,
        trades,
    ))
}

/// Distinguishes an explicit `null` (`Some(Value::Null)`) from an absent key.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

fn cash_field(name: &str, value: Option<Value>, default: f64) -> Result<f64, serde_json::Error> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.as_f64() {
        Some(cash) if cash.is_finite() && cash >= -CASH_EPSILON => Ok(cash),
        _ => Err(<serde_json::Error as serde::de::Error>::custom(format!(
            "{name} must be a non-negative number, got {value}"
        ))),
    }
}

/// Encode the ledger. Non-finite amounts are refused rather than written as `null`.
pub fn encode_record(ledger: &Ledger) -> Result<String, serde_json::Error> {
    let mut amounts = [ledger.cash(), ledger.initial_cash()]
        .into_iter()
        .chain(ledger.trades().iter().map(|t| t.price));
    if let Some(bad) = amounts.find(|v| !v.is_finite()) {
        return Err(<serde_json::Error as serde::ser::Error>::custom(format!(
            "refusing to write non-finite amount {bad}"
        )));
    }
    serde_json::to_string_pretty(&RecordRef {
        cash: ledger.cash(),
        initial_cash: ledger.initial_cash(),
        holdings: ledger.holdings(),
        trade_history: ledger.trades(),
    })
}

fn holding_quantity(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && f.abs() < MAX_INTEGRAL_FLOAT).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

impl LedgerStore for JsonLedgerStore {
    fn load(&self, starting_cash: f64) -> Result<Ledger, StocksimError> {
        if !self.path.exists() {
            // Bootstrap: the first load writes a fresh record.
            let ledger = Ledger::new(starting_cash);
            self.save(&ledger)?;
            tracing::info!(path = %self.location(), starting_cash, "created new portfolio record");
            return Ok(ledger);
        }

        let bytes = fs::read(&self.path).map_err(|e| self.persistence_error(e))?;
        let ledger = decode_record(&bytes, starting_cash).map_err(|e| self.malformed(e))?;
        tracing::debug!(
            path = %self.location(),
            cash = ledger.cash(),
            holdings = ledger.holdings().len(),
            trades = ledger.trades().len(),
            "portfolio loaded"
        );
        Ok(ledger)
    }

    fn save(&self, ledger: &Ledger) -> Result<(), StocksimError> {
        self.ensure_parent_dir()?;
        let body = encode_record(ledger).map_err(|e| self.persistence_error(e))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, body).map_err(|e| self.persistence_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.persistence_error(e))?;
        Ok(())
    }

    fn archive(&self) -> Result<Option<PathBuf>, StocksimError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let backup = self.backup_path();
        fs::copy(&self.path, &backup).map_err(|e| self.persistence_error(e))?;
        Ok(Some(backup))
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> JsonLedgerStore {
        JsonLedgerStore::new(dir.path().join("data").join("portfolio.json"))
    }

    fn d(day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2024, 1, day)
    }

    #[test]
    fn load_missing_creates_record() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(!store.path().exists());

        let ledger = store.load(10_000.0).unwrap();
        assert_eq!(ledger, Ledger::new(10_000.0));
        assert!(store.path().exists());
    }

    #[test]
    fn save_then_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let mut ledger = Ledger::new(10_000.0);
        ledger.buy("ABC", 100.0, 50, d(2)).unwrap();
        ledger.buy("XYZ", 33.3, 7, d(3)).unwrap();
        ledger.sell("ABC", 101.25, 20, d(4)).unwrap();
        store.save(&ledger).unwrap();

        let loaded = store.load(10_000.0).unwrap();
        assert_eq!(loaded, ledger);
    }

    #[test]
    fn save_overwrites_whole_record() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let mut ledger = Ledger::new(1_000.0);
        ledger.buy("ABC", 10.0, 1, d(2)).unwrap();
        store.save(&ledger).unwrap();
        store.save(&Ledger::new(50.0)).unwrap();

        let loaded = store.load(0.0).unwrap();
        assert!(loaded.trades().is_empty());
        assert!(loaded.holdings().is_empty());
        assert!((loaded.cash() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn decode_skips_non_integer_holdings() {
        let json = r#"{"cash": 10.0, "holdings": {"abc": 5, "xyz": 1.5, "foo": "7", "bar": "many", "baz": null, "qux": 3.0}}"#;
        let ledger = decode_record(json.as_bytes(), 10_000.0).unwrap();
        let held: Vec<_> = ledger.holdings().iter().map(|(k, v)| (k.as_str(), *v)).collect();
        assert_eq!(held, vec![("ABC", 5), ("FOO", 7), ("QUX", 3)]);
    }

    #[test]
    fn decode_accepts_legacy_trades_key() {
        let json = r#"{"cash": 900.0, "trades": [{"date":"2024-01-02","type":"BUY","symbol":"ABC","qty":1,"price":100.0}]}"#;
        let ledger = decode_record(json.as_bytes(), 1_000.0).unwrap();
        assert_eq!(ledger.trades().len(), 1);
        assert!((ledger.initial_cash() - 1_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn decode_prefers_canonical_trade_key() {
        let json = r#"{
            "trade_history": [{"date":"2024-01-02","type":"SELL","symbol":"ABC","qty":2,"price":10.0}],
            "trades": [{"date":"2024-01-03","type":"BUY","symbol":"XYZ","qty":1,"price":5.0}]
        }"#;
        let ledger = decode_record(json.as_bytes(), 1_000.0).unwrap();
        assert_eq!(ledger.trades().len(), 1);
        assert_eq!(ledger.trades()[0].symbol, "ABC");
    }

    #[test]
    fn decode_defaults_missing_cash() {
        let ledger = decode_record(b"{}", 10_000.0).unwrap();
        assert_eq!(ledger, Ledger::new(10_000.0));
    }

    #[test]
    fn decode_rejects_null_or_negative_cash() {
        assert!(decode_record(br#"{"cash": null}"#, 10_000.0).is_err());
        assert!(decode_record(br#"{"cash": -5.0}"#, 10_000.0).is_err());
        assert!(decode_record(br#"{"cash": "lots"}"#, 10_000.0).is_err());
        assert!(decode_record(br#"{"cash": 1.0, "initial_cash": null}"#, 10_000.0).is_err());

        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), r#"{"cash": null}"#).unwrap();
        assert!(matches!(
            store.load(10_000.0).unwrap_err(),
            StocksimError::MalformedRecord { .. }
        ));
    }

    #[test]
    fn decode_keeps_odd_trade_rows() {
        let json = r#"{"cash": 1.0, "trade_history": [{"date":"2024-01-02","type":"BUY","symbol":"ABC","qty":0,"price":-1.0}]}"#;
        let ledger = decode_record(json.as_bytes(), 0.0).unwrap();
        assert_eq!(ledger.trades().len(), 1);
    }

    #[test]
    fn encode_refuses_non_finite_amounts() {
        let inf_cash = Ledger::from_parts(f64::INFINITY, 10.0, Vec::new(), vec![]);
        assert!(encode_record(&inf_cash).is_err());

        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save(&Ledger::new(10.0)).unwrap();
        assert!(store.save(&inf_cash).unwrap_err().is_persistence());
        let reloaded = store.load(0.0).unwrap();
        assert!((reloaded.cash() - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn decode_skips_holdings_too_large_for_i64() {
        let json = r#"{"cash": 1.0, "holdings": {"abc": 1e30, "xyz": 2}}"#;
        let ledger = decode_record(json.as_bytes(), 0.0).unwrap();
        assert_eq!(ledger.quantity("ABC"), 0);
        assert_eq!(ledger.quantity("XYZ"), 2);
    }

    #[test]
    fn decode_tolerates_bom() {
        let mut bytes = BOM.to_vec();
        bytes.extend_from_slice(br#"{"cash": 12.5}"#);
        let ledger = decode_record(&bytes, 0.0).unwrap();
        assert!((ledger.cash() - 12.5).abs() < f64::EPSILON);
    }

    #[test]
    fn truncated_record_is_fatal() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), r#"{"cash": 100.0, "holdings": {"AB"#).unwrap();
        let err = store.load(10_000.0).unwrap_err();
        assert!(matches!(err, StocksimError::MalformedRecord { .. }));
    }

    #[test]
    fn invalid_encoding_is_fatal() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), [0xff, 0xfe, 0x00, 0x7b]).unwrap();
        assert!(store.load(10_000.0).unwrap_err().is_persistence());
    }

    #[test]
    fn malformed_trade_entry_is_fatal() {
        let json = r#"{"trade_history": [{"date":"yesterday","type":"BUY","symbol":"ABC","qty":1,"price":1.0}]}"#;
        assert!(decode_record(json.as_bytes(), 0.0).is_err());
    }

    #[test]
    fn archive_copies_existing_record() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.archive().unwrap(), None);

        store.save(&Ledger::new(42.0)).unwrap();
        let backup = store.archive().unwrap().unwrap();
        assert!(backup.exists());
        assert!(
            backup
                .file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("portfolio_backup_")
        );
        let archived = decode_record(&fs::read(&backup).unwrap(), 0.0).unwrap();
        assert!((archived.cash() - 42.0).abs() < f64::EPSILON);

        let second = store.archive().unwrap().unwrap();
        assert_ne!(second, backup);
    }

    #[test]
    fn encoded_record_uses_canonical_keys() {
        let mut ledger = Ledger::new(100.0);
        ledger.buy("ABC", 10.0, 2, d(2)).unwrap();
        let value: Value = serde_json::from_str(&encode_record(&ledger).unwrap()).unwrap();
        assert_eq!(value["cash"], 80.0);
        assert_eq!(value["holdings"]["ABC"], 2);
        assert_eq!(value["trade_history"][0]["type"], "BUY");
        assert!(value.get("trades").is_none());
    }
}
