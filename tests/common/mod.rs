#![allow(dead_code)]

use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use stocksim::adapters::json_ledger_store::JsonLedgerStore;
use stocksim::domain::error::StocksimError;
use stocksim::domain::ledger::Ledger;
use stocksim::domain::settings::Settings;
use stocksim::domain::simulator::Simulator;
use stocksim::ports::ledger_store::LedgerStore;

/// Ledger store kept in memory. Clones share state, so a test can keep a
/// handle after handing one to the simulator.
#[derive(Clone, Default)]
pub struct MemoryStore {
    pub saved: Arc<Mutex<Option<Ledger>>>,
    pub fail_saves: Arc<Mutex<bool>>,
    pub archives: Arc<Mutex<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ledger(ledger: Ledger) -> Self {
        let store = Self::default();
        *store.saved.lock().unwrap() = Some(ledger);
        store
    }

    pub fn fail_saves(&self, fail: bool) {
        *self.fail_saves.lock().unwrap() = fail;
    }

    pub fn saved(&self) -> Option<Ledger> {
        self.saved.lock().unwrap().clone()
    }
}

impl LedgerStore for MemoryStore {
    fn load(&self, starting_cash: f64) -> Result<Ledger, StocksimError> {
        let mut saved = self.saved.lock().unwrap();
        Ok(saved
            .get_or_insert_with(|| Ledger::new(starting_cash))
            .clone())
    }

    fn save(&self, ledger: &Ledger) -> Result<(), StocksimError> {
        if *self.fail_saves.lock().unwrap() {
            return Err(StocksimError::Persistence {
                path: "memory".into(),
                reason: "write refused".into(),
            });
        }
        *self.saved.lock().unwrap() = Some(ledger.clone());
        Ok(())
    }

    fn archive(&self) -> Result<Option<PathBuf>, StocksimError> {
        let mut count = self.archives.lock().unwrap();
        *count += 1;
        Ok(Some(PathBuf::from(format!("memory_backup_{count}"))))
    }

    fn location(&self) -> String {
        "memory".into()
    }
}

pub fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

/// Default instruments, fixed start date and seed.
pub fn test_settings() -> Settings {
    Settings {
        start_date: Some(start_date()),
        seed: Some(7),
        ..Settings::default()
    }
}

pub fn memory_simulator() -> (Simulator, MemoryStore) {
    let store = MemoryStore::new();
    let sim = Simulator::bootstrap(test_settings(), Box::new(store.clone())).unwrap();
    (sim, store)
}

pub fn file_simulator(path: PathBuf) -> Simulator {
    let settings = Settings {
        portfolio_path: path.clone(),
        ..test_settings()
    };
    Simulator::bootstrap(settings, Box::new(JsonLedgerStore::new(path))).unwrap()
}

pub fn assert_close(a: f64, b: f64) {
    assert!((a - b).abs() < 1e-6, "expected {b}, got {a}");
}
