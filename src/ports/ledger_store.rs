//! Durable storage port for the ledger.

use std::path::PathBuf;

use crate::domain::error::StocksimError;
use crate::domain::ledger::Ledger;

pub trait LedgerStore {
    /// Read the durable record. When none exists, a fresh ledger with
    /// `starting_cash` is created and saved before being returned.
    fn load(&self, starting_cash: f64) -> Result<Ledger, StocksimError>;

    /// Overwrite the durable record with the full ledger state.
    fn save(&self, ledger: &Ledger) -> Result<(), StocksimError>;

    /// Copy the current record aside. Returns where it went, or `None` when
    /// there was nothing to archive.
    fn archive(&self) -> Result<Option<PathBuf>, StocksimError>;

    /// Human-readable location of the record, for messages.
    fn location(&self) -> String;
}
