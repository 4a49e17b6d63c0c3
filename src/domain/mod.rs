//! Core domain types and logic.

pub mod error;
pub mod price_process;
pub mod instrument;
pub mod market;
pub mod trade;
pub mod ledger;
pub mod stats;
pub mod settings;
pub mod simulator;
