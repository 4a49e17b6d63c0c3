//! Concrete adapter implementations for the ports.

pub mod csv_adapter;
pub mod file_config_adapter;
pub mod json_ledger_store;
#[cfg(feature = "web")]
pub mod web;
