//! CSV export of the trade log and of instrument price history.

use crate::domain::error::StocksimError;
use crate::domain::instrument::PricePoint;
use crate::domain::trade::Trade;
use std::fs::File;
use std::io::Write;
use std::path::Path;

fn csv_error(path: &str, err: csv::Error) -> StocksimError {
    StocksimError::Persistence {
        path: path.to_string(),
        reason: format!("CSV write error: {}", err),
    }
}

/// Columns: `date,type,symbol,qty,price`.
pub fn write_trades<W: Write>(trades: &[Trade], out: W) -> Result<(), StocksimError> {
    let mut wtr = csv::Writer::from_writer(out);
    for trade in trades {
        wtr.serialize(trade).map_err(|e| csv_error("<trades>", e))?;
    }
    // Header only written on first record; emit it explicitly for an empty log.
    if trades.is_empty() {
        wtr.write_record(["date", "type", "symbol", "qty", "price"])
            .map_err(|e| csv_error("<trades>", e))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Columns: `date,symbol,price`.
pub fn write_price_history<W: Write>(
    symbol: &str,
    points: &[PricePoint],
    out: W,
) -> Result<(), StocksimError> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(["date", "symbol", "price"])
        .map_err(|e| csv_error(symbol, e))?;
    for point in points {
        wtr.write_record([
            point.date.format("%Y-%m-%d").to_string(),
            symbol.to_string(),
            point.price.to_string(),
        ])
        .map_err(|e| csv_error(symbol, e))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn export_trades(path: &Path, trades: &[Trade]) -> Result<(), StocksimError> {
    let file = File::create(path).map_err(|e| StocksimError::Persistence {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    write_trades(trades, file)
}

pub fn export_price_history(
    path: &Path,
    symbol: &str,
    points: &[PricePoint],
) -> Result<(), StocksimError> {
    let file = File::create(path).map_err(|e| StocksimError::Persistence {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    write_price_history(symbol, points, file)
}
