//! Summary statistics over the trade log.

use serde::Serialize;

use super::trade::{Side, Trade};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeStats {
    pub total_buys: f64,
    pub total_sells: f64,
    pub net_invested: f64,
    pub total_profit: f64,
    pub num_trades: usize,
}

impl TradeStats {
    /// `total_profit` is measured against `initial_cash`; trades with a
    /// non-positive quantity or negative price are ignored in the totals.
    pub fn compute(trades: &[Trade], net_worth: f64, initial_cash: f64) -> Self {
        let mut total_buys = 0.0;
        let mut total_sells = 0.0;

        for trade in trades {
            if trade.qty <= 0 || trade.price < 0.0 {
                continue;
            }
            match trade.side {
                Side::Buy => total_buys += trade.notional(),
                Side::Sell => total_sells += trade.notional(),
            }
        }

        TradeStats {
            total_buys,
            total_sells,
            net_invested: total_buys - total_sells,
            total_profit: net_worth - initial_cash,
            num_trades: trades.len(),
        }
    }
}
