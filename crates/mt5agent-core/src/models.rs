//! Plain records for the data the MT5 platform returns.
//!
//! Prices and volumes are `f64` throughout: the platform's native API
//! reports doubles and this layer performs no arithmetic of its own beyond
//! the ratios the analysis skills derive from already-returned fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::OrderSide;

/// Retcode reported by the platform for a completed trade request.
pub const TRADE_RETCODE_DONE: u32 = 10009;

/// Retcode reported by the platform for a passing order check.
pub const RETCODE_CHECK_OK: u32 = 0;

/// Trading account state as reported by the terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountInfo {
    /// Account number.
    pub login: i64,
    /// Account trade mode (0 demo, 1 contest, 2 real).
    pub trade_mode: i32,
    pub name: String,
    pub server: String,
    pub currency: String,
    pub company: String,
    pub leverage: i64,
    pub balance: f64,
    pub credit: f64,
    pub equity: f64,
    pub profit: f64,
    pub margin: f64,
    pub margin_free: f64,
    /// Margin level in percent.
    pub margin_level: f64,
    pub trade_allowed: bool,
}

/// Terminal build and permission state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalInfo {
    pub build: i64,
    pub connected: bool,
    pub trade_allowed: bool,
    pub dlls_allowed: bool,
    pub name: String,
    pub company: String,
    pub path: String,
}

/// Trading specification and current prices for one symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub name: String,
    pub description: String,
    pub currency_base: String,
    pub currency_profit: String,
    pub bid: f64,
    pub ask: f64,
    /// Minimal price increment.
    pub point: f64,
    pub digits: i32,
    /// Spread in points.
    pub spread: i64,
    pub volume_min: f64,
    pub volume_max: f64,
    pub volume_step: f64,
    pub trade_contract_size: f64,
}

/// A single bid/ask quote snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tick {
    pub time: DateTime<Utc>,
    pub bid: f64,
    pub ask: f64,
    pub last: f64,
    pub volume: u64,
}

/// One OHLCV aggregate over a timeframe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub tick_volume: u64,
    /// Spread in points at bar close.
    pub spread: i32,
    pub real_volume: u64,
}

/// A pending order resting on the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingOrder {
    pub ticket: i64,
    pub symbol: String,
    /// Platform order type name, e.g. `"BUY_LIMIT"`.
    pub order_type: String,
    pub volume_initial: f64,
    pub volume_current: f64,
    pub price_open: f64,
    pub sl: f64,
    pub tp: f64,
    pub price_current: f64,
    pub magic: i64,
    pub comment: String,
    pub time_setup: DateTime<Utc>,
}

/// An open position with its unrealized metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub ticket: i64,
    pub symbol: String,
    pub side: OrderSide,
    pub volume: f64,
    pub price_open: f64,
    pub price_current: f64,
    pub sl: f64,
    pub tp: f64,
    pub profit: f64,
    pub swap: f64,
    pub magic: i64,
    pub comment: String,
    pub time: DateTime<Utc>,
}

/// A completed or cancelled order from trading history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryOrder {
    pub ticket: i64,
    pub symbol: String,
    pub order_type: String,
    /// Terminal order state name, e.g. `"FILLED"`.
    pub state: String,
    pub volume_initial: f64,
    pub price_open: f64,
    pub sl: f64,
    pub tp: f64,
    pub magic: i64,
    pub comment: String,
    pub time_setup: DateTime<Utc>,
    pub time_done: DateTime<Utc>,
}

/// An executed deal from trading history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deal {
    pub ticket: i64,
    /// Ticket of the order that produced this deal.
    pub order: i64,
    pub symbol: String,
    pub deal_type: String,
    /// Entry direction name, e.g. `"IN"`, `"OUT"`.
    pub entry: String,
    pub volume: f64,
    pub price: f64,
    pub profit: f64,
    pub commission: f64,
    pub swap: f64,
    pub magic: i64,
    pub comment: String,
    pub time: DateTime<Utc>,
}

/// A market-order request submitted to the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub volume: f64,
    pub side: OrderSide,
    /// Execution price; `None` sends at market.
    pub price: Option<f64>,
    pub sl: Option<f64>,
    pub tp: Option<f64>,
    /// Maximum price deviation in points.
    pub deviation: u32,
    pub comment: String,
    pub magic: i64,
}

/// The platform's answer to an order send or check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeResult {
    pub retcode: u32,
    pub deal: i64,
    pub order: i64,
    pub volume: f64,
    pub price: f64,
    pub bid: f64,
    pub ask: f64,
    pub comment: String,
    pub request_id: u32,
}

impl TradeResult {
    /// Whether a live send was completed by the platform.
    pub fn is_done(&self) -> bool {
        self.retcode == TRADE_RETCODE_DONE
    }

    /// Whether an order check passed validation.
    pub fn check_passed(&self) -> bool {
        self.retcode == RETCODE_CHECK_OK
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn trade_result_retcode_predicates() {
        let done = TradeResult {
            retcode: TRADE_RETCODE_DONE,
            deal: 1,
            order: 2,
            volume: 0.1,
            price: 1.1,
            bid: 1.0999,
            ask: 1.1001,
            comment: String::new(),
            request_id: 7,
        };
        assert!(done.is_done());
        assert!(!done.check_passed());

        let checked = TradeResult { retcode: RETCODE_CHECK_OK, ..done };
        assert!(checked.check_passed());
        assert!(!checked.is_done());
    }

    #[test]
    fn position_serializes_side_uppercase() {
        let position = Position {
            ticket: 42,
            symbol: "EURUSD".to_string(),
            side: OrderSide::Sell,
            volume: 0.5,
            price_open: 1.1,
            price_current: 1.09,
            sl: 0.0,
            tp: 0.0,
            profit: 50.0,
            swap: -0.1,
            magic: 0,
            comment: String::new(),
            time: Utc::now(),
        };
        let json = serde_json::to_value(&position).unwrap();
        assert_eq!(json["side"], "SELL");
    }
}
