use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use mt5agent_core::{
    AccountInfo, Bar, Deal, HistoryOrder, Mt5AgentResult, OrderRequest, OrderSide, PendingOrder,
    Position, SymbolInfo, TerminalInfo, Tick, Timeframe, TradeResult,
};

use crate::config::Mt5Config;

/// Operation contract of the external MT5 client.
///
/// Every method is a direct passthrough to the platform. Single records
/// come back as `Option<T>` (`None` is the platform's absence signal),
/// tabular results as a `Vec<T>`; platform failures surface as
/// [`mt5agent_core::Mt5AgentError::External`].
#[async_trait]
pub trait Mt5Api: Send + Sync + std::fmt::Debug {
    /// Current account state.
    async fn account_info(&self) -> Mt5AgentResult<Option<AccountInfo>>;

    /// Terminal build and permission state.
    async fn terminal_info(&self) -> Mt5AgentResult<Option<TerminalInfo>>;

    /// Names of available symbols, optionally filtered by a group pattern
    /// such as `*USD*`.
    async fn symbols(&self, group: Option<&str>) -> Mt5AgentResult<Vec<String>>;

    /// Full specification and current prices for one symbol.
    async fn symbol_info(&self, symbol: &str) -> Mt5AgentResult<Option<SymbolInfo>>;

    /// Latest tick for one symbol.
    async fn symbol_tick(&self, symbol: &str) -> Mt5AgentResult<Option<Tick>>;

    /// The most recent `count` bars for a symbol and timeframe.
    async fn latest_rates(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: u32,
    ) -> Mt5AgentResult<Vec<Bar>>;

    /// Bars for a symbol and timeframe between two instants.
    async fn rates_range(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Mt5AgentResult<Vec<Bar>>;

    /// Ticks for the trailing `seconds` window.
    async fn latest_ticks(&self, symbol: &str, seconds: u32) -> Mt5AgentResult<Vec<Tick>>;

    /// Pending orders, optionally filtered by symbol.
    async fn orders(&self, symbol: Option<&str>) -> Mt5AgentResult<Vec<PendingOrder>>;

    /// Open positions, optionally filtered by symbol.
    async fn positions(&self, symbol: Option<&str>) -> Mt5AgentResult<Vec<Position>>;

    /// Submits a market order for execution.
    async fn order_send(&self, request: &OrderRequest) -> Mt5AgentResult<TradeResult>;

    /// Validates a market order without executing it.
    async fn order_check(&self, request: &OrderRequest) -> Mt5AgentResult<TradeResult>;

    /// Closes one open position by ticket.
    async fn close_position(
        &self,
        ticket: i64,
        deviation: u32,
        comment: &str,
    ) -> Mt5AgentResult<TradeResult>;

    /// Updates stop loss and/or take profit on one open position;
    /// `None` leaves the corresponding level unchanged.
    async fn modify_position(
        &self,
        ticket: i64,
        sl: Option<f64>,
        tp: Option<f64>,
    ) -> Mt5AgentResult<TradeResult>;

    /// Historical orders, with optional range and symbol filters passed
    /// through to the platform's own defaults.
    async fn history_orders(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        symbol: Option<&str>,
    ) -> Mt5AgentResult<Vec<HistoryOrder>>;

    /// Historical deals, with optional range and symbol filters.
    async fn history_deals(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        symbol: Option<&str>,
    ) -> Mt5AgentResult<Vec<Deal>>;

    /// Margin required to open the given position, at the given price.
    async fn calc_margin(
        &self,
        side: OrderSide,
        symbol: &str,
        volume: f64,
        price: f64,
    ) -> Mt5AgentResult<Option<f64>>;

    /// Profit for a hypothetical trade between two prices.
    async fn calc_profit(
        &self,
        side: OrderSide,
        symbol: &str,
        volume: f64,
        price_open: f64,
        price_close: f64,
    ) -> Mt5AgentResult<Option<f64>>;

    /// Maximum volume openable with the given margin. Delegated to the
    /// platform; this layer never derives it locally.
    async fn calc_volume_by_margin(
        &self,
        side: OrderSide,
        symbol: &str,
        margin: f64,
    ) -> Mt5AgentResult<Option<f64>>;

    /// Releases the session with the terminal.
    async fn shutdown(&self) -> Mt5AgentResult<()>;
}

/// Factory seam that opens a connected [`Mt5Api`] client from a config.
///
/// The default implementation dials the terminal bridge; tests inject a
/// connector returning a [`crate::mock::MockMt5`].
#[async_trait]
pub trait Mt5Connector: Send + Sync {
    /// Opens a new client session, performing the login handshake.
    async fn open(&self, config: &Mt5Config) -> Mt5AgentResult<Arc<dyn Mt5Api>>;
}
