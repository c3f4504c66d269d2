//! Scriptable in-memory client, for tests and offline development.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use mt5agent_core::{
    AccountInfo, Bar, Deal, HistoryOrder, Mt5AgentError, Mt5AgentResult, OrderRequest, OrderSide,
    PendingOrder, Position, SymbolInfo, TerminalInfo, Tick, Timeframe, TradeResult,
    RETCODE_CHECK_OK, TRADE_RETCODE_DONE,
};

use crate::api::{Mt5Api, Mt5Connector};
use crate::config::Mt5Config;

#[derive(Default)]
struct MockState {
    account: Option<AccountInfo>,
    terminal: Option<TerminalInfo>,
    symbols: Vec<String>,
    symbol_infos: HashMap<String, SymbolInfo>,
    ticks: HashMap<String, Tick>,
    rates: HashMap<String, Vec<Bar>>,
    tick_series: HashMap<String, Vec<Tick>>,
    orders: Vec<PendingOrder>,
    positions: Vec<Position>,
    history_orders: Vec<HistoryOrder>,
    history_deals: Vec<Deal>,
    margin: Option<f64>,
    profit: Option<f64>,
    volume_by_margin: Option<f64>,
    fail_message: Option<String>,
    fail_shutdown: bool,
    sent: Vec<OrderRequest>,
    checked: Vec<OrderRequest>,
    closed: Vec<i64>,
    modified: Vec<(i64, Option<f64>, Option<f64>)>,
    shutdowns: usize,
}

/// In-memory [`Mt5Api`] whose responses are scripted by the test.
///
/// Mutating calls (send/close/modify) are recorded for assertion; checks
/// are recorded separately so tests can prove a dry run touched nothing.
#[derive(Default)]
pub struct MockMt5 {
    state: Mutex<MockState>,
}

impl std::fmt::Debug for MockMt5 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockMt5").finish_non_exhaustive()
    }
}

impl MockMt5 {
    /// Creates an empty mock; every lookup reports absence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the account record.
    pub fn with_account(self, account: AccountInfo) -> Self {
        self.state_mut(|s| s.account = Some(account));
        self
    }

    /// Scripts the terminal record.
    pub fn with_terminal(self, terminal: TerminalInfo) -> Self {
        self.state_mut(|s| s.terminal = Some(terminal));
        self
    }

    /// Scripts the symbol name list.
    pub fn with_symbols(self, symbols: &[&str]) -> Self {
        self.state_mut(|s| s.symbols = symbols.iter().map(|n| (*n).to_string()).collect());
        self
    }

    /// Scripts one symbol's specification.
    pub fn with_symbol_info(self, info: SymbolInfo) -> Self {
        self.state_mut(|s| {
            s.symbol_infos.insert(info.name.clone(), info);
        });
        self
    }

    /// Scripts one symbol's current tick.
    pub fn with_tick(self, symbol: &str, tick: Tick) -> Self {
        self.state_mut(|s| {
            s.ticks.insert(symbol.to_string(), tick);
        });
        self
    }

    /// Scripts one symbol's bar series, returned for any timeframe.
    pub fn with_rates(self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.state_mut(|s| {
            s.rates.insert(symbol.to_string(), bars);
        });
        self
    }

    /// Scripts one symbol's recent tick series.
    pub fn with_tick_series(self, symbol: &str, ticks: Vec<Tick>) -> Self {
        self.state_mut(|s| {
            s.tick_series.insert(symbol.to_string(), ticks);
        });
        self
    }

    /// Scripts the pending order list.
    pub fn with_orders(self, orders: Vec<PendingOrder>) -> Self {
        self.state_mut(|s| s.orders = orders);
        self
    }

    /// Scripts the open position list.
    pub fn with_positions(self, positions: Vec<Position>) -> Self {
        self.state_mut(|s| s.positions = positions);
        self
    }

    /// Scripts order history.
    pub fn with_history_orders(self, orders: Vec<HistoryOrder>) -> Self {
        self.state_mut(|s| s.history_orders = orders);
        self
    }

    /// Scripts deal history.
    pub fn with_history_deals(self, deals: Vec<Deal>) -> Self {
        self.state_mut(|s| s.history_deals = deals);
        self
    }

    /// Scripts the platform margin calculation.
    pub fn with_margin(self, margin: f64) -> Self {
        self.state_mut(|s| s.margin = Some(margin));
        self
    }

    /// Scripts the platform profit calculation.
    pub fn with_profit(self, profit: f64) -> Self {
        self.state_mut(|s| s.profit = Some(profit));
        self
    }

    /// Scripts the platform volume-by-margin calculation.
    pub fn with_volume_by_margin(self, volume: f64) -> Self {
        self.state_mut(|s| s.volume_by_margin = Some(volume));
        self
    }

    /// Makes every subsequent call fail with an external error.
    pub fn failing(self, message: &str) -> Self {
        self.state_mut(|s| s.fail_message = Some(message.to_string()));
        self
    }

    /// Makes `shutdown` fail while other calls keep working.
    pub fn with_failing_shutdown(self) -> Self {
        self.state_mut(|s| s.fail_shutdown = true);
        self
    }

    /// Orders submitted through `order_send`.
    pub fn sent_orders(&self) -> Vec<OrderRequest> {
        self.state_ref(|s| s.sent.clone())
    }

    /// Orders validated through `order_check`.
    pub fn checked_orders(&self) -> Vec<OrderRequest> {
        self.state_ref(|s| s.checked.clone())
    }

    /// Tickets closed through `close_position`.
    pub fn closed_tickets(&self) -> Vec<i64> {
        self.state_ref(|s| s.closed.clone())
    }

    /// `(ticket, sl, tp)` triples passed to `modify_position`.
    pub fn modified_sltp(&self) -> Vec<(i64, Option<f64>, Option<f64>)> {
        self.state_ref(|s| s.modified.clone())
    }

    /// Number of `shutdown` calls observed.
    pub fn shutdown_count(&self) -> usize {
        self.state_ref(|s| s.shutdowns)
    }

    fn state_mut<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }

    fn state_ref<R>(&self, f: impl FnOnce(&MockState) -> R) -> R {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&state)
    }

    fn gate(&self) -> Mt5AgentResult<()> {
        match self.state_ref(|s| s.fail_message.clone()) {
            Some(message) => Err(Mt5AgentError::External(message)),
            None => Ok(()),
        }
    }

    fn trade_result(retcode: u32, volume: f64, price: f64) -> TradeResult {
        TradeResult {
            retcode,
            deal: 1001,
            order: 2001,
            volume,
            price,
            bid: price,
            ask: price,
            comment: "mock".to_string(),
            request_id: 1,
        }
    }
}

#[async_trait]
impl Mt5Api for MockMt5 {
    async fn account_info(&self) -> Mt5AgentResult<Option<AccountInfo>> {
        self.gate()?;
        Ok(self.state_ref(|s| s.account.clone()))
    }

    async fn terminal_info(&self) -> Mt5AgentResult<Option<TerminalInfo>> {
        self.gate()?;
        Ok(self.state_ref(|s| s.terminal.clone()))
    }

    async fn symbols(&self, group: Option<&str>) -> Mt5AgentResult<Vec<String>> {
        self.gate()?;
        let names = self.state_ref(|s| s.symbols.clone());
        // Group patterns reduce to a contains match here; the platform
        // owns the real wildcard semantics.
        Ok(match group {
            Some(pattern) => {
                let needle = pattern.trim_matches('*');
                names.into_iter().filter(|n| n.contains(needle)).collect()
            }
            None => names,
        })
    }

    async fn symbol_info(&self, symbol: &str) -> Mt5AgentResult<Option<SymbolInfo>> {
        self.gate()?;
        Ok(self.state_ref(|s| s.symbol_infos.get(symbol).cloned()))
    }

    async fn symbol_tick(&self, symbol: &str) -> Mt5AgentResult<Option<Tick>> {
        self.gate()?;
        Ok(self.state_ref(|s| s.ticks.get(symbol).cloned()))
    }

    async fn latest_rates(
        &self,
        symbol: &str,
        _timeframe: Timeframe,
        count: u32,
    ) -> Mt5AgentResult<Vec<Bar>> {
        self.gate()?;
        let mut bars = self.state_ref(|s| s.rates.get(symbol).cloned().unwrap_or_default());
        bars.truncate(count as usize);
        Ok(bars)
    }

    async fn rates_range(
        &self,
        symbol: &str,
        _timeframe: Timeframe,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Mt5AgentResult<Vec<Bar>> {
        self.gate()?;
        let bars = self.state_ref(|s| s.rates.get(symbol).cloned().unwrap_or_default());
        Ok(bars
            .into_iter()
            .filter(|b| b.time >= from && b.time <= to)
            .collect())
    }

    async fn latest_ticks(&self, symbol: &str, _seconds: u32) -> Mt5AgentResult<Vec<Tick>> {
        self.gate()?;
        Ok(self.state_ref(|s| s.tick_series.get(symbol).cloned().unwrap_or_default()))
    }

    async fn orders(&self, symbol: Option<&str>) -> Mt5AgentResult<Vec<PendingOrder>> {
        self.gate()?;
        let orders = self.state_ref(|s| s.orders.clone());
        Ok(match symbol {
            Some(name) => orders.into_iter().filter(|o| o.symbol == name).collect(),
            None => orders,
        })
    }

    async fn positions(&self, symbol: Option<&str>) -> Mt5AgentResult<Vec<Position>> {
        self.gate()?;
        let positions = self.state_ref(|s| s.positions.clone());
        Ok(match symbol {
            Some(name) => positions.into_iter().filter(|p| p.symbol == name).collect(),
            None => positions,
        })
    }

    async fn order_send(&self, request: &OrderRequest) -> Mt5AgentResult<TradeResult> {
        self.gate()?;
        self.state_mut(|s| s.sent.push(request.clone()));
        Ok(Self::trade_result(
            TRADE_RETCODE_DONE,
            request.volume,
            request.price.unwrap_or(1.0),
        ))
    }

    async fn order_check(&self, request: &OrderRequest) -> Mt5AgentResult<TradeResult> {
        self.gate()?;
        self.state_mut(|s| s.checked.push(request.clone()));
        Ok(Self::trade_result(
            RETCODE_CHECK_OK,
            request.volume,
            request.price.unwrap_or(1.0),
        ))
    }

    async fn close_position(
        &self,
        ticket: i64,
        _deviation: u32,
        _comment: &str,
    ) -> Mt5AgentResult<TradeResult> {
        self.gate()?;
        let volume = self.state_mut(|s| {
            s.closed.push(ticket);
            let volume = s
                .positions
                .iter()
                .find(|p| p.ticket == ticket)
                .map(|p| p.volume)
                .unwrap_or_default();
            s.positions.retain(|p| p.ticket != ticket);
            volume
        });
        Ok(Self::trade_result(TRADE_RETCODE_DONE, volume, 1.0))
    }

    async fn modify_position(
        &self,
        ticket: i64,
        sl: Option<f64>,
        tp: Option<f64>,
    ) -> Mt5AgentResult<TradeResult> {
        self.gate()?;
        self.state_mut(|s| {
            s.modified.push((ticket, sl, tp));
            if let Some(position) = s.positions.iter_mut().find(|p| p.ticket == ticket) {
                if let Some(sl) = sl {
                    position.sl = sl;
                }
                if let Some(tp) = tp {
                    position.tp = tp;
                }
            }
        });
        Ok(Self::trade_result(TRADE_RETCODE_DONE, 0.0, 0.0))
    }

    async fn history_orders(
        &self,
        _from: Option<DateTime<Utc>>,
        _to: Option<DateTime<Utc>>,
        symbol: Option<&str>,
    ) -> Mt5AgentResult<Vec<HistoryOrder>> {
        self.gate()?;
        let orders = self.state_ref(|s| s.history_orders.clone());
        Ok(match symbol {
            Some(name) => orders.into_iter().filter(|o| o.symbol == name).collect(),
            None => orders,
        })
    }

    async fn history_deals(
        &self,
        _from: Option<DateTime<Utc>>,
        _to: Option<DateTime<Utc>>,
        symbol: Option<&str>,
    ) -> Mt5AgentResult<Vec<Deal>> {
        self.gate()?;
        let deals = self.state_ref(|s| s.history_deals.clone());
        Ok(match symbol {
            Some(name) => deals.into_iter().filter(|d| d.symbol == name).collect(),
            None => deals,
        })
    }

    async fn calc_margin(
        &self,
        _side: OrderSide,
        _symbol: &str,
        _volume: f64,
        _price: f64,
    ) -> Mt5AgentResult<Option<f64>> {
        self.gate()?;
        Ok(self.state_ref(|s| s.margin))
    }

    async fn calc_profit(
        &self,
        _side: OrderSide,
        _symbol: &str,
        _volume: f64,
        _price_open: f64,
        _price_close: f64,
    ) -> Mt5AgentResult<Option<f64>> {
        self.gate()?;
        Ok(self.state_ref(|s| s.profit))
    }

    async fn calc_volume_by_margin(
        &self,
        _side: OrderSide,
        _symbol: &str,
        _margin: f64,
    ) -> Mt5AgentResult<Option<f64>> {
        self.gate()?;
        Ok(self.state_ref(|s| s.volume_by_margin))
    }

    async fn shutdown(&self) -> Mt5AgentResult<()> {
        let fail = self.state_mut(|s| {
            s.shutdowns += 1;
            s.fail_shutdown
        });
        if fail {
            return Err(Mt5AgentError::External("shutdown refused".to_string()));
        }
        Ok(())
    }
}

/// [`Mt5Connector`] handing out a shared [`MockMt5`].
pub struct MockConnector {
    api: Arc<MockMt5>,
    fail_message: Option<String>,
    opens: AtomicUsize,
}

impl MockConnector {
    /// Creates a connector that returns `api` on every open.
    pub fn new(api: Arc<MockMt5>) -> Self {
        Self {
            api,
            fail_message: None,
            opens: AtomicUsize::new(0),
        }
    }

    /// Creates a connector whose every open fails.
    pub fn failing(message: &str) -> Self {
        Self {
            api: Arc::new(MockMt5::new()),
            fail_message: Some(message.to_string()),
            opens: AtomicUsize::new(0),
        }
    }

    /// Number of `open` calls observed.
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Mt5Connector for MockConnector {
    async fn open(&self, _config: &Mt5Config) -> Mt5AgentResult<Arc<dyn Mt5Api>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.fail_message {
            return Err(Mt5AgentError::External(message.clone()));
        }
        Ok(self.api.clone())
    }
}

/// Builds a tick at a fixed instant, for scripting quotes in tests.
pub fn tick(bid: f64, ask: f64) -> Tick {
    Tick {
        time: Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 0).single().unwrap_or_else(Utc::now),
        bid,
        ask,
        last: bid,
        volume: 1,
    }
}

/// Builds a symbol specification with sane forex-style defaults.
pub fn symbol_info(name: &str, bid: f64, ask: f64, point: f64) -> SymbolInfo {
    SymbolInfo {
        name: name.to_string(),
        description: format!("{name} test symbol"),
        currency_base: "EUR".to_string(),
        currency_profit: "USD".to_string(),
        bid,
        ask,
        point,
        digits: 5,
        spread: ((ask - bid) / point).round() as i64,
        volume_min: 0.01,
        volume_max: 500.0,
        volume_step: 0.01,
        trade_contract_size: 100_000.0,
    }
}

/// Builds an open position for scripting trading scenarios.
pub fn position(ticket: i64, symbol: &str, side: OrderSide, volume: f64, magic: i64) -> Position {
    Position {
        ticket,
        symbol: symbol.to_string(),
        side,
        volume,
        price_open: 1.1,
        price_current: 1.1005,
        sl: 0.0,
        tp: 0.0,
        profit: 5.0,
        swap: 0.0,
        magic,
        comment: String::new(),
        time: Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).single().unwrap_or_else(Utc::now),
    }
}
